//! Request enums for the service actors. Each variant carries its
//! parameters and a oneshot channel for the reply.

use tokio::sync::oneshot;

use crate::domain::{Condition, Order, OrderDraft};
use crate::drafts::{OrderQuery, OrderRow, StoredOrder};
use crate::error::{OrderError, StockTakeError};
use crate::stocktake::{AdditionEvent, Outcome, StockTakeView};

pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

#[derive(Debug)]
pub enum StockTakeRequest {
    LoadCatalog {
        respond_to: ServiceResponse<usize, StockTakeError>,
    },
    AddUld {
        event: AdditionEvent,
        respond_to: ServiceResponse<Outcome, StockTakeError>,
    },
    RemoveUld {
        identifier: String,
        respond_to: ServiceResponse<Outcome, StockTakeError>,
    },
    ToggleFound {
        identifier: String,
        respond_to: ServiceResponse<bool, StockTakeError>,
    },
    UpdateCondition {
        identifier: String,
        condition: Condition,
        respond_to: ServiceResponse<(), StockTakeError>,
    },
    Reset {
        respond_to: ServiceResponse<(), StockTakeError>,
    },
    Snapshot {
        respond_to: ServiceResponse<StockTakeView, StockTakeError>,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum OrderDeskRequest {
    SaveDraft {
        draft: OrderDraft,
        respond_to: ServiceResponse<Order, OrderError>,
    },
    Publish {
        draft: OrderDraft,
        respond_to: ServiceResponse<Order, OrderError>,
    },
    ListOrders {
        query: OrderQuery,
        respond_to: ServiceResponse<Vec<OrderRow>, OrderError>,
    },
    GetOrder {
        id: String,
        respond_to: ServiceResponse<Option<StoredOrder>, OrderError>,
    },
    Shutdown,
}
