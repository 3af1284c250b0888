//! Order desk actor: the single writer of the draft and published tables.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{Order, OrderDraft};
use crate::drafts::{DraftRepository, OrderQuery, OrderRow, StoredOrder};
use crate::error::OrderError;
use crate::messages::{OrderDeskRequest, ServiceResponse};
use crate::storage::KeyValueStore;

pub struct OrderDeskService<S> {
    receiver: mpsc::Receiver<OrderDeskRequest>,
    repository: DraftRepository<S>,
    require_balanced_flow: bool,
}

impl<S: KeyValueStore> OrderDeskService<S> {
    pub fn new(buffer_size: usize, store: S, require_balanced_flow: bool) -> (Self, OrderDeskClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            repository: DraftRepository::new(store),
            require_balanced_flow,
        };
        (service, OrderDeskClient::new(sender))
    }

    #[instrument(name = "order_desk_service", skip(self))]
    pub async fn run(mut self) {
        info!(require_balanced_flow = self.require_balanced_flow, "OrderDeskService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                OrderDeskRequest::SaveDraft { draft, respond_to } => {
                    self.handle_save_draft(draft, respond_to);
                }
                OrderDeskRequest::Publish { draft, respond_to } => {
                    self.handle_publish(draft, respond_to);
                }
                OrderDeskRequest::ListOrders { query, respond_to } => {
                    self.handle_list_orders(query, respond_to);
                }
                OrderDeskRequest::GetOrder { id, respond_to } => {
                    self.handle_get_order(id, respond_to);
                }
                OrderDeskRequest::Shutdown => {
                    info!("OrderDeskService shutting down");
                    break;
                }
            }
        }

        info!("OrderDeskService stopped");
    }

    #[instrument(
        fields(awb = %draft.details.awb_number(), order_id = ?draft.id),
        skip(self, draft, respond_to)
    )]
    fn handle_save_draft(&mut self, draft: OrderDraft, respond_to: ServiceResponse<Order, OrderError>) {
        debug!("Processing save_draft request");
        let result = self.repository.save_draft(draft, Utc::now());
        if let Err(e) = &result {
            warn!(error = %e, "Draft not saved");
        }
        let _ = respond_to.send(result);
    }

    #[instrument(
        fields(awb = %draft.details.awb_number(), order_id = ?draft.id),
        skip(self, draft, respond_to)
    )]
    fn handle_publish(&mut self, draft: OrderDraft, respond_to: ServiceResponse<Order, OrderError>) {
        debug!("Processing publish request");
        let result = self
            .repository
            .publish(draft, self.require_balanced_flow, Utc::now());
        match &result {
            Ok(order) => info!(order_id = %order.id, "Order published"),
            Err(OrderError::Store(e)) => error!(error = %e, "Publishing failed in storage"),
            Err(e) => warn!(error = %e, "Order not published"),
        }
        let _ = respond_to.send(result);
    }

    #[instrument(fields(text = ?query.text), skip(self, query, respond_to))]
    fn handle_list_orders(&self, query: OrderQuery, respond_to: ServiceResponse<Vec<OrderRow>, OrderError>) {
        debug!("Processing list_orders request");
        let result = self.repository.list(&query).map_err(|e| {
            error!(error = %e, "Order tables unreadable");
            OrderError::from(e)
        });
        if let Ok(rows) = &result {
            info!(row_count = rows.len(), "Listed orders");
        }
        let _ = respond_to.send(result);
    }

    #[instrument(fields(order_id = %id), skip(self, respond_to))]
    fn handle_get_order(&self, id: String, respond_to: ServiceResponse<Option<StoredOrder>, OrderError>) {
        debug!("Processing get_order request");
        let result = self.repository.get(&id).map_err(OrderError::from);
        match &result {
            Ok(Some(stored)) => debug!(status = %stored.status(), "Order found"),
            Ok(None) => debug!("Order not found"),
            Err(e) => error!(error = %e, "Order tables unreadable"),
        }
        let _ = respond_to.send(result);
    }
}

#[derive(Clone)]
pub struct OrderDeskClient {
    sender: mpsc::Sender<OrderDeskRequest>,
}

impl OrderDeskClient {
    pub fn new(sender: mpsc::Sender<OrderDeskRequest>) -> Self {
        Self { sender }
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), OrderError> {
        debug!("Sending shutdown request");
        self.sender
            .send(OrderDeskRequest::Shutdown)
            .await
            .map_err(|e| OrderError::ActorCommunicationError(e.to_string()))
    }
}

client_method!(OrderDeskClient => fn save_draft(draft: OrderDraft) -> Order as OrderDeskRequest::SaveDraft, Error = OrderError);
client_method!(OrderDeskClient => fn publish(draft: OrderDraft) -> Order as OrderDeskRequest::Publish, Error = OrderError);
client_method!(OrderDeskClient => fn list_orders(query: OrderQuery) -> Vec<OrderRow> as OrderDeskRequest::ListOrders, Error = OrderError);
client_method!(OrderDeskClient => fn get_order(id: String) -> Option<StoredOrder> as OrderDeskRequest::GetOrder, Error = OrderError);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FlightLeg, OrderDetails, Product};
    use crate::drafts::{OrderStatus, DRAFTS_KEY};
    use crate::error::StoreError;
    use crate::storage::MemoryStore;

    fn draft() -> OrderDraft {
        let mut first = FlightLeg::new("LH400", "FRA", "ORD", "CoolPro", 3);
        first.date = Some(Utc::now() + chrono::Duration::days(2));
        let mut second = FlightLeg::new("UA900", "ORD", "JFK", "CoolPro", 3);
        second.date = first.date;
        OrderDraft {
            id: None,
            order_type: "Lease".into(),
            supplier: "Envirotainer".into(),
            details: OrderDetails {
                awb_prefix: "020".into(),
                awb_suffix: "123456".into(),
                awb_origin: "FRA".into(),
                awb_destination: "JFK".into(),
                ..Default::default()
            },
            products: vec![Product::new("CoolPro", 3)],
            flights: vec![first, second],
        }
    }

    fn start(store: MemoryStore) -> OrderDeskClient {
        let (service, client) = OrderDeskService::new(8, store, true);
        tokio::spawn(service.run());
        client
    }

    #[tokio::test]
    async fn save_then_publish_through_the_actor() {
        let client = start(MemoryStore::new());

        let saved = client.save_draft(draft()).await.unwrap();
        let rows = client.list_orders(OrderQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, OrderStatus::Draft);

        let published = client.publish(saved.to_draft()).await.unwrap();
        assert_eq!(published.id, saved.id);

        match client.get_order(saved.id.clone()).await.unwrap() {
            Some(StoredOrder::Published(order)) => assert_eq!(order.details.awb_number(), "020-123456"),
            other => panic!("expected published order, got {other:?}"),
        }
        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn leftover_at_transit_node_blocks_publish() {
        let client = start(MemoryStore::new());
        let mut unbalanced = draft();
        unbalanced.flights[1].quantity = Some(2);

        match client.publish(unbalanced).await {
            Err(OrderError::Unbalanced(violations)) => {
                assert!(violations.iter().any(|v| v.node == "ORD"));
            }
            other => panic!("expected unbalanced, got {other:?}"),
        }
        assert!(client.list_orders(OrderQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_storage_is_reported_not_hidden() {
        let mut store = MemoryStore::new();
        store.set(DRAFTS_KEY, "[{\"broken\":".into()).unwrap();
        let client = start(store);

        assert!(matches!(
            client.list_orders(OrderQuery::default()).await,
            Err(OrderError::Store(StoreError::Corrupt { .. }))
        ));
    }

    #[tokio::test]
    async fn stopped_service_reports_communication_error() {
        let client = start(MemoryStore::new());
        client.shutdown().await.unwrap();
        tokio::task::yield_now().await;

        let err = client.get_order("x".into()).await.unwrap_err();
        assert!(matches!(err, OrderError::ActorCommunicationError(_)));
    }
}
