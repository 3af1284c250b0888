use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use super::{normalize_identifier, AdditionEvent, Outcome, Plan, StockTake, StockTakeView, Transition};
use crate::catalog::UldCatalogClient;
use crate::confirm::Confirmer;
use crate::domain::{AdditionalUld, Condition, UldState};
use crate::error::StockTakeError;
use crate::messages::{ServiceResponse, StockTakeRequest};

/// Owns one stock take. Events are handled one at a time; while a prompt is
/// waiting for an answer the next event waits too.
pub struct StockTakeService {
    receiver: mpsc::Receiver<StockTakeRequest>,
    catalog: UldCatalogClient,
    confirmer: Confirmer,
    state: StockTake,
    view: watch::Sender<StockTakeView>,
}

impl StockTakeService {
    pub fn new(
        buffer_size: usize,
        catalog: UldCatalogClient,
        confirmer: Confirmer,
    ) -> (Self, StockTakeClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (view, view_rx) = watch::channel(StockTakeView::default());
        let service = Self {
            receiver,
            catalog,
            confirmer,
            state: StockTake::default(),
            view,
        };
        (service, StockTakeClient::new(sender, view_rx))
    }

    #[instrument(name = "stock_take_service", skip(self))]
    pub async fn run(mut self) {
        info!("StockTakeService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StockTakeRequest::LoadCatalog { respond_to } => {
                    self.handle_load_catalog(respond_to).await;
                }
                StockTakeRequest::AddUld { event, respond_to } => {
                    self.handle_add_uld(event, respond_to).await;
                }
                StockTakeRequest::RemoveUld { identifier, respond_to } => {
                    self.handle_remove_uld(identifier, respond_to).await;
                }
                StockTakeRequest::ToggleFound { identifier, respond_to } => {
                    let result = self.state.toggle_found(&identifier);
                    if result.is_ok() {
                        self.publish();
                    }
                    let _ = respond_to.send(result);
                }
                StockTakeRequest::UpdateCondition {
                    identifier,
                    condition,
                    respond_to,
                } => {
                    self.handle_update_condition(identifier, condition, respond_to);
                }
                StockTakeRequest::Reset { respond_to } => {
                    info!("Resetting stock take");
                    self.state.reset();
                    self.publish();
                    let _ = respond_to.send(Ok(()));
                }
                StockTakeRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(Ok(StockTakeView::of(&self.state)));
                }
                StockTakeRequest::Shutdown => {
                    info!("StockTakeService shutting down");
                    break;
                }
            }
        }

        info!("StockTakeService stopped");
    }

    fn publish(&self) {
        self.view.send_replace(StockTakeView::of(&self.state));
    }

    #[instrument(skip(self, respond_to))]
    async fn handle_load_catalog(&mut self, respond_to: ServiceResponse<usize, StockTakeError>) {
        debug!("Processing load_catalog request");

        let records = match self.catalog.list_all().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to load ULD catalog; keeping current state");
                let _ = respond_to.send(Err(e.into()));
                return;
            }
        };

        let ulds: Vec<_> = records
            .iter()
            .filter(|r| !r.is_additional)
            .map(|r| r.to_catalog_uld())
            .collect();
        self.state = StockTake::new(ulds);
        let count = self.state.catalog().len();
        info!(uld_count = count, "Catalog loaded");

        self.publish();
        let _ = respond_to.send(Ok(count));
    }

    #[instrument(fields(uld = %event.identifier, location = %event.location), skip(self, event, respond_to))]
    async fn handle_add_uld(&mut self, event: AdditionEvent, respond_to: ServiceResponse<Outcome, StockTakeError>) {
        debug!("Processing add_uld request");
        let _ = respond_to.send(self.add_uld(event).await);
    }

    async fn add_uld(&mut self, event: AdditionEvent) -> Result<Outcome, StockTakeError> {
        let identifier = normalize_identifier(&event.identifier)?;
        let location = event.location.trim().to_string();
        if location.is_empty() {
            return Err(StockTakeError::MissingLocation);
        }
        let event = AdditionEvent {
            identifier,
            location,
            condition: event.condition,
        };

        // The backend may know a ULD this stock take never loaded.
        let mut known_to_backend = false;
        if matches!(self.state.state_of(&event.identifier), UldState::Unknown) {
            let found = self.catalog.find_by_identifier(&event.identifier).await.map_err(|e| {
                error!(error = %e, "ULD lookup failed");
                StockTakeError::from(e)
            })?;
            if let Some(record) = found {
                known_to_backend = true;
                if !record.is_additional {
                    info!(home = %record.location(), "ULD found in catalog backend");
                    self.state.adopt(record.to_catalog_uld())?;
                    self.publish();
                }
            }
        }

        let plan = self.state.plan_addition(&event);
        self.commit(plan, known_to_backend).await
    }

    #[instrument(fields(uld = %identifier), skip(self, respond_to))]
    async fn handle_remove_uld(&mut self, identifier: String, respond_to: ServiceResponse<Outcome, StockTakeError>) {
        debug!("Processing remove_uld request");
        let result = match normalize_identifier(&identifier) {
            Ok(identifier) => match self.state.plan_removal(&identifier) {
                Ok(plan) => self.commit(plan, true).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        let _ = respond_to.send(result);
    }

    /// Asks if the plan needs it, runs the backend side effect, then applies.
    async fn commit(&mut self, plan: Plan, known_to_backend: bool) -> Result<Outcome, StockTakeError> {
        if let Some(prompt) = plan.prompt {
            if !self.confirmer.request_confirmation(prompt).await {
                info!("Change cancelled");
                return Ok(Outcome::Cancelled);
            }
        }

        match &plan.transition {
            Transition::Discover {
                identifier,
                location,
                condition,
            } if !known_to_backend => {
                let uld = AdditionalUld {
                    identifier: identifier.clone(),
                    uld_type: None,
                    location: location.clone(),
                    condition: *condition,
                    is_found: true,
                    displaced_from: None,
                };
                if let Err(e) = self.catalog.add_additional(&uld).await {
                    error!(error = %e, "Failed to post new ULD; keeping current state");
                    return Err(e.into());
                }
            }
            Transition::Discard { identifier } => match self.catalog.remove(identifier).await {
                Ok(true) => {}
                Ok(false) => warn!("Discarded ULD was not in the catalog backend"),
                Err(e) => {
                    error!(error = %e, "Failed to remove ULD from catalog backend; keeping current state");
                    return Err(e.into());
                }
            },
            _ => {}
        }

        self.state.apply(plan.transition)?;
        self.publish();
        info!(additional_count = self.state.additional().len(), "Change committed");
        Ok(Outcome::Committed)
    }

    #[instrument(fields(uld = %identifier, condition = %condition), skip(self, respond_to))]
    fn handle_update_condition(
        &mut self,
        identifier: String,
        condition: Condition,
        respond_to: ServiceResponse<(), StockTakeError>,
    ) {
        let result = self.state.update_condition(&identifier, condition);
        match &result {
            Ok(()) => {
                debug!("Condition updated");
                self.publish();
            }
            Err(e) => warn!(error = %e, "Condition not updated"),
        }
        let _ = respond_to.send(result);
    }
}

#[derive(Clone)]
pub struct StockTakeClient {
    sender: mpsc::Sender<StockTakeRequest>,
    view: watch::Receiver<StockTakeView>,
}

impl StockTakeClient {
    pub fn new(sender: mpsc::Sender<StockTakeRequest>, view: watch::Receiver<StockTakeView>) -> Self {
        Self { sender, view }
    }

    /// A receiver that sees the view after every change committed from now on.
    pub fn subscribe(&self) -> watch::Receiver<StockTakeView> {
        let mut view = self.view.clone();
        view.borrow_and_update();
        view
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StockTakeError> {
        debug!("Sending shutdown request");
        self.sender
            .send(StockTakeRequest::Shutdown)
            .await
            .map_err(|e| StockTakeError::ActorCommunicationError(e.to_string()))
    }
}

client_method!(StockTakeClient => fn load_catalog() -> usize as StockTakeRequest::LoadCatalog, Error = StockTakeError);
client_method!(StockTakeClient => fn add_uld(event: AdditionEvent) -> Outcome as StockTakeRequest::AddUld, Error = StockTakeError);
client_method!(StockTakeClient => fn remove_uld(identifier: String) -> Outcome as StockTakeRequest::RemoveUld, Error = StockTakeError);
client_method!(StockTakeClient => fn toggle_found(identifier: String) -> bool as StockTakeRequest::ToggleFound, Error = StockTakeError);
client_method!(StockTakeClient => fn update_condition(identifier: String, condition: Condition) -> () as StockTakeRequest::UpdateCondition, Error = StockTakeError);
client_method!(StockTakeClient => fn reset() -> () as StockTakeRequest::Reset, Error = StockTakeError);
client_method!(StockTakeClient => fn snapshot() -> StockTakeView as StockTakeRequest::Snapshot, Error = StockTakeError);
