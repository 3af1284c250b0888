//! Generic resource actor: one task owning a keyed collection of entities,
//! driven over an mpsc mailbox with oneshot replies.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

pub use crate::error::FrameworkError;

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Anything a [`ResourceActor`] can own.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Ord + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;

    fn id(&self) -> &Self::Id;

    /// Builds the entity from a freshly issued id. An `Err` rejects the create.
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, String>;

    // --- Lifecycle hooks ---

    fn on_create(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn on_delete(&self) -> Result<(), String> {
        Ok(())
    }
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        respond_to: Response<Vec<T>>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Shutdown,
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: BTreeMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: BTreeMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        (actor, ResourceClient::new(sender))
    }

    #[instrument(name = "resource_actor", skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn run(mut self) {
        info!("ResourceActor starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let _ = respond_to.send(self.handle_create(params));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.store.get(&id).cloned()));
                }
                ResourceRequest::List { respond_to } => {
                    let _ = respond_to.send(Ok(self.store.values().cloned().collect()));
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(id));
                }
                ResourceRequest::Shutdown => {
                    info!("ResourceActor shutting down");
                    break;
                }
            }
        }

        info!(remaining = self.store.len(), "ResourceActor stopped");
    }

    fn handle_create(&mut self, params: T::CreateParams) -> Result<T::Id, FrameworkError> {
        let id = (self.next_id_fn)();
        let mut item = T::from_create_params(id.clone(), params).map_err(|reason| {
            warn!(%reason, "Create rejected");
            FrameworkError::Rejected(reason)
        })?;
        item.on_create().map_err(FrameworkError::Rejected)?;
        self.store.insert(id.clone(), item);
        debug!(%id, "Entity created");
        Ok(id)
    }

    fn handle_delete(&mut self, id: T::Id) -> Result<(), FrameworkError> {
        let item = self
            .store
            .get(&id)
            .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;
        item.on_delete().map_err(FrameworkError::Rejected)?;
        self.store.remove(&id);
        debug!(%id, "Entity deleted");
        Ok(())
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn call<R>(
        &self,
        request: ResourceRequest<T>,
        response: oneshot::Receiver<Result<R, FrameworkError>>,
    ) -> Result<R, FrameworkError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T::Id, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.call(ResourceRequest::Create { params, respond_to }, response)
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.call(ResourceRequest::Get { id, respond_to }, response).await
    }

    pub async fn list(&self) -> Result<Vec<T>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.call(ResourceRequest::List { respond_to }, response).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.call(ResourceRequest::Delete { id, respond_to }, response)
            .await
    }

    pub async fn shutdown(&self) -> Result<(), FrameworkError> {
        self.sender
            .send(ResourceRequest::Shutdown)
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Pallet {
        id: u64,
        tag: String,
        locked: bool,
    }

    #[derive(Debug)]
    struct NewPallet {
        tag: String,
        locked: bool,
    }

    impl Entity for Pallet {
        type Id = u64;
        type CreateParams = NewPallet;

        fn id(&self) -> &u64 {
            &self.id
        }

        fn from_create_params(id: u64, params: NewPallet) -> Result<Self, String> {
            if params.tag.is_empty() {
                return Err("tag required".into());
            }
            Ok(Self {
                id,
                tag: params.tag,
                locked: params.locked,
            })
        }

        fn on_delete(&self) -> Result<(), String> {
            if self.locked {
                Err(format!("pallet {} is locked", self.id))
            } else {
                Ok(())
            }
        }
    }

    fn spawn_actor() -> ResourceClient<Pallet> {
        let counter = Arc::new(AtomicU64::new(1));
        let (actor, client) = ResourceActor::new(10, move || counter.fetch_add(1, Ordering::SeqCst));
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn create_get_list_delete() {
        let client = spawn_actor();

        let a = client
            .create(NewPallet { tag: "a".into(), locked: false })
            .await
            .unwrap();
        let b = client
            .create(NewPallet { tag: "b".into(), locked: false })
            .await
            .unwrap();
        assert_eq!((a, b), (1, 2));

        let fetched = client.get(a).await.unwrap().unwrap();
        assert_eq!(fetched.tag, "a");
        assert_eq!(client.list().await.unwrap().len(), 2);

        client.delete(a).await.unwrap();
        assert_eq!(client.get(a).await.unwrap(), None);
        assert_eq!(client.delete(a).await, Err(FrameworkError::NotFound("1".into())));

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn hooks_can_reject() {
        let client = spawn_actor();

        let rejected = client.create(NewPallet { tag: String::new(), locked: false }).await;
        assert_eq!(rejected, Err(FrameworkError::Rejected("tag required".into())));

        let id = client
            .create(NewPallet { tag: "x".into(), locked: true })
            .await
            .unwrap();
        assert!(matches!(client.delete(id).await, Err(FrameworkError::Rejected(_))));
        assert!(client.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn closed_mailbox_is_reported() {
        let (actor, client) = ResourceActor::<Pallet>::new(1, || 0);
        drop(actor);
        assert_eq!(client.list().await, Err(FrameworkError::ActorClosed));
    }
}
