//! # Mock Framework
//!
//! Utilities for testing clients of a [`ResourceActor`](crate::actor_framework::ResourceActor)
//! without running one.
//!
//! [`create_mock_client`] hands back a real [`ResourceClient`] plus the
//! receiving end of its mailbox. The test then pulls requests off the
//! receiver with the `expect_*` helpers and answers them by hand, which makes
//! backend failures and odd replies easy to script.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, FrameworkError, ResourceClient, ResourceRequest};

type Reply<T> = oneshot::Sender<Result<T, FrameworkError>>;

pub fn create_mock_client<T: Entity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Next message must be a Create request.
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Reply<T::Id>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Next message must be a Get request.
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Reply<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Next message must be a List request.
pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<Reply<Vec<T>>> {
    match receiver.recv().await {
        Some(ResourceRequest::List { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Next message must be a Delete request.
pub async fn expect_delete<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Reply<()>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Delete { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogRecord, NewCatalogRecord};
    use crate::domain::Condition;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<CatalogRecord>(10);

        let create_task = tokio::spawn(async move {
            let record = NewCatalogRecord::regular("AKE12345LH", "AKE", "LH-FRA-Cargo", Condition::Serviceable);
            client.create(record).await
        });

        let (params, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(params.uld_identifier, "AKE12345LH");
        responder.send(Ok("uld_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("uld_1".to_string()));
    }

    #[tokio::test]
    async fn wrong_request_kind_yields_none() {
        let (client, mut receiver) = create_mock_client::<CatalogRecord>(10);
        let _task = tokio::spawn(async move { client.delete("uld_1".to_string()).await });

        assert!(expect_get(&mut receiver).await.is_none());
    }
}
