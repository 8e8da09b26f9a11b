//! Tests for the receive-phase poller.

use super::*;
use crate::testing::{queue_url, ScriptedQueueClient};
use sqs_peek_runtime::QueueLocator;
use std::time::Duration;

fn session() -> DrainSession {
    let locator: QueueLocator = "orders".parse().unwrap();
    DrainSession::new(locator, "unused.json")
}

fn poller(client: &Arc<ScriptedQueueClient>, collection: &MessageCollection, session: &DrainSession) -> Poller {
    Poller::new(
        0,
        Arc::clone(client) as Arc<dyn QueueClient>,
        queue_url(),
        collection.clone(),
        session,
    )
}

#[tokio::test]
async fn test_drains_scripted_batches_then_stops_after_two_empties() {
    let client = Arc::new(ScriptedQueueClient::new([10, 10, 3, 0, 0]));
    let collection = MessageCollection::new();

    let report = poller(&client, &collection, &session()).run().await.unwrap();

    assert_eq!(client.receive_calls(), 5);
    assert_eq!(report.receive_calls, 5);
    assert_eq!(report.messages_received, 23);
    assert_eq!(collection.len().await, 23);
}

#[tokio::test]
async fn test_two_empty_receives_on_empty_queue() {
    let client = Arc::new(ScriptedQueueClient::new([]));
    let collection = MessageCollection::new();

    let report = poller(&client, &collection, &session()).run().await.unwrap();

    assert_eq!(report.receive_calls, 2);
    assert_eq!(report.messages_received, 0);
    assert!(collection.is_empty().await);
}

#[tokio::test]
async fn test_single_empty_receive_does_not_stop_the_poller() {
    let client = Arc::new(ScriptedQueueClient::new([4, 0, 6]));
    let collection = MessageCollection::new();

    let report = poller(&client, &collection, &session()).run().await.unwrap();

    // 4, empty, 6, empty, empty
    assert_eq!(report.receive_calls, 5);
    assert_eq!(report.messages_received, 10);
}

#[tokio::test]
async fn test_empty_receive_limit_is_configurable() {
    let client = Arc::new(ScriptedQueueClient::new([2]));
    let collection = MessageCollection::new();
    let session = session().with_empty_receive_limit(NonZeroU32::new(4).unwrap());

    let report = poller(&client, &collection, &session).run().await.unwrap();

    assert_eq!(report.receive_calls, 5);
}

#[tokio::test]
async fn test_request_size_is_clamped_to_batch_cap() {
    // The scripted client asserts every request asks for at most 10
    let client = Arc::new(ScriptedQueueClient::new([10]));
    let collection = MessageCollection::new();
    let session = session().with_receive_options(ReceiveOptions::new().with_max_messages(50));

    let poller = poller(&client, &collection, &session);
    assert_eq!(
        poller.options.max_messages as usize,
        client.provider_type().max_batch_size()
    );
    let report = poller.run().await.unwrap();

    assert_eq!(report.messages_received, 10);
}

#[tokio::test]
async fn test_zero_request_size_is_raised_to_one() {
    let client = Arc::new(ScriptedQueueClient::new([1]));
    let collection = MessageCollection::new();
    let session = session().with_receive_options(ReceiveOptions::new().with_max_messages(0));

    let poller = poller(&client, &collection, &session);

    assert_eq!(poller.options.max_messages, 1);
}

#[tokio::test]
async fn test_receive_error_stops_the_poller() {
    let client = Arc::new(ScriptedQueueClient::new([10, 10, 10, 10]).failing_receive_on(3));
    let collection = MessageCollection::new();

    let error = poller(&client, &collection, &session()).run().await.unwrap_err();

    assert!(matches!(error, DrainError::Receive { worker: 0, .. }));
    assert_eq!(client.receive_calls(), 3);
    assert_eq!(collection.len().await, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pollers_collect_every_delivered_message() {
    let batches: Vec<usize> = (0..60).map(|n| 1 + n % 10).collect();
    let client = Arc::new(
        ScriptedQueueClient::new(batches.clone()).with_receive_delay(Duration::from_millis(2)),
    );
    let collection = MessageCollection::new();
    let session = session();

    let mut tasks = tokio::task::JoinSet::new();
    for worker in 0..8 {
        let poller = Poller::new(
            worker,
            Arc::clone(&client) as Arc<dyn QueueClient>,
            queue_url(),
            collection.clone(),
            &session,
        );
        tasks.spawn(poller.run());
    }

    let mut reported = 0;
    while let Some(joined) = tasks.join_next().await {
        reported += joined.unwrap().unwrap().messages_received;
    }

    let delivered: usize = client.delivered_batch_sizes().iter().sum();
    assert_eq!(delivered, batches.iter().sum::<usize>());
    assert_eq!(collection.len().await, delivered);
    assert_eq!(reported, delivered);
}
