//! Tests for drain session defaults.

use super::*;

fn locator() -> QueueLocator {
    "orders".parse().unwrap()
}

#[test]
fn test_detected_worker_count_is_never_zero() {
    let detected = detect_worker_count();
    assert!(detected.get() >= 1);
}

#[test]
fn test_new_session_uses_defaults() {
    let session = DrainSession::new(locator(), DEFAULT_OUTPUT_FILE);

    assert_eq!(session.output(), Path::new("queue_messages.json"));
    assert_eq!(session.worker_count, detect_worker_count());
    assert!(!session.purge);
    assert_eq!(session.empty_receive_limit.get(), 2);
    assert_eq!(session.receive_options.max_messages, 10);
}

#[test]
fn test_builders_override_defaults() {
    let session = DrainSession::new(locator(), "/tmp/snapshot.json")
        .with_worker_count(NonZeroUsize::new(3).unwrap())
        .with_purge(true)
        .with_empty_receive_limit(NonZeroU32::new(5).unwrap())
        .with_receive_options(ReceiveOptions::new().with_max_messages(4));

    assert_eq!(session.worker_count.get(), 3);
    assert!(session.purge);
    assert_eq!(session.empty_receive_limit.get(), 5);
    assert_eq!(session.receive_options.max_messages, 4);
}
