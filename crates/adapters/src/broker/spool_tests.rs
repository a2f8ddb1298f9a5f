// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn spool(dir: &Path) -> SpoolBroker {
    SpoolBroker::new(dir).with_poll_interval(Duration::from_millis(5))
}

#[yare::parameterized(
    absolute = { "file:///var/spool/bq", Some("/var/spool/bq") },
    relative = { "file://spool",         Some("spool") },
    no_path  = { "file://",              None },
    tcp      = { "tcp://localhost:61616", None },
)]
fn parse_uri(uri: &str, expected: Option<&str>) {
    let parsed = SpoolBroker::from_uri(uri).ok();
    assert_eq!(
        parsed.as_ref().map(|b| b.root().to_path_buf()),
        expected.map(PathBuf::from)
    );
}

#[yare::parameterized(
    plain        = { "bl.scan.queue", "bl.scan.queue" },
    slashes      = { "a/b",           "a%2Fb" },
    underscore   = { "a_b",           "a_b" },
    percent      = { "a%2Fb",         "a%252Fb" },
    dot_dot      = { "..",            "%2E." },
    leading_dot  = { ".hidden",       "%2Ehidden" },
    empty        = { "",              "%" },
)]
fn file_names(input: &str, expected: &str) {
    assert_eq!(file_name(input), expected);
}

#[tokio::test]
async fn missing_root_is_unreachable() {
    let dir = tempdir().unwrap();
    let broker = spool(&dir.path().join("gone"));
    let err = broker.submit("q", "x".to_string()).await.unwrap_err();
    assert!(matches!(err, BrokerError::Unreachable(_)));
    assert!(broker.open_receiver("q").await.is_err());
}

#[tokio::test]
async fn queue_round_trip_in_submit_order() {
    let dir = tempdir().unwrap();
    let broker = spool(dir.path());
    broker.submit("q", "first".to_string()).await.unwrap();
    broker.submit("q", "second\nline".to_string()).await.unwrap();

    assert_eq!(broker.queue_entries("q").await.unwrap().len(), 2);

    let mut rx = broker.open_receiver("q").await.unwrap();
    let t = Duration::from_millis(20);
    assert_eq!(rx.receive(t).await.unwrap().as_deref(), Some("first"));
    assert_eq!(rx.receive(t).await.unwrap().as_deref(), Some("second\nline"));
    assert_eq!(rx.receive(t).await.unwrap(), None);
}

#[tokio::test]
async fn receiver_fails_once_root_disappears() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("spool");
    std::fs::create_dir_all(&root).unwrap();
    let broker = spool(&root);
    let mut rx = broker.open_receiver("q").await.unwrap();

    std::fs::remove_dir_all(&root).unwrap();
    let err = rx.receive(Duration::from_millis(10)).await.unwrap_err();
    assert!(matches!(err, BrokerError::Unreachable(_)));
}

#[tokio::test]
async fn subscriber_sees_only_later_publishes() {
    let dir = tempdir().unwrap();
    let broker = spool(dir.path());
    broker.publish("t", "before".to_string()).await.unwrap();

    let mut sub = broker.subscribe("t").await.unwrap();
    broker.publish("t", "one".to_string()).await.unwrap();
    broker.publish("t", "two".to_string()).await.unwrap();

    async fn next(sub: &mut Subscription) -> Option<String> {
        let fut = sub.recv();
        tokio::time::timeout(Duration::from_secs(2), fut).await.unwrap()
    }
    assert_eq!(next(&mut sub).await.as_deref(), Some("one"));
    assert_eq!(next(&mut sub).await.as_deref(), Some("two"));
}

#[tokio::test]
async fn subscriber_follows_topic_across_generations() {
    let dir = tempdir().unwrap();
    // Two records of "\"n\"\n" per generation
    let broker = spool(dir.path()).with_topic_limit(8);
    let mut sub = broker.subscribe("t").await.unwrap();
    for n in ["a", "b", "c", "d"] {
        broker.publish("t", n.to_string()).await.unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..4 {
        let next = tokio::time::timeout(Duration::from_secs(2), sub.recv()).await;
        received.push(next.unwrap().unwrap());
    }
    assert_eq!(received, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn topic_keeps_only_the_last_two_generations() {
    let dir = tempdir().unwrap();
    let broker = spool(dir.path()).with_topic_limit(8);
    for n in 0..8 {
        broker.publish("t", n.to_string()).await.unwrap();
    }

    let gens = generations(&broker.topic_dir("t")).await.unwrap();
    assert_eq!(gens, vec![2, 3]);
}

#[tokio::test]
async fn set_upsert_replaces_by_key() {
    let dir = tempdir().unwrap();
    let broker = spool(dir.path());
    broker.upsert("s", "job/1", "v1".to_string()).await.unwrap();
    broker.upsert("s", "job/1", "v2".to_string()).await.unwrap();

    assert_eq!(broker.set_entries("s").await.unwrap(), vec!["v2"]);

    broker.clear("s").await.unwrap();
    assert!(broker.set_entries("s").await.unwrap().is_empty());
}

#[tokio::test]
async fn set_keys_differing_only_in_punctuation_stay_apart() {
    let dir = tempdir().unwrap();
    let broker = spool(dir.path());
    broker.upsert("s", "scan/1", "first".to_string()).await.unwrap();
    broker.upsert("s", "scan_1", "second".to_string()).await.unwrap();
    broker.upsert("s", "scan 1", "third".to_string()).await.unwrap();

    let mut entries = broker.set_entries("s").await.unwrap();
    entries.sort();
    assert_eq!(entries, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn queues_with_similar_names_do_not_share_messages() {
    let dir = tempdir().unwrap();
    let broker = spool(dir.path());
    broker.submit("bl/jobs", "a".to_string()).await.unwrap();
    broker.submit("bl_jobs", "b".to_string()).await.unwrap();

    assert_eq!(broker.queue_entries("bl/jobs").await.unwrap(), vec!["a"]);
    assert_eq!(broker.queue_entries("bl_jobs").await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn dropped_receive_leaves_queue_intact() {
    let dir = tempdir().unwrap();
    let broker = spool(dir.path());
    let mut rx = broker.open_receiver("q").await.unwrap();

    let waiting = tokio::time::timeout(
        Duration::from_millis(20),
        rx.receive(Duration::from_secs(5)),
    )
    .await;
    assert!(waiting.is_err());
    broker.submit("q", "kept".to_string()).await.unwrap();

    assert_eq!(broker.queue_entries("q").await.unwrap(), vec!["kept"]);
    assert_eq!(
        rx.receive(Duration::from_secs(1)).await.unwrap().as_deref(),
        Some("kept")
    );
}
