use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use super::queue::DropOldestQueue;
use super::{ClientSession, Enqueue, SessionState, SlowConsumerPolicy};
use crate::hub::message::Message;

fn msg(n: usize) -> Arc<Message> {
    Arc::new(Message::new("Camera_status", format!("{n}")))
}

fn payloads(messages: &[Arc<Message>]) -> Vec<String> {
    messages.iter().map(|m| m.payload_text()).collect()
}

#[test]
fn test_queue_evicts_oldest_when_full() {
    let mut queue = DropOldestQueue::with_capacity(2);
    assert_eq!(queue.push(1), None);
    assert_eq!(queue.push(2), None);
    assert!(queue.is_full());
    assert_eq!(queue.push(3), Some(1));
    assert_eq!(queue.pop(), Some(2));
    assert_eq!(queue.pop(), Some(3));
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_queue_zero_capacity_keeps_newest() {
    let mut queue = DropOldestQueue::with_capacity(0);
    assert_eq!(queue.capacity(), 1);
    queue.push("a");
    assert_eq!(queue.push("b"), Some("a"));
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_session_new() {
    let session = ClientSession::new(64, SlowConsumerPolicy::DropOldest);
    assert!(session.id().starts_with("session-"));
    assert_eq!(session.state(), SessionState::Connecting);
    assert_eq!(session.capacity(), 64);
    assert!(session.is_empty());

    session.open();
    assert_eq!(session.state(), SessionState::Open);
}

#[test]
fn test_hundred_messages_into_capacity_64_keeps_last_64() {
    let session = ClientSession::new(64, SlowConsumerPolicy::DropOldest);
    session.open();

    for n in 0..100 {
        session.enqueue(msg(n));
    }

    let expected: Vec<String> = (36..100).map(|n| n.to_string()).collect();
    assert_eq!(payloads(&session.pending()), expected);
}

#[test]
fn test_enqueue_reports_consecutive_drops() {
    let session = ClientSession::new(1, SlowConsumerPolicy::DropOldest);
    assert_eq!(session.enqueue(msg(0)), Enqueue::Queued);
    assert_eq!(
        session.enqueue(msg(1)),
        Enqueue::DroppedOldest { consecutive: 1 }
    );
    assert_eq!(
        session.enqueue(msg(2)),
        Enqueue::DroppedOldest { consecutive: 2 }
    );
}

#[tokio::test]
async fn test_drain_resets_consecutive_drops() {
    let session = ClientSession::new(1, SlowConsumerPolicy::Disconnect { after: 2 });
    session.enqueue(msg(0));
    assert_eq!(
        session.enqueue(msg(1)),
        Enqueue::DroppedOldest { consecutive: 1 }
    );

    assert_eq!(session.next().await.unwrap().payload_text(), "1");
    assert_eq!(session.enqueue(msg(2)), Enqueue::Queued);
    assert_eq!(
        session.enqueue(msg(3)),
        Enqueue::DroppedOldest { consecutive: 1 }
    );
    assert_eq!(session.state(), SessionState::Connecting);
}

#[test]
fn test_disconnect_policy_evicts_after_threshold() {
    let session = ClientSession::new(2, SlowConsumerPolicy::from_max_consecutive_drops(3));
    session.open();
    for n in 0..2 {
        assert_eq!(session.enqueue(msg(n)), Enqueue::Queued);
    }
    assert!(matches!(session.enqueue(msg(2)), Enqueue::DroppedOldest { .. }));
    assert!(matches!(session.enqueue(msg(3)), Enqueue::DroppedOldest { .. }));
    assert_eq!(session.enqueue(msg(4)), Enqueue::Evicted { drops: 3 });

    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.is_empty());
    assert_eq!(session.enqueue(msg(5)), Enqueue::Closed);
}

#[test]
fn test_policy_from_zero_is_drop_oldest() {
    assert_eq!(
        SlowConsumerPolicy::from_max_consecutive_drops(0),
        SlowConsumerPolicy::DropOldest
    );
    assert_eq!(
        SlowConsumerPolicy::from_max_consecutive_drops(5),
        SlowConsumerPolicy::Disconnect { after: 5 }
    );
}

#[tokio::test]
async fn test_next_yields_in_fifo_order() {
    let session = ClientSession::new(8, SlowConsumerPolicy::DropOldest);
    session.open();
    for n in 0..3 {
        session.enqueue(msg(n));
    }
    for n in 0..3 {
        assert_eq!(session.next().await.unwrap().payload_text(), n.to_string());
    }
}

#[tokio::test]
async fn test_next_wakes_on_enqueue() {
    let session = Arc::new(ClientSession::new(8, SlowConsumerPolicy::DropOldest));
    session.open();

    let reader = {
        let session = session.clone();
        tokio::spawn(async move { session.next().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.enqueue(msg(7));

    let received = tokio::time::timeout(Duration::from_secs(1), reader)
        .await
        .expect("reader timed out")
        .unwrap();
    assert_eq!(received.unwrap().payload_text(), "7");
}

#[tokio::test]
async fn test_close_drains_then_ends() {
    let session = ClientSession::new(8, SlowConsumerPolicy::DropOldest);
    session.open();
    session.enqueue(msg(1));
    session.enqueue(msg(2));
    session.close();

    assert_eq!(session.state(), SessionState::Closing);
    assert_eq!(session.enqueue(msg(3)), Enqueue::Closed);
    assert_eq!(session.next().await.unwrap().payload_text(), "1");
    assert_eq!(session.next().await.unwrap().payload_text(), "2");
    assert!(session.next().await.is_none());
}

#[tokio::test]
async fn test_abort_wakes_waiting_reader() {
    let session = Arc::new(ClientSession::new(8, SlowConsumerPolicy::DropOldest));
    session.open();

    let reader = {
        let session = session.clone();
        tokio::spawn(async move { session.next().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.abort();

    let received = tokio::time::timeout(Duration::from_secs(1), reader)
        .await
        .expect("reader timed out")
        .unwrap();
    assert!(received.is_none());
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_close_after_abort_stays_closed() {
    let session = ClientSession::new(8, SlowConsumerPolicy::DropOldest);
    session.abort();
    session.close();
    assert_eq!(session.state(), SessionState::Closed);
}

proptest! {
    #[test]
    fn prop_keeps_most_recent_in_order(capacity in 1usize..32, extra in 1usize..64) {
        let total = capacity + extra;
        let session = ClientSession::new(capacity, SlowConsumerPolicy::DropOldest);
        for n in 0..total {
            session.enqueue(msg(n));
        }

        let expected: Vec<String> = (total - capacity..total).map(|n| n.to_string()).collect();
        prop_assert_eq!(payloads(&session.pending()), expected);
    }

    #[test]
    fn prop_interleaved_drain_never_duplicates(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let session = ClientSession::new(4, SlowConsumerPolicy::DropOldest);
        let mut sent = 0usize;
        let mut received = Vec::new();

        for push in ops {
            if push {
                session.enqueue(msg(sent));
                sent += 1;
            } else if !session.is_empty() {
                let m = rt.block_on(session.next()).unwrap();
                received.push(m.payload_text().parse::<usize>().unwrap());
            }
        }
        session.close();
        while let Some(m) = rt.block_on(session.next()) {
            received.push(m.payload_text().parse::<usize>().unwrap());
        }

        prop_assert!(received.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(received.iter().all(|&n| n < sent));
    }
}
