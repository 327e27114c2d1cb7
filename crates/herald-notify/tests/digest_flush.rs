mod common;

use std::sync::Arc;

use herald_core::{Severity, SubscriberId};
use herald_notify::DigestBuffer;

use common::RecordingTransport;

#[tokio::test]
async fn flush_on_empty_buffer_makes_no_transport_calls() {
    let buffer = DigestBuffer::new(4096);
    let transport = RecordingTransport::new();

    assert_eq!(buffer.flush(&transport).await, 0);
    assert_eq!(transport.send_count(), 0);
}

#[tokio::test]
async fn flush_sends_one_digest_with_entries_in_order() {
    let buffer = DigestBuffer::new(4096);
    let transport = RecordingTransport::new();
    let recipient = SubscriberId::from("r");

    buffer.add(&recipient, "m1", "payment", Severity::Warn);
    buffer.add(&recipient, "m2", "payment", Severity::Error);

    assert_eq!(buffer.flush(&transport).await, 1);

    let digests = transport.sent_to("r");
    assert_eq!(digests.len(), 1);
    let text = &digests[0];
    assert!(text.contains("2 notifications"));
    assert!(text.contains("payment (2):"));
    let m1 = text.find("m1").expect("m1 present");
    let m2 = text.find("m2").expect("m2 present");
    assert!(m1 < m2, "insertion order preserved");
}

#[tokio::test]
async fn flush_clears_the_buffer() {
    let buffer = DigestBuffer::new(4096);
    let transport = RecordingTransport::new();
    let recipient = SubscriberId::from("r");

    buffer.add(&recipient, "m", "ops", Severity::Info);
    buffer.flush(&transport).await;
    assert_eq!(buffer.pending_recipients(), 0);

    // Second flush is a no-op.
    assert_eq!(buffer.flush(&transport).await, 0);
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn oversized_digest_splits_into_exact_chunks() {
    // A message long enough that the rendered digest passes 4096 bytes but
    // stays under 8192, with newlines available for clean splits.
    let buffer = DigestBuffer::new(4096);
    let transport = RecordingTransport::new();
    let recipient = SubscriberId::from("r");

    for i in 0..50 {
        buffer.add(&recipient, &format!("entry {i}: {}", "x".repeat(80)), "ops", Severity::Info);
    }

    let chunks = buffer.flush(&transport).await;
    assert_eq!(chunks, 2);

    let sent = transport.sent_to("r");
    assert_eq!(sent.len(), 2);
    assert!(sent[0].len() <= 4096);
    assert!(sent[1].len() <= 4096);
    // Concatenation reproduces the rendered digest exactly.
    let rebuilt = sent.concat();
    assert!(rebuilt.starts_with("Digest: 50 notifications"));
    assert!(rebuilt.contains("entry 0:"));
    assert!(rebuilt.contains("entry 49:"));
    assert!(sent[0].ends_with('\n'), "preferred split point is a newline");
}

#[tokio::test]
async fn failing_recipient_does_not_block_others() {
    let buffer = DigestBuffer::new(4096);
    let transport = RecordingTransport::new();
    transport.fail_for("bad");

    buffer.add(&SubscriberId::from("bad"), "m", "ops", Severity::Info);
    buffer.add(&SubscriberId::from("good"), "m", "ops", Severity::Info);

    let chunks = buffer.flush(&transport).await;
    assert_eq!(chunks, 1);
    assert_eq!(transport.sent_to("good").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_adds_are_neither_lost_nor_duplicated() {
    const N: usize = 200;

    let buffer = Arc::new(DigestBuffer::new(1_000_000));
    let transport = RecordingTransport::new();
    let recipient = SubscriberId::from("r");

    let mut handles = Vec::new();
    for i in 0..N {
        let buffer = buffer.clone();
        let recipient = recipient.clone();
        handles.push(tokio::spawn(async move {
            buffer.add(&recipient, &format!("msg-{i}"), "ops", Severity::Info);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    buffer.flush(&transport).await;
    let digests = transport.sent_to("r");
    assert_eq!(digests.len(), 1);
    let text = &digests[0];
    assert!(text.contains(&format!("{N} notifications")));
    for i in 0..N {
        assert_eq!(
            text.matches(&format!("msg-{i} ")).count()
                + text.matches(&format!("msg-{i}\n")).count(),
            1,
            "msg-{i} appears exactly once"
        );
    }
}
