mod common;

use common::*;
use sospf_router::{LinkDescriptor, Lsa, PathResult, Router, WireMessage};
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(300);

fn lsa(origin: &str, sequence: i32, neighbors: &[&str]) -> Lsa {
    let mut links = vec![LinkDescriptor::new(origin, -1)];
    links.extend(
        neighbors
            .iter()
            .enumerate()
            .map(|(slot, id)| LinkDescriptor::new(*id, slot as i16)),
    );
    Lsa {
        origin: origin.to_string(),
        sequence,
        links,
    }
}

/// Router A with two fake neighbors, both TWO_WAY, and their inboxes emptied.
async fn star() -> (Router, FakePeer, FakePeer) {
    let a = router("10.0.0.1").await;
    let mut f1 = FakePeer::spawn("10.0.1.1").await;
    let mut f2 = FakePeer::spawn("10.0.1.2").await;
    a.connect("127.0.0.1", f1.identity.process_port, f1.id()).await.unwrap();
    a.connect("127.0.0.1", f2.identity.process_port, f2.id()).await.unwrap();
    f1.drain(SETTLE).await;
    f2.drain(SETTLE).await;
    (a, f1, f2)
}

fn with_origin<'a>(
    messages: &'a [WireMessage],
    origin: &'a str,
) -> impl Iterator<Item = &'a Lsa> + 'a {
    messages
        .iter()
        .filter_map(|m| m.lsa.as_ref())
        .filter(move |lsa| lsa.origin == origin)
}

#[tokio::test]
async fn test_chain_converges_and_detects_path() {
    let a = router("10.0.0.1").await;
    let b = router("10.0.0.2").await;
    let c = router("10.0.0.3").await;
    let d = router("10.0.0.4").await;

    link(&a, &b).await;
    link(&b, &c).await;
    link(&c, &d).await;

    for r in [&a, &b, &c, &d] {
        eventually("every database holds all four LSAs", || async {
            r.database().await.len() == 4
        })
        .await;
    }

    eventually("A finds the full chain", || async {
        a.detect("10.0.0.4").await.to_string() == "10.0.0.1 -> 10.0.0.2 -> 10.0.0.3 -> 10.0.0.4"
    })
    .await;
    eventually("D finds the way back", || async {
        d.detect("10.0.0.1").await.to_string() == "10.0.0.4 -> 10.0.0.3 -> 10.0.0.2 -> 10.0.0.1"
    })
    .await;
    assert_eq!(a.detect("10.9.9.9").await, PathResult::NotFound);
}

#[tokio::test]
async fn test_late_joiner_learns_existing_topology() {
    let a = router("10.0.0.1").await;
    let b = router("10.0.0.2").await;
    link(&a, &b).await;
    eventually("A and B converge", || async { b.database().await.len() == 2 }).await;

    let c = router("10.0.0.3").await;
    link(&c, &b).await;

    eventually("C learns A through B", || async { stored(&c, "10.0.0.1").await.is_some() }).await;
    eventually("C finds A", || async {
        c.detect("10.0.0.1").await.to_string() == "10.0.0.3 -> 10.0.0.2 -> 10.0.0.1"
    })
    .await;
}

#[tokio::test]
async fn test_new_lsa_forwarded_once_except_sender() {
    let (a, mut f1, mut f2) = star().await;

    f1.send_lsa(&a, lsa("10.0.9.9", 5, &["10.0.1.1"])).await;
    eventually("A stores the new LSA", || async { stored(&a, "10.0.9.9").await.is_some() }).await;
    f1.send_lsa(&a, lsa("10.0.9.9", 5, &["10.0.1.1"])).await;
    f1.send_lsa(&a, lsa("10.0.9.9", 4, &[])).await;

    let to_f2 = f2.drain(SETTLE).await;
    let forwarded: Vec<&Lsa> = with_origin(&to_f2, "10.0.9.9").collect();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].sequence, 5);
    assert!(to_f2.iter().all(|m| m.sender_ip == "10.0.0.1" && m.destination_ip == "10.0.1.2"));

    let to_f1 = f1.drain(Duration::ZERO).await;
    assert_eq!(with_origin(&to_f1, "10.0.9.9").count(), 0);

    let kept = stored(&a, "10.0.9.9").await.unwrap();
    assert_eq!(kept.sequence, 5);
    assert!(kept.lists("10.0.1.1"));
}

#[tokio::test]
async fn test_copies_of_own_lsa_and_looped_messages_are_ignored() {
    let (a, f1, mut f2) = star().await;
    let own = a.self_lsa().await;

    f1.send_lsa(&a, lsa("10.0.0.1", i32::MAX, &[])).await;
    let looped = WireMessage::lsupdate(a.identity(), "10.0.0.1", lsa("10.0.9.9", 7, &[]));
    send_raw(&a, &looped).await;

    let to_f2 = f2.drain(SETTLE).await;
    assert!(to_f2.is_empty());
    assert_eq!(a.self_lsa().await, own);
    assert!(stored(&a, "10.0.9.9").await.is_none());
    assert_eq!(a.neighbors().await.len(), 2);
}

#[tokio::test]
async fn test_only_origin_can_withdraw_adjacency() {
    let (a, f1, mut f2) = star().await;
    let seq = a.self_lsa().await.sequence;

    // Relayed by F2: stored and forwarded, but the link to F1 stays.
    f2.send_lsa(&a, lsa("10.0.1.1", 0, &[])).await;
    eventually("A stores the relayed LSA", || async {
        stored(&a, "10.0.1.1").await.is_some()
    })
    .await;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(a.neighbors().await.len(), 2);
    assert_eq!(a.self_lsa().await.sequence, seq);

    // Straight from F1 and no longer listing A: the link goes.
    f1.send_lsa(&a, lsa("10.0.1.1", 1, &[])).await;
    eventually("A drops F1", || async { a.neighbors().await.len() == 1 }).await;

    let own = a.self_lsa().await;
    assert_eq!(own.sequence, seq + 1);
    assert!(!own.lists("10.0.1.1"));
    assert!(own.lists("10.0.1.2"));

    let to_f2 = f2.drain(SETTLE).await;
    assert!(with_origin(&to_f2, "10.0.0.1").any(|l| l.sequence == seq + 1 && !l.lists("10.0.1.1")));
}

#[tokio::test]
async fn test_detect_reports_unreachable_islands() {
    let (a, f1, _f2) = star().await;

    f1.send_lsa(&a, lsa("10.0.9.9", 1, &["10.0.9.8"])).await;
    eventually("A stores the island", || async { stored(&a, "10.0.9.9").await.is_some() }).await;

    assert_eq!(a.detect("10.0.9.9").await, PathResult::Unreachable);
    assert_eq!(a.detect("10.0.9.8").await, PathResult::Unreachable);
    assert_eq!(a.detect("10.0.9.8").await.to_string(), "destination unreachable");
    assert_eq!(
        a.detect("10.0.1.2").await,
        PathResult::Found(vec!["10.0.0.1".to_string(), "10.0.1.2".to_string()])
    );
}
