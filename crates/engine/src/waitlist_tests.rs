// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::hub::RecordingSink;
use crate::ErrorKind;
use std::collections::BTreeSet;
use std::time::Duration;
use suds_core::{FakeClock, ObserverId};
use suds_storage::{FailingJournal, MemoryJournal};

fn manager(journal: Arc<dyn Journal>) -> (Arc<WaitlistManager<FakeClock>>, Hub) {
    let clock = FakeClock::new();
    let hub = Hub::spawn(clock.clone(), Duration::from_millis(100));
    let manager = WaitlistManager::new(
        Waitlist::new(ResourceClass::Washer),
        Waitlist::new(ResourceClass::Dryer),
        journal,
        hub.clone(),
        clock,
    );
    (Arc::new(manager), hub)
}

fn positions(snapshot: &WaitlistSnapshot) -> Vec<(u64, u32)> {
    snapshot
        .iter()
        .map(|e| (e.requester_id.0, e.position))
        .collect()
}

#[tokio::test]
async fn join_assigns_increasing_positions() {
    let (waitlists, _hub) = manager(Arc::new(MemoryJournal::new()));

    assert_eq!(waitlists.join(ResourceClass::Washer, RequesterId(7)).await.unwrap(), 1);
    assert_eq!(waitlists.join(ResourceClass::Washer, RequesterId(9)).await.unwrap(), 2);
    assert_eq!(waitlists.join(ResourceClass::Dryer, RequesterId(7)).await.unwrap(), 1);

    let washers = waitlists.list(ResourceClass::Washer).await;
    assert_eq!(positions(&washers), vec![(7, 1), (9, 2)]);
    assert_eq!(
        waitlists.position_of(ResourceClass::Dryer, RequesterId(7)).await,
        Some(1)
    );
}

#[tokio::test]
async fn duplicate_join_is_rejected() {
    let journal = Arc::new(MemoryJournal::new());
    let (waitlists, _hub) = manager(journal.clone());
    waitlists.join(ResourceClass::Washer, RequesterId(7)).await.unwrap();

    let err = waitlists
        .join(ResourceClass::Washer, RequesterId(7))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyQueued);
    assert_eq!(journal.ops().len(), 1);
    assert_eq!(waitlists.list(ResourceClass::Washer).await.len(), 1);
}

#[tokio::test]
async fn leave_keeps_other_positions() {
    let (waitlists, _hub) = manager(Arc::new(MemoryJournal::new()));
    for requester in [7, 9, 11] {
        waitlists
            .join(ResourceClass::Dryer, RequesterId(requester))
            .await
            .unwrap();
    }

    waitlists.leave(ResourceClass::Dryer, RequesterId(9)).await.unwrap();

    let dryers = waitlists.list(ResourceClass::Dryer).await;
    assert_eq!(positions(&dryers), vec![(7, 1), (11, 3)]);
    let err = waitlists
        .leave(ResourceClass::Dryer, RequesterId(9))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotQueued);
}

#[tokio::test]
async fn snapshot_is_stable_across_later_changes() {
    let (waitlists, _hub) = manager(Arc::new(MemoryJournal::new()));
    waitlists.join(ResourceClass::Washer, RequesterId(1)).await.unwrap();
    let before = waitlists.list(ResourceClass::Washer).await;

    waitlists.join(ResourceClass::Washer, RequesterId(2)).await.unwrap();

    assert_eq!(positions(&before), vec![(1, 1)]);
    assert_eq!(positions(&before), positions(&before));
    assert_eq!(waitlists.list(ResourceClass::Washer).await.len(), 2);
}

#[tokio::test]
async fn join_broadcasts_and_notifies_joiner() {
    let (waitlists, hub) = manager(Arc::new(MemoryJournal::new()));
    let joiner = RecordingSink::new();
    let other = RecordingSink::new();
    hub.register(ObserverId::new("joiner"), Arc::new(joiner.clone()), Some(RequesterId(7)));
    hub.register(ObserverId::new("other"), Arc::new(other.clone()), None);

    waitlists.join(ResourceClass::Washer, RequesterId(7)).await.unwrap();
    waitlists.leave(ResourceClass::Washer, RequesterId(7)).await.unwrap();
    hub.flush().await;

    assert_eq!(
        joiner.event_names(),
        vec!["waitlist_update", "notification", "waitlist_update"]
    );
    assert_eq!(other.event_names(), vec!["waitlist_update", "waitlist_update"]);
    let joined = &other.events()[0];
    assert_eq!(joined["data"]["resource_class"], "washer");
    assert_eq!(joined["data"]["change"]["joined"]["position"], 1);
    assert_eq!(joiner.events()[1]["data"]["kind"], "joined_waitlist");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_get_distinct_positions_in_commit_order() {
    let journal = Arc::new(MemoryJournal::new());
    let (waitlists, _hub) = manager(journal.clone());
    let n: u64 = 32;

    let tasks: Vec<_> = (1..=n)
        .map(|requester| {
            let waitlists = Arc::clone(&waitlists);
            tokio::spawn(async move {
                let position = waitlists
                    .join(ResourceClass::Washer, RequesterId(requester))
                    .await
                    .unwrap();
                (requester, position)
            })
        })
        .collect();

    let mut assigned = BTreeSet::new();
    for task in tasks {
        let (_, position) = task.await.unwrap();
        assert!(assigned.insert(position));
    }
    assert_eq!(assigned, (1..=n as u32).collect::<BTreeSet<_>>());

    let committed: Vec<u32> = journal
        .ops()
        .iter()
        .filter_map(|op| match op {
            Operation::WaitlistJoin { entry } => Some(entry.position),
            _ => None,
        })
        .collect();
    assert_eq!(committed, (1..=n as u32).collect::<Vec<_>>());
}

#[tokio::test]
async fn failed_commit_does_not_join() {
    let (waitlists, hub) = manager(Arc::new(FailingJournal));
    let observer = RecordingSink::new();
    hub.register(ObserverId::new("obs"), Arc::new(observer.clone()), None);

    let err = waitlists
        .join(ResourceClass::Dryer, RequesterId(3))
        .await
        .unwrap_err();
    hub.flush().await;

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(waitlists.list(ResourceClass::Dryer).await.is_empty());
    assert!(observer.frames().is_empty());
}
