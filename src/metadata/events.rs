//! Notifications published by the metadata service.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};

use crate::core::package::PackageRef;
use crate::core::path::NormalizedPath;

/// Something changed in the set of loaded packages or their test containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    PackageAdded(PackageRef),
    PackageRemoved(PackageRef),
    /// A test container file was written or deleted
    TestContainerUpdated(NormalizedPath),
}

/// Identifies one subscriber. Unique across services for the life of the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// A live subscription: the packages loaded at the moment of subscribing,
/// and every event published after that moment.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub snapshot: Vec<PackageRef>,
    pub events: Receiver<WorkspaceEvent>,
}

static NEXT_SUBSCRIBER: AtomicU64 = AtomicU64::new(0);

/// Fan-out of events to subscribers. Subscribers whose receiver is gone are
/// dropped on the next publish.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Vec<(SubscriberId, Sender<WorkspaceEvent>)>,
}

impl Subscribers {
    pub(crate) fn add(&mut self) -> (SubscriberId, Receiver<WorkspaceEvent>) {
        let id = SubscriberId(NEXT_SUBSCRIBER.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.push((id, tx));
        (id, rx)
    }

    /// Returns whether the subscriber existed.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(sid, _)| *sid != id);
        self.senders.len() != before
    }

    pub(crate) fn publish(&mut self, event: &WorkspaceEvent) {
        self.senders
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}
