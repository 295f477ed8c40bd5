// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event fan-out to live observers
//!
//! A single actor task owns the observer registry. Handles talk to it over
//! an unbounded command channel, so commands are processed in the order
//! they were sent. Each broadcast is serialized once, stamped with the
//! hub clock at send time, and delivered to every target observer in turn.
//! An observer whose delivery fails or times out is dropped from the
//! registry; the rest of the fan-out continues.

#[cfg(any(test, feature = "test-support"))]
mod fake;
mod sink;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FailingSink, RecordingSink, StalledSink};
pub use sink::{channel_sink, ChannelSink, Frame, ObserverSink, SinkError};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use suds_core::{Clock, Effect, Envelope, Event, ObserverId, RequesterId};
use tokio::sync::{mpsc, oneshot};

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub pruned: Vec<ObserverId>,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    All,
    Requester(RequesterId),
}

enum Command {
    Register {
        observer: ObserverId,
        sink: Arc<dyn ObserverSink>,
        requester: Option<RequesterId>,
    },
    Identify {
        observer: ObserverId,
        requester: RequesterId,
    },
    Unregister {
        observer: ObserverId,
    },
    Broadcast {
        target: Target,
        event: Event,
        done: Option<oneshot::Sender<DeliveryReport>>,
    },
    Count {
        requester: Option<RequesterId>,
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the fan-out actor; cheap to clone
#[derive(Clone)]
pub struct Hub {
    tx: mpsc::UnboundedSender<Command>,
}

impl Hub {
    /// Spawn the actor on the current tokio runtime
    pub fn spawn<C: Clock>(clock: C, delivery_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = HubActor {
            registry: Registry::default(),
            clock,
            delivery_timeout,
        };
        tokio::spawn(actor.run(rx));
        Self { tx }
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::debug!("hub stopped, command dropped");
        }
    }

    /// Add an observer, replacing any registration under the same id
    pub fn register(
        &self,
        observer: ObserverId,
        sink: Arc<dyn ObserverSink>,
        requester: Option<RequesterId>,
    ) {
        self.send(Command::Register {
            observer,
            sink,
            requester,
        });
    }

    /// Associate an already registered observer with a requester
    pub fn identify(&self, observer: ObserverId, requester: RequesterId) {
        self.send(Command::Identify {
            observer,
            requester,
        });
    }

    pub fn unregister(&self, observer: ObserverId) {
        self.send(Command::Unregister { observer });
    }

    /// Queue a broadcast to every observer without waiting for delivery
    pub fn publish(&self, event: Event) {
        self.send(Command::Broadcast {
            target: Target::All,
            event,
            done: None,
        });
    }

    /// Queue a broadcast to one requester's observers
    pub fn publish_to(&self, requester: RequesterId, event: Event) {
        self.send(Command::Broadcast {
            target: Target::Requester(requester),
            event,
            done: None,
        });
    }

    /// Route transition effects to their audiences, in order
    pub fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => self.publish(event),
                Effect::Notify { requester, event } => self.publish_to(requester, event),
            }
        }
    }

    /// Broadcast to every observer and wait for the fan-out to finish
    pub async fn broadcast_all(&self, event: Event) -> DeliveryReport {
        self.broadcast(Target::All, event).await
    }

    /// Broadcast to one requester's observers and wait for the fan-out
    pub async fn broadcast_to_requester(
        &self,
        requester: RequesterId,
        event: Event,
    ) -> DeliveryReport {
        self.broadcast(Target::Requester(requester), event).await
    }

    async fn broadcast(&self, target: Target, event: Event) -> DeliveryReport {
        let (done, rx) = oneshot::channel();
        self.send(Command::Broadcast {
            target,
            event,
            done: Some(done),
        });
        rx.await.unwrap_or_default()
    }

    pub async fn observer_count(&self) -> usize {
        self.count(None).await
    }

    pub async fn requester_observer_count(&self, requester: RequesterId) -> usize {
        self.count(Some(requester)).await
    }

    /// Wait until every command sent before this call has been processed
    pub async fn flush(&self) {
        self.count(None).await;
    }

    async fn count(&self, requester: Option<RequesterId>) -> usize {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Count { requester, reply });
        rx.await.unwrap_or(0)
    }
}

struct Registered {
    sink: Arc<dyn ObserverSink>,
    requester: Option<RequesterId>,
}

#[derive(Default)]
struct Registry {
    observers: HashMap<ObserverId, Registered>,
    by_requester: HashMap<RequesterId, HashSet<ObserverId>>,
}

impl Registry {
    fn register(
        &mut self,
        observer: ObserverId,
        sink: Arc<dyn ObserverSink>,
        requester: Option<RequesterId>,
    ) {
        self.unregister(&observer);
        if let Some(requester) = requester {
            self.by_requester
                .entry(requester)
                .or_default()
                .insert(observer.clone());
        }
        self.observers
            .insert(observer, Registered { sink, requester });
    }

    fn identify(&mut self, observer: &ObserverId, requester: RequesterId) -> bool {
        let Some(registered) = self.observers.get_mut(observer) else {
            return false;
        };
        let previous = registered.requester.replace(requester);
        if let Some(previous) = previous {
            Self::detach(&mut self.by_requester, previous, observer);
        }
        self.by_requester
            .entry(requester)
            .or_default()
            .insert(observer.clone());
        true
    }

    fn unregister(&mut self, observer: &ObserverId) -> bool {
        let Some(registered) = self.observers.remove(observer) else {
            return false;
        };
        if let Some(requester) = registered.requester {
            Self::detach(&mut self.by_requester, requester, observer);
        }
        true
    }

    fn detach(
        by_requester: &mut HashMap<RequesterId, HashSet<ObserverId>>,
        requester: RequesterId,
        observer: &ObserverId,
    ) {
        if let Some(set) = by_requester.get_mut(&requester) {
            set.remove(observer);
            if set.is_empty() {
                by_requester.remove(&requester);
            }
        }
    }

    fn targets(&self, target: Target) -> Vec<(ObserverId, Arc<dyn ObserverSink>)> {
        match target {
            Target::All => self
                .observers
                .iter()
                .map(|(id, r)| (id.clone(), Arc::clone(&r.sink)))
                .collect(),
            Target::Requester(requester) => self
                .by_requester
                .get(&requester)
                .into_iter()
                .flatten()
                .filter_map(|id| {
                    self.observers
                        .get(id)
                        .map(|r| (id.clone(), Arc::clone(&r.sink)))
                })
                .collect(),
        }
    }

    fn count(&self, requester: Option<RequesterId>) -> usize {
        match requester {
            None => self.observers.len(),
            Some(requester) => self.by_requester.get(&requester).map_or(0, HashSet::len),
        }
    }
}

struct HubActor<C: Clock> {
    registry: Registry,
    clock: C,
    delivery_timeout: Duration,
}

impl<C: Clock> HubActor<C> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Register {
                    observer,
                    sink,
                    requester,
                } => {
                    tracing::debug!(%observer, ?requester, "observer registered");
                    self.registry.register(observer, sink, requester);
                }
                Command::Identify {
                    observer,
                    requester,
                } => {
                    if self.registry.identify(&observer, requester) {
                        tracing::debug!(%observer, %requester, "observer identified");
                    }
                }
                Command::Unregister { observer } => {
                    if self.registry.unregister(&observer) {
                        tracing::debug!(%observer, "observer unregistered");
                    }
                }
                Command::Broadcast {
                    target,
                    event,
                    done,
                } => {
                    let report = self.broadcast(target, &event).await;
                    if let Some(done) = done {
                        let _ = done.send(report);
                    }
                }
                Command::Count { requester, reply } => {
                    let _ = reply.send(self.registry.count(requester));
                }
            }
        }
        tracing::debug!("hub stopped");
    }

    async fn broadcast(&mut self, target: Target, event: &Event) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let targets = self.registry.targets(target);
        if targets.is_empty() {
            return report;
        }

        let frame: Frame = match Envelope::new(event, self.clock.now()).to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "failed to serialize event");
                return report;
            }
        };

        for (observer, sink) in targets {
            let result =
                match tokio::time::timeout(self.delivery_timeout, sink.deliver(Arc::clone(&frame)))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(SinkError::Timeout(self.delivery_timeout)),
                };
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        %observer,
                        event = event.name(),
                        error = %e,
                        "dropping observer after failed delivery"
                    );
                    report.pruned.push(observer);
                }
            }
        }
        tracing::trace!(
            event = event.name(),
            resource = ?event.resource(),
            delivered = report.delivered,
            "broadcast"
        );

        for observer in &report.pruned {
            self.registry.unregister(observer);
        }
        report
    }
}
