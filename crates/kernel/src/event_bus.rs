// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::{HashMap, VecDeque};

use tokio::sync::{mpsc, RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::agent::AgentId;
use crate::event::{Event, EventType};

/// Per-subscriber channel capacity (spec's shared-resource policy default).
const SUBSCRIBER_CHANNEL_CAP: usize = 64;

/// Per-target pending-store cap; oldest event evicted once full.
const PENDING_STORE_CAP: usize = 256;

pub type EventReceiver = mpsc::Receiver<Event>;

struct Subscriber {
    tx: mpsc::Sender<Event>,
    filter: Vec<EventType>,
}

/// Targeted publish/subscribe bus with a bounded pending store for
/// undelivered events to offline targets.
///
/// Both maps are guarded by their own `RwLock`; no method awaits while
/// holding the other's lock, and neither is ever held across a call into
/// the Store façade.
pub struct EventBus {
    subscribers: RwLock<HashMap<AgentId, Vec<Subscriber>>>,
    pending: RwLock<HashMap<AgentId, VecDeque<Event>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: RwLock::new(HashMap::new()), pending: RwLock::new(HashMap::new()) }
    }

    /// Subscribe `agent_id` to events matching `event_types` (empty = all).
    /// Multiple concurrent subscriptions for the same agent are permitted
    /// (e.g. a stream reconnect racing its predecessor's teardown); each
    /// gets its own channel and all matching ones are delivered to.
    pub async fn subscribe(&self, agent_id: AgentId, event_types: Vec<EventType>) -> EventReceiver {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAP);
        self.subscribers
            .write()
            .await
            .entry(agent_id)
            .or_default()
            .push(Subscriber { tx, filter: event_types });
        rx
    }

    /// Drop every subscriber for `agent_id`. Idempotent.
    pub async fn unsubscribe(&self, agent_id: &AgentId) {
        self.subscribers.write().await.remove(agent_id);
    }

    /// Deliver `event`, persisting to the pending store only when it
    /// could not be handed to a live matching subscriber.
    pub async fn publish(&self, mut event: Event) -> Event {
        event.delivered = false;

        if event.is_broadcast() {
            let subs = self.subscribers.read().await;
            for targets in subs.values() {
                for sub in targets {
                    if event.matches_types(&sub.filter) {
                        if sub.tx.try_send(event.clone()).is_err() {
                            warn!(event_id = %event.id, "dropping broadcast event, subscriber queue full");
                        }
                    }
                }
            }
            event.delivered = true;
            return event;
        }

        let Some(target) = event.target.clone() else {
            // is_broadcast() already handled the None case above.
            event.delivered = true;
            return event;
        };
        let delivered_live = {
            let subs = self.subscribers.read().await;
            match subs.get(&target) {
                Some(targets) => {
                    let mut any = false;
                    for sub in targets {
                        if event.matches_types(&sub.filter) {
                            match sub.tx.try_send(event.clone()) {
                                Ok(()) => any = true,
                                Err(_) => warn!(event_id = %event.id, agent_id = %target, "dropping event, subscriber queue full"),
                            }
                        }
                    }
                    any
                }
                None => false,
            }
        };

        if delivered_live {
            event.delivered = true;
        } else {
            self.store_pending(target, event.clone()).await;
        }

        event
    }

    async fn store_pending(&self, target: AgentId, event: Event) {
        let mut pending = self.pending.write().await;
        let queue = pending.entry(target.clone()).or_default();
        if queue.len() >= PENDING_STORE_CAP {
            let evicted = queue.pop_front();
            if let Some(evicted) = evicted {
                warn!(event_id = %evicted.id, agent_id = %target, "pending event store full, evicting oldest");
            }
        }
        queue.push_back(event);
    }

    /// Read (without consuming) pending events for `agent_id`, oldest first.
    pub async fn get_pending_events(&self, agent_id: &AgentId, event_types: &[EventType]) -> Vec<Event> {
        let pending = self.pending.read().await;
        match pending.get(agent_id) {
            Some(queue) => queue.iter().filter(|e| e.matches_types(event_types)).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Consume a single pending event by id. Returns true if it was present.
    pub async fn mark_delivered(&self, agent_id: &AgentId, event_id: Uuid) -> bool {
        let mut pending = self.pending.write().await;
        if let Some(queue) = pending.get_mut(agent_id) {
            let before = queue.len();
            queue.retain(|e| e.id != event_id);
            return queue.len() != before;
        }
        false
    }

    /// Number of pending events currently queued for `agent_id`.
    pub async fn pending_count(&self, agent_id: &AgentId) -> usize {
        self.pending.read().await.get(agent_id).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
