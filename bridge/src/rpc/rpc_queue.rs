use std::collections::{HashMap, VecDeque};

use log::{debug, warn};

use crate::{
    config::RpcRingBufferConfig,
    rpc::{
        error::QueueError,
        ring_buffer_sender::RingBufferSender,
        rpc_category::{OverflowPolicy, RpcCategory, RpcId, RpcPayload},
    },
    EntityId, WireSender,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after dropping the oldest entry under the drop-oldest policy
    DroppedOldest,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub written: usize,
    pub remaining: usize,
}

/// Calls waiting locally for ring buffer capacity, or for their entity's
/// channel to be ready.
pub struct RpcQueue<P: RpcPayload> {
    config: RpcRingBufferConfig,
    queues: HashMap<(EntityId, RpcCategory), VecDeque<P>>,
}

impl<P: RpcPayload> RpcQueue<P> {
    pub fn new(config: &RpcRingBufferConfig) -> Self {
        Self {
            config: config.clone(),
            queues: HashMap::new(),
        }
    }

    pub fn push(
        &mut self,
        entity: EntityId,
        category: RpcCategory,
        payload: P,
    ) -> Result<PushOutcome, QueueError> {
        let settings = self.config.settings(category);
        let queue = self.queues.entry((entity, category)).or_default();

        let mut outcome = PushOutcome::Queued;
        if let Some(limit) = settings.queue_limit {
            if limit == 0 {
                return Err(QueueError::QueueFull);
            }
            if queue.len() >= limit {
                match settings.overflow_policy {
                    OverflowPolicy::Backpressure => return Err(QueueError::QueueFull),
                    OverflowPolicy::DropOldest => {
                        queue.pop_front();
                        outcome = PushOutcome::DroppedOldest;
                    }
                }
            }
        }
        queue.push_back(payload);
        Ok(outcome)
    }

    pub fn len(&self, entity: EntityId, category: RpcCategory) -> usize {
        self.queues
            .get(&(entity, category))
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(|queue| queue.is_empty())
    }

    pub fn has_queued(&self, entity: EntityId) -> bool {
        self.queues
            .iter()
            .any(|((queued, _), queue)| *queued == entity && !queue.is_empty())
    }

    /// Drops every call queued for the entity, returning how many were lost
    pub fn drop_entity(&mut self, entity: EntityId) -> usize {
        let mut dropped = 0;
        self.queues.retain(|(queued, _), queue| {
            if *queued == entity {
                dropped += queue.len();
                false
            } else {
                true
            }
        });
        if dropped > 0 {
            debug!("dropped {} queued calls for entity {}", dropped, entity);
        }
        dropped
    }

    /// Re-attempts writing the head of each of the entity's queues. Pairs
    /// the sender doesn't track (no sending authority) are left untouched.
    /// Calls that still don't fit are reported as `BufferOverflow`.
    pub fn flush_for_entity(
        &mut self,
        entity: EntityId,
        sender: &mut RingBufferSender<P>,
        wire: &mut dyn WireSender<P>,
        on_error: &mut dyn FnMut(RpcCategory, QueueError),
        on_written: &mut dyn FnMut(RpcId),
    ) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();
        for category in RpcCategory::ALL {
            let Some(queue) = self.queues.get_mut(&(entity, category)) else {
                continue;
            };
            if queue.is_empty() || !sender.is_tracking(entity, category) {
                continue;
            }
            match sender.write(entity, category, queue.make_contiguous(), wire, on_written) {
                Ok(written) => {
                    queue.drain(..written);
                    outcome.written += written;
                }
                Err(error) => {
                    warn!("flushing {:?} for entity {} failed: {}", category, entity, error);
                }
            }
            if !queue.is_empty() {
                outcome.remaining += queue.len();
                on_error(category, QueueError::BufferOverflow);
            }
        }
        self.queues.retain(|_, queue| !queue.is_empty());
        outcome
    }
}
