use std::{collections::HashMap, marker::PhantomData};

use log::{debug, warn};

use crate::{
    config::RpcRingBufferConfig,
    rpc::{
        error::RpcError,
        rpc_category::{RpcCategory, RpcId, RpcPayload},
    },
    AuthorityDomain, EntityId, EntityView, WireSender,
};

/// Sender-side counters of one (entity, category) ring buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingBufferSlotState {
    /// Calls ever written, monotonic
    pub count_written: u64,
    /// Calls the receiver reported as extracted, monotonic
    pub last_ack: u64,
}

impl RingBufferSlotState {
    pub fn in_flight(&self) -> u64 {
        self.count_written.saturating_sub(self.last_ack)
    }

    /// `slots - (count_written - last_ack)`, clamped at zero
    pub fn available(&self, slots: u32) -> u32 {
        u64::from(slots).saturating_sub(self.in_flight()) as u32
    }
}

/// Writes RPC payloads into per-entity ring buffers.
///
/// Invariant: `count_written - last_ack <= slots` for every tracked pair.
pub struct RingBufferSender<P: RpcPayload> {
    config: RpcRingBufferConfig,
    states: HashMap<(EntityId, RpcCategory), RingBufferSlotState>,
    next_rpc_id: u64,
    phantom_p: PhantomData<P>,
}

impl<P: RpcPayload> RingBufferSender<P> {
    pub fn new(config: &RpcRingBufferConfig) -> Self {
        Self {
            config: config.clone(),
            states: HashMap::new(),
            next_rpc_id: 0,
            phantom_p: PhantomData,
        }
    }

    pub fn is_tracking(&self, entity: EntityId, category: RpcCategory) -> bool {
        self.states.contains_key(&(entity, category))
    }

    pub fn state(&self, entity: EntityId, category: RpcCategory) -> Option<RingBufferSlotState> {
        self.states.get(&(entity, category)).copied()
    }

    pub fn available_slots(&self, entity: EntityId, category: RpcCategory) -> u32 {
        self.state(entity, category)
            .map(|state| state.available(self.config.slots(category)))
            .unwrap_or(0)
    }

    /// Starts tracking a pair with explicit counters
    pub fn track(&mut self, entity: EntityId, category: RpcCategory, state: RingBufferSlotState) {
        self.states.insert((entity, category), state);
    }

    /// Writes as many payloads as there is capacity for into successive
    /// slots, then publishes the new written count once for the batch.
    /// Returns how many were written; the caller keeps the rest.
    pub fn write(
        &mut self,
        entity: EntityId,
        category: RpcCategory,
        payloads: &[P],
        wire: &mut dyn WireSender<P>,
        on_written: &mut dyn FnMut(RpcId),
    ) -> Result<usize, RpcError> {
        let slots = self.config.slots(category);
        let Some(state) = self.states.get_mut(&(entity, category)) else {
            return Err(RpcError::NotTracked {
                entity_id: entity.to_string(),
                category: format!("{:?}", category),
            });
        };

        let to_write = (state.available(slots) as usize).min(payloads.len());
        if to_write == 0 {
            return Ok(0);
        }

        for payload in payloads.iter().take(to_write) {
            state.count_written += 1;
            let slot = ((state.count_written - 1) % u64::from(slots)) as u32;
            wire.write_rpc_slot(entity, category, slot, payload.clone());
            on_written(RpcId(self.next_rpc_id));
            self.next_rpc_id += 1;
        }
        if !category.is_acknowledged() {
            // nobody acknowledges these, the sender overwrites freely
            state.last_ack = state.count_written;
        }
        wire.publish_rpc_count(entity, category, state.count_written);
        debug!(
            "wrote {} {:?} calls for entity {}, count now {}",
            to_write, category, entity, state.count_written
        );

        Ok(to_write)
    }

    /// Applies a receiver acknowledgment. Acks only move forward: a stale
    /// or reordered value never lowers `last_ack`. Returns whether capacity
    /// grew.
    pub fn on_acknowledgment_update(
        &mut self,
        entity: EntityId,
        category: RpcCategory,
        new_ack: u64,
    ) -> Result<bool, RpcError> {
        let Some(state) = self.states.get_mut(&(entity, category)) else {
            return Err(RpcError::NotTracked {
                entity_id: entity.to_string(),
                category: format!("{:?}", category),
            });
        };
        if new_ack > state.count_written {
            return Err(RpcError::AckBeyondWritten {
                entity_id: entity.to_string(),
                category: format!("{:?}", category),
                ack: new_ack,
                written: state.count_written,
            });
        }
        if new_ack <= state.last_ack {
            return Ok(false);
        }
        state.last_ack = new_ack;
        Ok(true)
    }

    /// Takes over the sending side of every category written by `domain`,
    /// continuing the sequence the previous sender left in the view.
    pub fn on_authority_gained(
        &mut self,
        entity: EntityId,
        domain: AuthorityDomain,
        view: &dyn EntityView<P>,
    ) {
        for category in RpcCategory::sent_by(domain) {
            let count_written = view
                .rpc_ring(entity, category)
                .map(|ring| ring.count_written)
                .unwrap_or(0);
            let last_ack = if category.is_acknowledged() {
                view.rpc_ack(entity, category).unwrap_or(0)
            } else {
                count_written
            };
            let mut state = RingBufferSlotState {
                count_written,
                last_ack: last_ack.min(count_written),
            };
            let slots = u64::from(self.config.slots(category));
            if state.in_flight() > slots {
                warn!(
                    "entity {} {:?} ring buffer seeded over capacity, clamping",
                    entity, category
                );
                state.last_ack = state.count_written - slots;
            }
            self.states.insert((entity, category), state);
        }
    }

    pub fn on_authority_lost(&mut self, entity: EntityId, domain: AuthorityDomain) {
        for category in RpcCategory::sent_by(domain) {
            self.states.remove(&(entity, category));
        }
    }

    pub fn remove_entity(&mut self, entity: EntityId) {
        self.states.retain(|(tracked, _), _| *tracked != entity);
    }

    /// Acknowledged pairs with calls still in flight, whose acks are worth
    /// polling
    pub fn awaiting_ack(&self) -> Vec<(EntityId, RpcCategory)> {
        let mut pairs: Vec<(EntityId, RpcCategory)> = self
            .states
            .iter()
            .filter(|((_, category), state)| category.is_acknowledged() && state.in_flight() > 0)
            .map(|(pair, _)| *pair)
            .collect();
        pairs.sort();
        pairs
    }
}
