use std::{collections::HashMap, marker::PhantomData};

use log::{trace, warn};

use crate::{
    config::RpcRingBufferConfig,
    rpc::{
        error::RpcError,
        rpc_category::{RpcCategory, RpcPayload},
    },
    AuthorityDomain, EntityId, EntityView, WireSender,
};

/// Explicit origin of a received call, handed to the dispatcher alongside
/// the payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcOrigin {
    /// Domain whose authority holder wrote the call
    pub sender_domain: AuthorityDomain,
    /// Monotonic index of the call within its (entity, category) sequence
    pub index: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedRpc<P> {
    pub entity: EntityId,
    pub category: RpcCategory,
    pub payload: P,
    pub origin: RpcOrigin,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub extracted: u64,
    /// Extraction stopped at a call the predicate refused
    pub held: bool,
    /// Calls overwritten by the sender before they could be extracted
    pub lost: u64,
}

/// Extracts RPC payloads from per-entity ring buffers in slot order and
/// acknowledges them.
pub struct RingBufferReceiver<P: RpcPayload> {
    config: RpcRingBufferConfig,
    last_extracted: HashMap<(EntityId, RpcCategory), u64>,
    phantom_p: PhantomData<P>,
}

impl<P: RpcPayload> RingBufferReceiver<P> {
    pub fn new(config: &RpcRingBufferConfig) -> Self {
        Self {
            config: config.clone(),
            last_extracted: HashMap::new(),
            phantom_p: PhantomData,
        }
    }

    pub fn last_extracted(&self, entity: EntityId, category: RpcCategory) -> Option<u64> {
        self.last_extracted.get(&(entity, category)).copied()
    }

    pub fn is_tracking(&self, entity: EntityId, category: RpcCategory) -> bool {
        self.last_extracted.contains_key(&(entity, category))
    }

    /// Starts receiving every category acknowledged by `domain`, continuing
    /// from the ack the previous receiver published.
    pub fn on_authority_gained(
        &mut self,
        entity: EntityId,
        domain: AuthorityDomain,
        view: &dyn EntityView<P>,
    ) {
        for category in RpcCategory::received_by(domain) {
            let last_ack = view.rpc_ack(entity, category).unwrap_or(0);
            self.last_extracted.insert((entity, category), last_ack);
        }
    }

    pub fn on_authority_lost(&mut self, entity: EntityId, domain: AuthorityDomain) {
        for category in RpcCategory::received_by(domain) {
            self.last_extracted.remove(&(entity, category));
        }
    }

    /// Multicast calls are received by every viewer; history written before
    /// the entity entered view is skipped.
    pub fn track_multicast(&mut self, entity: EntityId, view: &dyn EntityView<P>) {
        let count_written = view
            .rpc_ring(entity, RpcCategory::Multicast)
            .map(|ring| ring.count_written)
            .unwrap_or(0);
        self.last_extracted
            .entry((entity, RpcCategory::Multicast))
            .or_insert(count_written);
    }

    pub fn remove_entity(&mut self, entity: EntityId) {
        self.last_extracted.retain(|(tracked, _), _| *tracked != entity);
    }

    pub fn tracked(&self) -> Vec<(EntityId, RpcCategory)> {
        let mut pairs: Vec<(EntityId, RpcCategory)> = self.last_extracted.keys().copied().collect();
        pairs.sort();
        pairs
    }

    /// Extracts newly written calls up to the sender's published count.
    ///
    /// Calls are consumed strictly in index order; when `can_extract` refuses
    /// one, extraction stops there and resumes at the same call later. The
    /// new ack is published once per batch.
    pub fn extract(
        &mut self,
        entity: EntityId,
        category: RpcCategory,
        view: &dyn EntityView<P>,
        wire: &mut dyn WireSender<P>,
        can_extract: &mut dyn FnMut(&P) -> bool,
        out: &mut Vec<ReceivedRpc<P>>,
    ) -> Result<ExtractOutcome, RpcError> {
        let slots = u64::from(self.config.slots(category));
        let Some(last) = self.last_extracted.get_mut(&(entity, category)) else {
            return Err(RpcError::NotTracked {
                entity_id: entity.to_string(),
                category: format!("{:?}", category),
            });
        };
        let mut outcome = ExtractOutcome::default();
        let Some(ring) = view.rpc_ring(entity, category) else {
            return Ok(outcome);
        };
        if ring.count_written <= *last {
            return Ok(outcome);
        }

        if ring.count_written - *last > slots {
            outcome.lost = ring.count_written - *last - slots;
            warn!(
                "entity {} {:?} lost {} calls to slot overwrite",
                entity, category, outcome.lost
            );
            *last = ring.count_written - slots;
        }

        let start = *last;
        while *last < ring.count_written {
            let index = *last + 1;
            let slot = ((index - 1) % slots) as usize;
            let Some(Some(payload)) = ring.slots.get(slot) else {
                trace!("entity {} {:?} slot {} not visible yet", entity, category, slot);
                outcome.held = true;
                break;
            };
            if !can_extract(payload) {
                outcome.held = true;
                break;
            }
            out.push(ReceivedRpc {
                entity,
                category,
                payload: payload.clone(),
                origin: RpcOrigin {
                    sender_domain: category.sender_domain(),
                    index,
                },
            });
            *last = index;
        }

        outcome.extracted = *last - start;
        if outcome.extracted > 0 && category.is_acknowledged() {
            wire.publish_rpc_ack(entity, category, *last);
        }
        Ok(outcome)
    }
}
