use log::{debug, warn};

use crate::{
    bridge::{context::BridgeContext, replication_bridge::ReplicationBridge},
    invariant::report_violation,
    rpc::rpc_category::RpcPayload,
    world::channel::replication_channel::ChannelState,
    EntityId, ObjectRef,
};

impl<P: RpcPayload> ReplicationBridge<P> {
    /// Outgoing calls wait until the entity exists remotely
    pub(super) fn can_send_rpcs(&self, entity: EntityId) -> bool {
        match self.channels.get(&entity) {
            Some(channel) => match channel.state() {
                ChannelState::Active | ChannelState::Dormant => true,
                ChannelState::AwaitingFirstReplication => !channel.is_self_created(),
                _ => false,
            },
            None => false,
        }
    }

    /// Incoming calls wait until the entity is bound locally and every
    /// reference the next call carries can be resolved
    pub(super) fn can_extract_rpcs(&self, entity: EntityId) -> bool {
        let bound = matches!(
            self.channel_state(entity),
            Some(ChannelState::Active) | Some(ChannelState::Dormant)
        );
        bound && !self.resolver.is_rpc_blocked(entity)
    }

    /// Polls acknowledgments, flushes queues that gained capacity and
    /// extracts newly received calls
    pub(super) fn process_rpcs(&mut self, ctx: &mut BridgeContext<'_, P>) {
        let view = ctx.view;

        for (entity, category) in self.rpc_sender.awaiting_ack() {
            let Some(ack) = view.rpc_ack(entity, category) else {
                continue;
            };
            match self
                .rpc_sender
                .on_acknowledgment_update(entity, category, ack)
            {
                Ok(true) => {
                    self.rpc_dirty.insert(entity);
                }
                Ok(false) => {}
                Err(error) => report_violation("applying RPC acknowledgment", &error),
            }
        }

        let mut dirty: Vec<EntityId> = self.rpc_dirty.drain().collect();
        dirty.sort();
        for entity in dirty {
            if self.rpc_queue.has_queued(entity) {
                self.flush_rpc_queue_for_entity(entity, ctx);
            }
        }

        for (entity, category) in self.rpc_receiver.tracked() {
            if !self.can_extract_rpcs(entity) {
                continue;
            }

            let bindings = &self.bindings;
            let mut blocked_on: Option<ObjectRef> = None;
            let mut can_extract = |payload: &P| {
                for object_ref in payload.references() {
                    if bindings.object(object_ref).is_none() {
                        blocked_on = Some(object_ref);
                        return false;
                    }
                }
                true
            };
            let result = self.rpc_receiver.extract(
                entity,
                category,
                view,
                ctx.wire,
                &mut can_extract,
                &mut self.received_rpcs,
            );

            match result {
                Ok(outcome) => {
                    if outcome.lost > 0 {
                        warn!(
                            "entity {} lost {} {:?} calls before they were extracted",
                            entity, outcome.lost, category
                        );
                    }
                }
                Err(error) => report_violation("extracting RPCs", &error),
            }
            if let Some(object_ref) = blocked_on {
                debug!(
                    "{:?} calls of entity {} wait on unresolved {}",
                    category, entity, object_ref
                );
                self.resolver.block_rpcs_on(object_ref, entity);
            }
        }
    }
}
