/// INTEGRATION TEST: RPC ring buffers
///
/// Calls go through the local queue into per-entity ring buffers, are
/// extracted in order by the worker holding the receiving authority and
/// acknowledged back, which frees capacity for queued calls.
use replication_bridge::{
    AuthorityDomain, BridgeConfig, BridgeEvent, EntityId, OverflowPolicy, QueueError,
    RingBufferSettings, RpcCategory, RpcOrigin,
};
use replication_bridge_test::{character_core, deliver_rpcs, TestRpc, TestWorker};

fn with_settings(worker_id: &str, category: RpcCategory, settings: RingBufferSettings) -> TestWorker {
    let slots = settings.slots as usize;
    let mut config = BridgeConfig::new(worker_id);
    config.rpc.set(category, settings);
    let mut worker = TestWorker::with_config(config);
    worker.view.set_ring_slots(slots);
    worker
}

fn bind_with_authority(worker: &mut TestWorker, entity: EntityId, domain: Option<AuthorityDomain>) {
    worker
        .view
        .add_entity(entity, "Game.Character", vec![character_core(100, "hero")]);
    if let Some(domain) = domain {
        worker.view.grant_authority(entity, domain);
    }
    worker.tick();
}

fn send(worker: &mut TestWorker, entity: EntityId, category: RpcCategory, name: &str) -> Result<(), QueueError> {
    let payload = TestRpc::new(name);
    worker.with_bridge(|bridge, ctx| bridge.send_rpc(entity, category, payload, ctx))
}

#[test]
fn full_ring_buffer_defers_to_local_queue() {
    let entity = EntityId::new(10);
    let mut client = with_settings(
        "client",
        RpcCategory::ServerReliable,
        RingBufferSettings {
            slots: 4,
            queue_limit: None,
            overflow_policy: OverflowPolicy::Backpressure,
        },
    );
    bind_with_authority(&mut client, entity, Some(AuthorityDomain::Secondary));

    for index in 0..6 {
        send(&mut client, entity, RpcCategory::ServerReliable, &format!("call_{}", index))
            .expect("reliable queue is unbounded");
    }

    assert_eq!(client.wire.rpc_slots.len(), 4);
    assert_eq!(
        client.wire.rpc_counts.get(&(entity, RpcCategory::ServerReliable)),
        Some(&4)
    );
    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerReliable), 2);
    assert!(client.events().contains(&BridgeEvent::RpcQueueError {
        entity,
        category: RpcCategory::ServerReliable,
        error: QueueError::BufferOverflow,
    }));

    client.view.set_ack(entity, RpcCategory::ServerReliable, 4);
    client.tick();

    assert_eq!(
        client.wire.rpc_counts.get(&(entity, RpcCategory::ServerReliable)),
        Some(&6)
    );
    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerReliable), 0);
    let slots: Vec<u32> = client.wire.rpc_slots.iter().map(|(_, _, slot, _)| *slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 3, 0, 1]);
    assert_eq!(
        client.wire.rpc_names(entity, RpcCategory::ServerReliable),
        vec!["call_0", "call_1", "call_2", "call_3", "call_4", "call_5"]
    );

    let state = client
        .bridge
        .rpc_sender_state(entity, RpcCategory::ServerReliable)
        .expect("sender tracks the ring");
    assert_eq!(state.count_written, 6);
    assert_eq!(state.last_ack, 4);
}

#[test]
fn receiver_extracts_in_order_and_acknowledges() {
    let entity = EntityId::new(10);
    let mut client = TestWorker::new("client");
    let mut server = TestWorker::new("server");
    bind_with_authority(&mut client, entity, Some(AuthorityDomain::Secondary));
    bind_with_authority(&mut server, entity, Some(AuthorityDomain::Primary));

    send(&mut client, entity, RpcCategory::ServerReliable, "hello").unwrap();
    send(&mut client, entity, RpcCategory::ServerReliable, "bye").unwrap();

    deliver_rpcs(&client, &mut server);
    server.tick();

    let received = server.bridge.take_received_rpcs();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].payload.name, "hello");
    assert_eq!(
        received[0].origin,
        RpcOrigin {
            sender_domain: AuthorityDomain::Secondary,
            index: 1,
        }
    );
    assert_eq!(received[1].payload.name, "bye");
    assert_eq!(received[1].origin.index, 2);
    assert_eq!(
        server.wire.rpc_acks.get(&(entity, RpcCategory::ServerReliable)),
        Some(&2)
    );

    // nothing new, nothing extracted twice
    server.tick();
    assert!(server.bridge.take_received_rpcs().is_empty());

    deliver_rpcs(&server, &mut client);
    client.tick();
    let state = client
        .bridge
        .rpc_sender_state(entity, RpcCategory::ServerReliable)
        .expect("sender tracks the ring");
    assert_eq!(state.last_ack, 2);
}

#[test]
fn multicast_reaches_viewers_without_acknowledgment() {
    let entity = EntityId::new(10);
    let mut client = TestWorker::new("client");
    let mut server = TestWorker::new("server");
    bind_with_authority(&mut client, entity, None);
    bind_with_authority(&mut server, entity, Some(AuthorityDomain::Primary));

    // more calls than slots: nobody acknowledges, so the sender never blocks
    for index in 0..40 {
        send(&mut server, entity, RpcCategory::Multicast, &format!("boom_{}", index)).unwrap();
    }
    assert_eq!(server.bridge.queued_rpcs(entity, RpcCategory::Multicast), 0);
    assert_eq!(
        server.wire.rpc_counts.get(&(entity, RpcCategory::Multicast)),
        Some(&40)
    );

    deliver_rpcs(&server, &mut client);
    client.tick();

    let received = client.bridge.take_received_rpcs();
    // only the last ring's worth survived the overwrite
    assert_eq!(received.len(), 32);
    assert_eq!(received[0].payload.name, "boom_8");
    assert_eq!(received[0].origin.sender_domain, AuthorityDomain::Primary);
    assert_eq!(received[0].origin.index, 9);
    assert!(client.wire.rpc_acks.is_empty());
}

#[test]
fn drop_oldest_policy_keeps_newest_calls() {
    let entity = EntityId::new(10);
    let mut client = with_settings(
        "client",
        RpcCategory::ServerUnreliable,
        RingBufferSettings {
            slots: 8,
            queue_limit: Some(2),
            overflow_policy: OverflowPolicy::DropOldest,
        },
    );
    bind_with_authority(&mut client, entity, None);

    send(&mut client, entity, RpcCategory::ServerUnreliable, "a").unwrap();
    send(&mut client, entity, RpcCategory::ServerUnreliable, "b").unwrap();
    send(&mut client, entity, RpcCategory::ServerUnreliable, "c").unwrap();

    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerUnreliable), 2);
    assert!(client.events().contains(&BridgeEvent::RpcDropped {
        entity,
        category: RpcCategory::ServerUnreliable,
    }));

    client.view.grant_authority(entity, AuthorityDomain::Secondary);
    client.tick();

    assert_eq!(
        client.wire.rpc_names(entity, RpcCategory::ServerUnreliable),
        vec!["b", "c"]
    );
}

#[test]
fn backpressure_policy_refuses_when_queue_is_full() {
    let entity = EntityId::new(10);
    let mut client = with_settings(
        "client",
        RpcCategory::ServerReliable,
        RingBufferSettings {
            slots: 8,
            queue_limit: Some(1),
            overflow_policy: OverflowPolicy::Backpressure,
        },
    );
    bind_with_authority(&mut client, entity, None);

    send(&mut client, entity, RpcCategory::ServerReliable, "first").unwrap();
    assert_eq!(
        send(&mut client, entity, RpcCategory::ServerReliable, "second"),
        Err(QueueError::QueueFull)
    );
    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerReliable), 1);
}

#[test]
fn queued_calls_are_discarded_with_their_entity() {
    let entity = EntityId::new(10);
    let mut client = TestWorker::new("client");
    bind_with_authority(&mut client, entity, None);

    send(&mut client, entity, RpcCategory::ServerReliable, "lost").unwrap();
    send(&mut client, entity, RpcCategory::ServerReliable, "also lost").unwrap();
    client.events();

    client.view.remove_entity(entity);
    client.tick();

    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerReliable), 0);
    assert!(client
        .events()
        .contains(&BridgeEvent::RpcsDiscarded { entity, count: 2 }));
    assert!(client.wire.rpc_slots.is_empty());
}

#[test]
fn queued_calls_survive_authority_loss() {
    let entity = EntityId::new(10);
    let mut client = with_settings(
        "client",
        RpcCategory::ServerReliable,
        RingBufferSettings {
            slots: 4,
            queue_limit: None,
            overflow_policy: OverflowPolicy::Backpressure,
        },
    );
    bind_with_authority(&mut client, entity, Some(AuthorityDomain::Secondary));

    for index in 0..5 {
        send(&mut client, entity, RpcCategory::ServerReliable, &format!("call_{}", index)).unwrap();
    }
    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerReliable), 1);

    client.view.revoke_authority(entity, AuthorityDomain::Secondary);
    client.tick();
    assert!(client
        .bridge
        .rpc_sender_state(entity, RpcCategory::ServerReliable)
        .is_none());
    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerReliable), 1);

    // the store now holds the four written calls, all acknowledged
    client.view.apply_rpc_traffic(&client.wire);
    client.view.set_ack(entity, RpcCategory::ServerReliable, 4);
    client.view.grant_authority(entity, AuthorityDomain::Secondary);
    client.tick();

    assert_eq!(client.bridge.queued_rpcs(entity, RpcCategory::ServerReliable), 0);
    assert_eq!(
        client.wire.rpc_counts.get(&(entity, RpcCategory::ServerReliable)),
        Some(&5)
    );
    assert_eq!(
        client.wire.rpc_names(entity, RpcCategory::ServerReliable).last(),
        Some(&"call_4".to_string())
    );
}
