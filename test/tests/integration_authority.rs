/// INTEGRATION TEST: Authority changes
///
/// Authority over an entity moving between two workers: the losing worker
/// stops replicating before the gaining worker starts, received values
/// become the gaining worker's baseline, and no field is sent twice.
use replication_bridge::{
    AuthorityDomain, BridgeEvent, CreationStatus, DropReason, EntityId, FieldHandle, FieldValue,
    ObjectOffset,
};
use replication_bridge_test::{
    character_core, deliver_updates, health, TestWorker, CHARACTER_CORE, CHARACTER_TYPE,
};

fn observed_by(workers: [&mut TestWorker; 2], entity: EntityId) {
    for worker in workers {
        worker
            .view
            .add_entity(entity, "Game.Character", vec![character_core(100, "hero")]);
        worker.tick();
    }
}

#[test]
fn authority_handoff_sends_each_change_once() {
    let entity = EntityId::new(10);
    let mut a = TestWorker::new("worker_a");
    let mut b = TestWorker::new("worker_b");
    observed_by([&mut a, &mut b], entity);

    a.view.grant_authority(entity, AuthorityDomain::Primary);
    a.tick();
    assert!(a.bridge.has_authority(entity, AuthorityDomain::Primary));
    assert!(a.wire.updates.is_empty());

    let a_root = a.root(entity).expect("bound on A");
    a.host.set_field(a_root, 0, FieldValue::Int(50));
    a.tick();

    let sent = a.wire.updates_for(entity, CHARACTER_CORE);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].fields, vec![(FieldHandle(0), FieldValue::Int(50))]);

    // authority moves to B within one tick
    deliver_updates(&a, &mut b);
    a.wire.clear();
    a.view.revoke_authority(entity, AuthorityDomain::Primary);
    a.host.set_field(a_root, 0, FieldValue::Int(60));
    b.view.grant_authority(entity, AuthorityDomain::Primary);
    a.tick();
    b.tick();

    assert!(!a.bridge.has_authority(entity, AuthorityDomain::Primary));
    assert!(a.wire.updates.is_empty());
    assert!(b.bridge.has_authority(entity, AuthorityDomain::Primary));
    assert!(b.wire.updates.is_empty());

    let b_root = b.root(entity).expect("bound on B");
    assert_eq!(b.host.field(b_root, 0), Some(&FieldValue::Int(50)));

    b.host.set_field(b_root, 0, FieldValue::Int(70));
    b.tick();
    let sent = b.wire.updates_for(entity, CHARACTER_CORE);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].fields, vec![(FieldHandle(0), FieldValue::Int(70))]);
}

#[test]
fn losses_are_processed_before_gains() {
    let entity = EntityId::new(10);
    let mut worker = TestWorker::new("worker_a");
    worker
        .view
        .add_entity(entity, "Game.Character", vec![character_core(100, "hero")]);
    worker.view.grant_authority(entity, AuthorityDomain::Primary);
    worker.tick();
    let root = worker.root(entity).expect("bound");
    worker.host.clear_records();
    worker.events();

    worker.view.grant_authority(entity, AuthorityDomain::Secondary);
    worker.view.revoke_authority(entity, AuthorityDomain::Primary);
    worker.tick();

    assert_eq!(
        worker.host.authority_changes,
        vec![
            (root, AuthorityDomain::Primary, false),
            (root, AuthorityDomain::Secondary, true),
        ]
    );
    let authority_events: Vec<BridgeEvent> = worker
        .events()
        .into_iter()
        .filter(|event| matches!(event, BridgeEvent::AuthorityChanged { .. }))
        .collect();
    assert_eq!(
        authority_events,
        vec![
            BridgeEvent::AuthorityChanged {
                entity,
                domain: AuthorityDomain::Primary,
                authoritative: false,
            },
            BridgeEvent::AuthorityChanged {
                entity,
                domain: AuthorityDomain::Secondary,
                authoritative: true,
            },
        ]
    );
}

#[test]
fn gaining_authority_does_not_echo_received_state() {
    let entity = EntityId::new(10);
    let mut worker = TestWorker::new("worker_a");
    worker
        .view
        .add_entity(entity, "Game.Character", vec![character_core(100, "hero")]);
    worker.tick();

    worker.view.grant_authority(entity, AuthorityDomain::Primary);
    worker.tick();
    worker.tick();

    assert!(worker.wire.updates.is_empty());
    assert!(worker.wire.adds.is_empty());
}

#[test]
fn only_changed_fields_are_sent() {
    let entity = EntityId::new(10);
    let mut worker = TestWorker::new("worker_a");
    worker
        .view
        .add_entity(entity, "Game.Character", vec![character_core(100, "hero")]);
    worker.view.grant_authority(entity, AuthorityDomain::Primary);
    worker.tick();
    let root = worker.root(entity).expect("bound");

    worker.host.set_field(root, 4, FieldValue::Float(2.5));
    worker.host.set_field(root, 0, FieldValue::Int(1));
    worker.tick();

    let sent = worker.wire.updates_for(entity, CHARACTER_CORE);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].fields,
        vec![
            (FieldHandle(0), FieldValue::Int(1)),
            (FieldHandle(4), FieldValue::Float(2.5)),
        ]
    );
    assert_eq!(worker.wire.updates.len(), 1);

    // nothing changed since
    worker.wire.clear();
    worker.tick();
    assert!(worker.wire.updates.is_empty());
}

#[test]
fn remote_writes_to_authoritative_entity_are_dropped() {
    let entity = EntityId::new(10);
    let mut worker = TestWorker::new("worker_a");
    worker
        .view
        .add_entity(entity, "Game.Character", vec![character_core(100, "hero")]);
    worker.view.grant_authority(entity, AuthorityDomain::Primary);
    worker.tick();
    let root = worker.root(entity).expect("bound");
    worker.events();

    worker.view.update_component(entity, health(1));
    worker.tick();

    assert_eq!(worker.host.field(root, 0), Some(&FieldValue::Int(100)));
    assert!(worker.events().contains(&BridgeEvent::UpdateDropped {
        entity,
        offset: ObjectOffset::ROOT,
        reason: DropReason::NotPermitted,
    }));
}

#[test]
fn authority_over_unbound_entity_applies_once_bound() {
    let entity = EntityId::new(10);
    let mut worker = TestWorker::new("worker_a");

    // additions run before gains within a tick
    worker
        .view
        .add_entity(entity, "Game.Character", vec![character_core(100, "hero")]);
    worker.view.grant_authority(entity, AuthorityDomain::Primary);
    worker.tick();

    assert!(worker.bridge.has_authority(entity, AuthorityDomain::Primary));
    let root = worker.root(entity).expect("bound");
    assert_eq!(
        worker.host.authority_changes,
        vec![(root, AuthorityDomain::Primary, true)]
    );
}

#[test]
fn regaining_authority_over_created_entity_does_not_echo_received_state() {
    let mut worker = TestWorker::new("server");
    let (root, status) = worker.create_local(CHARACTER_TYPE);
    let entity = match status {
        CreationStatus::Assigned(entity) => entity,
        CreationStatus::Pending => {
            worker.reserve_ids(100, 8);
            EntityId::new(100)
        }
    };
    worker.tick();
    assert_eq!(worker.wire.created_entities(), vec![entity]);

    // the store echoes the created entity back
    worker
        .view
        .add_entity(entity, "Game.Character", vec![character_core(0, "")]);
    worker.tick();
    worker.wire.clear();

    worker.view.revoke_authority(entity, AuthorityDomain::Primary);
    worker.tick();
    assert!(!worker.bridge.has_authority(entity, AuthorityDomain::Primary));

    // the new authoritative worker writes while this one only listens
    worker.view.update_component(entity, health(80));
    worker.tick();
    assert_eq!(worker.host.field(root, 0), Some(&FieldValue::Int(80)));

    worker.view.grant_authority(entity, AuthorityDomain::Primary);
    worker.tick();
    worker.tick();

    assert!(worker.bridge.has_authority(entity, AuthorityDomain::Primary));
    assert!(worker.wire.updates.is_empty());
    assert!(worker.wire.adds.is_empty());

    // later local writes still go out
    worker.host.set_field(root, 0, FieldValue::Int(90));
    worker.tick();
    let sent = worker.wire.updates_for(entity, CHARACTER_CORE);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].fields, vec![(FieldHandle(0), FieldValue::Int(90))]);
}
