/// INTEGRATION TEST: Reference resolution
///
/// Fields referencing objects that aren't bound yet hold a null value until
/// the target arrives, then get patched and notified exactly once. RPCs
/// carrying unresolved references are held back until they resolve.
use replication_bridge::{EntityId, FieldHandle, FieldValue, ObjectRef, RpcCategory};
use replication_bridge_test::{
    character_core, character_links, target, TestRpc, TestWorker,
};

fn add_character(worker: &mut TestWorker, entity: u64, links: Option<replication_bridge::ComponentData>) {
    let mut components = vec![character_core(100, "npc")];
    components.extend(links);
    worker
        .view
        .add_entity(EntityId::new(entity), "Game.Character", components);
}

#[test]
fn late_target_patches_dependent_once() {
    let mut worker = TestWorker::new("client");
    let x = ObjectRef::root(EntityId::new(20));

    add_character(&mut worker, 10, Some(character_links(Some(x), Vec::new())));
    worker.tick();

    let a = worker.root(EntityId::new(10)).expect("A is bound");
    assert_eq!(worker.host.field(a, 2), Some(&FieldValue::Object(None)));
    assert!(worker.bridge.resolver().unresolved_refs(a).contains(&x));
    // the target field is held back while it can't be resolved
    assert!(!worker.host.notifications_for(a).contains(&FieldHandle(2)));
    worker.host.clear_records();

    add_character(&mut worker, 20, None);
    worker.tick();

    let x_handle = worker.root(EntityId::new(20)).expect("X is bound");
    assert_eq!(worker.host.field(a, 2), Some(&FieldValue::Object(Some(x_handle))));
    assert_eq!(worker.host.notifications_for(a), vec![FieldHandle(2)]);
    assert!(!worker.bridge.resolver().unresolved_refs(a).contains(&x));
    assert!(worker.bridge.resolver().mapped_refs(a).contains(&x));
    assert!(worker.bridge.resolver().dependents_of(x).contains(&a));
    assert!(worker.bridge.resolver().is_consistent());
}

#[test]
fn already_bound_target_resolves_immediately() {
    let mut worker = TestWorker::new("client");
    let x = ObjectRef::root(EntityId::new(20));

    add_character(&mut worker, 20, None);
    worker.tick();
    let x_handle = worker.root(EntityId::new(20)).expect("X is bound");

    add_character(&mut worker, 10, Some(character_links(Some(x), Vec::new())));
    worker.tick();

    let a = worker.root(EntityId::new(10)).expect("A is bound");
    assert_eq!(worker.host.field(a, 2), Some(&FieldValue::Object(Some(x_handle))));
    assert!(worker.host.notifications_for(a).contains(&FieldHandle(2)));
    assert!(worker.bridge.resolver().unresolved_refs(a).is_empty());
}

#[test]
fn array_fields_notify_despite_unresolved_elements() {
    let mut worker = TestWorker::new("client");
    let x = ObjectRef::root(EntityId::new(20));
    let y = ObjectRef::root(EntityId::new(30));

    add_character(
        &mut worker,
        10,
        Some(character_links(None, vec![Some(x), Some(y)])),
    );
    worker.tick();

    let a = worker.root(EntityId::new(10)).expect("A is bound");
    assert_eq!(
        worker.host.field(a, 3),
        Some(&FieldValue::Array(vec![
            FieldValue::Object(None),
            FieldValue::Object(None)
        ]))
    );
    assert!(worker.host.notifications_for(a).contains(&FieldHandle(3)));
    worker.host.clear_records();

    add_character(&mut worker, 20, None);
    worker.tick();

    // still waiting on y, but arrays always fire
    let x_handle = worker.root(EntityId::new(20)).expect("X is bound");
    assert_eq!(worker.host.notifications_for(a), vec![FieldHandle(3)]);
    assert_eq!(
        worker.host.field(a, 3),
        Some(&FieldValue::Array(vec![
            FieldValue::Object(Some(x_handle)),
            FieldValue::Object(None)
        ]))
    );
    assert!(worker.bridge.resolver().unresolved_refs(a).contains(&y));
}

#[test]
fn retargeting_to_unresolved_reference_suppresses_notify() {
    let mut worker = TestWorker::new("client");
    let x = ObjectRef::root(EntityId::new(20));
    let y = ObjectRef::root(EntityId::new(30));

    add_character(&mut worker, 20, None);
    add_character(&mut worker, 10, Some(character_links(Some(x), Vec::new())));
    worker.tick();
    let a = worker.root(EntityId::new(10)).expect("A is bound");
    worker.host.clear_records();

    worker.view.update_component(EntityId::new(10), target(Some(y)));
    worker.tick();

    assert_eq!(worker.host.field(a, 2), Some(&FieldValue::Object(None)));
    assert!(worker.host.notifications_for(a).is_empty());
    assert!(worker.bridge.resolver().unresolved_refs(a).contains(&y));
    // the previous target is no longer held
    assert!(!worker.bridge.resolver().dependents_of(x).contains(&a));

    add_character(&mut worker, 30, None);
    worker.tick();

    assert_eq!(worker.host.notifications_for(a), vec![FieldHandle(2)]);
}

#[test]
fn removed_target_flips_back_to_unresolved() {
    let mut worker = TestWorker::new("client");
    let x = ObjectRef::root(EntityId::new(20));

    add_character(&mut worker, 20, None);
    add_character(&mut worker, 10, Some(character_links(Some(x), Vec::new())));
    worker.tick();
    let a = worker.root(EntityId::new(10)).expect("A is bound");
    assert!(worker.bridge.resolver().mapped_refs(a).contains(&x));
    worker.host.clear_records();

    worker.view.remove_entity(EntityId::new(20));
    worker.tick();

    assert!(worker.bridge.resolver().unresolved_refs(a).contains(&x));
    assert!(worker.host.notifications_for(a).is_empty());
    assert!(worker.bridge.resolver().is_consistent());
}

#[test]
fn rpc_waits_for_its_target_to_resolve() {
    let mut worker = TestWorker::new("client");
    let a_entity = EntityId::new(10);
    let x = ObjectRef::root(EntityId::new(20));

    add_character(&mut worker, 10, None);
    worker.tick();

    worker
        .view
        .write_rpc(a_entity, RpcCategory::Multicast, TestRpc::targeting("aim", x));
    worker
        .view
        .write_rpc(a_entity, RpcCategory::Multicast, TestRpc::new("fire"));
    worker.tick();

    assert!(worker.bridge.take_received_rpcs().is_empty());
    assert!(worker.bridge.resolver().is_rpc_blocked(a_entity));

    add_character(&mut worker, 20, None);
    worker.tick();

    let received = worker.bridge.take_received_rpcs();
    let names: Vec<&str> = received.iter().map(|rpc| rpc.payload.name.as_str()).collect();
    assert_eq!(names, vec!["aim", "fire"]);
    assert_eq!(received[0].origin.index, 1);
    assert_eq!(received[1].origin.index, 2);
    assert!(!worker.bridge.resolver().is_rpc_blocked(a_entity));
}
