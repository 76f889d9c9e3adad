/// PROPERTY TEST: Binding and reference bookkeeping
///
/// Random sequences of entity arrivals, departures and reference changes
/// never alias two entities onto one object, and the resolver's forward and
/// backward maps always agree at the end of a tick.
use proptest::prelude::*;

use replication_bridge::{EntityId, ObjectHost, ObjectRef};
use replication_bridge_test::{character_core, character_links, target, TestWorker};

#[derive(Clone, Debug)]
enum Op {
    Add { entity: u64, target: Option<u64> },
    Remove { entity: u64 },
    TemporarilyRemove { entity: u64 },
    Readd { entity: u64 },
    Retarget { entity: u64, target: Option<u64> },
}

fn entity_id() -> impl Strategy<Value = u64> {
    1u64..6
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (entity_id(), proptest::option::of(entity_id()))
            .prop_map(|(entity, target)| Op::Add { entity, target }),
        1 => entity_id().prop_map(|entity| Op::Remove { entity }),
        1 => entity_id().prop_map(|entity| Op::TemporarilyRemove { entity }),
        1 => entity_id().prop_map(|entity| Op::Readd { entity }),
        2 => (entity_id(), proptest::option::of(entity_id()))
            .prop_map(|(entity, target)| Op::Retarget { entity, target }),
    ]
}

fn root_ref(entity: Option<u64>) -> Option<ObjectRef> {
    entity.map(|entity| ObjectRef::root(EntityId::new(entity)))
}

fn apply(worker: &mut TestWorker, op: &Op) {
    match op {
        Op::Add { entity, target } => worker.view.add_entity(
            EntityId::new(*entity),
            "Game.Character",
            vec![
                character_core(10, "unit"),
                character_links(root_ref(*target), Vec::new()),
            ],
        ),
        Op::Remove { entity } => worker.view.remove_entity(EntityId::new(*entity)),
        Op::TemporarilyRemove { entity } => {
            worker.view.temporarily_remove_entity(EntityId::new(*entity))
        }
        Op::Readd { entity } => worker.view.readd_entity(EntityId::new(*entity)),
        Op::Retarget { entity, target: to } => worker
            .view
            .update_component(EntityId::new(*entity), target(root_ref(*to))),
    }
}

proptest! {
    #[test]
    fn bindings_stay_bijective(ops in proptest::collection::vec(op(), 1..40)) {
        let mut worker = TestWorker::new("client");
        for op in ops.iter() {
            apply(&mut worker, op);
            worker.tick();

            let bindings = worker.bridge.bindings();
            prop_assert!(bindings.is_bijective());
            for entity in bindings.bound_entities() {
                let root = bindings.root_object(entity);
                prop_assert!(root.is_some());
                let root = root.unwrap();
                prop_assert!(worker.host.is_alive(root));
                prop_assert_eq!(bindings.object_ref(root), Some(ObjectRef::root(entity)));
            }
        }
    }

    #[test]
    fn resolver_maps_stay_symmetric(ops in proptest::collection::vec(op(), 1..40)) {
        let mut worker = TestWorker::new("client");
        for op in ops.iter() {
            apply(&mut worker, op);
            worker.tick();

            let resolver = worker.bridge.resolver();
            prop_assert!(resolver.is_consistent());
            for entity in worker.bridge.bindings().bound_entities() {
                let Some(root) = worker.bridge.bindings().root_object(entity) else {
                    continue;
                };
                for object_ref in resolver.unresolved_refs(root) {
                    prop_assert!(resolver.dependents_of(object_ref).contains(&root));
                    prop_assert!(worker.bridge.object(object_ref).is_none());
                }
                for object_ref in resolver.mapped_refs(root) {
                    prop_assert!(resolver.dependents_of(object_ref).contains(&root));
                }
            }
        }
    }
}
