//! Convergence properties for the field-level primitives and `DocCrdt`:
//! merging the same set of updates in different orders must land on the
//! same state, regardless of how the updates were interleaved or repeated.

use mindcache_core::ActorId;
use mindcache_crdt::{DocCrdt, DocOp, GCounter, ORSet};
use proptest::prelude::*;

fn agent_id_strategy() -> impl Strategy<Value = String> {
    "[a-c]".prop_map(|s| s)
}

proptest! {
    /// A `GCounter` merged with itself has no effect: re-observing the same
    /// per-agent counts can never change the total.
    #[test]
    fn gcounter_merge_is_idempotent(ops in prop::collection::vec((agent_id_strategy(), 0u64..100), 0..20)) {
        let mut counter = GCounter::new();
        for (agent, amount) in &ops {
            counter.increment(agent, *amount);
        }
        let before = counter.value();
        let snapshot = counter.clone();
        counter.merge(&snapshot);
        prop_assert_eq!(counter.value(), before);
    }

    /// Merging two independently-built counters converges to the same total
    /// regardless of which side initiates the merge.
    #[test]
    fn gcounter_merge_is_commutative(
        ops_a in prop::collection::vec((agent_id_strategy(), 0u64..100), 0..20),
        ops_b in prop::collection::vec((agent_id_strategy(), 0u64..100), 0..20),
    ) {
        let mut a = GCounter::new();
        for (agent, amount) in &ops_a {
            a.increment(agent, *amount);
        }
        let mut b = GCounter::new();
        for (agent, amount) in &ops_b {
            b.increment(agent, *amount);
        }

        let mut a_then_b = a.clone();
        a_then_b.merge(&b);
        let mut b_then_a = b.clone();
        b_then_a.merge(&a);

        prop_assert_eq!(a_then_b.value(), b_then_a.value());
        for agent in ["a", "b", "c"] {
            prop_assert_eq!(a_then_b.agent_value(agent), b_then_a.agent_value(agent));
        }
    }

    /// Two replicas that apply the same adds/removes, possibly in different
    /// order, then merge converge to the same visible element set.
    #[test]
    fn orset_merge_converges_regardless_of_order(
        adds_a in prop::collection::vec(0u8..5, 0..10),
        removes_a in prop::collection::vec(0u8..5, 0..5),
        adds_b in prop::collection::vec(0u8..5, 0..10),
    ) {
        let mut a = ORSet::new();
        for (i, e) in adds_a.iter().enumerate() {
            a.add(*e, "agent-a", i as u64);
        }
        for e in &removes_a {
            a.remove(e);
        }

        let mut b = ORSet::new();
        for (i, e) in adds_b.iter().enumerate() {
            b.add(*e, "agent-b", i as u64);
        }

        let mut a_then_b = a.clone();
        a_then_b.merge(&b);
        let mut b_then_a = b.clone();
        b_then_a.merge(&a);

        prop_assert_eq!(a_then_b.elements(), b_then_a.elements());
    }
}

fn doc_op_strategy() -> impl Strategy<Value = (char, usize)> {
    ("[a-z]", 0usize..8).prop_map(|(s, pos)| (s.chars().next().unwrap(), pos))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two replicas starting from the same base text, each making one local
    /// insert, converge to the same materialized string no matter which
    /// order the two ops are applied in.
    #[test]
    fn concurrent_inserts_converge_regardless_of_apply_order(
        base in "[a-z]{0,6}",
        (char_a, pos_a) in doc_op_strategy(),
        (char_b, pos_b) in doc_op_strategy(),
    ) {
        let actor_a = ActorId::new("a");
        let actor_b = ActorId::new("b");
        let root = DocCrdt::from_text(&base, &actor_a);

        let mut replica_a = root.clone();
        let pos_a = pos_a.min(replica_a.materialize().chars().count());
        let op_a = replica_a.local_insert(pos_a, char_a, &actor_a);

        let mut replica_b = root.clone();
        let pos_b = pos_b.min(replica_b.materialize().chars().count());
        let op_b = replica_b.local_insert(pos_b, char_b, &actor_b);

        replica_a.apply(op_b);
        replica_b.apply(op_a);

        prop_assert_eq!(replica_a.materialize(), replica_b.materialize());
    }

    /// Replaying the same stream of ops twice against a fresh replica, in
    /// any received order, is idempotent and order-independent: a document
    /// never depends on how many times a remote op was retried.
    #[test]
    fn replaying_ops_twice_in_any_order_is_idempotent(
        base in "[a-z]{0,5}",
        inserts in prop::collection::vec(doc_op_strategy(), 0..6),
    ) {
        let actor = ActorId::new("seed");
        let mut source = DocCrdt::from_text(&base, &actor);
        let mut ops: Vec<DocOp> = Vec::new();
        for (ch, pos) in inserts {
            let pos = pos.min(source.materialize().chars().count());
            ops.push(source.local_insert(pos, ch, &actor));
        }

        let mut replica = DocCrdt::new();
        for op in &ops {
            replica.apply(op.clone());
        }
        let once = replica.materialize();

        // Re-apply every op again, in reverse order, plus the original order.
        for op in ops.iter().rev() {
            replica.apply(op.clone());
        }
        for op in &ops {
            replica.apply(op.clone());
        }

        prop_assert_eq!(replica.materialize(), once);
        prop_assert_eq!(replica.materialize(), source.materialize());
    }
}
