//! Property tests for identifier packing, id issuance, implementer address
//! stability, and view collection bookkeeping.
//!
//! These tests use `proptest` to generate random reservation sequences and
//! verify that the database invariants hold after each step.

use std::collections::HashSet;

use proptest::prelude::*;
use stratum_ecs::prelude::*;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Pos {
    x: i32,
    y: i32,
}
impl Implementer for Pos {}

#[derive(Debug, Default)]
struct PosView {
    gid: Egid,
    pos: Option<ImplementerPtr<Pos>>,
}

impl EntityView for PosView {
    fn gid(&self) -> Egid {
        self.gid
    }
    fn set_gid(&mut self, gid: Egid) {
        self.gid = gid;
    }
}

struct PosFields {
    pos: ImplementerPtr<Pos>,
}

impl BindView for PosView {
    type Fields = PosFields;
    fn bind(&mut self, fields: PosFields) {
        self.pos = Some(fields.pos);
    }
}

/// Operations we can perform on the database.
#[derive(Debug, Clone)]
enum DbOp {
    /// Reserve an entity in group `1 + n % 4` and bind a fresh `Pos` to it.
    Spawn(u32, i32),
    /// Reserve a bare `Pos` with no view.
    ReservePos(i32),
    /// Re-reserve the view of an already spawned entity.
    Rebind(usize),
    /// Look up a spawned entity by id.
    Lookup(usize),
}

fn db_op_strategy() -> impl Strategy<Value = DbOp> {
    prop_oneof![
        (0..4u32, any::<i32>()).prop_map(|(g, x)| DbOp::Spawn(g, x)),
        any::<i32>().prop_map(DbOp::ReservePos),
        (0..100usize).prop_map(DbOp::Rebind),
        (0..100usize).prop_map(DbOp::Lookup),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn packing_round_trips(entity in any::<u32>(), group in any::<u32>()) {
        let egid = Egid::new(entity, group);
        prop_assert_eq!(egid.entity(), entity);
        prop_assert_eq!(egid.group(), group);
        prop_assert_eq!(Egid::from_raw(egid.to_raw()), egid);
    }

    #[test]
    fn non_zero_entity_is_always_valid(entity in 1..=u32::MAX, group in any::<u32>()) {
        prop_assert!(Egid::new(entity, group).is_valid());
    }

    #[test]
    fn ordering_matches_packed_value(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(Egid::from_raw(a).cmp(&Egid::from_raw(b)), a.cmp(&b));
    }

    #[test]
    fn issued_ids_are_strictly_increasing_from_one(count in 1..500usize) {
        let mut db = EntityDatabase::new();
        let ids: Vec<u32> = (0..count).map(|_| db.new_entity_id().unwrap()).collect();
        prop_assert_eq!(ids[0], 1);
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(ids.iter().collect::<HashSet<_>>().len(), count);
    }

    /// Small buckets force frequent bucket creation; every earlier address
    /// must keep its value and no two reservations may share an address.
    #[test]
    fn implementer_addresses_are_stable(
        per_bucket in 1..16usize,
        count in 1..400usize,
    ) {
        let mut db = EntityDatabase::with_config(DatabaseConfig {
            bucket_byte_budget: per_bucket * std::mem::size_of::<Pos>(),
        });
        let mut issued: Vec<(ImplementerPtr<Pos>, usize)> = Vec::new();
        for i in 0..count {
            let ptr = db.reserve_implementer::<Pos>();
            db.implementer_mut(ptr).unwrap().x = i as i32;
            issued.push((ptr, ptr.addr()));

            for (j, (earlier, addr)) in issued.iter().enumerate() {
                prop_assert_eq!(earlier.addr(), *addr);
                prop_assert_eq!(db.implementer(*earlier).unwrap().x, j as i32);
            }
        }
        let distinct: HashSet<usize> = issued.iter().map(|(_, addr)| *addr).collect();
        prop_assert_eq!(distinct.len(), count);
        prop_assert_eq!(db.bucket_count::<Pos>(), count.div_ceil(per_bucket));
    }

    #[test]
    fn random_ops_preserve_view_invariants(ops in prop::collection::vec(db_op_strategy(), 1..80)) {
        let mut db = EntityDatabase::with_config(DatabaseConfig { bucket_byte_budget: 64 });
        let mut spawned: Vec<(Egid, ImplementerPtr<Pos>)> = Vec::new();
        let mut appended_per_group = [0usize; 5];

        for op in ops {
            match op {
                DbOp::Spawn(g, x) => {
                    let group = 1 + g % 4;
                    let egid = db.new_entity_id_in(group).unwrap();
                    let pos = db.reserve_implementer::<Pos>();
                    db.implementer_mut(pos).unwrap().x = x;
                    let view = db.bind_view::<PosView>(egid, PosFields { pos }).unwrap();
                    prop_assert_eq!(view.gid, egid);
                    appended_per_group[group as usize] += 1;
                    spawned.push((egid, pos));
                }
                DbOp::ReservePos(x) => {
                    let pos = db.reserve_implementer::<Pos>();
                    db.implementer_mut(pos).unwrap().y = x;
                }
                DbOp::Rebind(idx) => {
                    if !spawned.is_empty() {
                        let (egid, _) = spawned[idx % spawned.len()];
                        let pos = db.reserve_implementer::<Pos>();
                        db.bind_view::<PosView>(egid, PosFields { pos }).unwrap();
                        let len = spawned.len();
                        spawned[idx % len].1 = pos;
                        appended_per_group[egid.group() as usize] += 1;
                    }
                }
                DbOp::Lookup(idx) => {
                    if !spawned.is_empty() {
                        let (egid, pos) = spawned[idx % spawned.len()];
                        let view = db.query_one::<PosView>(egid).unwrap();
                        prop_assert_eq!(view.gid, egid);
                        prop_assert_eq!(view.pos, Some(pos));
                    }
                }
            }

            // Invariant: each group's count is the number of appends to it,
            // and every record belongs to that group.
            for group in 1..=4u32 {
                let records = db.query_group::<PosView>(group).unwrap();
                prop_assert_eq!(records.len(), appended_per_group[group as usize]);
                prop_assert!(records.iter().all(|v| v.gid.group() == group));
            }
        }

        // Invariant: the latest binding of every spawned entity is what a
        // point lookup returns.
        for &(egid, pos) in &spawned {
            prop_assert_eq!(db.query_one::<PosView>(egid).unwrap().pos, Some(pos));
        }
    }
}
