//! Property tests for the grid, resource meters, structures and decay

use eldoria::core::config::{HunterConfig, KnightConfig, SimulationConfig};
use eldoria::core::types::{Metric, Position};
use eldoria::entity::kind::EntityKind;
use eldoria::entity::resource::{ResourceMeter, ResourceProfile};
use eldoria::entity::treasure::{Treasure, TreasureKind};
use eldoria::simulation::{EntityCounts, Simulation};
use eldoria::spatial::torus::ToroidalGrid;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum MeterOp {
    Move,
    Drain(f32),
    StartRest,
    Recover,
    EndTurn,
}

fn meter_op() -> impl Strategy<Value = MeterOp> {
    prop_oneof![
        Just(MeterOp::Move),
        (0.0f32..40.0).prop_map(MeterOp::Drain),
        Just(MeterOp::StartRest),
        Just(MeterOp::Recover),
        Just(MeterOp::EndTurn),
    ]
}

fn apply(meter: &mut ResourceMeter, op: MeterOp) {
    match op {
        MeterOp::Move => meter.spend_move(),
        MeterOp::Drain(amount) => meter.drain(amount),
        MeterOp::StartRest => meter.start_rest(),
        MeterOp::Recover => {
            meter.recover();
        }
        MeterOp::EndTurn => {
            meter.end_turn();
        }
    }
}

proptest! {
    #[test]
    fn wrap_is_idempotent_and_periodic(
        w in 1i32..64,
        h in 1i32..64,
        x in -1000i32..1000,
        y in -1000i32..1000,
    ) {
        let grid = ToroidalGrid::new(w, h);
        let p = grid.wrap(x, y);
        prop_assert_eq!(grid.wrap(p.x, p.y), p);
        prop_assert_eq!(grid.wrap(x + w, y), p);
        prop_assert_eq!(grid.wrap(x, y - h), p);
        prop_assert!(p.x >= 0 && p.x < w && p.y >= 0 && p.y < h);
    }

    #[test]
    fn distance_is_symmetric_and_bounded(
        w in 1i32..64,
        h in 1i32..64,
        ax in -100i32..100,
        ay in -100i32..100,
        bx in -100i32..100,
        by in -100i32..100,
    ) {
        let grid = ToroidalGrid::new(w, h);
        let a = Position::new(ax, ay);
        let b = Position::new(bx, by);
        for metric in [Metric::Euclidean, Metric::Manhattan] {
            prop_assert_eq!(grid.distance(a, b, metric), grid.distance(b, a, metric));
            prop_assert_eq!(grid.distance(a, a, metric), 0.0);
            prop_assert!(grid.distance(a, b, metric) <= grid.max_distance(metric) + 1e-4);
        }
    }

    #[test]
    fn hunter_stamina_stays_in_range(ops in prop::collection::vec(meter_op(), 0..200)) {
        let mut meter = ResourceMeter::new(ResourceProfile::hunter(&HunterConfig::default()));
        for op in ops {
            apply(&mut meter, op);
            prop_assert!((0.0..=100.0).contains(&meter.value()));
        }
    }

    #[test]
    fn knight_energy_stays_in_range(ops in prop::collection::vec(meter_op(), 0..200)) {
        let mut meter = ResourceMeter::new(ResourceProfile::knight(&KnightConfig::default()));
        for op in ops {
            apply(&mut meter, op);
            prop_assert!((0.0..=100.0).contains(&meter.value()));
            prop_assert!(!meter.is_collapsed());
        }
    }

    #[test]
    fn treasure_value_never_increases(
        initial in 0.1f32..100.0,
        rate in 0.0f32..0.2,
        steps in 1usize..200,
    ) {
        let mut treasure = Treasure::new(TreasureKind::Silver, initial);
        let mut last = treasure.value;
        for _ in 0..steps {
            let now = treasure.decay(rate);
            prop_assert!(now <= last);
            prop_assert!(now >= 0.0);
            last = now;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn structures_never_exceed_capacity(seed in any::<u64>(), hunters in 1usize..12) {
        let mut config = SimulationConfig::with_seed(seed);
        config.structures.hideout_capacity = 2;
        config.structures.garrison_capacity = 1;
        config.structures.recruit_probability = 0.5;
        let mut sim = Simulation::new(config);
        sim.setup(EntityCounts {
            treasures: 15,
            hunters,
            knights: 3,
            hideouts: 2,
            garrisons: 2,
        })
        .unwrap();

        for _ in 0..150 {
            sim.step();
            let world = sim.world();
            for id in world.ids_of_kind(EntityKind::Hideout) {
                let hideout = world.hideout(id).unwrap();
                prop_assert!(hideout.residents.len() <= hideout.capacity);
            }
            for id in world.ids_of_kind(EntityKind::Garrison) {
                let garrison = world.garrison(id).unwrap();
                prop_assert!(garrison.residents.len() <= garrison.capacity);
            }
        }
    }

    #[test]
    fn carriers_hold_at_most_one_treasure(seed in any::<u64>()) {
        let mut sim = Simulation::new(SimulationConfig::with_seed(seed));
        sim.setup(EntityCounts {
            treasures: 30,
            hunters: 6,
            knights: 2,
            hideouts: 2,
            garrisons: 1,
        })
        .unwrap();

        for _ in 0..100 {
            sim.step();
            let world = sim.world();
            for hunter_id in world.ids_of_kind(EntityKind::Hunter) {
                let carried = world
                    .entities()
                    .filter_map(|(_, e)| e.as_treasure())
                    .filter(|t| t.carrier() == Some(hunter_id))
                    .count();
                prop_assert!(carried <= 1);
            }
        }
    }
}
