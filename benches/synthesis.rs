//! Synthesis benchmarks on random plants.
//!
//! Run with:
//! ```bash
//! cargo bench --bench synthesis
//! ```

use buechi_syn::{buechi_con, sup_buechi_con, sup_buechi_con_norm, Automaton, EventId, EventSet, StateId, StateSet};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// Helper: random control problems
// ============================================================================

/// A random deterministic plant with `num_states` states over `num_events`
/// events. Every state has at least one successor.
fn random_plant(num_states: u32, num_events: u32, seed: u64) -> Automaton {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut g = Automaton::new(format!("plant{}", num_states));
    for ev in 1..=num_events {
        g.insert_event(EventId::new(ev));
    }
    g.set_init_state(StateId::new(1));
    for x in 1..=num_states {
        g.insert_state_with_id(StateId::new(x));
        if rng.random_bool(0.3) {
            g.set_marked_state(StateId::new(x));
        }
        // ring edge keeps the plant strongly connected
        let next = x % num_states + 1;
        g.set_transition(StateId::new(x), EventId::new(1), StateId::new(next));
        for ev in 2..=num_events {
            if rng.random_bool(0.4) {
                let y = rng.random_range(1..=num_states);
                g.set_transition(StateId::new(x), EventId::new(ev), StateId::new(y));
            }
        }
    }
    g.set_marked_state(StateId::new(1));
    g
}

/// The plant with some transitions removed and a random Büchi marking.
fn random_spec(plant: &Automaton, seed: u64) -> Automaton {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut g = plant.clone();
    g.set_name("spec");
    g.retain_transitions(|t| t.ev == EventId::new(1) || rng.random_bool(0.8));
    let marked: StateSet = g.states().iter().filter(|_| rng.random_bool(0.5)).collect();
    g.inject_marked_states(&marked);
    g
}

fn controllable(num_events: u32) -> EventSet {
    (1..=num_events).filter(|ev| ev % 2 == 1).map(EventId::new).collect()
}

// ============================================================================
// Benchmark: SupBuechiCon scaling
// ============================================================================

fn bench_sup_buechi_con(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis/sup_buechi_con");
    group.sample_size(10);

    let num_events = 4;
    for num_states in [8, 16, 32, 64] {
        let plant = random_plant(num_states, num_events, 42);
        let spec = random_spec(&plant, 7);
        let calph = controllable(num_events);

        group.throughput(Throughput::Elements(num_states as u64));
        group.bench_with_input(BenchmarkId::new("states", num_states), &num_states, |b, _| {
            b.iter(|| sup_buechi_con(&plant, &calph, &spec).map(|res| res.size()));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: closed loop with feedback
// ============================================================================

fn bench_buechi_con(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis/buechi_con");
    group.sample_size(10);

    let num_events = 4;
    for num_states in [8, 16, 32] {
        let plant = random_plant(num_states, num_events, 42);
        let spec = random_spec(&plant, 7);
        let calph = controllable(num_events);

        group.bench_with_input(BenchmarkId::new("states", num_states), &num_states, |b, _| {
            b.iter(|| buechi_con(&plant, &calph, &spec).map(|res| res.transition_count()));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: partial observation
// ============================================================================

fn bench_sup_buechi_con_norm(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis/sup_buechi_con_norm");
    group.sample_size(10);

    let num_events = 4;
    // the last event is hidden
    let observable: EventSet = (1..num_events).map(EventId::new).collect();
    for num_states in [8, 16] {
        let plant = random_plant(num_states, num_events, 42);
        let spec = random_spec(&plant, 7);
        let calph = controllable(num_events);

        group.bench_with_input(BenchmarkId::new("states", num_states), &num_states, |b, _| {
            b.iter(|| sup_buechi_con_norm(&plant, &calph, &observable, &spec).map(|res| res.size()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sup_buechi_con, bench_buechi_con, bench_sup_buechi_con_norm);

criterion_main!(benches);
