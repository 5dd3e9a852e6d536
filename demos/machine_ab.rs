//! Two machines coupled by a one-slot buffer.
//!
//! Machine A takes a workpiece (`start_a`) and puts it into the buffer when it
//! is done (`finish_a`); machine B takes it from the buffer (`start_b`) and
//! releases it (`finish_b`). Starting is controllable, finishing is not. The
//! specification forbids buffer overflow and underflow and asks for the buffer
//! to be emptied infinitely often.
//!
//! Run with:
//! ```bash
//! cargo run --example machine_ab -- --verify --dot closed-loop.dot
//! ```

use std::path::PathBuf;

use clap::Parser;

use buechi_syn::product::{inv_project, product};
use buechi_syn::{Automaton, EventId, EventSet, StateId, SynthesisConfig, Synthesizer};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Re-check the closed loop after synthesis.
    #[clap(long)]
    verify: bool,

    /// Hide `finish_b` from the supervisor.
    #[clap(long)]
    partial: bool,

    /// Write the closed loop in DOT format to this file.
    #[clap(long, value_name = "FILE")]
    dot: Option<PathBuf>,
}

const START_A: EventId = EventId::new(1);
const FINISH_A: EventId = EventId::new(2);
const START_B: EventId = EventId::new(3);
const FINISH_B: EventId = EventId::new(4);

fn machine(name: &str, start: (EventId, &str), finish: (EventId, &str)) -> Automaton {
    let (idle, busy) = (StateId::new(1), StateId::new(2));
    let mut g = Automaton::new(name);
    g.insert_named_event(start.0, start.1);
    g.insert_named_event(finish.0, finish.1);
    g.set_init_state(idle);
    g.set_marked_state(idle);
    g.set_transition(idle, start.0, busy);
    g.set_transition(busy, finish.0, idle);
    g.set_state_name(idle, "idle");
    g.set_state_name(busy, "busy");
    g
}

fn buffer(alphabet: &EventSet) -> Automaton {
    let (empty, full) = (StateId::new(1), StateId::new(2));
    let mut g = Automaton::new("buffer");
    g.insert_events(alphabet);
    g.set_init_state(empty);
    g.set_marked_state(empty);
    g.set_transition(empty, FINISH_A, full);
    g.set_transition(full, START_B, empty);
    for x in [empty, full] {
        g.set_transition(x, START_A, x);
        g.set_transition(x, FINISH_B, x);
    }
    g.set_state_name(empty, "empty");
    g.set_state_name(full, "full");
    g
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let mut ma = machine("A", (START_A, "start_a"), (FINISH_A, "finish_a"));
    let mut mb = machine("B", (START_B, "start_b"), (FINISH_B, "finish_b"));
    let alphabet = ma.alphabet() | mb.alphabet();
    inv_project(&mut ma, &alphabet);
    inv_project(&mut mb, &alphabet);
    let (mut plant, _) = product(&ma, &mb);
    plant.set_name("plant");
    plant.copy_event_names(&ma);
    plant.copy_event_names(&mb);
    println!("plant: {} states, {} transitions", plant.size(), plant.transition_count());

    let spec = buffer(&alphabet);
    let controllable: EventSet = [START_A, START_B].into_iter().collect();
    let observable: EventSet = if args.partial {
        [START_A, FINISH_A, START_B].into_iter().collect()
    } else {
        alphabet.clone()
    };

    let mut syn = Synthesizer::new().with_config(SynthesisConfig {
        verify: args.verify,
        ..Default::default()
    });

    let sup = syn.sup_buechi_con(&plant, &controllable, &spec)?;
    println!("{}: {} states, {} transitions", sup.name(), sup.size(), sup.transition_count());
    for x in sup.states() {
        if let Some(name) = sup.state_name(x) {
            println!("  {} = {}", x, name);
        }
    }

    let closed_loop = if args.partial {
        syn.buechi_con_norm(&plant, &controllable, &observable, &spec)?
    } else {
        syn.buechi_con(&plant, &controllable, &spec)?
    };
    println!(
        "{}: {} states, {} transitions",
        closed_loop.name(),
        closed_loop.size(),
        closed_loop.transition_count()
    );
    println!(
        "Büchi controllable: {}",
        buechi_syn::is_buechi_controllable(&plant, &controllable, &closed_loop)?
    );

    if let Some(path) = &args.dot {
        std::fs::write(path, closed_loop.to_dot()?)?;
        println!("Wrote {}", path.display());
    }

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
