use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use log::info;

use fsm_accept::engine::{BasicEngine, Engine};
use fsm_accept::fsm::{DynamicFsm, Label, Transition, View};
use fsm_accept::theory::{AcceptConfig, AcceptTheory, SymmetryBreaking};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Symmetry {
    None,
    Popcount,
    Bitvector,
}

impl From<Symmetry> for SymmetryBreaking {
    fn from(value: Symmetry) -> Self {
        match value {
            Symmetry::None => SymmetryBreaking::None,
            Symmetry::Popcount => SymmetryBreaking::PopCount,
            Symmetry::Bitvector => SymmetryBreaking::BitVector,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Synthesise an automaton separating two sets of strings")]
struct Cli {
    /// Number of states.
    #[arg(short, long, value_name = "INT", default_value = "3")]
    states: usize,

    /// Strings that must end in the last state (letters 'a'..'z').
    #[arg(short, long, value_name = "STRING", num_args = 1..)]
    accept: Vec<String>,

    /// Strings that must not end in the last state.
    #[arg(short, long, value_name = "STRING", num_args = 0..)]
    reject: Vec<String>,

    /// Symmetry-breaking strategy.
    #[arg(long, value_enum, default_value = "popcount")]
    symmetry: Symmetry,

    /// Shuffle the processing order of propagated pairs with this seed.
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,

    /// Print the full theory dump instead of the DOT output only.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_word(s: &str) -> color_eyre::Result<Vec<Label>> {
    s.chars()
        .map(|c| match c {
            'a'..='z' => Ok(c as usize - 'a' as usize + 1),
            _ => Err(eyre!("unsupported letter {:?} in {:?}", c, s)),
        })
        .collect()
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();
    println!("args = {:?}", args);

    if args.states == 0 {
        return Err(eyre!("at least one state is required"));
    }

    let accept: Vec<Vec<Label>> = args.accept.iter().map(|s| parse_word(s)).collect::<Result<_, _>>()?;
    let reject: Vec<Vec<Label>> = args.reject.iter().map(|s| parse_word(s)).collect::<Result<_, _>>()?;
    let labels = accept.iter().chain(&reject).flatten().copied().max().unwrap_or(1);

    // Complete automaton: every ordered pair of states, every letter gated by a variable
    let mut fsm = DynamicFsm::new(labels + 1, false);
    for _ in 0..args.states {
        fsm.add_state();
    }
    let mut edges = Vec::new();
    for from in 0..args.states {
        for to in 0..args.states {
            edges.push(fsm.add_edge(from, to));
        }
    }
    let mut engine = BasicEngine::new(fsm);
    for e in edges {
        for label in 1..=labels {
            engine.new_transition_var(Transition::new(e, label));
        }
    }
    info!("{} states, {} letters, {} transition variables", args.states, labels, engine.num_vars());

    let config = AcceptConfig {
        symmetry: args.symmetry.into(),
        shuffle: args.seed.is_some(),
        seed: args.seed.unwrap_or_default(),
        ..AcceptConfig::default()
    };
    let mut theory = AcceptTheory::new(0, config, &mut engine);
    let target = args.states - 1;

    for (words, wanted) in [(&accept, true), (&reject, false)] {
        for word in words {
            let root = theory.add_string(word);
            let y = engine.new_var();
            theory.register_acceptance(&mut engine, target, root, y.pos());
            engine.add_clause([y.lit(!wanted)]);
        }
    }

    let time_solve = std::time::Instant::now();
    let sat = engine.solve(&mut theory);
    info!("solved in {:.3}s", time_solve.elapsed().as_secs_f64());

    if sat {
        println!("SAT");
        if args.verbose {
            let mut out = String::new();
            theory.dump(&engine, &mut out)?;
            println!("{}", out);
        } else {
            println!("{}", engine.fsm().to_dot(View::Under, theory.source())?);
        }
    } else {
        println!("UNSAT: no automaton with {} states separates the strings", args.states);
    }
    println!("{}", theory.stats());

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
