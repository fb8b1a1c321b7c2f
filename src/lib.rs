//! # fsm-accept: automaton acceptance as a lazy SAT theory
//!
//! **`fsm-accept`** extends a conflict-driven Boolean search engine with
//! constraints of the form *"the automaton, started at a fixed source state
//! and driven by some string of a tracked trie, can end in state `S`"*, over
//! a nondeterministic automaton whose transitions are themselves decision
//! variables.
//!
//! ## How it works
//!
//! Each transition slot of the [`DynamicFsm`][crate::fsm::DynamicFsm] holds a
//! three-valued value written by the engine as it assigns variables. Two
//! [`AcceptDetector`][crate::detector::AcceptDetector]s read it through
//! opposite lenses:
//!
//! - **Under** counts only committed transitions: if it accepts, acceptance
//!   is certain and the literal is implied true;
//! - **Over** counts everything not yet ruled out: if it rejects, acceptance
//!   is impossible and the literal is implied false.
//!
//! Tracked strings share prefixes in a [`Dawg`][crate::dawg::Dawg], so one
//! product-reachability sweep answers every obligation rooted at the same
//! trie node. Implications are explained lazily: witness paths for
//! acceptance, backward cuts for non-acceptance.
//!
//! ## Basic usage
//!
//! ```rust
//! use fsm_accept::engine::{BasicEngine, Engine};
//! use fsm_accept::fsm::{DynamicFsm, Transition};
//! use fsm_accept::theory::{AcceptConfig, AcceptTheory};
//!
//! // 1. An automaton s0 --a--> s1 where the `a` transition is a variable
//! let mut fsm = DynamicFsm::new(2, false);
//! let s0 = fsm.add_state();
//! let s1 = fsm.add_state();
//! let e = fsm.add_edge(s0, s1);
//! let mut engine = BasicEngine::new(fsm);
//! let x = engine.new_transition_var(Transition::new(e, 1));
//!
//! // 2. Require the string "a" to end in s1
//! let mut theory = AcceptTheory::new(s0, AcceptConfig::default(), &mut engine);
//! let root = theory.add_string(&[1]);
//! let y = engine.new_var();
//! theory.register_acceptance(&mut engine, s1, root, y.pos());
//! engine.add_clause([y.pos()]);
//!
//! // 3. Solve: the transition must be enabled
//! assert!(engine.solve(&mut theory));
//! assert!(engine.value(x.pos()).is_true());
//! ```
//!
//! ## Core components
//!
//! - **[`theory`]**: the [`AcceptTheory`][crate::theory::AcceptTheory] and its configuration.
//! - **[`engine`]**: the [`Engine`][crate::engine::Engine] / [`Theory`][crate::engine::Theory] contract and a reference engine.
//! - **[`detector`]**: incremental product reachability under one view.
//! - **[`dot`]**: Graphviz output and diagnostic dumps.

pub mod bitset;
pub mod bridge;
pub mod dawg;
pub mod decide;
pub mod detector;
pub mod dot;
pub mod engine;
pub mod explain;
pub mod fsm;
pub mod heap;
pub mod registry;
pub mod symmetry;
pub mod theory;
pub mod types;
