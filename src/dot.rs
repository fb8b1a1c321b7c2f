//! Automaton to DOT (Graphviz) conversion and diagnostic dumps.
//!
//! The generated DOT output follows these conventions:
//! - **States** are circles labelled `s<i>`; the source is a double circle
//!   and states named by an acceptance registration are boxes
//! - **Edges** carry the comma-separated labels enabled under the chosen
//!   view (`eps` for epsilon); edges with no enabled label are omitted
//! - Labels that are enabled only because they are still undecided (Over
//!   view) are drawn in the undecided style
//!
//! # Examples
//!
//! ```
//! use fsm_accept::fsm::{DynamicFsm, View};
//! use fsm_accept::types::LBool;
//!
//! let mut fsm = DynamicFsm::new(2, false);
//! let s0 = fsm.add_state();
//! let s1 = fsm.add_state();
//! let e = fsm.add_edge(s0, s1);
//! fsm.set_value(e, 1, LBool::True);
//!
//! let dot = fsm.to_dot(View::Under, s0).unwrap();
//! assert!(dot.contains("s0 -> s1"));
//! ```

use std::fmt::{self, Write as _};

use crate::bitset::BitSet;
use crate::engine::Engine;
use crate::fsm::{DynamicFsm, StateId, View, EPSILON};
use crate::theory::AcceptTheory;
use crate::types::LBool;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for ordinary states (default: "circle")
    pub state_shape: &'static str,
    /// Shape for the source state (default: "doublecircle")
    pub source_shape: &'static str,
    /// Shape for accepting states (default: "box")
    pub accepting_shape: &'static str,
    /// Style for edges with a committed label (default: "solid")
    pub enabled_style: &'static str,
    /// Style for edges whose labels are all undecided (default: "dashed")
    pub undecided_style: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "circle",
            source_shape: "doublecircle",
            accepting_shape: "box",
            enabled_style: "solid",
            undecided_style: "dashed",
        }
    }
}

impl DynamicFsm {
    fn label_name(&self, label: usize) -> String {
        if self.emoves_enabled() && label == EPSILON {
            "eps".to_string()
        } else {
            label.to_string()
        }
    }

    /// Converts the automaton, as seen through `view`, to DOT format.
    pub fn to_dot(&self, view: View, source: StateId) -> Result<String, fmt::Error> {
        self.to_dot_with_config(view, source, &BitSet::default(), &DotConfig::default())
    }

    pub fn to_dot_with_config(
        &self,
        view: View,
        source: StateId,
        accepting: &BitSet,
        config: &DotConfig,
    ) -> Result<String, fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "rankdir=LR;")?;
        writeln!(dot, "node [shape={}];", config.state_shape)?;

        for state in 0..self.states() {
            let shape = if state == source {
                config.source_shape
            } else if accepting.contains(state) {
                config.accepting_shape
            } else {
                config.state_shape
            };
            writeln!(dot, "s{} [shape={}];", state, shape)?;
        }

        for edge in self.edges() {
            let mut labels = Vec::new();
            let mut committed = false;
            for label in 0..self.alphabet() {
                if self.enabled(view, edge.id, label) {
                    committed |= self.value(edge.id, label) == LBool::True;
                    labels.push(self.label_name(label));
                }
            }
            if labels.is_empty() {
                continue;
            }
            let style = if committed {
                config.enabled_style
            } else {
                config.undecided_style
            };
            writeln!(
                dot,
                "s{} -> s{} [label=\"{}\", style={}];",
                edge.from,
                edge.to,
                labels.join(","),
                style
            )?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl AcceptTheory {
    /// Writes every tracked pair with its literal, value and detector
    /// answers, the counters, and the Under view as DOT.
    pub fn dump<E: Engine, W: fmt::Write>(&self, engine: &E, out: &mut W) -> fmt::Result {
        writeln!(out, "source: s{}", self.source)?;
        writeln!(out, "tracked pairs: {}", self.registry.len())?;
        for (lit, pair) in self.registry.iter() {
            let words: Vec<String> = self
                .dawg
                .words(pair.node)
                .iter()
                .map(|w| w.iter().map(|&l| engine.fsm().label_name(l)).collect::<Vec<_>>().join(" "))
                .collect();
            writeln!(
                out,
                "  {:>6} = {}  {}  under={} over={}  {{{}}}",
                lit,
                engine.value(engine.to_solver(lit)),
                pair,
                self.under.accepts(pair.node, pair.state),
                self.over.accepts(pair.node, pair.state),
                words.join(" | ")
            )?;
        }
        writeln!(out, "{}", self.stats)?;
        let dot = engine.fsm().to_dot_with_config(
            View::Under,
            self.source,
            &self.accepting,
            &DotConfig::default(),
        )?;
        write!(out, "{}", dot)
    }
}
