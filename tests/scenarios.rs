//! End-to-end scenarios for the acceptance theory.
//!
//! Tests cover implications and their reasons on small hand-built automata,
//! literal reuse, symmetry breaking, and full solving with the reference engine.

use fsm_accept::engine::{BasicEngine, Engine, Reason, Theory};
use fsm_accept::fsm::{DynamicFsm, Label, StateId, Transition};
use fsm_accept::theory::{AcceptConfig, AcceptTheory, SymmetryBreaking};
use fsm_accept::types::{Lit, Var};
use test_log::test;

const A: Label = 1;
const B: Label = 2;
const C: Label = 3;

/// The reason tag the engine recorded for an implied literal.
fn implied_by(engine: &BasicEngine, lit: Lit) -> fsm_accept::engine::ReasonTag {
    match engine.reason(lit.var()) {
        Some(Reason::Theory(tag)) => tag,
        other => panic!("{} was not implied by the theory: {:?}", lit, other),
    }
}

/// Does some string of `words` drive the automaton from `source` to `target`
/// using only the transitions accepted by `enabled`?
fn reaches(
    fsm: &DynamicFsm,
    source: StateId,
    words: &[Vec<Label>],
    target: StateId,
    enabled: impl Fn(Transition) -> bool,
) -> bool {
    words.iter().any(|word| {
        let mut current = vec![source];
        for &label in word {
            let mut next: Vec<StateId> = current
                .iter()
                .flat_map(|&s| fsm.outgoing(s).iter().copied())
                .filter(|&e| enabled(Transition::new(e, label)))
                .map(|e| fsm.edge(e).to)
                .collect();
            next.sort_unstable();
            next.dedup();
            current = next;
        }
        current.contains(&target)
    })
}

// ─── Scenario A: a single gated transition ─────────────────────────────────────

fn scenario_a() -> (BasicEngine, AcceptTheory, Var, Var, Lit) {
    let mut fsm = DynamicFsm::new(2, false);
    let s0 = fsm.add_state();
    let s1 = fsm.add_state();
    let e = fsm.add_edge(s0, s1);
    let mut engine = BasicEngine::new(fsm);
    let x = engine.new_transition_var(Transition::new(e, A));

    let mut theory = AcceptTheory::new(s0, AcceptConfig::default(), &mut engine);
    let root = theory.add_string(&[A]);
    let y = engine.new_var();
    let lit = theory.register_acceptance(&mut engine, s1, root, y.pos());
    (engine, theory, x, y, lit)
}

#[test]
fn disabling_the_only_transition_forces_rejection() {
    let (mut engine, mut theory, x, y, lit) = scenario_a();
    engine.decide(x.neg());
    assert_eq!(theory.propagate(&mut engine), Ok(()));
    assert!(engine.value(lit).is_false());

    let tag = implied_by(&engine, !lit);
    assert_eq!(theory.build_reason(&engine, !lit, tag), vec![!lit, x.pos()]);

    engine.propagate_clauses().unwrap();
    assert!(engine.value(y.pos()).is_false());
}

#[test]
fn enabling_the_only_transition_forces_acceptance() {
    let (mut engine, mut theory, x, y, lit) = scenario_a();
    engine.decide(x.pos());
    assert_eq!(theory.propagate(&mut engine), Ok(()));
    assert!(engine.value(lit).is_true());

    let tag = implied_by(&engine, lit);
    let reason = theory.build_reason(&engine, lit, tag);
    assert_eq!(reason, vec![lit, x.neg()]);
    assert!(reason[1..].iter().all(|&l| engine.value(l).is_false()));

    engine.propagate_clauses().unwrap();
    assert!(engine.value(y.pos()).is_true());
}

#[test]
fn contradicting_assignment_is_a_conflict() {
    let (mut engine, mut theory, x, _, lit) = scenario_a();
    engine.decide(lit);
    engine.decide(x.neg());
    let conflict = theory.propagate(&mut engine).unwrap_err();
    assert_eq!(conflict.lits(), &[!lit, x.pos()]);
    assert!(conflict.lits().iter().all(|&l| engine.value(l).is_false()));
    assert_eq!(theory.stats().conflicts, 1);
}

#[test]
fn implications_are_rederived_after_backtrack() {
    let (mut engine, mut theory, x, _, lit) = scenario_a();
    engine.decide(x.pos());
    engine.decide(lit);
    theory.propagate(&mut engine).unwrap();
    assert!(engine.value(lit).is_true());

    // Undo everything, then assign x at a fresh level: lit must come back as an implication.
    engine.backtrack(0);
    theory.backtrack(0);
    engine.decide(x.pos());
    theory.propagate(&mut engine).unwrap();
    assert!(engine.value(lit).is_true());
    assert!(matches!(engine.reason(lit.var()), Some(Reason::Theory(_))));
}

// ─── Scenario B: siblings sharing a prefix ─────────────────────────────────────

#[test]
fn non_accept_reason_justifies_every_sibling() {
    // s0 --a--> s1, then s1 --b--> s2 and s1 --c--> s2 on separate edges
    let mut fsm = DynamicFsm::new(4, false);
    let s0 = fsm.add_state();
    let s1 = fsm.add_state();
    let s2 = fsm.add_state();
    let e01 = fsm.add_edge(s0, s1);
    let e12b = fsm.add_edge(s1, s2);
    let e12c = fsm.add_edge(s1, s2);
    let mut engine = BasicEngine::new(fsm);
    let a = engine.new_transition_var(Transition::new(e01, A));
    let b = engine.new_transition_var(Transition::new(e12b, B));
    let c = engine.new_transition_var(Transition::new(e12c, C));

    let mut theory = AcceptTheory::new(s0, AcceptConfig::default(), &mut engine);
    let root = theory.dawg_mut().new_root();
    theory.dawg_mut().insert(root, &[A, B]);
    theory.dawg_mut().insert(root, &[A, C]);
    let y = engine.new_var();
    let lit = theory.register_acceptance(&mut engine, s2, root, y.pos());

    engine.decide(a.pos());
    engine.decide(b.neg());
    theory.propagate(&mut engine).unwrap();
    assert!(engine.value(lit).is_undef(), "c still offers a way into s2");

    engine.decide(c.neg());
    theory.propagate(&mut engine).unwrap();
    assert!(engine.value(lit).is_false());

    let tag = implied_by(&engine, !lit);
    let reason = theory.build_reason(&engine, !lit, tag);
    assert_eq!(reason[0], !lit);
    assert!(reason.contains(&b.pos()));
    assert!(reason.contains(&c.pos()));
    assert_eq!(reason.len(), 3);
}

// ─── Scenario C: symmetric free states ─────────────────────────────────────────

#[test]
fn unassigned_symmetric_states_do_not_conflict() {
    for symmetry in [SymmetryBreaking::PopCount, SymmetryBreaking::BitVector] {
        let mut fsm = DynamicFsm::new(2, false);
        let s0 = fsm.add_state();
        let s1 = fsm.add_state();
        let s2 = fsm.add_state();
        let mut edges = Vec::new();
        for (from, to) in [(s0, s1), (s0, s2), (s1, s2), (s2, s1)] {
            edges.push(fsm.add_edge(from, to));
        }
        let mut engine = BasicEngine::new(fsm);
        for e in edges {
            engine.new_transition_var(Transition::new(e, A));
        }
        let config = AcceptConfig {
            symmetry,
            ..AcceptConfig::default()
        };
        let mut theory = AcceptTheory::new(s0, config, &mut engine);
        assert_eq!(theory.propagate(&mut engine), Ok(()));
        assert_eq!(theory.stats().symmetry_conflicts, 0);
    }
}

// ─── Registration ──────────────────────────────────────────────────────────────

#[test]
fn registering_a_pair_twice_equates_the_literals() {
    let (mut engine, mut theory, _, y, lit) = scenario_a();
    let root = theory
        .registry()
        .pair(lit.var())
        .map(|pair| pair.node)
        .unwrap();
    let z = engine.new_var();
    let again = theory.register_acceptance(&mut engine, 1, root, z.pos());
    assert_eq!(again, lit);
    assert_eq!(theory.registry().len(), 1);

    engine.decide(z.neg());
    engine.propagate_clauses().unwrap();
    assert!(engine.value(y.pos()).is_false());
    assert!(engine.value(lit).is_false());
}

// ─── Full search ───────────────────────────────────────────────────────────────

/// Every transition of a complete automaton over `states` and `labels` gets a variable.
fn complete_automaton(states: usize, labels: usize) -> (BasicEngine, Vec<(Transition, Var)>) {
    let mut fsm = DynamicFsm::new(labels + 1, false);
    for _ in 0..states {
        fsm.add_state();
    }
    let mut edges = Vec::new();
    for from in 0..states {
        for to in 0..states {
            edges.push(fsm.add_edge(from, to));
        }
    }
    let mut engine = BasicEngine::new(fsm);
    let mut vars = Vec::new();
    for e in edges {
        for label in 1..=labels {
            let t = Transition::new(e, label);
            vars.push((t, engine.new_transition_var(t)));
        }
    }
    (engine, vars)
}

#[test]
fn synthesises_an_automaton_separating_strings() {
    let (mut engine, _) = complete_automaton(3, 2);
    let config = AcceptConfig {
        symmetry: SymmetryBreaking::PopCount,
        ..AcceptConfig::default()
    };
    let mut theory = AcceptTheory::new(0, config, &mut engine);
    let accept = 2;

    let positive = [vec![A, B], vec![A, A, B]];
    let negative = [vec![B, A], vec![A], vec![]];
    for word in &positive {
        let root = theory.add_string(word);
        let y = engine.new_var();
        theory.register_acceptance(&mut engine, accept, root, y.pos());
        engine.add_clause([y.pos()]);
    }
    for word in &negative {
        let root = theory.add_string(word);
        let y = engine.new_var();
        theory.register_acceptance(&mut engine, accept, root, y.pos());
        engine.add_clause([y.neg()]);
    }

    assert!(engine.solve(&mut theory));
    let fsm = engine.fsm();
    let enabled = |t: Transition| fsm.value(t.edge, t.label).is_true();
    for word in &positive {
        assert!(reaches(fsm, 0, std::slice::from_ref(word), accept, enabled), "{:?}", word);
    }
    for word in &negative {
        assert!(!reaches(fsm, 0, std::slice::from_ref(word), accept, enabled), "{:?}", word);
    }
}

#[test]
fn contradictory_requirements_are_unsatisfiable() {
    let (mut engine, _) = complete_automaton(2, 1);
    let mut theory = AcceptTheory::new(0, AcceptConfig::default(), &mut engine);
    let root = theory.add_string(&[A]);
    let y = engine.new_var();
    let z = engine.new_var();
    theory.register_acceptance(&mut engine, 1, root, y.pos());
    theory.register_acceptance(&mut engine, 1, root, z.pos());
    engine.add_clause([y.pos()]);
    engine.add_clause([z.neg()]);
    assert!(!engine.solve(&mut theory));
}

#[test]
fn empty_string_is_accepted_only_at_the_source() {
    let (mut engine, _) = complete_automaton(2, 1);
    let mut theory = AcceptTheory::new(0, AcceptConfig::default(), &mut engine);
    let root = theory.add_string(&[]);
    let y = engine.new_var();
    let at_source = theory.register_acceptance(&mut engine, 0, root, y.pos());
    let z = engine.new_var();
    let elsewhere = theory.register_acceptance(&mut engine, 1, root, z.pos());

    theory.propagate(&mut engine).unwrap();
    assert!(engine.value(at_source).is_true());
    assert!(engine.value(elsewhere).is_false());

    let tag = implied_by(&engine, !elsewhere);
    assert_eq!(theory.build_reason(&engine, !elsewhere, tag), vec![!elsewhere]);
}

#[test]
fn epsilon_moves_carry_the_empty_string() {
    let mut fsm = DynamicFsm::new(2, true);
    let s0 = fsm.add_state();
    let s1 = fsm.add_state();
    let e = fsm.add_edge(s0, s1);
    let mut engine = BasicEngine::new(fsm);
    let eps = engine.new_transition_var(Transition::new(e, fsm_accept::fsm::EPSILON));
    let mut theory = AcceptTheory::new(s0, AcceptConfig::default(), &mut engine);
    let root = theory.add_string(&[]);
    let y = engine.new_var();
    let lit = theory.register_acceptance(&mut engine, s1, root, y.pos());

    theory.propagate(&mut engine).unwrap();
    assert!(engine.value(lit).is_undef());

    engine.decide(eps.neg());
    theory.propagate(&mut engine).unwrap();
    assert!(engine.value(lit).is_false());
    let tag = implied_by(&engine, !lit);
    assert_eq!(theory.build_reason(&engine, !lit, tag), vec![!lit, eps.pos()]);
}
