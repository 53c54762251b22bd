use std::collections::VecDeque;

use crate::math;
use crate::tree::{NodeId, Observation, ObservationTree};
use crate::{Input, Output};

/// The interface a conjectured hypothesis automaton exposes to the witness
/// finder. Under Mealy semantics, [`Hypothesis::output`] gives the output
/// along an input; under Moore/DFA semantics, [`Hypothesis::state_output`]
/// gives the state output respectively the acceptance flag (as `bool`-valued
/// `O`).
///
/// A hypothesis may be partial: a missing transition or output is treated as
/// absence of information, never as a mismatch.
pub trait Hypothesis<I, O> {
    type State: Copy + Eq;

    fn initial(&self) -> Self::State;
    fn transition(&self, state: Self::State, input: I) -> Option<Self::State>;
    fn output(&self, state: Self::State, input: I) -> Option<O>;
    fn state_output(&self, state: Self::State) -> Option<O>;
}

/// Searches for a sequence on which the recorded observations below
/// `tree_state` contradict the hypothesis from `hyp_state` onwards. Returns
/// the transfer sequence from `tree_state` to the contradicting tree node,
/// or `None` when the tree is consistent with the hypothesis.
pub fn witness_in_tree_vs_hypothesis<I: Input, O: Output, H: Hypothesis<I, O>>(
    tree: &ObservationTree<I, O>,
    tree_state: NodeId,
    hypothesis: &H,
    hyp_state: H::State,
) -> Option<Vec<I>> {
    if tree.semantics().is_mealy() {
        witness_mealy(tree, tree_state, hypothesis, hyp_state)
    } else {
        witness_moore(tree, tree_state, hypothesis, hyp_state)
    }
}

fn witness_mealy<I: Input, O: Output, H: Hypothesis<I, O>>(
    tree: &ObservationTree<I, O>,
    origin: NodeId,
    hypothesis: &H,
    initial: H::State,
) -> Option<Vec<I>> {
    let mut pairs = VecDeque::from([(origin, initial)]);

    while let Some((tree_state, hyp_state)) = pairs.pop_front() {
        for &input in tree.alphabet() {
            let Some(tree_succ) = tree.get_successor(tree_state, input) else {
                continue;
            };
            if let (Observation::Known(tree_out), Some(hyp_out)) = (
                tree.node(tree_succ).output(),
                hypothesis.output(hyp_state, input),
            ) {
                if *tree_out != hyp_out {
                    return tree.transfer_sequence(origin, tree_succ);
                }
            }
            if let Some(hyp_succ) = hypothesis.transition(hyp_state, input) {
                pairs.push_back((tree_succ, hyp_succ));
            }
        }
    }
    None
}

fn witness_moore<I: Input, O: Output, H: Hypothesis<I, O>>(
    tree: &ObservationTree<I, O>,
    origin: NodeId,
    hypothesis: &H,
    initial: H::State,
) -> Option<Vec<I>> {
    let mut pairs = VecDeque::from([(origin, initial)]);

    while let Some((tree_state, hyp_state)) = pairs.pop_front() {
        if let (Observation::Known(tree_out), Some(hyp_out)) = (
            tree.node(tree_state).output(),
            hypothesis.state_output(hyp_state),
        ) {
            if *tree_out != hyp_out {
                return tree.transfer_sequence(origin, tree_state);
            }
        }
        for &input in tree.alphabet() {
            if let (Some(tree_succ), Some(hyp_succ)) = (
                tree.get_successor(tree_state, input),
                hypothesis.transition(hyp_state, input),
            ) {
                pairs.push_back((tree_succ, hyp_succ));
            }
        }
    }
    None
}

/// A table-backed hypothesis automaton, sufficient for checking learner
/// conjectures against a tree. States are dense indices, state 0 is initial.
#[derive(Clone, Debug, Default)]
pub struct TableHypothesis<I, O> {
    states: Vec<TableState<I, O>>,
}

#[derive(Clone, Debug)]
struct TableState<I, O> {
    output: Option<O>,
    outputs: math::Map<I, O>,
    transitions: math::Map<I, usize>,
}

impl<I: Input, O: Output> TableHypothesis<I, O> {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Adds a state with the given Moore output (or DFA acceptance) and
    /// returns its index.
    pub fn add_state(&mut self, output: Option<O>) -> usize {
        self.states.push(TableState {
            output,
            outputs: math::Map::default(),
            transitions: math::Map::default(),
        });
        self.states.len() - 1
    }

    /// Adds a transition, with an optional Mealy output along it.
    pub fn add_transition(&mut self, source: usize, input: I, output: Option<O>, target: usize) {
        debug_assert!(source < self.states.len() && target < self.states.len());
        let state = &mut self.states[source];
        if let Some(output) = output {
            state.outputs.insert(input, output);
        }
        state.transitions.insert(input, target);
    }
}

impl<I: Input, O: Output> Hypothesis<I, O> for TableHypothesis<I, O> {
    type State = usize;

    fn initial(&self) -> usize {
        0
    }

    fn transition(&self, state: usize, input: I) -> Option<usize> {
        self.states[state].transitions.get(&input).copied()
    }

    fn output(&self, state: usize, input: I) -> Option<O> {
        self.states[state].outputs.get(&input).cloned()
    }

    fn state_output(&self, state: usize) -> Option<O> {
        self.states[state].output.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Semantics;

    /// Mealy tree for the parity of 'a's observed so far, plus a hypothesis
    /// that wrongly loops on a single state.
    #[test_log::test]
    fn mealy_mismatch_is_found() {
        let mut tree = ObservationTree::new(vec!['a', 'b'], Semantics::Mealy);
        let root = tree.root();
        let a = tree.add_successor(root, 'a', Observation::Known(true));
        tree.add_successor(a, 'b', Observation::Known(true));
        let aa = tree.add_successor(a, 'a', Observation::Known(false));
        tree.add_successor(aa, 'a', Observation::Known(true));

        let mut hyp = TableHypothesis::new();
        let only = hyp.add_state(None);
        hyp.add_transition(only, 'a', Some(true), only);
        hyp.add_transition(only, 'b', Some(true), only);

        let witness = witness_in_tree_vs_hypothesis(&tree, root, &hyp, hyp.initial());
        // the tree records 'aa' -> false, the hypothesis claims true
        assert_eq!(witness, Some(vec!['a', 'a']));
    }

    #[test]
    fn mealy_consistent_hypothesis_has_no_witness() {
        let mut tree = ObservationTree::new(vec!['a', 'b'], Semantics::Mealy);
        let root = tree.root();
        let a = tree.add_successor(root, 'a', Observation::Known(true));
        let aa = tree.add_successor(a, 'a', Observation::Known(false));
        tree.add_successor(aa, 'a', Observation::Known(true));

        let mut hyp = TableHypothesis::new();
        let even = hyp.add_state(None);
        let odd = hyp.add_state(None);
        hyp.add_transition(even, 'a', Some(true), odd);
        hyp.add_transition(odd, 'a', Some(false), even);

        assert_eq!(
            witness_in_tree_vs_hypothesis(&tree, root, &hyp, hyp.initial()),
            None
        );
    }

    #[test]
    fn partial_hypothesis_branches_are_skipped() {
        let mut tree = ObservationTree::new(vec!['a', 'b'], Semantics::Mealy);
        let root = tree.root();
        let b = tree.add_successor(root, 'b', Observation::Known(true));
        tree.add_successor(b, 'b', Observation::Known(false));

        // no 'b' transition at all: the recorded 'b' branch is not explored
        let mut hyp = TableHypothesis::new();
        let only = hyp.add_state(None);
        hyp.add_transition(only, 'a', Some(true), only);

        assert_eq!(
            witness_in_tree_vs_hypothesis(&tree, root, &hyp, hyp.initial()),
            None
        );
    }

    #[test_log::test]
    fn dfa_acceptance_mismatch() {
        // tree records the language "even number of a's"
        let mut tree = ObservationTree::with_root_output(vec!['a'], Semantics::Dfa, true);
        let root = tree.root();
        let a = tree.add_successor(root, 'a', Observation::Known(false));
        tree.add_successor(a, 'a', Observation::Known(true));

        // hypothesis accepts everything
        let mut hyp = TableHypothesis::new();
        let all = hyp.add_state(Some(true));
        hyp.add_transition(all, 'a', None, all);

        let witness = witness_in_tree_vs_hypothesis(&tree, root, &hyp, hyp.initial());
        assert_eq!(witness, Some(vec!['a']));
    }

    #[test]
    fn unresolved_tree_outputs_never_contradict() {
        let mut tree = ObservationTree::new(vec!['a'], Semantics::Moore);
        let root = tree.root();
        tree.add_successor(root, 'a', Observation::Unknown);

        let mut hyp = TableHypothesis::new();
        let s = hyp.add_state(Some(false));
        hyp.add_transition(s, 'a', None, s);

        assert_eq!(
            witness_in_tree_vs_hypothesis(&tree, root, &hyp, hyp.initial()),
            None
        );
    }
}
