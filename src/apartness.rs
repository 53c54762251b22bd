use std::collections::VecDeque;

use tracing::trace;

use crate::tree::{NodeId, ObservationTree};
use crate::{Input, Output};

/// Checks whether two states of the tree are *apart*, i.e. provably
/// distinguishable by some input sequence along which both have a resolved
/// output and the outputs differ.
pub fn states_are_apart<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
    first: NodeId,
    second: NodeId,
) -> bool {
    apart_destination(tree, first, second).is_some()
}

/// Computes a witness for the apartness of `first` and `second`: an input
/// sequence which, replayed from either state, ends in two resolved and
/// unequal outputs. Returns `None` when the states are not apart.
pub fn compute_witness<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
    first: NodeId,
    second: NodeId,
) -> Option<Vec<I>> {
    let destination = apart_destination(tree, first, second)?;
    tree.transfer_sequence(first, destination)
}

/// Returns the node below `first` at which the output divergence shows up,
/// which the tree translates into an input sequence for witness extraction.
fn apart_destination<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
    first: NodeId,
    second: NodeId,
) -> Option<NodeId> {
    if tree.semantics().is_mealy() {
        apart_destination_mealy(tree, first, second)
    } else {
        apart_destination_moore(tree, first, second)
    }
}

// BFS over pairs of nodes. No visited set is needed: both components of a
// pair strictly descend the finite tree, so the queue drains.
fn apart_destination_mealy<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
    first: NodeId,
    second: NodeId,
) -> Option<NodeId> {
    let mut pairs = VecDeque::from([(first, second)]);

    while let Some((left, right)) = pairs.pop_front() {
        for &input in tree.alphabet() {
            let (Some(left_succ), Some(right_succ)) = (
                tree.get_successor(left, input),
                tree.get_successor(right, input),
            ) else {
                continue;
            };
            let left_out = tree.node(left_succ).output();
            let right_out = tree.node(right_succ).output();
            if left_out.incompatible_with(right_out) {
                trace!("{left:?} and {right:?} diverge on {input:?}: {left_out:?} vs {right_out:?}");
                return Some(left_succ);
            }
            pairs.push_back((left_succ, right_succ));
        }
    }
    None
}

// Moore and DFA semantics compare the pair's own outputs before expanding,
// so a divergence at the compared states themselves yields an empty witness.
fn apart_destination_moore<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
    first: NodeId,
    second: NodeId,
) -> Option<NodeId> {
    let mut pairs = VecDeque::from([(first, second)]);

    while let Some((left, right)) = pairs.pop_front() {
        let left_out = tree.node(left).output();
        let right_out = tree.node(right).output();
        if left_out.incompatible_with(right_out) {
            trace!("{left:?} and {right:?} diverge: {left_out:?} vs {right_out:?}");
            return Some(left);
        }
        for &input in tree.alphabet() {
            if let (Some(left_succ), Some(right_succ)) = (
                tree.get_successor(left, input),
                tree.get_successor(right, input),
            ) {
                pairs.push_back((left_succ, right_succ));
            }
        }
    }
    None
}
