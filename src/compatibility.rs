use std::collections::VecDeque;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::apartness::states_are_apart;
use crate::tree::{NodeId, Observation, ObservationTree, Sul};
use crate::{Input, Output};

/// The access sequences of the two nodes whose resolved outputs clash when a
/// speculative merge is attempted. A conflict is a normal return value, not
/// an error; `first` belongs to the earlier-created of the two nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConflict<I> {
    pub first: Vec<I>,
    pub second: Vec<I>,
}

/// Decides whether `first` and `second` are *incompatible*: whether merging
/// them, and transitively everything their subtrees force to merge, would
/// require some node to hold two different resolved outputs.
///
/// Apartness is checked first since it is cheaper than a merge trial and
/// implies incompatibility. The trial itself runs on a pruned clone of the
/// tree, so the authoritative tree is never touched by it. When the trial
/// uncovers a conflict, candidate distinguishing experiments are derived from
/// it and issued through the given SUL in the hope of turning the speculative
/// conflict into directly provable apartness; this is a diagnostic aid for
/// the learner and does not influence the verdict.
pub fn states_are_incompatible<I: Input, O: Output, S: Sul<I, O>>(
    tree: &mut ObservationTree<I, O>,
    sul: &mut S,
    first: NodeId,
    second: NodeId,
) -> bool {
    let first = tree.find(first);
    let second = tree.find(second);
    // a subtree without any resolved output can be merged into anything
    if !tree.node(first).leads_to_known() || !tree.node(second).leads_to_known() {
        return false;
    }
    if !tree.use_compatibility() {
        return states_are_apart(tree, first, second);
    }

    // merges always walk from the later-created id into the earlier one
    let (first, second) = if second < first {
        (second, first)
    } else {
        (first, second)
    };

    if states_are_apart(tree, first, second) {
        return true;
    }

    let Some(conflict) = merge_conflict(tree, first, second) else {
        return false;
    };
    debug!(
        "conflict merging {first:?} and {second:?}, clashing at {:?} / {:?}",
        conflict.first, conflict.second
    );
    suggest_experiments(tree, sul, first, second, &conflict);
    true
}

/// The pure verdict underlying [`states_are_incompatible`]: runs the merge
/// trial in a sandbox and reports the conflict, without issuing experiments.
/// `None` means the states are compatible on current evidence.
pub fn merge_conflict<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
    first: NodeId,
    second: NodeId,
) -> Option<MergeConflict<I>> {
    if !tree.node(first).leads_to_known() || !tree.node(second).leads_to_known() {
        return None;
    }
    let mut sandbox = known_subtree_clone(tree);
    // both candidates carry evidence, so pruning kept their access paths
    let first = sandbox
        .resolve(tree.access_sequence(first))
        .expect("evidence-bearing node must survive pruning");
    let second = sandbox
        .resolve(tree.access_sequence(second))
        .expect("evidence-bearing node must survive pruning");
    merge(&mut sandbox, first, second)
}

/// Merges `second` into `first`, transitively merging every pair of
/// successors that would otherwise make the resulting automaton
/// nondeterministic. On success the two ids denote the same logical state
/// and all subsequent lookups through either observe the unified successor
/// set. On conflict the merge is abandoned part-way; callers that need the
/// tree intact run it on a sandbox, see [`merge_conflict`].
///
/// Merging a node with itself is a no-op and never conflicts.
pub fn merge<I: Input, O: Output>(
    tree: &mut ObservationTree<I, O>,
    first: NodeId,
    second: NodeId,
) -> Option<MergeConflict<I>> {
    let alphabet = tree.alphabet().to_vec();
    let mut worklist = VecDeque::from([(first, second)]);

    while let Some((left, right)) = worklist.pop_front() {
        let left = tree.find(left);
        let right = tree.find(right);
        if left == right {
            continue;
        }
        // normalize toward the earlier id; children are allocated after
        // their parents, so the representative is never below the absorbed node
        let (keep, drop) = if left < right { (left, right) } else { (right, left) };
        trace!("merging {drop:?} into {keep:?}");

        match (
            &tree.nodes[keep.index()].output,
            &tree.nodes[drop.index()].output,
        ) {
            (Observation::Known(a), Observation::Known(b)) if a != b => {
                return Some(MergeConflict {
                    first: tree.nodes[keep.index()].access.clone(),
                    second: tree.nodes[drop.index()].access.clone(),
                });
            }
            (Observation::Unknown, Observation::Known(_)) => {
                let adopted = tree.nodes[drop.index()].output.clone();
                tree.nodes[keep.index()].output = adopted;
                tree.mark_leads_to_known(keep);
            }
            _ => {}
        }

        let mut dropped = std::mem::take(&mut tree.nodes[drop.index()].successors);
        tree.union(keep, drop);
        for &input in &alphabet {
            let Some(succ) = dropped.remove(&input) else {
                continue;
            };
            match tree.nodes[keep.index()].successors.get(&input) {
                // colliding successors with distinct identities force a merge
                Some(&existing) if tree.find(existing) != tree.find(succ) => {
                    worklist.push_back((existing, succ));
                }
                Some(_) => {}
                None => {
                    tree.nodes[keep.index()].successors.insert(input, succ);
                }
            }
        }
    }
    None
}

/// Deep-clones the evidence-bearing part of the tree into a private sandbox,
/// dropping every branch whose subtree has no resolved output. Uses an
/// explicit stack, deep trees must not exhaust the call stack.
fn known_subtree_clone<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
) -> ObservationTree<I, O> {
    let mut sandbox = ObservationTree::new(tree.alphabet().to_vec(), tree.semantics());
    if let Observation::Known(output) = tree.node(tree.root()).output() {
        sandbox.observe(sandbox.root(), output.clone());
    }
    let mut stack = vec![(tree.root(), sandbox.root())];
    while let Some((original, copy)) = stack.pop() {
        for &input in tree.alphabet() {
            let Some(succ) = tree.get_successor(original, input) else {
                continue;
            };
            if !tree.node(succ).leads_to_known() {
                continue;
            }
            let cloned = sandbox.add_successor(copy, input, tree.node(succ).output().clone());
            stack.push((succ, cloned));
        }
    }
    sandbox
}

/// Derives candidate distinguishing experiments from a merge conflict and
/// issues them through the SUL: the transfer sequence between the compared
/// nodes, extended backward with suffixes of the conflicting access
/// sequences. This assumes the first candidate is a suffix of the second
/// access sequence; the assumption is a heuristic carried from observed
/// learner behavior, so growth is bounded and bailing out only costs
/// diagnostics.
fn suggest_experiments<I: Input, O: Output, S: Sul<I, O>>(
    tree: &mut ObservationTree<I, O>,
    sul: &mut S,
    first: NodeId,
    second: NodeId,
    conflict: &MergeConflict<I>,
) {
    let Some(transfer) = tree.transfer_sequence(first, second) else {
        debug!("compared nodes are not ancestor-related, no experiments derived");
        return;
    };
    if transfer.is_empty() {
        debug!("empty transfer sequence, backward growth would not converge");
        return;
    }

    let skip = tree.access_sequence(first).len().min(conflict.first.len());
    let mut candidate: Vec<I> = transfer
        .iter()
        .chain(&conflict.first[skip..])
        .copied()
        .collect();

    let mut candidates = Vec::new();
    while candidate != conflict.second {
        if candidate.len() > conflict.second.len() {
            debug!("candidate outgrew the conflicting access sequence, stopping");
            break;
        }
        candidates.push(candidate.clone());
        candidate = transfer.iter().copied().chain(candidate).collect();
    }

    debug!(
        "issuing {} apartness candidate experiments: {}",
        candidates.len(),
        candidates.iter().map(|word| format!("{word:?}")).join(", ")
    );
    for word in candidates {
        tree.experiment(&word, sul);
    }
    if states_are_apart(tree, first, second) {
        debug!("{first:?} and {second:?} are apart after suggested experiments");
    }
}
