use std::collections::VecDeque;

use crate::math;
use crate::tree::{NodeId, ObservationTree};
use crate::{Input, Output};

/// Lazily enumerates input sequences that split `group` into at least two
/// resolved output classes, in order of increasing length.
///
/// The traversal is breadth-first over access-sequence length and only ever
/// expands as far as the caller drives the iterator, since the search space
/// is exponential in alphabet size and depth. The iterator is consumed by a
/// single traversal and is not restartable.
///
/// Under `pessimistic`, Moore/DFA-style enumeration is disabled entirely and
/// the iterator yields nothing; conservative learning configurations use this
/// to refuse proactive apartness assumptions under incomplete evidence.
/// Mealy enumeration is unaffected by the flag.
pub fn distinguishing_sequences<I: Input, O: Output>(
    tree: &ObservationTree<I, O>,
    group: impl IntoIterator<Item = NodeId>,
    pessimistic: bool,
) -> DistinguishingSequences<'_, I, O> {
    let mut queue = VecDeque::new();
    if tree.semantics().is_mealy() || !pessimistic {
        queue.push_back((Vec::new(), group.into_iter().collect()));
    }
    DistinguishingSequences {
        tree,
        queue,
        pending: VecDeque::new(),
    }
}

/// See [`distinguishing_sequences`].
pub struct DistinguishingSequences<'a, I, O> {
    tree: &'a ObservationTree<I, O>,
    queue: VecDeque<(Vec<I>, Vec<NodeId>)>,
    pending: VecDeque<Vec<I>>,
}

impl<I: Input, O: Output> Iterator for DistinguishingSequences<'_, I, O> {
    type Item = Vec<I>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(word) = self.pending.pop_front() {
                return Some(word);
            }
            let (access, group) = self.queue.pop_front()?;
            if self.tree.semantics().is_mealy() {
                self.expand_mealy(access, group);
            } else {
                self.expand_moore(access, group);
            }
        }
    }
}

impl<I: Input, O: Output> DistinguishingSequences<'_, I, O> {
    // Splits are detected per input symbol: the valid subgroup holds the
    // nodes whose output along the input is recorded at all, the split test
    // only counts resolved outputs.
    fn expand_mealy(&mut self, access: Vec<I>, group: Vec<NodeId>) {
        let tree = self.tree;
        for &input in tree.alphabet() {
            let successors: Vec<NodeId> = group
                .iter()
                .filter_map(|&node| tree.get_successor(node, input))
                .collect();
            if successors.len() < 2 {
                continue;
            }
            let mut word = access.clone();
            word.push(input);
            let outputs: math::Set<&O> = successors
                .iter()
                .filter_map(|&node| tree.node(node).output().as_known())
                .collect();
            if outputs.len() >= 2 {
                self.pending.push_back(word.clone());
            }
            self.queue.push_back((word, successors));
        }
    }

    // The valid subgroup filters on evidence-bearing nodes; the current
    // access sequence itself is the split witness, then the group is expanded
    // along every symbol regardless of whether it split here.
    fn expand_moore(&mut self, access: Vec<I>, group: Vec<NodeId>) {
        let tree = self.tree;
        let valid: Vec<NodeId> = group
            .into_iter()
            .filter(|&node| tree.node(node).leads_to_known())
            .collect();
        if valid.len() < 2 {
            return;
        }
        let outputs: math::Set<&O> = valid
            .iter()
            .filter_map(|&node| tree.node(node).output().as_known())
            .collect();
        if outputs.len() >= 2 {
            self.pending.push_back(access.clone());
        }
        for &input in tree.alphabet() {
            let successors: Vec<NodeId> = valid
                .iter()
                .filter_map(|&node| tree.get_successor(node, input))
                .collect();
            let mut word = access.clone();
            word.push(input);
            self.queue.push_back((word, successors));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Observation, Semantics};
    use itertools::Itertools;

    fn uniform_moore_tree(depth: usize) -> (ObservationTree<char, bool>, Vec<NodeId>) {
        let mut tree = ObservationTree::with_root_output(vec!['a', 'b'], Semantics::Moore, true);
        let mut level = vec![tree.root()];
        for _ in 0..depth {
            let mut next = Vec::new();
            for &node in &level {
                for input in ['a', 'b'] {
                    next.push(tree.add_successor(node, input, Observation::Known(true)));
                }
            }
            level = next;
        }
        (tree, level)
    }

    #[test]
    fn uniform_group_yields_nothing() {
        let (tree, _) = uniform_moore_tree(3);
        let group = vec![
            tree.resolve(&[]).unwrap(),
            tree.resolve(&['a']).unwrap(),
            tree.resolve(&['b', 'a']).unwrap(),
        ];
        assert_eq!(distinguishing_sequences(&tree, group, false).count(), 0);
    }

    #[test]
    fn moore_split_at_current_depth() {
        let mut tree = ObservationTree::with_root_output(vec!['a', 'b'], Semantics::Moore, false);
        let p = tree.root();
        let q = tree.add_successor(p, 'b', Observation::Known(true));
        // p=false and q=true split immediately, the witness is empty
        let first = distinguishing_sequences(&tree, [p, q], false).next();
        assert_eq!(first, Some(vec![]));
    }

    #[test]
    fn moore_split_one_level_down() {
        let mut tree = ObservationTree::with_root_output(vec!['a', 'b'], Semantics::Moore, false);
        let p = tree.root();
        let q = tree.add_successor(p, 'a', Observation::Known(false));
        tree.add_successor(p, 'b', Observation::Known(true));
        tree.add_successor(q, 'b', Observation::Known(false));
        // p and q agree (both false), their b-successors disagree
        let witnesses = distinguishing_sequences(&tree, [p, q], false).collect_vec();
        assert_eq!(witnesses, vec![vec!['b']]);
    }

    #[test_log::test]
    fn pessimistic_moore_never_yields() {
        let mut tree = ObservationTree::with_root_output(vec!['a', 'b'], Semantics::Moore, false);
        let p = tree.root();
        let q = tree.add_successor(p, 'b', Observation::Known(true));
        assert!(states_split(&tree, p, q));
        assert_eq!(distinguishing_sequences(&tree, [p, q], true).next(), None);
    }

    fn states_split(tree: &ObservationTree<char, bool>, p: NodeId, q: NodeId) -> bool {
        distinguishing_sequences(tree, [p, q], false).next().is_some()
    }

    #[test]
    fn mealy_split_counts_edge_outputs() {
        let mut tree = ObservationTree::new(vec!['a', 'b'], Semantics::Mealy);
        let root = tree.root();
        let x = tree.add_successor(root, 'a', Observation::Known(false));
        let y = tree.add_successor(root, 'b', Observation::Known(false));
        tree.add_successor(x, 'a', Observation::Known(true));
        tree.add_successor(y, 'a', Observation::Known(false));

        let witnesses = distinguishing_sequences(&tree, [x, y], false).collect_vec();
        assert_eq!(witnesses, vec![vec!['a']]);
        // pessimistic only disables Moore-style enumeration
        let witnesses = distinguishing_sequences(&tree, [x, y], true).collect_vec();
        assert_eq!(witnesses, vec![vec!['a']]);
    }

    #[test]
    fn unknown_outputs_do_not_split() {
        let mut tree = ObservationTree::new(vec!['a'], Semantics::Mealy);
        let root = tree.root();
        let x = tree.add_successor(root, 'a', Observation::Known(false));
        let y = tree.add_successor(x, 'a', Observation::Known(false));
        tree.add_successor(y, 'a', Observation::Unknown);
        // x/a and y/a resolve to false and Unknown, a single resolved class
        assert_eq!(distinguishing_sequences(&tree, [x, y], false).count(), 0);
    }

    #[test]
    fn yields_in_order_of_increasing_length() {
        let mut tree = ObservationTree::with_root_output(vec!['a'], Semantics::Moore, false);
        let p = tree.root();
        let q = tree.add_successor(p, 'a', Observation::Known(true));
        let r = tree.add_successor(q, 'a', Observation::Known(false));
        tree.add_successor(r, 'a', Observation::Known(true));
        // {p, q} splits at depth 0 and again at every deeper level
        let witnesses = distinguishing_sequences(&tree, [p, q], false)
            .take(3)
            .collect_vec();
        assert!(witnesses
            .iter()
            .tuple_windows()
            .all(|(shorter, longer)| shorter.len() <= longer.len()));
        assert_eq!(witnesses[0], Vec::<char>::new());
    }
}
