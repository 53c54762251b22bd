use thiserror::Error;
use tracing::warn;

use crate::{Input, Output};

mod node;
pub use node::{Node, NodeId, Observation};

/// The semantics under which outputs recorded in a tree are interpreted.
///
/// Mealy trees carry outputs on transitions (stored on the target node of the
/// transition), Moore and DFA trees carry outputs on the states themselves,
/// with DFA outputs being acceptance booleans.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Semantics {
    Mealy,
    Moore,
    Dfa,
}

impl Semantics {
    /// Mealy semantics compares outputs per input symbol, Moore and DFA
    /// semantics compare the states' own outputs.
    pub fn is_mealy(self) -> bool {
        matches!(self, Semantics::Mealy)
    }
}

/// Error raised when a tree turns out to be malformed. Merge conflicts and
/// missing witnesses are ordinary return values, this is reserved for actual
/// programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("access sequence does not resolve from the root, stuck after {resolved} inputs")]
    UnresolvedAccess { resolved: usize },
}

/// The seam towards the system under learning. One observation is returned
/// per input consumed; an adapter over an incompletely or noisily observable
/// system reports positions it cannot resolve as [`Observation::Unknown`].
pub trait Sul<I, O> {
    fn query(&mut self, word: &[I]) -> Vec<Observation<O>>;
}

impl<I, O, F> Sul<I, O> for F
where
    F: FnMut(&[I]) -> Vec<Observation<O>>,
{
    fn query(&mut self, word: &[I]) -> Vec<Observation<O>> {
        self(word)
    }
}

/// An observation tree: the arena of all [`Node`]s recorded during learning,
/// together with the input alphabet and the output [`Semantics`].
///
/// Absent merges the structure is a strict tree. A merge unions two ids in
/// the internal link structure; all lookups resolve ids to their
/// representative first, so both former ids observe the unified successor
/// set afterwards.
#[derive(Clone, Debug)]
pub struct ObservationTree<I, O> {
    alphabet: Vec<I>,
    semantics: Semantics,
    pub(crate) nodes: Vec<Node<I, O>>,
    link: Vec<NodeId>,
    use_compatibility: bool,
}

impl<I: Input, O: Output> ObservationTree<I, O> {
    /// Creates a tree whose root output is still unresolved.
    pub fn new(alphabet: Vec<I>, semantics: Semantics) -> Self {
        Self {
            alphabet,
            semantics,
            nodes: vec![Node::new(None, vec![], Observation::Unknown)],
            link: vec![NodeId(0)],
            use_compatibility: false,
        }
    }

    /// Creates a tree with a resolved root output, as a Moore or DFA learner
    /// would after its initial query.
    pub fn with_root_output(alphabet: Vec<I>, semantics: Semantics, output: O) -> Self {
        Self {
            alphabet,
            semantics,
            nodes: vec![Node::new(None, vec![], Observation::Known(output))],
            link: vec![NodeId(0)],
            use_compatibility: false,
        }
    }

    /// Enables compatibility-based (speculative merge) reasoning for this
    /// tree, see [`states_are_incompatible`](crate::states_are_incompatible).
    pub fn with_compatibility(mut self) -> Self {
        self.use_compatibility = true;
        self
    }

    pub fn use_compatibility(&self) -> bool {
        self.use_compatibility
    }

    pub fn alphabet(&self) -> &[I] {
        &self.alphabet
    }

    pub fn semantics(&self) -> Semantics {
        self.semantics
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever created, merged ones included.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Resolves an id to its representative. The representative of a merged
    /// class is always the earliest-created member.
    pub fn find(&self, node: NodeId) -> NodeId {
        let mut current = node;
        loop {
            let next = self.link[current.index()];
            if next == current {
                return current;
            }
            current = next;
        }
    }

    pub(crate) fn union(&mut self, keep: NodeId, drop: NodeId) {
        debug_assert!(keep < drop, "representative must be the earlier id");
        self.link[drop.index()] = keep;
    }

    pub fn node(&self, node: NodeId) -> &Node<I, O> {
        &self.nodes[self.find(node).index()]
    }

    pub fn get_successor(&self, node: NodeId, input: I) -> Option<NodeId> {
        let node = self.find(node);
        let succ = *self.nodes[node.index()].successors.get(&input)?;
        Some(self.find(succ))
    }

    /// The output observed along `input` from `node`, i.e. the observation
    /// recorded on the successor. `None` when no successor exists.
    pub fn get_output(&self, node: NodeId, input: I) -> Option<&Observation<O>> {
        let succ = self.get_successor(node, input)?;
        Some(&self.nodes[succ.index()].output)
    }

    pub fn access_sequence(&self, node: NodeId) -> &[I] {
        &self.node(node).access
    }

    /// The input sequence moving from `from` to `to`, or `None` when `to`
    /// does not lie below `from`.
    pub fn transfer_sequence(&self, from: NodeId, to: NodeId) -> Option<Vec<I>> {
        let prefix = self.access_sequence(from);
        self.access_sequence(to)
            .strip_prefix(prefix)
            .map(<[I]>::to_vec)
    }

    /// Follows `word` from the root. Failing to resolve a word that is
    /// supposed to address a node means the tree is malformed.
    pub fn resolve(&self, word: &[I]) -> Result<NodeId, TreeError> {
        let mut current = self.root();
        for (resolved, &input) in word.iter().enumerate() {
            current = self
                .get_successor(current, input)
                .ok_or(TreeError::UnresolvedAccess { resolved })?;
        }
        Ok(current)
    }

    /// Records an output for the successor of `node` along `input`, creating
    /// the successor if necessary, and returns it.
    ///
    /// An already resolved output is never overwritten: a contradicting
    /// observation is dropped with a warning, noise handling belongs to the
    /// SUL adapters.
    pub fn add_successor(&mut self, node: NodeId, input: I, output: Observation<O>) -> NodeId {
        let node = self.find(node);
        if let Some(&succ) = self.nodes[node.index()].successors.get(&input) {
            let succ = self.find(succ);
            if let Observation::Known(output) = output {
                self.observe(succ, output);
            }
            return succ;
        }

        let id = NodeId(self.nodes.len() as u32);
        let mut access = self.nodes[node.index()].access.clone();
        access.push(input);
        self.nodes
            .push(Node::new(Some((node, input)), access, output));
        self.link.push(id);
        self.nodes[node.index()].successors.insert(input, id);
        if self.nodes[id.index()].leads_to_known {
            self.mark_leads_to_known(node);
        }
        id
    }

    /// Resolves the output of `node` to `output` if it is still unknown.
    pub fn observe(&mut self, node: NodeId, output: O) {
        let node = self.find(node);
        match &self.nodes[node.index()].output {
            Observation::Unknown => {
                self.nodes[node.index()].output = Observation::Known(output);
                self.mark_leads_to_known(node);
            }
            Observation::Known(recorded) if *recorded != output => {
                warn!(
                    "discarding observation {output:?} for {node:?} contradicting recorded {recorded:?}"
                );
            }
            _ => {}
        }
    }

    pub(crate) fn mark_leads_to_known(&mut self, node: NodeId) {
        let mut current = self.find(node);
        loop {
            if self.nodes[current.index()].leads_to_known {
                return;
            }
            self.nodes[current.index()].leads_to_known = true;
            match self.nodes[current.index()].parent {
                Some((parent, _)) => current = self.find(parent),
                None => return,
            }
        }
    }

    /// Issues a live query through the SUL and records every prefix output
    /// into the tree. Returns the observation at the end of `word`. This is
    /// the only operation mutating the authoritative tree from within this
    /// crate.
    pub fn experiment<S: Sul<I, O>>(&mut self, word: &[I], sul: &mut S) -> Observation<O> {
        let outputs = sul.query(word);
        debug_assert_eq!(
            outputs.len(),
            word.len(),
            "SUL must answer one observation per input"
        );
        let mut current = self.root();
        for (&input, output) in word.iter().zip(outputs) {
            current = self.add_successor(current, input, output);
        }
        self.node(current).output.clone()
    }
}
