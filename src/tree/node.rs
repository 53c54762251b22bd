use std::fmt::Debug;

use crate::math;

/// Index of a node in the arena backing an [`ObservationTree`](super::ObservationTree).
///
/// Ids are handed out in creation order, so a child always carries a larger id
/// than its parent. Merges never invalidate ids; they only redirect lookups to
/// a representative.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A recorded output, which may not have been resolved by any query yet.
///
/// `Unknown` takes the place of the `None`/`"unknown"` sentinels one would
/// otherwise mix into the output domain. It never proves inequality: two
/// observations are in conflict only when both are resolved and differ.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Observation<O> {
    Unknown,
    Known(O),
}

impl<O> Observation<O> {
    pub fn is_known(&self) -> bool {
        matches!(self, Observation::Known(_))
    }

    pub fn as_known(&self) -> Option<&O> {
        match self {
            Observation::Unknown => None,
            Observation::Known(o) => Some(o),
        }
    }

    /// Two observations are locally incompatible iff both are resolved and unequal.
    pub fn incompatible_with(&self, other: &Self) -> bool
    where
        O: Eq,
    {
        match (self, other) {
            (Observation::Known(left), Observation::Known(right)) => left != right,
            _ => false,
        }
    }
}

impl<O: Debug> Debug for Observation<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Observation::Unknown => write!(f, "?"),
            Observation::Known(o) => write!(f, "{o:?}"),
        }
    }
}

impl<O> From<Option<O>> for Observation<O> {
    fn from(value: Option<O>) -> Self {
        match value {
            Some(o) => Observation::Known(o),
            None => Observation::Unknown,
        }
    }
}

/// One node of an observation tree, one per distinct access sequence reached
/// during learning.
///
/// The `output` is the observation made on *entering* this node, which serves
/// as the Moore/DFA state output and doubles as the Mealy output of the
/// transition leading here. The parent link is a non-owning back-reference.
#[derive(Clone, Debug)]
pub struct Node<I, O> {
    pub(crate) output: Observation<O>,
    pub(crate) successors: math::Map<I, NodeId>,
    pub(crate) parent: Option<(NodeId, I)>,
    pub(crate) access: Vec<I>,
    pub(crate) leads_to_known: bool,
}

impl<I, O> Node<I, O> {
    pub(crate) fn new(parent: Option<(NodeId, I)>, access: Vec<I>, output: Observation<O>) -> Self {
        let leads_to_known = output.is_known();
        Self {
            output,
            successors: math::Map::default(),
            parent,
            access,
            leads_to_known,
        }
    }

    pub fn output(&self) -> &Observation<O> {
        &self.output
    }

    /// The mapping from input symbol to successor node, as recorded. Lookups
    /// on a tree that has seen merges should go through
    /// [`ObservationTree::get_successor`](super::ObservationTree::get_successor)
    /// instead, which resolves representatives.
    pub fn successors(&self) -> &math::Map<I, NodeId> {
        &self.successors
    }

    pub fn parent(&self) -> Option<(NodeId, &I)> {
        self.parent.as_ref().map(|(p, i)| (*p, i))
    }

    /// The sequence of inputs leading from the root to this node.
    pub fn access_sequence(&self) -> &[I] {
        &self.access
    }

    /// Whether some node in this node's subtree (itself included) carries a
    /// resolved output. Branches where this is `false` carry no evidence and
    /// are pruned by the compatibility sandbox.
    pub fn leads_to_known(&self) -> bool {
        self.leads_to_known
    }
}
