//! Apartness and compatibility checking over observation trees.
//!
//! This crate implements the state-equivalence reasoning that underlies
//! L#-style active automata learning: deciding whether two states recorded in
//! a growing [`ObservationTree`] are provably distinct (*apart*), or whether
//! under incomplete evidence they can still be unified without contradiction
//! (*compatible*). The surrounding learning loop, the query scheduling and
//! the SUL adapters are not part of this crate; they plug in through the
//! [`Sul`] and [`Hypothesis`] seams.
#![allow(missing_docs)]

use std::fmt::Debug;
use std::hash::Hash;

pub mod math;

pub mod tree;
pub use tree::{Node, NodeId, Observation, ObservationTree, Semantics, Sul, TreeError};

mod apartness;
pub use apartness::{compute_witness, states_are_apart};

mod distinguish;
pub use distinguish::{distinguishing_sequences, DistinguishingSequences};

mod hypothesis;
pub use hypothesis::{witness_in_tree_vs_hypothesis, Hypothesis, TableHypothesis};

mod compatibility;
pub use compatibility::{merge, merge_conflict, states_are_incompatible, MergeConflict};

/// An input symbol of the learning alphabet.
pub trait Input: Copy + Eq + Hash + Debug {}
impl<T: Copy + Eq + Hash + Debug> Input for T {}

/// An output label produced by the system under learning. For DFA semantics
/// this is simply `bool`.
pub trait Output: Clone + Eq + Hash + Debug {}
impl<T: Clone + Eq + Hash + Debug> Output for T {}
