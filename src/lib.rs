//! Hierarchical shape key trees.
//!
//! A [`domain::ShapeTree`] keeps groups and shape nodes in a flat, depth
//! tagged pre-order sequence. Mutations validate against placement rules and
//! a shared name registry before touching the sequence, and each node's
//! weight is planned as its influence times its parent's weight.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
