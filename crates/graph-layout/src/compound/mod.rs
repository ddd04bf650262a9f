//! Layouts over nested and grouped vertices
//!
//! [`CompoundFdpLayout`] works on a [`crate::CompoundGraph`] and sizes every
//! compound vertex from its laid-out children. [`GroupingLayout`] partitions a
//! flat graph by `group_id` and runs a separate algorithm per group.

mod fdp;
mod grouping;

pub use fdp::{CompoundFdpLayout, CompoundFdpParameters, CompoundSizing};
pub use grouping::{GroupSettings, GroupingLayout, GroupingParameters};
