//! Domain models for Leadflow Core

pub mod actor;
pub mod common;
pub mod duplicate;
pub mod lead;
pub mod rule;
pub mod snapshot;
pub mod team;

pub use actor::*;
pub use common::*;
pub use duplicate::*;
pub use lead::*;
pub use rule::*;
pub use snapshot::*;
pub use team::*;
