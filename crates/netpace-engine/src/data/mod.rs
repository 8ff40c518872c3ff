//! Configuration and result types for the engines.
//!
//! Everything here is plain data: validated once by the engine constructors
//! and never mutated while an engine runs.

pub mod config;
pub mod direction;
pub mod verdict;

pub use config::{
    ChannelConfig, ChannelFailureHook, ChannelTimingHook, LoadConfig, LoadHooks,
    ReachabilityOptions,
};
pub use direction::Direction;
pub use verdict::{Outcome, ReachabilityResult};
