//! Sustained load and reachability checks built on phased HTTP probes.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Load and reachability configuration, verdicts
//! - [`core`] - Configuration checks, request targets, the exactly-once latch
//! - [`effects`] - The cancelable loop and the engines built on it
//!
//! # Key Features
//!
//! - **No Overlap**: A loop never starts an iteration before the previous one
//!   settled, even across stop and restart
//! - **Independent Channels**: Download and upload run at their own pace; a
//!   failure halts only the channel it happened on
//! - **Exactly-Once Verdicts**: A reachability request and its deadline race to
//!   a single-assignment latch
//! - **Transport Agnostic**: Engines are generic over
//!   [`netpace_probe::Probe`], so tests drive them with stubs

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::{FinishedLatch, MAX_UPLOAD_CHUNK};
pub use data::{
    ChannelConfig, ChannelFailureHook, ChannelTimingHook, Direction, LoadConfig, LoadHooks,
    Outcome, ReachabilityOptions, ReachabilityResult,
};
pub use effects::{
    CancelableLoop, FinishedHook, LoadNetworkEngine, LoopFailureHook, PendingVerdict,
    ReachabilityEngine,
};
pub use error::{Error, Result};
