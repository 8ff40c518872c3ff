//! Engines that drive probe requests: the cancelable loop, the load engine and
//! the reachability check.

mod cancelable_loop;
mod load;
mod reachability;

pub use cancelable_loop::{CancelableLoop, LoopFailureHook};
pub use load::LoadNetworkEngine;
pub use reachability::{FinishedHook, PendingVerdict, ReachabilityEngine};
