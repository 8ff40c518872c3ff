//! I/O operations for HTTP probing.
//!
//! Resolution, connection establishment and the HTTP exchange live here,
//! each behind the smallest seam that lets tests substitute it: [`Resolve`]
//! for name lookup and [`Probe`] for a whole request.

mod client;
mod connect;
mod probe;
mod resolve;

pub use client::PhasedHttpClient;
pub use probe::Probe;
pub use resolve::{Resolve, SystemResolver};
