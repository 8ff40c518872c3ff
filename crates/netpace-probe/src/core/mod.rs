//! Pure transformations for HTTP probing.
//!
//! Nothing in this module performs I/O: URL targets, status and method
//! classification, and transfer-size derivation.

mod target;
mod transfer;
mod validation;

pub use target::{Target, TargetHost};
pub use transfer::{is_chunked, transfer_size, TransferFacts, CHUNKED_EMPTY_TRANSFER_PADDING};
pub use validation::{is_success, is_write_method};
