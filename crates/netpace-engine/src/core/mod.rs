//! Pure building blocks: configuration checks, request targets and the
//! exactly-once latch.

mod latch;
mod targets;

pub use latch::FinishedLatch;
pub use targets::{
    channel_url, download_url, target_url, upload_body, validate_load_config, BYTES_PARAM,
    MAX_UPLOAD_CHUNK, UPLOAD_FILLER,
};
