//! Request handlers.

pub mod download;
pub mod health;
pub mod jobs;
pub mod merge;
pub mod queue;

pub use download::download_output;
pub use health::health;
pub use jobs::get_status;
pub use merge::submit_merge;
pub use queue::{add_to_queue, clear_queue, get_queue};
