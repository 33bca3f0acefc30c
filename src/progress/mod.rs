pub mod gate;
pub mod record;
pub mod rollup;
pub mod service;

pub use record::{ItemType, ProgressRecord, ProgressStatus, ProgressUpdate};
pub use service::ProgressService;
