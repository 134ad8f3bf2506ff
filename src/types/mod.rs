mod config;
mod notification_log;
mod report;
mod state;

pub use config::UploadConfig;
pub use notification_log::{NotificationLog, NotificationSink};
pub use report::{UploadOutcome, UploadReport};
pub use state::{SessionState, TimeoutKind};
