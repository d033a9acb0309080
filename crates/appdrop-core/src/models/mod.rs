pub mod error;
pub mod format;
pub mod task;
pub mod timestamp;

pub use error::{CoreError, CoreErrorKind};
pub use format::{PackageFormat, app_name, package_stem, unrecognized_suffix};
pub use task::{Task, TaskId, TaskRecord, TaskStatus, UNKNOWN_CONTENT_HASH};
