//! Domain model (ids, kinds, statuses, errors, records).

pub mod errors;
pub mod ids;
pub mod state;
pub mod task;

pub use errors::{ErrorKind, TaskError};
pub use ids::TaskId;
pub use state::TaskStatus;
pub use task::{CRITICAL_PRIORITY_OFFSET, TaskBody, TaskKind, TaskMeta, TaskRecord, TaskSpec};
