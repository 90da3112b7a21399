//! Domain model (IDs, task records, run accounting).

pub mod ids;
pub mod run;
pub mod task;

pub use ids::{Id, IdMarker, OrgId, RunId, TaskId, UserId};
pub use run::{QueuedRun, RunMeta, RunStatus, RunningEntry};
pub use task::{StoreTask, TaskSearchParams};
