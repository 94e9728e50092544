pub mod task_lifecycle;
pub mod transition;

pub use task_lifecycle::TaskLifecycleController;
pub use transition::{apply_run_status, Transition};
