pub use lighthouse_metrics::*;

lazy_static! {
    pub static ref TASK_EXECUTOR_SPAWNED_TASKS: Result<IntCounter> = try_create_int_counter(
        "task_executor_spawned_tasks_total",
        "Total number of tasks spawned through the task executor"
    );
}
