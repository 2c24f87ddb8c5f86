//! A `tokio::runtime::Handle` bundled with the node's shutdown signal and root logger, so every
//! background task (peer pool housekeeping, sync manager, slot-timer) is spawned the same way and
//! dies together when the node shuts down, rather than each component rolling its own runtime
//! handle and panic-on-drop semantics.

#[macro_use]
extern crate lazy_static;

mod metrics;

use futures::channel::mpsc;
use futures::future::{Future, FutureExt};
use slog::{crit, debug, o, Logger};
use std::sync::Weak;
use tokio::runtime::Handle;

#[derive(Clone)]
pub struct TaskExecutor {
    handle: Weak<Handle>,
    exit: exit_future::Exit,
    signal_tx: mpsc::Sender<&'static str>,
    log: Logger,
}

impl TaskExecutor {
    pub fn new(
        handle: Weak<Handle>,
        exit: exit_future::Exit,
        log: Logger,
        signal_tx: mpsc::Sender<&'static str>,
    ) -> Self {
        Self {
            handle,
            exit,
            signal_tx,
            log,
        }
    }

    /// Spawns `task` on the runtime, silently dropping it once `exit` fires. Used for tasks whose
    /// result nobody needs to observe (most background loops).
    pub fn spawn<F>(&self, task: F, name: &'static str)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(handle) = self.handle.upgrade() {
            metrics::inc_counter(&metrics::TASK_EXECUTOR_SPAWNED_TASKS);
            let exit = self.exit.clone();
            let log = self.log.new(o!("task" => name));
            handle.spawn(async move {
                futures::pin_mut!(task);
                match futures::future::select(task, exit).await {
                    futures::future::Either::Left(_) => debug!(log, "Task completed"; "task" => name),
                    futures::future::Either::Right(_) => debug!(log, "Task shutdown"; "task" => name),
                }
            });
        } else {
            crit!(self.log, "Couldn't spawn task, runtime gone"; "task" => name);
        }
    }

    /// Like [`spawn`](Self::spawn), but tells the whole node to shut down if `task` itself signals
    /// a fatal error — used for tasks whose failure means the node can no longer make progress
    /// (e.g. losing the database).
    pub fn spawn_handle<F>(
        &self,
        task: F,
        name: &'static str,
    ) -> Option<tokio::task::JoinHandle<Option<F::Output>>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.handle.upgrade()?;
        metrics::inc_counter(&metrics::TASK_EXECUTOR_SPAWNED_TASKS);
        let exit = self.exit.clone();
        let log = self.log.new(o!("task" => name));
        Some(handle.spawn(async move {
            futures::pin_mut!(task);
            match futures::future::select(task, exit).await {
                futures::future::Either::Left((output, _)) => Some(output),
                futures::future::Either::Right(_) => {
                    debug!(log, "Task shutdown before completion"; "task" => name);
                    None
                }
            }
        }))
    }

    /// Runs `task` on the runtime's blocking thread pool, for CPU-heavy work (BLS verification,
    /// state transition) that must not stall the async executor. Unlike `spawn`, this is not
    /// cancelled on shutdown: a blocking closure can't be polled for cancellation once started.
    pub fn spawn_blocking<F>(&self, task: F, name: &'static str)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(handle) = self.handle.upgrade() {
            metrics::inc_counter(&metrics::TASK_EXECUTOR_SPAWNED_TASKS);
            let log = self.log.new(o!("task" => name));
            handle.spawn_blocking(move || {
                task();
                debug!(log, "Blocking task completed"; "task" => name);
            });
        } else {
            crit!(self.log, "Couldn't spawn blocking task, runtime gone"; "task" => name);
        }
    }

    pub fn runtime_handle(&self) -> Option<std::sync::Arc<Handle>> {
        self.handle.upgrade()
    }

    pub fn exit(&self) -> exit_future::Exit {
        self.exit.clone()
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    /// Tells the node to begin shutting down, giving `reason` as the cause (surfaced in logs and
    /// in the process exit path).
    pub fn shutdown(&mut self, reason: &'static str) {
        if let Err(e) = self.signal_tx.try_send(reason) {
            crit!(self.log, "Failed to send shutdown signal"; "error" => %e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn spawned_task_runs_before_exit() {
        let handle = Arc::new(Handle::current());
        let (signal, exit) = exit_future::signal();
        let (tx, _rx) = mpsc::channel(1);
        let log = slog::Logger::root(slog::Discard, o!());
        let executor = TaskExecutor::new(Arc::downgrade(&handle), exit, log, tx);

        let (done_tx, done_rx) = futures::channel::oneshot::channel();
        executor.spawn(
            async move {
                done_tx.send(()).ok();
            },
            "test",
        );

        done_rx.await.unwrap();
        drop(signal);
    }
}
