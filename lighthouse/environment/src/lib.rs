//! Runtime bootstrap shared by every `lighthouse` subcommand: builds the root `slog::Logger`,
//! owns the `tokio` runtime, and hands out `TaskExecutor`s tied to a single process-wide shutdown
//! signal. Exists so `beacon_node/client` and `validator_client` never construct their own
//! runtime or signal handler — there is exactly one per process, built here.

use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::Mutex;
use slog::{o, Drain, Level, Logger};
use std::marker::PhantomData;
use std::sync::Arc;
use task_executor::TaskExecutor;
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};
use types::EthSpec;

#[derive(Debug)]
pub enum Error {
    RuntimeCreationFailed(std::io::Error),
    CtrlCRegistrationFailed(ctrlc::Error),
}

/// Builds terminal logging the way every Lighthouse binary does: async, human-readable,
/// level-filtered.
fn build_root_logger(level: Level) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

pub struct EnvironmentBuilder<E: EthSpec> {
    log_level: Level,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> EnvironmentBuilder<E> {
    pub fn mainnet() -> Self {
        Self {
            log_level: Level::Info,
            _phantom: PhantomData,
        }
    }

    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn multi_threaded_tokio_runtime(self) -> Result<Self, Error> {
        // The runtime is built lazily in `build()`; this mirrors the teacher's staged builder
        // API without constructing a runtime twice.
        Ok(self)
    }

    pub fn build(self) -> Result<Environment<E>, Error> {
        let log = build_root_logger(self.log_level);

        let runtime = RuntimeBuilder::new_multi_thread()
            .enable_all()
            .thread_name("lighthouse-tokio")
            .build()
            .map_err(Error::RuntimeCreationFailed)?;

        let (signal, exit) = exit_future::signal();
        let (signal_tx, signal_rx) = mpsc::channel(1);

        Ok(Environment {
            runtime: Arc::new(runtime),
            log,
            signal: Some(signal),
            signal_rx: Some(signal_rx),
            exit,
            signal_tx,
            _phantom: PhantomData,
        })
    }
}

/// Owns the process's single `tokio` `Runtime` and shutdown signal. Every `TaskExecutor` handed
/// out from here shares the same runtime and dies on the same signal (`common/task_executor`'s
/// whole reason for existing).
pub struct Environment<E: EthSpec> {
    runtime: Arc<Runtime>,
    log: Logger,
    signal: Option<exit_future::Signal>,
    signal_rx: Option<mpsc::Receiver<&'static str>>,
    exit: exit_future::Exit,
    signal_tx: mpsc::Sender<&'static str>,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> Environment<E> {
    pub fn core_context(&self) -> RuntimeContext<E> {
        RuntimeContext {
            executor: TaskExecutor::new(
                Arc::downgrade(&self.runtime),
                self.exit.clone(),
                self.log.clone(),
                self.signal_tx.clone(),
            ),
            _phantom: PhantomData,
        }
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Registers a Ctrl+C handler and blocks until either it fires or a task signals shutdown
    /// through `TaskExecutor`'s `signal_tx`.
    pub fn block_until_shutdown_requested(&mut self) -> Result<&'static str, Error> {
        let (ctrlc_tx, mut ctrlc_rx) = mpsc::channel(1);
        let mut ctrlc_tx = ctrlc_tx;
        let ctrlc_tx_cell = Mutex::new(Some(()));
        ctrlc::set_handler(move || {
            if ctrlc_tx_cell.lock().take().is_some() {
                let _ = ctrlc_tx.try_send("Ctrl+C");
            }
        })
        .map_err(Error::CtrlCRegistrationFailed)?;

        let mut signal_rx = self
            .signal_rx
            .take()
            .expect("block_until_shutdown_requested called more than once");

        Ok(self.runtime.block_on(async move {
            futures::select! {
                reason = ctrlc_rx.next() => reason.unwrap_or("Ctrl+C"),
                reason = signal_rx.next() => reason.unwrap_or("shutdown requested"),
            }
        }))
    }

    /// Fires the shutdown signal every `TaskExecutor` spawned from this environment is racing
    /// against.
    pub fn fire_signal(&mut self) {
        if let Some(signal) = self.signal.take() {
            let _ = signal.fire();
        }
    }
}

/// A cheaply-clonable handle a subcommand threads through whatever it builds (`ClientBuilder`,
/// `ValidatorClient`), narrower than `Environment` so those constructors don't need the runtime
/// or the shutdown signal's producing half.
#[derive(Clone)]
pub struct RuntimeContext<E: EthSpec> {
    pub executor: TaskExecutor,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> RuntimeContext<E> {
    pub fn executor(&self) -> TaskExecutor {
        self.executor.clone()
    }

    pub fn log(&self) -> &Logger {
        self.executor.log()
    }
}
