//! A user-level cooperative task library: two kernel worker threads
//! (C-EXEC for compute, I-EXEC for blocking I/O) drive any number of
//! stackful coroutine "tasks" through FIFO READY/WAIT queues. Grounded on
//! the original course skeleton's pthread + ucontext + semaphore design,
//! reworked per its own design notes onto `Mutex`/`Condvar` queues and the
//! `generator` crate for stack switching.
//!
//! Task bodies call the free functions in [`task`] ([`task::open`],
//! [`task::read`], [`task::write`], [`task::close`], [`task::yield_now`],
//! [`task::exit`]) directly, the same way the original's global `sut_*`
//! functions worked — no context parameter to thread through.

mod executor;
mod io;
mod queue;
pub mod task;

use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use crate::config::UtlConfig;
use crate::error::UtlError;

use executor::Shared;
pub use task::{close, exit, open, read, write, yield_now};

/// A running scheduler: two live executor threads plus the shared task
/// table and queues they drive. Dropping this without calling
/// [`Utl::shutdown`] leaves the worker threads running; `shutdown` is the
/// only clean way to stop them.
pub struct Utl {
    shared: Arc<Shared>,
    handles: Option<executor::Handles>,
}

impl Utl {
    /// Starts the two executor threads and returns a handle to the running
    /// scheduler. Mirrors the original `sut_init()`.
    pub fn init(config: UtlConfig) -> Self {
        let shared = Arc::new(Shared::new(&config));

        let c_shared = shared.clone();
        let c_exec = thread::Builder::new()
            .name("c-exec".into())
            .spawn(move || executor::c_exec_loop(c_shared))
            .expect("failed to spawn c-exec thread");

        let i_shared = shared.clone();
        let i_exec = thread::Builder::new()
            .name("i-exec".into())
            .spawn(move || executor::i_exec_loop(i_shared))
            .expect("failed to spawn i-exec thread");

        info!(max_tasks = shared.max_tasks(), "utl scheduler initialized");
        Self {
            shared,
            handles: Some(executor::Handles { c_exec, i_exec }),
        }
    }

    /// Registers a new task onto the READY queue, returning `true` on
    /// success. Mirrors the original `sut_create()` (`examples/
    /// original_source/2/sut.h`'s `bool sut_create(sut_task_f fn)`), which
    /// returns `false` and creates nothing when the task table is full.
    pub fn create(&self, body: impl FnOnce() + 'static) -> bool {
        match self.shared.spawn_task(Box::new(body)) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "utl task creation rejected");
                false
            }
        }
    }

    /// Same as [`Utl::create`] but returns the new task's id instead of
    /// just `true`, for callers that want it.
    pub fn try_create(&self, body: impl FnOnce() + 'static) -> Result<u32, UtlError> {
        self.shared.spawn_task(Box::new(body))
    }

    pub fn live_tasks(&self) -> usize {
        self.shared.live_tasks()
    }

    /// Waits (up to the configured drain timeout) for every outstanding
    /// task to finish, then stops both executor threads. Unlike the
    /// original's unconditional `pthread_cancel`, this lets in-flight tasks
    /// and their I/O complete before tearing anything down.
    pub fn shutdown(mut self) {
        executor::wait_for_drain(&self.shared, self.shared.drain_timeout());
        if self.shared.live_tasks() > 0 {
            warn!(
                remaining = self.shared.live_tasks(),
                "utl shutdown drain timed out with tasks still live"
            );
        }
        self.shared.begin_shutdown();
        self.shared.close_queues();
        if let Some(handles) = self.handles.take() {
            let _ = handles.c_exec.join();
            let _ = handles.i_exec.join();
        }
        info!("utl scheduler shut down");
    }
}
