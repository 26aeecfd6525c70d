//! The two executor threads: C-EXEC runs READY tasks to their next yield
//! point, I-EXEC drains the WAIT queue performing blocking I/O. Grounded on
//! the original course skeleton's `c_exec`/`i_exec` worker-thread loops, and
//! on rustup's `diskio::threaded` executor for the thread-pool-plus-channel
//! shape (`src/diskio/threaded.rs`): a small fixed crew of worker threads
//! draining a shared queue and reporting completions back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::UtlConfig;
use crate::error::UtlError;

use super::io::IoBackend;
use super::queue::{IdQueue, IoQueue};
use super::task::{IoOutcome, Task, TaskBody, TaskEvent};

struct TaskTable {
    slots: Vec<Option<Task>>,
}

impl TaskTable {
    fn new(max_tasks: usize) -> Self {
        Self {
            slots: (0..max_tasks).map(|_| None).collect(),
        }
    }

    fn insert(&mut self, body: Box<TaskBody>, stack_size: usize) -> Result<u32, UtlError> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(UtlError::TooManyTasks { max: self.slots.len() })?;
        self.slots[slot] = Some(Task::spawn(slot as u32, body, stack_size));
        Ok(slot as u32)
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut Task> {
        self.slots.get_mut(id as usize).and_then(|s| s.as_mut())
    }

    fn remove(&mut self, id: u32) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            *slot = None;
        }
    }
}

pub(super) struct Shared {
    tasks: Mutex<TaskTable>,
    ready: IdQueue,
    wait: IoQueue,
    results: Mutex<HashMap<u32, IoOutcome>>,
    io: IoBackend,
    live_tasks: AtomicUsize,
    shutting_down: AtomicBool,
    max_tasks: usize,
    stack_size: usize,
    drain_timeout: Duration,
}

impl Shared {
    pub fn new(config: &UtlConfig) -> Self {
        Self {
            tasks: Mutex::new(TaskTable::new(config.max_tasks)),
            ready: IdQueue::new(),
            wait: IoQueue::new(),
            results: Mutex::new(HashMap::new()),
            io: IoBackend::new(),
            live_tasks: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
            max_tasks: config.max_tasks,
            stack_size: config.task_stack_size,
            drain_timeout: Duration::from_millis(config.shutdown_drain_timeout_ms),
        }
    }

    pub fn spawn_task(&self, body: Box<TaskBody>) -> Result<u32, UtlError> {
        let id = self.tasks.lock().unwrap().insert(body, self.stack_size)?;
        self.live_tasks.fetch_add(1, Ordering::SeqCst);
        self.ready.push(id);
        debug!(task = id, "task created");
        Ok(id)
    }

    pub fn live_tasks(&self) -> usize {
        self.live_tasks.load(Ordering::SeqCst)
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn close_queues(&self) {
        self.ready.close();
        self.wait.close();
    }
}

/// Runs on the C-EXEC thread: pops a ready task, resumes it with whatever
/// I/O result is waiting for it, and routes the next yield appropriately.
pub(super) fn c_exec_loop(shared: Arc<Shared>) {
    info!("c-exec started");
    while let Some(id) = shared.ready.pop_blocking() {
        let input = shared.results.lock().unwrap().remove(&id);
        let event = {
            let mut tasks = shared.tasks.lock().unwrap();
            match tasks.get_mut(id) {
                Some(task) => task.resume(input),
                None => continue,
            }
        };
        match event {
            TaskEvent::Io(req) => shared.wait.push(id, req),
            TaskEvent::Yielded => shared.ready.push(id),
            TaskEvent::Done => {
                shared.tasks.lock().unwrap().remove(id);
                shared.live_tasks.fetch_sub(1, Ordering::SeqCst);
                debug!(task = id, "task finished");
            }
        }
    }
    info!("c-exec stopped");
}

/// Runs on the I-EXEC thread: pops a pending I/O request, performs the real
/// blocking syscall, and requeues the task onto READY with its result
/// waiting for it.
pub(super) fn i_exec_loop(shared: Arc<Shared>) {
    info!("i-exec started");
    while let Some((id, req)) = shared.wait.pop_blocking() {
        let outcome = shared.io.execute(req);
        shared.results.lock().unwrap().insert(id, outcome);
        shared.ready.push(id);
    }
    info!("i-exec stopped");
}

/// Blocks the calling (non-executor) thread until every live task has
/// finished or `timeout` elapses, whichever comes first.
pub(super) fn wait_for_drain(shared: &Shared, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while shared.live_tasks() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub(super) struct Handles {
    pub c_exec: JoinHandle<()>,
    pub i_exec: JoinHandle<()>,
}
