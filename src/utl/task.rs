//! The cooperative `Task` abstraction: a stackful coroutine built on the
//! `generator` crate, plus the free functions a task body calls to perform
//! blocking-looking I/O or voluntarily give up the C-EXEC thread. These
//! mirror the original course skeleton's global `sut_*` functions — no
//! explicit context parameter is threaded through task bodies, because only
//! one task ever runs at a time per generator, so the crate's own
//! thread-local yield/resume plumbing is enough.

use generator::{yield_, yield_with, Gn};

use std::path::PathBuf;

/// What a task is asking the I/O side to do on its behalf.
pub enum IoRequest {
    Open { path: PathBuf },
    Read { fd: i32, len: usize },
    Write { fd: i32, data: Vec<u8> },
    Close { fd: i32 },
}

/// What I-EXEC hands back once the blocking syscall completes.
pub enum IoOutcome {
    Opened(i32),
    Read(Vec<u8>),
    Written(i32),
    Closed(i32),
}

/// What a resumed task communicates to the C-EXEC driving loop: either it
/// wants blocking I/O performed, it's voluntarily giving up its turn, or
/// it has finished running.
pub enum TaskEvent {
    Io(IoRequest),
    Yielded,
    Done,
}

pub type TaskBody = dyn FnOnce() + 'static;

/// One cooperatively-scheduled task. Owns its own stack; `resume` is only
/// ever called from the C-EXEC thread.
pub struct Task {
    pub id: u32,
    started: bool,
    gen: Gn<TaskEvent>,
}

impl Task {
    pub fn spawn(id: u32, body: Box<TaskBody>, stack_size: usize) -> Self {
        let gen = Gn::new_opt(stack_size, move || {
            body();
            TaskEvent::Done
        });
        Self {
            id,
            started: false,
            gen,
        }
    }

    /// Resumes the task, delivering `input` as the result of whatever I/O
    /// request it last yielded (or `None` if it was a voluntary yield, or
    /// this is the first resume).
    pub fn resume(&mut self, input: Option<IoOutcome>) -> TaskEvent {
        if !self.started {
            self.started = true;
            self.gen.next().unwrap_or(TaskEvent::Done)
        } else {
            match input {
                Some(outcome) => self.gen.send(outcome),
                None => self.gen.send(()),
            }
        }
    }
}

/// Suspends the calling task until its open request is serviced by I-EXEC.
pub fn open(path: impl Into<PathBuf>) -> i32 {
    let outcome = yield_(TaskEvent::Io(IoRequest::Open { path: path.into() }))
        .expect("utl::task::open called outside a running task");
    match outcome {
        IoOutcome::Opened(fd) => fd,
        _ => -1,
    }
}

/// Suspends the calling task until its read request is serviced by I-EXEC,
/// copying at most `buf.len()` bytes in and returning the count read (0 on
/// EOF or error).
pub fn read(fd: i32, buf: &mut [u8]) -> i32 {
    let outcome = yield_(TaskEvent::Io(IoRequest::Read { fd, len: buf.len() }))
        .expect("utl::task::read called outside a running task");
    match outcome {
        IoOutcome::Read(data) => {
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            n as i32
        }
        _ => 0,
    }
}

/// Suspends the calling task until its write request is serviced by I-EXEC.
pub fn write(fd: i32, data: &[u8]) -> i32 {
    let outcome = yield_(TaskEvent::Io(IoRequest::Write {
        fd,
        data: data.to_vec(),
    }))
    .expect("utl::task::write called outside a running task");
    match outcome {
        IoOutcome::Written(n) => n,
        _ => -1,
    }
}

/// Suspends the calling task until its close request is serviced by I-EXEC.
pub fn close(fd: i32) -> i32 {
    let outcome =
        yield_(TaskEvent::Io(IoRequest::Close { fd })).expect("utl::task::close called outside a running task");
    match outcome {
        IoOutcome::Closed(code) => code,
        _ => -1,
    }
}

/// Voluntarily gives up the C-EXEC thread, rejoining the back of the READY
/// queue. Does not block on anything.
pub fn yield_now() {
    yield_with(TaskEvent::Yielded);
}

/// Ends the calling task immediately, regardless of how much of its body
/// has run. Equivalent to returning from the task function.
pub fn exit() -> ! {
    yield_with(TaskEvent::Done);
    unreachable!("a task resumed after calling utl::task::exit")
}
