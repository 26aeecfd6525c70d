//! The real, blocking file I/O that I-EXEC performs on a task's behalf.
//! Deliberately decoupled from the `sfs` module: UTL's open/read/write/close
//! operate on ordinary host files through descriptors private to this
//! table, the same relationship the original course skeleton had between
//! its scheduler and the outside world.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::sync::Mutex;

use tracing::warn;

use super::task::{IoOutcome, IoRequest};

struct Slot {
    file: File,
}

/// Table of open host files, indexed by the small integer descriptors this
/// module hands back. Shared across tasks, so guarded by a mutex; only
/// I-EXEC ever touches it.
pub struct IoBackend {
    slots: Mutex<Vec<Option<Slot>>>,
}

impl IoBackend {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Performs the blocking syscall `req` describes and returns its
    /// outcome. This is the only place in the crate that actually blocks an
    /// OS thread on file I/O.
    pub fn execute(&self, req: IoRequest) -> IoOutcome {
        match req {
            IoRequest::Open { path } => IoOutcome::Opened(self.do_open(&path)),
            IoRequest::Read { fd, len } => IoOutcome::Read(self.do_read(fd, len)),
            IoRequest::Write { fd, data } => IoOutcome::Written(self.do_write(fd, &data)),
            IoRequest::Close { fd } => IoOutcome::Closed(self.do_close(fd)),
        }
    }

    fn do_open(&self, path: &std::path::Path) -> i32 {
        let file = match OpenOptions::new().read(true).write(true).create(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "utl open failed");
                return -1;
            }
        };
        let mut slots = self.slots.lock().unwrap();
        let slot = Slot { file };
        if let Some(i) = slots.iter().position(|s| s.is_none()) {
            slots[i] = Some(slot);
            i as i32
        } else {
            slots.push(Some(slot));
            (slots.len() - 1) as i32
        }
    }

    fn do_read(&self, fd: i32, len: usize) -> Vec<u8> {
        let mut slots = self.slots.lock().unwrap();
        let Some(Some(slot)) = slots.get_mut(fd as usize) else {
            warn!(fd, "utl read on unknown descriptor");
            return Vec::new();
        };
        let mut buf = vec![0u8; len];
        match slot.file.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                buf
            }
            Err(e) => {
                warn!(error = %e, fd, "utl read failed");
                Vec::new()
            }
        }
    }

    fn do_write(&self, fd: i32, data: &[u8]) -> i32 {
        let mut slots = self.slots.lock().unwrap();
        let Some(Some(slot)) = slots.get_mut(fd as usize) else {
            warn!(fd, "utl write on unknown descriptor");
            return -1;
        };
        match slot.file.write(data) {
            Ok(n) => n as i32,
            Err(e) => {
                warn!(error = %e, fd, "utl write failed");
                -1
            }
        }
    }

    fn do_close(&self, fd: i32) -> i32 {
        let mut slots = self.slots.lock().unwrap();
        match slots.get_mut(fd as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                0
            }
            _ => {
                warn!(fd, "utl close on unknown descriptor");
                -1
            }
        }
    }
}
