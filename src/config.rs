//! Configuration for the two cores, modeled on the teacher's
//! `Settings`/`SettingsFile` split (`rust-lang-rustup/src/settings.rs`):
//! a small, serde-derived, `Default`-able struct that can optionally be
//! loaded from a TOML file on disk, scaled down to the handful of knobs
//! this crate actually exposes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sfs::layout::BLOCK_SIZE;

/// Tunables for the UTL scheduler. Stack size and `max_tasks` are the only
/// compile-time constants the distilled spec calls out; both are exposed
/// here so callers can scale them instead of editing the source.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UtlConfig {
    /// Bytes reserved for each task's stack.
    pub task_stack_size: usize,
    /// Hard cap on simultaneously live tasks.
    pub max_tasks: usize,
    /// How long `shutdown` waits for the live-task count to reach zero
    /// before giving up and cancelling the executors anyway.
    pub shutdown_drain_timeout_ms: u64,
}

impl Default for UtlConfig {
    fn default() -> Self {
        Self {
            task_stack_size: 1024 * 1024,
            max_tasks: 32,
            shutdown_drain_timeout_ms: 5_000,
        }
    }
}

/// Tunables for SFS. `block_size` is fixed by the on-disk format and is not
/// serde-configurable; it is included here only so tests and callers can see
/// what the mounted image was built with.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SfsConfig {
    /// Path to the backing disk image.
    pub disk_path: PathBuf,
    /// Block size in bytes; always `sfs::layout::BLOCK_SIZE` in this crate.
    pub block_size: u32,
}

impl Default for SfsConfig {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from("taskfs.disk"),
            block_size: BLOCK_SIZE,
        }
    }
}

/// Loads a `UtlConfig` from a TOML file, falling back to defaults for any
/// field the file omits and for the file not existing at all.
pub fn load_utl_config(path: impl AsRef<Path>) -> anyhow::Result<UtlConfig> {
    load_or_default(path)
}

/// Loads an `SfsConfig` from a TOML file, same fallback behavior.
pub fn load_sfs_config(path: impl AsRef<Path>) -> anyhow::Result<SfsConfig> {
    load_or_default(path)
}

fn load_or_default<T>(path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
