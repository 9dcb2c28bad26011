//! The process has exactly one real current directory, so at most one file
//! manager may own it at a time. Ownership is an exclusive lease: activating
//! a manager changes the OS directory and returns a guard, and dropping the
//! last guard puts the previous directory back and frees the slot.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{IoContext, Result};

struct ActiveSlot {
    id: String,
    depth: usize,
    /// Directory that was current before the outermost activation.
    saved_pwd: Option<PathBuf>,
}

static ACTIVE: Mutex<Option<ActiveSlot>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<ActiveSlot>> {
    ACTIVE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Identifier of the manager currently holding the process directory.
pub fn active_manager_id() -> Option<String> {
    slot().as_ref().map(|s| s.id.clone())
}

/// Lease on the process current directory. Once the last guard of the
/// active manager is dropped, in whatever order, the directory that was
/// current before the outermost activation is restored.
#[must_use = "the manager is deactivated as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ActiveManagerGuard {
    id: String,
    saved_pwd: Option<PathBuf>,
}

impl ActiveManagerGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn saved_pwd(&self) -> Option<&Path> {
        self.saved_pwd.as_deref()
    }
}

/// Makes the manager `id` the active one and moves the process into
/// `working_dir`. Re-activating the manager that is already active nests.
///
/// # Panics
///
/// Panics if a different manager is already active. Sharing the process
/// directory between managers is unrecoverable.
pub(crate) fn activate(id: &str, working_dir: &Path) -> Result<ActiveManagerGuard> {
    let mut active = slot();
    if let Some(current) = active.as_ref() {
        if current.id != id {
            let current = current.id.clone();
            drop(active);
            panic!("Another manager already activated via context: {current} (requested {id})");
        }
    }

    let previous = env::current_dir().ok();
    env::set_current_dir(working_dir).io_context(|| {
        format!(
            "Failed to enter working directory: {}",
            working_dir.display()
        )
    })?;

    let saved_pwd = match active.as_mut() {
        Some(current) => {
            current.depth += 1;
            current.saved_pwd.clone()
        }
        None => {
            *active = Some(ActiveSlot {
                id: id.to_string(),
                depth: 1,
                saved_pwd: previous.clone(),
            });
            previous
        }
    };
    tracing::info!(id, dir = %working_dir.display(), "Activated file manager");

    Ok(ActiveManagerGuard {
        id: id.to_string(),
        saved_pwd,
    })
}

impl Drop for ActiveManagerGuard {
    fn drop(&mut self) {
        let mut active = slot();
        let release = match active.as_mut() {
            Some(current) if current.id == self.id => {
                current.depth -= 1;
                current.depth == 0
            }
            _ => false,
        };
        if !release {
            return;
        }

        if let Some(saved) = active.take().and_then(|s| s.saved_pwd) {
            if let Err(e) = env::set_current_dir(&saved) {
                tracing::warn!(dir = %saved.display(), error = %e, "Failed to restore working directory");
            }
        }
        tracing::info!(id = %self.id, "Deactivated file manager");
    }
}

/// Serializes tests that move the process current directory.
#[cfg(test)]
pub(crate) fn cwd_test_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
