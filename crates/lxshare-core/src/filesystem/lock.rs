//! Advisory file locks serializing concurrent runs.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lxshare_common::constants::LOCK_POLL_MS;
use lxshare_common::error::{LxshareError, Result};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

/// Exclusive `flock` held for as long as the guard lives.
///
/// The kernel drops the lock if the process dies, so a crashed run never
/// leaves a stale lock behind.
#[derive(Debug)]
pub struct EditLock {
    _lock: Flock<File>,
    path: PathBuf,
}

impl EditLock {
    /// Acquires an exclusive lock on `path`, creating the file and its
    /// parent directory if needed. Retries until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`LxshareError::LockBusy`] on timeout, or an I/O error if the
    /// lock file cannot be opened or locked.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LxshareError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LxshareError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let start = Instant::now();
        loop {
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => {
                    tracing::debug!(lock_path = %path.display(), "acquired lock");
                    return Ok(Self {
                        _lock: lock,
                        path: path.to_path_buf(),
                    });
                }
                Err((f, errno)) if errno == Errno::EWOULDBLOCK => {
                    if start.elapsed() >= timeout {
                        return Err(LxshareError::LockBusy {
                            path: path.to_path_buf(),
                        });
                    }
                    file = f;
                    std::thread::sleep(Duration::from_millis(LOCK_POLL_MS));
                }
                Err((_, errno)) => {
                    return Err(LxshareError::Io {
                        path: path.to_path_buf(),
                        source: errno.into(),
                    });
                }
            }
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EditLock {
    fn drop(&mut self) {
        tracing::debug!(lock_path = %self.path.display(), "released lock");
    }
}
