//! Directory-as-mutex guarding one target's repository.
//!
//! `mkdir` either creates the directory or fails because it exists, which
//! makes it an atomic test-and-set on every filesystem git itself supports.
//! A lock whose directory is older than the staleness threshold belonged to
//! an agent that died without releasing it and is reclaimed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::{debug, warn};

use crate::error::{Error, IoContext, Result};

/// Outcome of a lock attempt.
#[derive(Debug)]
pub enum Acquire {
    Acquired(LockGuard),
    /// Another live instance holds the lock.
    Busy,
}

/// Held lock. Dropping it removes the lock directory.
pub struct LockGuard {
    path: PathBuf,
    signals: Option<Handle>,
}

/// Termination signals caught on behalf of a lock that may not exist yet.
///
/// Install it before [`acquire`]: a SIGINT/SIGTERM/SIGHUP arriving while
/// the lock directory is being created is queued instead of killing the
/// process, and is acted on once [`LockGuard::release_on_signal`] binds the
/// watch to the lock.
pub struct SignalWatch {
    signals: Signals,
}

impl SignalWatch {
    pub fn install() -> Result<Self> {
        let signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
            .map_err(|e| Error::environment(format!("cannot install signal handlers: {e}")))?;
        Ok(Self { signals })
    }
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock directory from a termination signal as well.
    ///
    /// The watcher thread deletes the lock and exits with `128 + signo`,
    /// including for a signal queued in `watch` before the lock was taken.
    pub fn release_on_signal(&mut self, watch: SignalWatch) {
        self.on_signal(watch, |sig| std::process::exit(128 + sig));
    }

    fn on_signal(&mut self, watch: SignalWatch, then: impl FnOnce(i32) + Send + 'static) {
        let mut signals = watch.signals;
        self.signals = Some(signals.handle());
        let path = self.path.clone();

        std::thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                warn!("received signal {sig}, releasing {}", path.display());
                remove_lock_dir(&path);
                then(sig);
            }
        });
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("path", &self.path)
            .field("on_signal", &self.signals.is_some())
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Stop the watcher first so it can never delete a lock that a later
        // instance has taken over.
        if let Some(h) = self.signals.take() {
            h.close();
        }
        remove_lock_dir(&self.path);
    }
}

fn remove_lock_dir(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => debug!("released lock {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("cannot remove lock {}: {}", path.display(), e),
    }
}

fn try_create(path: &Path) -> Result<Option<LockGuard>> {
    match fs::create_dir(path) {
        Ok(()) => Ok(Some(LockGuard {
            path: path.to_path_buf(),
            signals: None,
        })),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(Error::environment(format!(
            "cannot create lock {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Age of an existing lock, from its creation time when the filesystem
/// records one and its modification time otherwise.
///
/// `None` when the lock vanished or its timestamp cannot be read.
fn lock_age(path: &Path) -> Option<Duration> {
    let meta = fs::metadata(path).ok()?;
    let born = meta.created().or_else(|_| meta.modified()).ok()?;
    SystemTime::now().duration_since(born).ok()
}

/// Try to take the lock at `path`.
///
/// An existing lock older than `stale_after` is removed and acquisition is
/// retried exactly once. Losing that retry to a concurrent instance counts
/// as [`Acquire::Busy`].
pub fn acquire(path: &Path, stale_after: Duration) -> Result<Acquire> {
    if let Some(g) = try_create(path)? {
        return Ok(Acquire::Acquired(g));
    }

    match lock_age(path) {
        Some(age) if age > stale_after => {
            warn!(
                "removing stale lock {} ({}s old)",
                path.display(),
                age.as_secs()
            );
            match fs::remove_dir_all(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e).at(path),
            }
        }
        Some(_) => return Ok(Acquire::Busy),
        // Released between our mkdir and stat: one more attempt is fair.
        None if !path.exists() => {}
        None => return Ok(Acquire::Busy),
    }

    Ok(match try_create(path)? {
        Some(g) => Acquire::Acquired(g),
        None => Acquire::Busy,
    })
}
