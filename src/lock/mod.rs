//! Cross-process mutual exclusion via a lock directory.
//!
//! The lock is a directory created with create-exclusive semantics (two
//! concurrent acquirers cannot both succeed) containing a `pid` file with
//! the owner's PID and acquisition timestamp. A lock is considered
//! abandoned when its age exceeds the configured TTL or when the recorded
//! PID no longer corresponds to a running process; abandoned locks are
//! evicted and acquisition retried once.
//!
//! [`LockGuard`] releases on drop, so the lock is removed on every exit
//! path of the workflow, including panics. Release only removes the entry
//! when the recorded PID matches the releasing process — never blindly
//! delete a lock you do not own.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, RoutineError};

/// Name of the ownership record inside the lock directory.
const PID_FILE: &str = "pid";

/// A lock dir with no pid record younger than this may belong to an
/// acquirer that is still mid-write and must not be reclaimed.
const RECLAIM_GRACE_SECS: u64 = 5;

/// Scoped ownership of the workflow lock.
#[derive(Debug)]
pub struct LockGuard {
    lock_dir: PathBuf,
    pid: u32,
    released: bool,
}

/// Parsed contents of a lock's `pid` file.
#[derive(Debug, Clone, Copy)]
struct LockRecord {
    pid: u32,
    acquired_at: i64,
}

impl LockRecord {
    fn age_secs(&self) -> u64 {
        (chrono::Utc::now().timestamp() - self.acquired_at).max(0) as u64
    }
}

impl LockGuard {
    /// Acquire the lock at `lock_dir`, evicting a stale holder if permitted.
    ///
    /// `ttl_secs` = 0 disables age-based eviction; a lock whose recorded PID
    /// is not alive is always treated as abandoned.
    pub fn acquire(lock_dir: &Path, ttl_secs: u64) -> Result<LockGuard> {
        let mut evicted = false;
        loop {
            match try_create(lock_dir) {
                Ok(guard) => {
                    info!(
                        "Lock acquired: {} (PID {})",
                        lock_dir.display(),
                        guard.pid
                    );
                    signal_cleanup::arm(lock_dir);
                    return Ok(guard);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if evicted {
                        // Lost the race to another acquirer right after eviction.
                        return Err(held_error(lock_dir));
                    }
                    match read_record(lock_dir) {
                        Some(record) if is_abandoned(&record, ttl_secs) => {
                            warn!(
                                "Evicting abandoned lock at {} (PID {}, age {}s)",
                                lock_dir.display(),
                                record.pid,
                                record.age_secs()
                            );
                            remove_lock_dir(lock_dir)?;
                            evicted = true;
                        }
                        Some(_) => return Err(held_error(lock_dir)),
                        None if dir_older_than(lock_dir, RECLAIM_GRACE_SECS) => {
                            // Directory without a readable pid file: a crashed
                            // acquirer that never finished writing. Reclaim it.
                            warn!("Removing lock dir without pid record: {}", lock_dir.display());
                            remove_lock_dir(lock_dir)?;
                            evicted = true;
                        }
                        None => {
                            // A concurrent acquirer may be between mkdir and
                            // writing its pid file; treat the lock as held.
                            return Err(held_error(lock_dir));
                        }
                    }
                }
                Err(e) => {
                    return Err(RoutineError::LockAcquisitionFailed {
                        lock_dir: lock_dir.to_path_buf(),
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    /// The directory this guard owns.
    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Explicitly release the lock (also happens on drop).
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        signal_cleanup::disarm();

        match read_record(&self.lock_dir) {
            Some(record) if record.pid == self.pid => {
                if let Err(e) = fs::remove_dir_all(&self.lock_dir) {
                    warn!("Error while releasing lock: {}", e);
                } else {
                    info!("Lock released: {}", self.lock_dir.display());
                }
            }
            Some(record) => {
                // A TTL eviction by another process reclaimed the entry.
                warn!(
                    "Lock at {} now owned by PID {} — leaving it in place",
                    self.lock_dir.display(),
                    record.pid
                );
            }
            None => {
                // No pid record left; best-effort removal of the bare dir.
                if self.lock_dir.exists() {
                    let _ = fs::remove_dir_all(&self.lock_dir);
                }
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Create the lock directory exclusively and record ownership.
fn try_create(lock_dir: &Path) -> std::io::Result<LockGuard> {
    if let Some(parent) = lock_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir(lock_dir)?;

    let pid = std::process::id();
    let record = format!("{}\n{}\n", pid, chrono::Utc::now().timestamp());
    fs::write(lock_dir.join(PID_FILE), record)?;

    Ok(LockGuard {
        lock_dir: lock_dir.to_path_buf(),
        pid,
        released: false,
    })
}

fn read_record(lock_dir: &Path) -> Option<LockRecord> {
    let raw = fs::read_to_string(lock_dir.join(PID_FILE)).ok()?;
    let mut lines = raw.lines();
    let pid = lines.next()?.trim().parse().ok()?;
    let acquired_at = lines.next()?.trim().parse().ok()?;
    Some(LockRecord { pid, acquired_at })
}

fn is_abandoned(record: &LockRecord, ttl_secs: u64) -> bool {
    if ttl_secs > 0 && record.age_secs() > ttl_secs {
        return true;
    }
    !pid_alive(record.pid)
}

fn dir_older_than(lock_dir: &Path, secs: u64) -> bool {
    fs::metadata(lock_dir)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|mtime| mtime.elapsed().ok())
        .map(|age| age.as_secs() >= secs)
        .unwrap_or(false)
}

fn remove_lock_dir(lock_dir: &Path) -> Result<()> {
    fs::remove_dir_all(lock_dir).map_err(|e| RoutineError::LockAcquisitionFailed {
        lock_dir: lock_dir.to_path_buf(),
        message: format!("could not evict stale lock: {}", e),
    })
}

fn held_error(lock_dir: &Path) -> RoutineError {
    let record = read_record(lock_dir);
    RoutineError::LockHeld {
        lock_dir: lock_dir.to_path_buf(),
        pid: record.map(|r| r.pid).unwrap_or(0),
        age_secs: record.map(|r| r.age_secs()).unwrap_or(0),
    }
}

/// Lock release on SIGINT/SIGTERM.
///
/// `Drop` never runs when a signal kills the process, so while the lock is
/// held a handler removes the lock entry and exits `128 + signum`. The
/// handler body is restricted to async-signal-safe calls (`unlink`,
/// `rmdir`, `_exit`); the paths are pre-rendered C strings published
/// through atomics when the lock is taken.
#[cfg(unix)]
mod signal_cleanup {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;
    use std::sync::atomic::{AtomicPtr, Ordering};

    static PID_FILE_PATH: AtomicPtr<libc::c_char> = AtomicPtr::new(std::ptr::null_mut());
    static LOCK_DIR_PATH: AtomicPtr<libc::c_char> = AtomicPtr::new(std::ptr::null_mut());

    extern "C" fn handle(signum: libc::c_int) {
        let pid_file = PID_FILE_PATH.load(Ordering::SeqCst);
        if !pid_file.is_null() {
            unsafe { libc::unlink(pid_file) };
        }
        let dir = LOCK_DIR_PATH.load(Ordering::SeqCst);
        if !dir.is_null() {
            unsafe { libc::rmdir(dir) };
        }
        unsafe { libc::_exit(128 + signum) };
    }

    pub(super) fn arm(lock_dir: &Path) {
        let dir = CString::new(lock_dir.as_os_str().as_bytes()).ok();
        let pid_file =
            CString::new(lock_dir.join(super::PID_FILE).as_os_str().as_bytes()).ok();
        let (Some(dir), Some(pid_file)) = (dir, pid_file) else {
            return;
        };
        // into_raw leaks on purpose: the handler may read these at any time.
        PID_FILE_PATH.store(pid_file.into_raw(), Ordering::SeqCst);
        LOCK_DIR_PATH.store(dir.into_raw(), Ordering::SeqCst);
        unsafe {
            libc::signal(libc::SIGINT, handle as libc::sighandler_t);
            libc::signal(libc::SIGTERM, handle as libc::sighandler_t);
        }
    }

    pub(super) fn disarm() {
        LOCK_DIR_PATH.store(std::ptr::null_mut(), Ordering::SeqCst);
        PID_FILE_PATH.store(std::ptr::null_mut(), Ordering::SeqCst);
        unsafe {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGTERM, libc::SIG_DFL);
        }
    }
}

#[cfg(not(unix))]
mod signal_cleanup {
    use std::path::Path;

    pub(super) fn arm(_lock_dir: &Path) {}

    pub(super) fn disarm() {}
}

/// Is a process with this PID currently running?
#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    // kill(pid, 0) probes for existence; EPERM still means the process exists.
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    // No cheap liveness probe; rely on TTL eviction only.
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lock_path(temp: &TempDir) -> PathBuf {
        temp.path().join("workflow.lock")
    }

    fn write_record(lock_dir: &Path, pid: u32, acquired_at: i64) {
        fs::create_dir_all(lock_dir).unwrap();
        fs::write(lock_dir.join(PID_FILE), format!("{}\n{}\n", pid, acquired_at)).unwrap();
    }

    #[test]
    fn acquire_creates_dir_and_pid_record() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        let guard = LockGuard::acquire(&dir, 0).unwrap();

        assert!(dir.is_dir());
        let record = read_record(&dir).unwrap();
        assert_eq!(record.pid, std::process::id());
        drop(guard);
    }

    #[test]
    fn acquire_creates_missing_parents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/deeper/workflow.lock");

        let _guard = LockGuard::acquire(&dir, 0).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn second_acquire_fails_with_lock_held() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        let _guard = LockGuard::acquire(&dir, 0).unwrap();
        let err = LockGuard::acquire(&dir, 0).unwrap_err();

        match err {
            RoutineError::LockHeld { pid, .. } => assert_eq!(pid, std::process::id()),
            other => panic!("expected LockHeld, got {:?}", other),
        }
    }

    #[test]
    fn release_on_drop_removes_dir() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        {
            let _guard = LockGuard::acquire(&dir, 0).unwrap();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn explicit_release_removes_dir() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        let guard = LockGuard::acquire(&dir, 0).unwrap();
        guard.release();
        assert!(!dir.exists());
    }

    #[test]
    fn stale_lock_is_evicted_after_ttl() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        // Our own PID is alive, so only the TTL can justify eviction.
        let old = chrono::Utc::now().timestamp() - 3600;
        write_record(&dir, std::process::id(), old);

        let guard = LockGuard::acquire(&dir, 60).unwrap();
        let record = read_record(&dir).unwrap();
        assert_eq!(record.pid, std::process::id());
        assert!(record.age_secs() < 60);
        drop(guard);
    }

    #[test]
    fn fresh_lock_survives_ttl_check() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        write_record(&dir, std::process::id(), chrono::Utc::now().timestamp());

        assert!(matches!(
            LockGuard::acquire(&dir, 3600),
            Err(RoutineError::LockHeld { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn dead_pid_lock_is_evicted() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        // A PID beyond any realistic pid_max; kill() reports ESRCH for it.
        write_record(&dir, 3_999_999, chrono::Utc::now().timestamp());

        let _guard = LockGuard::acquire(&dir, 0).unwrap();
        assert_eq!(read_record(&dir).unwrap().pid, std::process::id());
    }

    #[test]
    fn fresh_recordless_dir_treated_as_held() {
        // A dir with no pid file and a fresh mtime may belong to an acquirer
        // that is mid-write; it must not be reclaimed.
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);
        fs::create_dir_all(&dir).unwrap();

        assert!(matches!(
            LockGuard::acquire(&dir, 0),
            Err(RoutineError::LockHeld { .. })
        ));
    }

    #[test]
    fn release_leaves_foreign_lock_in_place() {
        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);

        let guard = LockGuard::acquire(&dir, 0).unwrap();
        // Simulate another process reclaiming the entry after a TTL eviction.
        write_record(&dir, std::process::id() + 1, chrono::Utc::now().timestamp());

        drop(guard);
        assert!(dir.exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn concurrent_acquires_admit_exactly_one() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Barrier};

        let temp = TempDir::new().unwrap();
        let dir = lock_path(&temp);
        let wins = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        std::thread::scope(|s| {
            for _ in 0..8 {
                let dir = dir.clone();
                let wins = Arc::clone(&wins);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    if let Ok(guard) = LockGuard::acquire(&dir, 0) {
                        wins.fetch_add(1, Ordering::SeqCst);
                        // Hold until every thread has attempted.
                        std::thread::sleep(std::time::Duration::from_millis(100));
                        drop(guard);
                    }
                });
            }
        });

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pid_alive_for_current_process() {
        assert!(pid_alive(std::process::id()));
    }
}
