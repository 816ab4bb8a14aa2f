//! Process lifecycle management for ssh child processes
//!
//! The validator blocks on one `ssh` child at a time. When the user hits
//! Ctrl+C (or the process is told to terminate) the in-flight session is
//! abandoned: the child is signalled, the signal is recorded, and the main
//! thread exits with `128 + signal`, which is 130 for SIGINT.
//!
//! - Every spawned child is tracked in a global registry
//! - Signal handlers run on a dedicated thread, never in signal context
//! - Children get SIGTERM, then SIGKILL after a grace period
//! - No new child is spawned once a signal has been recorded
//! - On Linux, children also receive SIGTERM if the parent dies outright

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Exit status used when the run is interrupted with SIGINT
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Grace period between SIGTERM and SIGKILL for children
const CHILD_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// How long the main thread gets to report the interrupt and exit
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Signal that interrupted the run; 0 until one arrives
static RECEIVED_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Signal that interrupted the run, if any
pub fn received_signal() -> Option<i32> {
    match RECEIVED_SIGNAL.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Process exit status for a run ended by `signal`
pub fn interrupt_exit_code(signal: i32) -> i32 {
    128 + signal
}

/// Global registry of child process IDs
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry tracking spawned child processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    /// Set once termination has started so a second signal is a no-op
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!(pid, "registered child process");
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!(pid, "unregistered child process");
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked child processes
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            debug!("cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            debug!("no child processes to terminate");
            return;
        }

        info!(count = self.pids.len(), "terminating child processes");

        let pids_to_kill: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids_to_kill {
            if let Err(e) = send_signal(pid, Signal::SIGTERM) {
                warn!(pid, error = %e, "failed to send SIGTERM");
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids_to_kill.iter().all(|&pid| !is_process_alive(pid)) {
                info!("all child processes terminated gracefully");
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids_to_kill {
            if is_process_alive(pid) {
                warn!(pid, "child did not terminate, sending SIGKILL");
                let _ = send_signal(pid, Signal::SIGKILL);
            }
        }

        self.pids.clear();
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Check if a process is still alive (not dead or zombie)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/pid/stat is the state; zombies count as dead
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        let fields: Vec<&str> = stat.split_whitespace().collect();
        if fields.len() > 2 {
            return !matches!(fields[2], "Z" | "X");
        }
    }

    true
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP
///
/// Call once at program start. On delivery the signal is recorded and the
/// registered ssh children are terminated. The main thread sees the record
/// through [`received_signal`], reports it and exits; if it has not done so
/// within the shutdown grace period, this thread exits with `128 + signal`.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            info!(signal = signal_name, "received signal, abandoning remote command");
            RECEIVED_SIGNAL.store(sig, Ordering::SeqCst);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(CHILD_GRACE_PERIOD);
            }

            thread::sleep(SHUTDOWN_GRACE_PERIOD);
            error!(signal = signal_name, "main thread did not exit after interrupt, forcing exit");
            std::process::exit(interrupt_exit_code(sig));
        }
    });

    Ok(())
}

/// Extension trait tying a child's lifetime to this process
pub trait CommandLifecycle {
    /// Ask the kernel to SIGTERM the child if the parent dies first
    fn die_with_parent(&mut self) -> &mut Self;
}

impl CommandLifecycle for std::process::Command {
    #[cfg(target_os = "linux")]
    fn die_with_parent(&mut self) -> &mut Self {
        use nix::libc;
        use std::os::unix::process::CommandExt;
        // SAFETY: prctl is async-signal-safe and touches no parent state
        unsafe {
            self.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }

    #[cfg(not(target_os = "linux"))]
    fn die_with_parent(&mut self) -> &mut Self {
        self
    }
}
