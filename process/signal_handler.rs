use std::{
    process,
    sync::{atomic::AtomicBool, Arc, LazyLock, Mutex},
    thread,
};

use log::{error, trace, warn};
use nix::{
    libc::{SIGABRT, SIGCONT, SIGHUP, SIGTSTP},
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use signal_hook::{
    consts::TERM_SIGNALS,
    flag,
    iterator::{exfiltrator::WithOrigin, SignalsInfo},
    low_level,
};

use crate::logging::Logger;

/// Tool processes that are currently running.
static CHILD_PIDS: LazyLock<Mutex<Vec<i32>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Runs `app_exec` on its own thread while this thread
/// listens for signals.
///
/// A termination signal is passed on to every running
/// tool before exiting with code 1. A second one kills
/// relkit right away. Stop and continue are passed on
/// so a suspended run suspends its tools too.
///
/// The process exits once `app_exec` returns, with code 2
/// if it panicked.
///
/// # Panics
/// Will panic if the signal handlers can't be registered.
pub fn init<F>(app_exec: F)
where
    F: FnOnce() + Send + 'static,
{
    let terminating = Arc::new(AtomicBool::new(false));
    for &sig in TERM_SIGNALS {
        // Armed by the first signal, fires on the second.
        flag::register_conditional_shutdown(sig, 1, Arc::clone(&terminating))
            .expect("Should register shutdown on repeated signal");
        flag::register(sig, Arc::clone(&terminating)).expect("Should register signal flag");
    }

    let mut watched = vec![SIGABRT, SIGHUP, SIGTSTP, SIGCONT];
    watched.extend_from_slice(TERM_SIGNALS);
    let mut signals =
        SignalsInfo::<WithOrigin>::new(watched).expect("Should listen for signals");

    thread::spawn(move || process::exit(run_app(app_exec)));

    let mut stopped = false;
    for info in &mut signals {
        trace!("Received signal {info:?}");

        match info.signal {
            sig if TERM_SIGNALS.contains(&sig) => {
                warn!("Received termination signal, stopping running tools...");
                let _ = Logger::multi_progress().clear();
                signal_children(sig);
                process::exit(1);
            }
            SIGTSTP if !stopped => {
                signal_children(SIGTSTP);
                stopped = true;
                low_level::emulate_default_handler(SIGTSTP).expect("Should stop");
            }
            SIGCONT if stopped => {
                signal_children(SIGCONT);
                stopped = false;
            }
            _ => {}
        }
    }
}

/// Waits for `app_exec` on a thread of its own and
/// returns the code the process should exit with.
fn run_app<F>(app_exec: F) -> i32
where
    F: FnOnce() + Send + 'static,
{
    match thread::spawn(app_exec).join() {
        Ok(()) => 0,
        Err(_) => {
            error!("App thread panicked");
            2
        }
    }
}

fn signal_children(sig: i32) {
    let Ok(signal) = Signal::try_from(sig) else {
        error!("Unknown signal {sig}");
        return;
    };

    let pids = CHILD_PIDS.lock().expect("Should lock child pids");
    for &pid in pids.iter() {
        match kill(Pid::from_raw(pid), signal) {
            Ok(()) => trace!("Sent {signal} to {pid}"),
            Err(e) => error!("Failed to send {signal} to {pid}: {e}"),
        }
    }
}

/// Tracks a spawned tool so it receives
/// forwarded signals.
///
/// # Panics
/// Will panic if the pid list mutex is poisoned.
pub fn add_pid<T>(pid: T)
where
    T: TryInto<i32>,
{
    let Ok(pid) = pid.try_into() else {
        return;
    };

    let mut pids = CHILD_PIDS.lock().expect("Should lock child pids");
    if !pids.contains(&pid) {
        pids.push(pid);
    }
}

/// Stops tracking a tool once it has exited.
///
/// # Panics
/// Will panic if the pid list mutex is poisoned.
pub fn remove_pid<T>(pid: T)
where
    T: TryInto<i32>,
{
    let Ok(pid) = pid.try_into() else {
        return;
    };

    CHILD_PIDS
        .lock()
        .expect("Should lock child pids")
        .retain(|tracked| *tracked != pid);
}

#[cfg(test)]
mod test {
    use super::{add_pid, remove_pid, run_app, CHILD_PIDS};

    #[test]
    fn app_result_sets_exit_code() {
        assert_eq!(run_app(|| {}), 0);
        assert_eq!(run_app(|| panic!("boom")), 2);
    }

    #[test]
    fn pids_are_tracked_once() {
        // Far outside any real pid range so other tests don't collide.
        const PID: i32 = i32::MAX - 7;

        add_pid(PID);
        add_pid(PID);
        assert_eq!(
            CHILD_PIDS.lock().unwrap().iter().filter(|p| **p == PID).count(),
            1
        );

        remove_pid(PID);
        assert!(!CHILD_PIDS.lock().unwrap().contains(&PID));
    }

    #[test]
    fn unrepresentable_pid_is_ignored() {
        add_pid(u64::MAX);
        remove_pid(u64::MAX);
    }
}
