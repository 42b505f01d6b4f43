use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Run,
    Pause,
    Stop,
}

/// Pause/resume/cancel signalling between the foreground and a scan worker.
///
/// The worker calls [`ScanControl::checkpoint`] before each directory and each
/// file. While paused it parks on a condition variable instead of polling.
pub struct ScanControl {
    flow: Mutex<Flow>,
    wake: Condvar,
}

impl ScanControl {
    pub fn new() -> Self {
        Self {
            flow: Mutex::new(Flow::Run),
            wake: Condvar::new(),
        }
    }

    fn flow(&self) -> MutexGuard<'_, Flow> {
        self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the call moved the worker from running to paused.
    pub fn pause(&self) -> bool {
        let mut flow = self.flow();
        if *flow == Flow::Run {
            *flow = Flow::Pause;
            true
        } else {
            false
        }
    }

    /// Returns `true` if the call released a paused worker.
    pub fn resume(&self) -> bool {
        let mut flow = self.flow();
        if *flow == Flow::Pause {
            *flow = Flow::Run;
            self.wake.notify_all();
            true
        } else {
            false
        }
    }

    /// Idempotent. Also releases a paused worker so it can observe the stop.
    pub fn cancel(&self) {
        let mut flow = self.flow();
        *flow = Flow::Stop;
        self.wake.notify_all();
    }

    /// Blocks while paused. Returns `false` once the worker should stop.
    pub fn checkpoint(&self) -> bool {
        let mut flow = self.flow();
        while *flow == Flow::Pause {
            flow = self
                .wake
                .wait(flow)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *flow != Flow::Stop
    }
}

impl Default for ScanControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps scan and recovery jobs from running at the same time.
#[derive(Clone, Default)]
pub struct JobGate {
    busy: Arc<AtomicBool>,
}

impl JobGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<JobGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| JobGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Releases the gate when dropped.
pub struct JobGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pause_blocks_until_resume() {
        let control = Arc::new(ScanControl::new());
        assert!(control.pause());
        assert!(!control.pause());

        let worker = {
            let control = Arc::clone(&control);
            std::thread::spawn(move || control.checkpoint())
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(!worker.is_finished());

        assert!(control.resume());
        assert!(worker.join().unwrap());
    }

    #[test]
    fn cancel_releases_paused_worker() {
        let control = Arc::new(ScanControl::new());
        control.pause();
        let worker = {
            let control = Arc::clone(&control);
            std::thread::spawn(move || control.checkpoint())
        };
        control.cancel();
        control.cancel();
        assert!(!worker.join().unwrap());
        assert!(!control.checkpoint());
        assert!(!control.resume());
    }

    #[test]
    fn gate_is_exclusive() {
        let gate = JobGate::new();
        let guard = gate.try_acquire().expect("first acquire");
        assert!(gate.try_acquire().is_none());
        assert!(gate.clone().try_acquire().is_none());
        drop(guard);
        assert!(gate.try_acquire().is_some());
    }
}
