use std::sync::{Condvar, Mutex, MutexGuard};

/// Result of a timer tick hitting the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The flag went from clear to set; one sample is now due.
    Armed,
    /// A sample was already due; the tick was merged into it.
    Coalesced,
    /// The flag was killed and ignores ticks.
    Rejected,
}

/// What the sampling thread woke up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Sample,
    Killed,
}

#[derive(Debug, Default)]
struct FlagState {
    /// A tick arrived and no sample has picked it up yet.
    pending: bool,
    /// The sampling thread is inside the sample operation.
    busy: bool,
    killed: bool,
}

/// Single-slot readiness signal between a timer context and a sampling
/// thread.
///
/// The flag reads as raised while a sample is due or being taken. A tick
/// that lands while a sample is in flight leaves exactly one request pending
/// for when it completes; any further ticks coalesce into that request.
#[derive(Debug, Default)]
pub struct ReadinessFlag {
    state: Mutex<FlagState>,
    wake: Condvar,
}

impl ReadinessFlag {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave FlagState half-written,
    // so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, FlagState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Called from the timer context. Never blocks beyond the lock.
    pub fn raise(&self) -> TickOutcome {
        let mut state = self.lock();
        if state.killed {
            return TickOutcome::Rejected;
        }
        if state.pending {
            return TickOutcome::Coalesced;
        }
        state.pending = true;
        drop(state);
        self.wake.notify_one();
        TickOutcome::Armed
    }

    /// Drops a pending request that no sample has picked up yet.
    pub fn clear_pending(&self) {
        self.lock().pending = false;
    }

    /// Blocks until a sample is due or the flag is killed. On `Wake::Sample`
    /// the pending request is consumed and the flag is marked busy until
    /// [`ReadinessFlag::complete`].
    pub fn wait(&self) -> Wake {
        let mut state = self.lock();
        loop {
            if state.killed {
                return Wake::Killed;
            }
            if state.pending {
                state.pending = false;
                state.busy = true;
                return Wake::Sample;
            }
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Marks the in-flight sample as finished.
    pub fn complete(&self) {
        self.lock().busy = false;
    }

    /// Permanently disables the flag and wakes the sampling thread.
    pub fn kill(&self) {
        let mut state = self.lock();
        state.killed = true;
        state.pending = false;
        drop(state);
        self.wake.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        let state = self.lock();
        state.pending || state.busy
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn is_killed(&self) -> bool {
        self.lock().killed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_tick_coalesces() {
        let flag = ReadinessFlag::new();
        assert_eq!(flag.raise(), TickOutcome::Armed);
        assert_eq!(flag.raise(), TickOutcome::Coalesced);
        assert_eq!(flag.wait(), Wake::Sample);
        assert!(flag.is_raised());
        assert!(!flag.is_pending());
        flag.complete();
        assert!(!flag.is_raised());
    }

    #[test]
    fn ticks_during_sample_leave_one_request() {
        let flag = ReadinessFlag::new();
        flag.raise();
        assert_eq!(flag.wait(), Wake::Sample);
        assert_eq!(flag.raise(), TickOutcome::Armed);
        assert_eq!(flag.raise(), TickOutcome::Coalesced);
        assert_eq!(flag.raise(), TickOutcome::Coalesced);
        flag.complete();
        assert_eq!(flag.wait(), Wake::Sample);
        flag.complete();
        assert!(!flag.is_raised());
    }

    #[test]
    fn killed_flag_never_raises() {
        let flag = ReadinessFlag::new();
        flag.raise();
        flag.kill();
        assert!(!flag.is_pending());
        assert_eq!(flag.raise(), TickOutcome::Rejected);
        assert!(!flag.is_raised());
        assert_eq!(flag.wait(), Wake::Killed);
    }

    #[test]
    fn wait_blocks_until_raised() {
        let flag = Arc::new(ReadinessFlag::new());
        let waiter = {
            let flag = Arc::clone(&flag);
            thread::spawn(move || flag.wait())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        flag.raise();
        assert_eq!(waiter.join().unwrap(), Wake::Sample);
    }

    #[test]
    fn kill_wakes_waiter() {
        let flag = Arc::new(ReadinessFlag::new());
        let waiter = {
            let flag = Arc::clone(&flag);
            thread::spawn(move || flag.wait())
        };
        thread::sleep(Duration::from_millis(10));
        flag.kill();
        assert_eq!(waiter.join().unwrap(), Wake::Killed);
    }

    #[test]
    fn clear_pending_drops_unstarted_request() {
        let flag = ReadinessFlag::new();
        flag.raise();
        flag.clear_pending();
        assert!(!flag.is_raised());
        assert_eq!(flag.raise(), TickOutcome::Armed);
    }
}
