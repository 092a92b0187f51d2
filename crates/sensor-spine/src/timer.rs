//! Timer sources that drive a sampling engine.
//!
//! A timer source invokes a handler on a fixed period until detached. The
//! handler runs on the timer's own context and must return quickly; the
//! engine's handler only raises the readiness flag.

use std::io;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub type TickHandler = Arc<dyn Fn() + Send + Sync>;

pub trait TimerSource: Send {
    /// Arms the timer. Attaching an already attached timer re-arms it with
    /// the new period and handler; the tick schedule restarts from now.
    fn attach(&mut self, period: Duration, handler: TickHandler) -> io::Result<()>;

    /// Disarms the timer. No-op when not attached.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;
}

impl TimerSource for Box<dyn TimerSource> {
    fn attach(&mut self, period: Duration, handler: TickHandler) -> io::Result<()> {
        (**self).attach(period, handler)
    }

    fn detach(&mut self) {
        (**self).detach()
    }

    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }
}

struct Ticking {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Timer source backed by a dedicated ticker thread.
pub struct ThreadTicker {
    name: String,
    ticking: Option<Ticking>,
}

impl ThreadTicker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticking: None,
        }
    }
}

impl Default for ThreadTicker {
    fn default() -> Self {
        Self::new("ticker")
    }
}

impl TimerSource for ThreadTicker {
    fn attach(&mut self, period: Duration, handler: TickHandler) -> io::Result<()> {
        if period.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "ticker period must be non-zero",
            ));
        }
        self.detach();

        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || ticker_loop(period, handler, stop_rx))?;

        log::debug!("{} attached with period {:?}", self.name, period);
        self.ticking = Some(Ticking { stop_tx, handle });
        Ok(())
    }

    fn detach(&mut self) {
        let Some(ticking) = self.ticking.take() else {
            return;
        };
        // the ticker also exits on a disconnected channel, so a failed send is fine
        let _ = ticking.stop_tx.send(());
        if ticking.handle.thread().id() == thread::current().id() {
            return;
        }
        if let Err(err) = ticking.handle.join() {
            log::warn!("failed to join {} thread: {:?}", self.name, err);
        }
        log::debug!("{} detached", self.name);
    }

    fn is_attached(&self) -> bool {
        self.ticking.is_some()
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.detach();
    }
}

fn ticker_loop(period: Duration, handler: TickHandler, stop_rx: mpsc::Receiver<()>) {
    let mut next_tick = Instant::now() + period;

    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(timeout) {
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        handler();
        next_tick += period;

        // Deadlines that already passed are dropped rather than fired in a burst.
        let now = Instant::now();
        if now > next_tick {
            let missed = (now - next_tick).as_nanos() / period.as_nanos() + 1;
            next_tick += period * missed as u32;
            log::debug!("ticker lagging, skipped {} deadlines", missed);
        }
    }
}

#[derive(Default)]
struct ManualSlot {
    handler: Option<TickHandler>,
    period: Option<Duration>,
    attach_count: u32,
}

/// Timer source whose ticks are fired by hand through a [`ManualTrigger`].
///
/// Useful for hosts that own their own tick source, and for deterministic
/// tests.
pub struct ManualTimer {
    slot: Arc<Mutex<ManualSlot>>,
}

/// Handle that fires a [`ManualTimer`] from outside the engine.
#[derive(Clone)]
pub struct ManualTrigger {
    slot: Arc<Mutex<ManualSlot>>,
}

impl ManualTimer {
    pub fn new() -> (ManualTimer, ManualTrigger) {
        let slot = Arc::new(Mutex::new(ManualSlot::default()));
        (
            ManualTimer {
                slot: Arc::clone(&slot),
            },
            ManualTrigger { slot },
        )
    }
}

fn lock_slot(slot: &Mutex<ManualSlot>) -> std::sync::MutexGuard<'_, ManualSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TimerSource for ManualTimer {
    fn attach(&mut self, period: Duration, handler: TickHandler) -> io::Result<()> {
        let mut slot = lock_slot(&self.slot);
        slot.handler = Some(handler);
        slot.period = Some(period);
        slot.attach_count += 1;
        Ok(())
    }

    fn detach(&mut self) {
        let mut slot = lock_slot(&self.slot);
        slot.handler = None;
        slot.period = None;
    }

    fn is_attached(&self) -> bool {
        lock_slot(&self.slot).handler.is_some()
    }
}

impl ManualTrigger {
    /// Invokes the handler once. Returns false when the timer is detached.
    pub fn fire(&self) -> bool {
        // cloned out so the handler never runs under the slot lock
        let handler = lock_slot(&self.slot).handler.clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    pub fn fire_n(&self, n: usize) -> usize {
        (0..n).filter(|_| self.fire()).count()
    }

    pub fn is_attached(&self) -> bool {
        lock_slot(&self.slot).handler.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        lock_slot(&self.slot).period
    }

    pub fn attach_count(&self) -> u32 {
        lock_slot(&self.slot).attach_count
    }
}
