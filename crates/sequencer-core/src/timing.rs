//! Tick sources feeding [`Sequencer::tick_timer`].
//!
//! The sequencer never reads wall-clock time itself. A [`TickSource`] reports
//! elapsed milliseconds and [`drive`] pumps them into the sequencer, so tests
//! inject synthetic ticks while front ends use [`IntervalClock`].

use std::thread;
use std::time::{Duration, Instant};

use crate::{Sequencer, SequencerObserver, TICK_INTERVAL_MS};

/// Periodic source of elapsed-time ticks.
pub trait TickSource {
    /// Blocks until the next tick and returns milliseconds since the previous
    /// one. Must eventually return non-zero values for [`drive`] to finish.
    fn next_tick(&mut self) -> u32;
}

/// Synthetic clock returning a fixed quantum without sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualClock {
    quantum_ms: u32,
    ticks: u64,
}

impl ManualClock {
    /// Creates a clock with the given quantum; zero is raised to 1 ms.
    #[must_use]
    pub fn new(quantum_ms: u32) -> Self {
        Self {
            quantum_ms: quantum_ms.max(1),
            ticks: 0,
        }
    }

    /// Ticks produced so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Synthetic milliseconds produced so far.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.ticks * u64::from(self.quantum_ms)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(TICK_INTERVAL_MS)
    }
}

impl TickSource for ManualClock {
    fn next_tick(&mut self) -> u32 {
        self.ticks += 1;
        self.quantum_ms
    }
}

/// Wall-clock source sleeping one interval per tick.
#[derive(Debug, Clone, Copy)]
pub struct IntervalClock {
    interval: Duration,
    last: Instant,
}

impl IntervalClock {
    /// Creates a clock ticking every `interval_ms` (at least 1 ms).
    #[must_use]
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval: Duration::from_millis(u64::from(interval_ms.max(1))),
            last: Instant::now(),
        }
    }
}

impl TickSource for IntervalClock {
    fn next_tick(&mut self) -> u32 {
        thread::sleep(self.interval);
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX)
    }
}

/// Result of [`drive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveOutcome {
    /// Ticks delivered to the sequencer.
    pub ticks: u64,
    /// The run reached flag computation.
    pub completed: bool,
}

/// Pumps ticks into the currently armed timer until it is cancelled or the
/// run completes. Ticks are delivered against the ticket captured on entry.
pub fn drive<O, S>(sequencer: &mut Sequencer<O>, source: &mut S) -> DriveOutcome
where
    O: SequencerObserver,
    S: TickSource + ?Sized,
{
    let Some(ticket) = sequencer.timer() else {
        return DriveOutcome::default();
    };
    let runs_before = sequencer.completed_runs();
    let mut ticks = 0;

    while sequencer.timer() == Some(ticket) {
        let elapsed = source.next_tick();
        if !sequencer.tick_timer(ticket, elapsed) {
            break;
        }
        ticks += 1;
    }

    DriveOutcome {
        ticks,
        completed: sequencer.completed_runs() > runs_before,
    }
}
