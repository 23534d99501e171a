//! Phase sequencer core for the single-bus CPU simulator.

/// Phase tags and per-variant phase orders.
pub mod phase;
pub use phase::{PhaseSet, PhaseTag, ALL_PHASE_TAGS};

/// Error taxonomy for commands and catalog construction.
pub mod fault;
pub use fault::{CatalogError, Command, InstructionRejection, SequencerError};

/// Instruction catalog and built-in micro-step tables.
pub mod catalog;
pub use catalog::{Catalog, InstructionDefinition, MicroStep, StepRow};

/// Arithmetic/flag unit.
pub mod alu;
pub use alu::{compare, difference, FlagState, OperandState};

/// Sequencer state machine values and snapshots.
pub mod state;
pub use state::{ExecutionMode, ExecutionSnapshot, IdleCause, SequencerState};

/// Host-facing configuration, events, and observers.
pub mod api;
pub use api::{
    EventLog, NullObserver, SequencerConfig, SequencerEvent, SequencerObserver, TICK_INTERVAL_MS,
};

/// Instruction execution state machine.
pub mod sequencer;
pub use sequencer::{Sequencer, TimerTicket};

/// Tick sources and the drive loop.
pub mod timing;
pub use timing::{drive, DriveOutcome, IntervalClock, ManualClock, TickSource};

/// Control-signal table.
pub mod signals;
pub use signals::{
    active_signals, is_active, signal_definition, signals_in, SignalCategory, SignalDefinition,
    SIGNAL_DEFINITIONS,
};

#[cfg(test)]
use proptest as _;
