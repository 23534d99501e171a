//! Host-facing configuration and notification contracts.
//!
//! Presentation layers read [`ExecutionSnapshot`]s delivered alongside each
//! [`SequencerEvent`] and never mutate sequencer state directly.

use crate::{Catalog, ExecutionSnapshot, FlagState, IdleCause, OperandState, PhaseSet, PhaseTag};

/// Default scheduler quantum between ticks.
pub const TICK_INTERVAL_MS: u32 = 50;

/// Top-level configuration for a sequencer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SequencerConfig {
    /// Simulator variant, selecting the built-in catalog.
    pub phase_set: PhaseSet,
    /// Tick quantum used by clocks built from this config.
    pub tick_interval_ms: u32,
    /// Operands latched before the host supplies its own.
    pub default_operands: OperandState,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            phase_set: PhaseSet::Classic,
            tick_interval_ms: TICK_INTERVAL_MS,
            default_operands: OperandState::default(),
        }
    }
}

impl SequencerConfig {
    /// Built-in catalog for the configured variant.
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        Catalog::for_phase_set(self.phase_set)
    }
}

/// State-change notifications, delivered in occurrence order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SequencerEvent {
    /// An instruction was selected without starting it.
    InstructionSelected {
        /// Catalog mnemonic.
        mnemonic: String,
    },
    /// A step became current. Indices are strictly increasing within a run.
    StepEntered {
        /// Index of the entered step.
        step_index: usize,
        /// Phase of the entered step.
        phase: PhaseTag,
    },
    /// Progress of the current step increased.
    ProgressAdvanced {
        /// Index of the current step.
        step_index: usize,
        /// New progress, `0..=100`.
        progress_percent: f64,
    },
    /// The arithmetic/flag unit produced a result.
    FlagsComputed {
        /// Computed flags.
        flags: FlagState,
        /// Operands the flags were computed from.
        operands: OperandState,
    },
    /// The sequencer is idle again.
    ReturnedToIdle {
        /// Completion or stop.
        cause: IdleCause,
    },
}

/// Subscriber for sequencer notifications.
pub trait SequencerObserver {
    /// Receives one event and the snapshot taken right after it.
    fn on_event(&mut self, event: &SequencerEvent, snapshot: &ExecutionSnapshot);
}

/// Observer that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SequencerObserver for NullObserver {
    fn on_event(&mut self, _event: &SequencerEvent, _snapshot: &ExecutionSnapshot) {}
}

/// Observer that records every notification in order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<(SequencerEvent, ExecutionSnapshot)>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Recorded `(event, snapshot)` pairs.
    #[must_use]
    pub fn records(&self) -> &[(SequencerEvent, ExecutionSnapshot)] {
        &self.records
    }

    /// Recorded events without snapshots.
    pub fn events(&self) -> impl Iterator<Item = &SequencerEvent> + '_ {
        self.records.iter().map(|(event, _)| event)
    }

    /// Indices from every [`SequencerEvent::StepEntered`], in order.
    #[must_use]
    pub fn entered_steps(&self) -> Vec<usize> {
        self.events()
            .filter_map(|event| match event {
                SequencerEvent::StepEntered { step_index, .. } => Some(*step_index),
                _ => None,
            })
            .collect()
    }

    /// Every flag result, in order.
    #[must_use]
    pub fn computed_flags(&self) -> Vec<FlagState> {
        self.events()
            .filter_map(|event| match event {
                SequencerEvent::FlagsComputed { flags, .. } => Some(*flags),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes and returns every record.
    pub fn drain(&mut self) -> Vec<(SequencerEvent, ExecutionSnapshot)> {
        std::mem::take(&mut self.records)
    }

    /// Forgets every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl SequencerObserver for EventLog {
    fn on_event(&mut self, event: &SequencerEvent, snapshot: &ExecutionSnapshot) {
        self.records.push((event.clone(), *snapshot));
    }
}
