use crate::PhaseTag;

/// Sequencer state machine value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SequencerState {
    /// No step in flight. Initial and terminal state.
    #[default]
    Idle,
    /// Timed progression through `step_index`.
    Running {
        /// Index of the step in flight.
        step_index: usize,
        /// Milliseconds accumulated on this step, capped at its duration.
        elapsed_ms: u32,
    },
    /// Single-step mode; `step_index` has just been executed.
    SteppedManually {
        /// Index of the last executed step.
        step_index: usize,
    },
}

impl SequencerState {
    /// Current step index, or `None` when idle.
    #[must_use]
    pub const fn step_index(self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Running { step_index, .. } | Self::SteppedManually { step_index } => {
                Some(step_index)
            }
        }
    }

    /// Returns `true` for [`SequencerState::Idle`].
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Coarse mode of this state.
    #[must_use]
    pub const fn mode(self) -> ExecutionMode {
        match self {
            Self::Idle => ExecutionMode::Idle,
            Self::Running { .. } => ExecutionMode::Timed,
            Self::SteppedManually { .. } => ExecutionMode::Manual,
        }
    }
}

/// Coarse sequencer mode, used in snapshots and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ExecutionMode {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Timer-driven progression.
    Timed,
    /// Single-step progression.
    Manual,
}

impl ExecutionMode {
    /// Lowercase description.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Timed => "running",
            Self::Manual => "stepping manually",
        }
    }
}

/// Why the sequencer returned to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IdleCause {
    /// Final step finished and flags were computed.
    Completed,
    /// Explicit or implicit stop discarded the run.
    Stopped,
}

/// Read-only view of the execution state, delivered with every event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExecutionSnapshot {
    /// Phase of the current step, [`PhaseTag::Idle`] when idle.
    pub phase: PhaseTag,
    /// Current step index.
    pub step_index: Option<usize>,
    /// Step count of the selected instruction, 0 when none is selected.
    pub step_count: usize,
    /// Progress through the current step, `0..=100`.
    pub progress_percent: f64,
    /// Progress through the whole instruction, `0..=100`.
    pub overall_progress_percent: f64,
    /// A step is in flight under an active timer.
    pub is_running: bool,
    /// Coarse mode.
    pub mode: ExecutionMode,
}
