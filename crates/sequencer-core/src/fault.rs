use thiserror::Error;

use crate::{ExecutionMode, PhaseTag};

/// Why an instruction was rejected by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionRejection {
    /// Mnemonic is not present in the catalog.
    #[error("mnemonic is not in the catalog")]
    Unknown,
    /// Definition resolved but carries no micro-steps.
    #[error("instruction has no micro-steps")]
    EmptySteps,
}

/// Host-issued sequencer commands, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Command {
    /// `select`
    Select,
    /// `start`
    Start,
    /// `step`
    Step,
    /// `resume`
    Resume,
    /// `stop`
    Stop,
    /// `run_to_completion`
    RunToCompletion,
}

impl Command {
    /// Lowercase command name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Start => "start",
            Self::Step => "step",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::RunToCompletion => "run_to_completion",
        }
    }
}

/// Errors reported synchronously by sequencer commands.
///
/// Every error leaves the sequencer exactly as it was before the command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SequencerError {
    /// The requested instruction cannot be executed.
    #[error("invalid instruction `{mnemonic}`: {reason}")]
    InvalidInstruction {
        /// Mnemonic as supplied by the caller.
        mnemonic: String,
        /// Rejection cause.
        reason: InstructionRejection,
    },
    /// The command is not supported in the current mode.
    #[error("`{}` is not valid while the sequencer is {}", .command.as_str(), .mode.as_str())]
    InvalidCommand {
        /// Rejected command.
        command: Command,
        /// Mode the sequencer was in.
        mode: ExecutionMode,
    },
}

impl SequencerError {
    pub(crate) fn unknown(mnemonic: &str) -> Self {
        Self::InvalidInstruction {
            mnemonic: mnemonic.to_owned(),
            reason: InstructionRejection::Unknown,
        }
    }
}

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Definition has no micro-steps.
    #[error("instruction `{mnemonic}` has no micro-steps")]
    EmptySteps {
        /// Offending mnemonic.
        mnemonic: String,
    },
    /// A mnemonic was inserted twice.
    #[error("instruction `{mnemonic}` is already defined")]
    DuplicateMnemonic {
        /// Offending mnemonic.
        mnemonic: String,
    },
    /// A micro-step declares a zero duration.
    #[error("step {step_id} of `{mnemonic}` has zero duration")]
    ZeroDuration {
        /// Offending mnemonic.
        mnemonic: String,
        /// 1-based micro-step id.
        step_id: usize,
    },
    /// A micro-step uses a phase outside the catalog's variant.
    #[error("step {step_id} of `{mnemonic}` uses phase `{phase}` outside the catalog variant")]
    PhaseOutsideSet {
        /// Offending mnemonic.
        mnemonic: String,
        /// 1-based micro-step id.
        step_id: usize,
        /// Phase that is not a member.
        phase: PhaseTag,
    },
    /// A micro-step moves back to an earlier phase.
    #[error("step {step_id} of `{mnemonic}` returns to earlier phase `{phase}`")]
    PhaseOutOfOrder {
        /// Offending mnemonic.
        mnemonic: String,
        /// 1-based micro-step id.
        step_id: usize,
        /// Phase that precedes its predecessor.
        phase: PhaseTag,
    },
}
