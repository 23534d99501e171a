//! Phase tags and the ordered phase sets used by each simulator variant.

use std::fmt;

/// Named stage of instruction execution.
///
/// The enum is closed over every tag any variant uses. [`PhaseTag::Idle`] is
/// the universal rest state and never belongs to a [`PhaseSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PhaseTag {
    /// No instruction in flight.
    #[default]
    Idle,
    /// Instruction fetch.
    Fetch,
    /// Instruction decode.
    Decode,
    /// Execute.
    Execute,
    /// Write back.
    Writeback,
    /// Instruction address calculation.
    Iac,
    /// Instruction fetch (six-step model).
    If,
    /// Instruction operation decoding.
    Iod,
    /// Operand address calculation.
    Oac,
    /// Operand fetch.
    Of,
    /// Data operation.
    Do,
    /// Numbered step 1.
    Step1,
    /// Numbered step 2.
    Step2,
    /// Numbered step 3.
    Step3,
    /// Numbered step 4.
    Step4,
    /// Numbered step 5.
    Step5,
}

impl PhaseTag {
    /// Short lowercase tag as used in catalog tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetch => "fetch",
            Self::Decode => "decode",
            Self::Execute => "execute",
            Self::Writeback => "writeback",
            Self::Iac => "iac",
            Self::If => "if",
            Self::Iod => "iod",
            Self::Oac => "oac",
            Self::Of => "of",
            Self::Do => "do",
            Self::Step1 => "step1",
            Self::Step2 => "step2",
            Self::Step3 => "step3",
            Self::Step4 => "step4",
            Self::Step5 => "step5",
        }
    }

    /// Human-readable label for panels and listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Fetch => "Instruction Fetch",
            Self::Decode => "Instruction Decode",
            Self::Execute => "Execute",
            Self::Writeback => "Write Back",
            Self::Iac => "Instruction Address Calculation",
            Self::If => "Instruction Fetch",
            Self::Iod => "Instruction Operation Decoding",
            Self::Oac => "Operand Address Calculation",
            Self::Of => "Operand Fetch",
            Self::Do => "Data Operation",
            Self::Step1 => "Step 1",
            Self::Step2 => "Step 2",
            Self::Step3 => "Step 3",
            Self::Step4 => "Step 4",
            Self::Step5 => "Step 5",
        }
    }

    /// Parses a tag case-insensitively.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        ALL_PHASE_TAGS
            .iter()
            .copied()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every phase tag in declaration order.
pub const ALL_PHASE_TAGS: &[PhaseTag] = &[
    PhaseTag::Idle,
    PhaseTag::Fetch,
    PhaseTag::Decode,
    PhaseTag::Execute,
    PhaseTag::Writeback,
    PhaseTag::Iac,
    PhaseTag::If,
    PhaseTag::Iod,
    PhaseTag::Oac,
    PhaseTag::Of,
    PhaseTag::Do,
    PhaseTag::Step1,
    PhaseTag::Step2,
    PhaseTag::Step3,
    PhaseTag::Step4,
    PhaseTag::Step5,
];

const CLASSIC_PHASES: &[PhaseTag] = &[
    PhaseTag::Fetch,
    PhaseTag::Decode,
    PhaseTag::Execute,
    PhaseTag::Writeback,
];

const SIX_STEP_PHASES: &[PhaseTag] = &[
    PhaseTag::Iac,
    PhaseTag::If,
    PhaseTag::Iod,
    PhaseTag::Oac,
    PhaseTag::Of,
    PhaseTag::Do,
];

const NUMBERED_PHASES: &[PhaseTag] = &[
    PhaseTag::Step1,
    PhaseTag::Step2,
    PhaseTag::Step3,
    PhaseTag::Step4,
    PhaseTag::Step5,
];

/// Strictly ordered phase sequence declared by one simulator variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PhaseSet {
    /// `fetch`, `decode`, `execute`, `writeback`.
    #[default]
    Classic,
    /// `iac`, `if`, `iod`, `oac`, `of`, `do`.
    SixStep,
    /// `step1` through `step5`.
    Numbered,
}

impl PhaseSet {
    /// Phases of this variant in execution order.
    #[must_use]
    pub const fn phases(self) -> &'static [PhaseTag] {
        match self {
            Self::Classic => CLASSIC_PHASES,
            Self::SixStep => SIX_STEP_PHASES,
            Self::Numbered => NUMBERED_PHASES,
        }
    }

    /// Position of `phase` in this variant's order, if it is a member.
    #[must_use]
    pub fn position(self, phase: PhaseTag) -> Option<usize> {
        self.phases().iter().position(|member| *member == phase)
    }

    /// Returns `true` when `phase` belongs to this variant.
    #[must_use]
    pub fn contains(self, phase: PhaseTag) -> bool {
        self.position(phase).is_some()
    }

    /// Stable name used on the command line and in bindings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::SixStep => "six-step",
            Self::Numbered => "single-bus",
        }
    }

    /// Resolves a variant from its stable name or a common alias.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "classic" | "fdew" => Some(Self::Classic),
            "six-step" | "six_step" | "sixstep" | "6" => Some(Self::SixStep),
            "single-bus" | "single_bus" | "numbered" | "5" => Some(Self::Numbered),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
