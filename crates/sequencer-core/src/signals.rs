//! Control-signal definitions and the lines asserted in each classic phase.

use crate::PhaseTag;

/// Functional group of a control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SignalCategory {
    /// Memory and I/O enables.
    Memory,
    /// Bus arbitration and latching.
    Bus,
    /// Register file and pointer control.
    Register,
    /// ALU operation select.
    Alu,
    /// Control unit sequencing.
    Control,
}

impl SignalCategory {
    /// Categories in panel order.
    pub const ALL: [Self; 5] = [
        Self::Memory,
        Self::Bus,
        Self::Register,
        Self::Alu,
        Self::Control,
    ];

    /// Panel label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Memory => "Memory",
            Self::Bus => "Bus",
            Self::Register => "Register",
            Self::Alu => "ALU",
            Self::Control => "Control",
        }
    }
}

/// Named control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignalDefinition {
    /// Line name, e.g. `MEM_READ`.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Functional group.
    pub category: SignalCategory,
}

const fn signal(
    name: &'static str,
    description: &'static str,
    category: SignalCategory,
) -> SignalDefinition {
    SignalDefinition {
        name,
        description,
        category,
    }
}

/// Every control line shown on the control panel.
pub const SIGNAL_DEFINITIONS: &[SignalDefinition] = &[
    signal("MEM_READ", "Memory Read Enable", SignalCategory::Memory),
    signal("MEM_WRITE", "Memory Write Enable", SignalCategory::Memory),
    signal("IO_READ", "I/O Read Enable", SignalCategory::Memory),
    signal("IO_WRITE", "I/O Write Enable", SignalCategory::Memory),
    signal("BUS_REQ", "Bus Request", SignalCategory::Bus),
    signal("BUS_GRANT", "Bus Grant", SignalCategory::Bus),
    signal("ALE", "Address Latch Enable", SignalCategory::Bus),
    signal("REG_WRITE", "Register Write Enable", SignalCategory::Register),
    signal("REG_READ", "Register Read Enable", SignalCategory::Register),
    signal("PC_INC", "Program Counter Increment", SignalCategory::Register),
    signal("SP_DEC", "Stack Pointer Decrement", SignalCategory::Register),
    signal("ALU_ADD", "ALU Addition", SignalCategory::Alu),
    signal("ALU_SUB", "ALU Subtraction", SignalCategory::Alu),
    signal("ALU_AND", "ALU Logical AND", SignalCategory::Alu),
    signal("ALU_OR", "ALU Logical OR", SignalCategory::Alu),
    signal("DECODE", "Instruction Decode", SignalCategory::Control),
    signal("EXEC", "Execute Control", SignalCategory::Control),
    signal("HALT", "Halt Processor", SignalCategory::Control),
];

/// Lines asserted while the classic pipeline is in `phase`.
///
/// Variant-specific phases assert nothing here; their per-step transfers are
/// carried by [`crate::MicroStep::signals`].
#[must_use]
pub const fn active_signals(phase: PhaseTag) -> &'static [&'static str] {
    match phase {
        PhaseTag::Fetch => &["MEM_READ", "BUS_REQ", "ALE", "PC_INC", "REG_READ"],
        PhaseTag::Decode => &["DECODE", "REG_READ"],
        PhaseTag::Execute => &["EXEC", "ALU_ADD", "REG_READ"],
        PhaseTag::Writeback => &["REG_WRITE", "MEM_WRITE"],
        _ => &[],
    }
}

/// Returns `true` when `name` is asserted during `phase`.
#[must_use]
pub fn is_active(name: &str, phase: PhaseTag) -> bool {
    active_signals(phase).iter().any(|signal| *signal == name)
}

/// Definitions belonging to `category`, in table order.
pub fn signals_in(category: SignalCategory) -> impl Iterator<Item = &'static SignalDefinition> {
    SIGNAL_DEFINITIONS
        .iter()
        .filter(move |definition| definition.category == category)
}

/// Looks up a definition by line name.
#[must_use]
pub fn signal_definition(name: &str) -> Option<&'static SignalDefinition> {
    SIGNAL_DEFINITIONS
        .iter()
        .find(|definition| definition.name == name)
}
