//! Instruction catalog: mnemonic to ordered micro-step tables.
//!
//! Catalogs are validated on insertion and read-only once handed to a
//! [`crate::Sequencer`]. Adding an instruction is a pure data insertion.

use crate::{CatalogError, PhaseSet, PhaseTag, SequencerError};

/// One atomic unit of work inside a phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MicroStep {
    /// 1-based ordinal within the owning instruction.
    pub id: usize,
    /// Display name.
    pub name: String,
    /// Phase this step belongs to.
    pub phase: PhaseTag,
    /// Animated duration in milliseconds; always non-zero in a catalog.
    pub duration_ms: u32,
    /// Control signals asserted during the step, in transfer order.
    pub signals: Vec<String>,
}

impl MicroStep {
    /// Creates a micro-step from borrowed table data.
    #[must_use]
    pub fn new(id: usize, name: &str, phase: PhaseTag, duration_ms: u32, signals: &[&str]) -> Self {
        Self {
            id,
            name: name.to_owned(),
            phase,
            duration_ms,
            signals: signals.iter().map(|signal| (*signal).to_owned()).collect(),
        }
    }
}

/// Immutable micro-step program for one mnemonic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionDefinition {
    /// Unique catalog key, e.g. `CMP AX, BX`.
    pub mnemonic: String,
    /// One-line description.
    pub description: String,
    /// Ordered micro-steps.
    pub steps: Vec<MicroStep>,
}

impl InstructionDefinition {
    /// Creates a definition, numbering steps from 1 in table order.
    #[must_use]
    pub fn from_table(mnemonic: &str, description: &str, table: &[StepRow]) -> Self {
        let steps = table
            .iter()
            .enumerate()
            .map(|(index, (name, phase, duration_ms, signals))| {
                MicroStep::new(index + 1, name, *phase, *duration_ms, signals)
            })
            .collect();
        Self {
            mnemonic: mnemonic.to_owned(),
            description: description.to_owned(),
            steps,
        }
    }

    /// Number of micro-steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` when the definition has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of every step duration.
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.duration_ms)).sum()
    }

    /// Distinct phases in first-use order.
    #[must_use]
    pub fn phases(&self) -> Vec<PhaseTag> {
        let mut phases = Vec::new();
        for step in &self.steps {
            if phases.last() != Some(&step.phase) {
                phases.push(step.phase);
            }
        }
        phases
    }

    fn validate(&self, phase_set: PhaseSet) -> Result<(), CatalogError> {
        if self.steps.is_empty() {
            return Err(CatalogError::EmptySteps {
                mnemonic: self.mnemonic.clone(),
            });
        }

        let mut floor = 0;
        for step in &self.steps {
            if step.duration_ms == 0 {
                return Err(CatalogError::ZeroDuration {
                    mnemonic: self.mnemonic.clone(),
                    step_id: step.id,
                });
            }
            let Some(position) = phase_set.position(step.phase) else {
                return Err(CatalogError::PhaseOutsideSet {
                    mnemonic: self.mnemonic.clone(),
                    step_id: step.id,
                    phase: step.phase,
                });
            };
            if position < floor {
                return Err(CatalogError::PhaseOutOfOrder {
                    mnemonic: self.mnemonic.clone(),
                    step_id: step.id,
                    phase: step.phase,
                });
            }
            floor = position;
        }
        Ok(())
    }
}

/// Table row: `(name, phase, duration_ms, signals)`.
pub type StepRow = (&'static str, PhaseTag, u32, &'static [&'static str]);

/// Validated mnemonic table for one simulator variant.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Catalog {
    phase_set: PhaseSet,
    instructions: Vec<InstructionDefinition>,
}

impl Catalog {
    /// Creates an empty catalog for a variant.
    #[must_use]
    pub const fn new(phase_set: PhaseSet) -> Self {
        Self {
            phase_set,
            instructions: Vec::new(),
        }
    }

    /// Builds a catalog from definitions, stopping at the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] raised by [`Catalog::insert`].
    pub fn with_instructions(
        phase_set: PhaseSet,
        definitions: impl IntoIterator<Item = InstructionDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(phase_set);
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    /// Adds a definition after validating it against the catalog variant.
    ///
    /// # Errors
    ///
    /// Rejects empty step lists, zero durations, duplicate mnemonics, phases
    /// outside the variant, and phases that move backwards.
    pub fn insert(&mut self, definition: InstructionDefinition) -> Result<(), CatalogError> {
        definition.validate(self.phase_set)?;
        if self.find(&definition.mnemonic).is_some() {
            return Err(CatalogError::DuplicateMnemonic {
                mnemonic: definition.mnemonic,
            });
        }
        self.instructions.push(definition);
        Ok(())
    }

    /// Resolves a mnemonic (ASCII case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidInstruction`] for unknown mnemonics.
    pub fn lookup(&self, mnemonic: &str) -> Result<&InstructionDefinition, SequencerError> {
        self.find(mnemonic)
            .map(|index| &self.instructions[index])
            .ok_or_else(|| SequencerError::unknown(mnemonic))
    }

    pub(crate) fn find(&self, mnemonic: &str) -> Option<usize> {
        let needle = mnemonic.trim();
        self.instructions
            .iter()
            .position(|definition| definition.mnemonic.eq_ignore_ascii_case(needle))
    }

    pub(crate) fn get(&self, index: usize) -> Option<&InstructionDefinition> {
        self.instructions.get(index)
    }

    /// Variant whose phases every definition uses.
    #[must_use]
    pub const fn phase_set(&self) -> PhaseSet {
        self.phase_set
    }

    /// Definitions in insertion order.
    pub fn instructions(&self) -> impl Iterator<Item = &InstructionDefinition> + '_ {
        self.instructions.iter()
    }

    /// Mnemonics in insertion order.
    pub fn mnemonics(&self) -> impl Iterator<Item = &str> + '_ {
        self.instructions
            .iter()
            .map(|definition| definition.mnemonic.as_str())
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` when no definitions are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Built-in catalog for a variant.
    #[must_use]
    pub fn for_phase_set(phase_set: PhaseSet) -> Self {
        match phase_set {
            PhaseSet::Classic => Self::classic(),
            PhaseSet::SixStep => Self::six_step(),
            PhaseSet::Numbered => Self::single_bus(),
        }
    }

    /// Fetch/decode/execute/writeback programs for the general instruction set.
    #[must_use]
    pub fn classic() -> Self {
        Self::from_builtin(PhaseSet::Classic, CLASSIC_TABLE)
    }

    /// `CMP AX, BX` over the five numbered single-bus steps.
    #[must_use]
    pub fn single_bus() -> Self {
        Self::from_builtin(PhaseSet::Numbered, SINGLE_BUS_TABLE)
    }

    /// `CMP AX, BX` over the six-step IAC..DO cycle.
    #[must_use]
    pub fn six_step() -> Self {
        Self::from_builtin(PhaseSet::SixStep, SIX_STEP_TABLE)
    }

    fn from_builtin(phase_set: PhaseSet, table: &[BuiltinInstruction]) -> Self {
        // Built-in tables skip validation; `builtin_tables_validate` checks them.
        let instructions = table
            .iter()
            .map(|(mnemonic, description, steps)| {
                InstructionDefinition::from_table(mnemonic, description, steps)
            })
            .collect();
        Self {
            phase_set,
            instructions,
        }
    }
}

type BuiltinInstruction = (&'static str, &'static str, &'static [StepRow]);

const FETCH_INSTRUCTION: StepRow = (
    "Fetch Instruction",
    PhaseTag::Fetch,
    1000,
    &["PC→MAR", "MEM→MDR", "MDR→IR"],
);

const CLASSIC_TABLE: &[BuiltinInstruction] = &[
    (
        "MOV AX, BX",
        "Copy BX into AX",
        &[
            FETCH_INSTRUCTION,
            ("Decode Operands", PhaseTag::Decode, 800, &["IR→CU", "CU→RegSelect"]),
            ("Read Source", PhaseTag::Execute, 600, &["BX→TempReg"]),
            ("Write Destination", PhaseTag::Writeback, 600, &["TempReg→AX"]),
        ],
    ),
    (
        "MOV R1, (R2)",
        "Load R1 from the memory word addressed by R2",
        &[
            FETCH_INSTRUCTION,
            ("Decode Addressing", PhaseTag::Decode, 800, &["IR→CU", "CU→RegSelect"]),
            ("Read Address", PhaseTag::Execute, 600, &["R2→MAR"]),
            ("Memory Access", PhaseTag::Execute, 800, &["MEM→MDR"]),
            ("Store Data", PhaseTag::Writeback, 600, &["MDR→R1"]),
        ],
    ),
    (
        "MOV (R1), R2",
        "Store R2 into the memory word addressed by R1",
        &[
            FETCH_INSTRUCTION,
            ("Decode Addressing", PhaseTag::Decode, 800, &["IR→CU", "CU→RegSelect"]),
            ("Setup Address", PhaseTag::Execute, 600, &["R1→MAR"]),
            ("Setup Data", PhaseTag::Execute, 600, &["R2→MDR"]),
            ("Memory Write", PhaseTag::Writeback, 800, &["MDR→MEM"]),
        ],
    ),
    (
        "ADD R1, (R2)",
        "Add the memory word addressed by R2 to R1",
        &[
            FETCH_INSTRUCTION,
            ("Decode Operation", PhaseTag::Decode, 800, &["IR→CU", "CU→RegSelect"]),
            ("Read Memory Address", PhaseTag::Execute, 600, &["R2→MAR"]),
            ("Fetch Operand", PhaseTag::Execute, 800, &["MEM→MDR", "MDR→Y"]),
            (
                "ALU Addition",
                PhaseTag::Execute,
                1000,
                &["R1→ALU_A", "Y→ALU_B", "ALU_ADD"],
            ),
            ("Update Flags", PhaseTag::Execute, 400, &["ALU_FLAGS→FLAGS"]),
            ("Store Result", PhaseTag::Writeback, 600, &["ALU→R1"]),
        ],
    ),
    (
        "ADD AX, 1000H",
        "Add the immediate 1000H to AX",
        &[
            FETCH_INSTRUCTION,
            ("Fetch Immediate", PhaseTag::Fetch, 1000, &["PC+1→MAR", "MEM→MDR"]),
            ("Decode Operation", PhaseTag::Decode, 800, &["IR→CU", "MDR→Y"]),
            (
                "ALU Addition",
                PhaseTag::Execute,
                1200,
                &["AX→ALU_A", "Y→ALU_B", "ALU_ADD"],
            ),
            ("Update Flags", PhaseTag::Execute, 400, &["ALU_FLAGS→FLAGS"]),
            ("Store Result", PhaseTag::Writeback, 600, &["ALU→AX"]),
        ],
    ),
    (
        "SUB R1, R2",
        "Subtract R2 from R1",
        &[
            FETCH_INSTRUCTION,
            ("Decode Operands", PhaseTag::Decode, 800, &["IR→CU", "CU→RegSelect"]),
            ("Setup ALU", PhaseTag::Execute, 600, &["R1→ALU_A", "R2→ALU_B"]),
            ("ALU Subtraction", PhaseTag::Execute, 1000, &["ALU_SUB", "ALU→Z"]),
            ("Update Flags", PhaseTag::Execute, 400, &["ALU_FLAGS→FLAGS"]),
            ("Store Result", PhaseTag::Writeback, 600, &["Z→R1"]),
        ],
    ),
    (
        "CMP R1, R2",
        "Compare R1 with R2, updating flags only",
        &[
            FETCH_INSTRUCTION,
            ("Decode Compare", PhaseTag::Decode, 800, &["IR→CU", "CU→RegSelect"]),
            (
                "ALU Compare",
                PhaseTag::Execute,
                1000,
                &["R1→ALU_A", "R2→ALU_B", "ALU_SUB"],
            ),
            ("Update Flags Only", PhaseTag::Execute, 600, &["ALU_FLAGS→FLAGS"]),
        ],
    ),
    (
        "JMP 2000H",
        "Jump unconditionally to 2000H",
        &[
            FETCH_INSTRUCTION,
            ("Fetch Address", PhaseTag::Fetch, 1000, &["PC+1→MAR", "MEM→MDR"]),
            ("Decode Jump", PhaseTag::Decode, 800, &["IR→CU", "MDR→TEMP"]),
            ("Update PC", PhaseTag::Execute, 600, &["TEMP→PC"]),
        ],
    ),
    (
        "JZ 3000H",
        "Jump to 3000H when the zero flag is set",
        &[
            FETCH_INSTRUCTION,
            ("Fetch Address", PhaseTag::Fetch, 1000, &["PC+1→MAR", "MEM→MDR"]),
            ("Check Zero Flag", PhaseTag::Decode, 800, &["IR→CU", "FLAGS→CU"]),
            ("Conditional Jump", PhaseTag::Execute, 600, &["MDR→TEMP", "TEMP→PC"]),
        ],
    ),
];

const SINGLE_BUS_TABLE: &[BuiltinInstruction] = &[(
    "CMP AX, BX",
    "Compare accumulator with base register",
    &[
        ("Address Instruction", PhaseTag::Step1, 1000, &["PC→MAR", "PC_INC"]),
        ("Fetch Instruction", PhaseTag::Step2, 1000, &["MEM→MDR", "MDR→IR"]),
        ("Decode Compare", PhaseTag::Step3, 800, &["IR→CU", "CU→RegSelect"]),
        (
            "Load Operands",
            PhaseTag::Step4,
            1000,
            &["AX→ALU_A", "BX→Y", "Y→ALU_B"],
        ),
        (
            "Compare and Set Flags",
            PhaseTag::Step5,
            1000,
            &["ALU_SUB", "ALU_FLAGS→FLAGS"],
        ),
    ],
)];

const SIX_STEP_TABLE: &[BuiltinInstruction] = &[(
    "CMP AX, BX",
    "Compare accumulator with base register",
    &[
        ("Instruction Address Calculation", PhaseTag::Iac, 600, &["PC→MAR"]),
        (
            "Instruction Fetch",
            PhaseTag::If,
            1000,
            &["MEM→MDR", "MDR→IR", "PC_INC"],
        ),
        ("Instruction Operation Decoding", PhaseTag::Iod, 800, &["IR→CU"]),
        ("Operand Address Calculation", PhaseTag::Oac, 600, &["CU→RegSelect"]),
        ("Operand Fetch", PhaseTag::Of, 800, &["AX→ALU_A", "BX→ALU_B"]),
        ("Data Operation", PhaseTag::Do, 1000, &["ALU_SUB", "ALU_FLAGS→FLAGS"]),
    ],
)];
