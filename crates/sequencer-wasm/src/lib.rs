use sequencer_core::{
    active_signals, difference, EventLog, ExecutionSnapshot, FlagState, InstructionDefinition,
    MicroStep, OperandState, PhaseSet, PhaseTag, Sequencer, SequencerConfig, SequencerEvent,
    SIGNAL_DEFINITIONS,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&JsValue::from_str(&format!($($t)*))))
}

/// JS-facing catalog entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct WasmInstruction {
    pub mnemonic: String,
    pub description: String,
    pub total_duration_ms: u64,
    pub steps: Vec<MicroStep>,
}

impl From<&InstructionDefinition> for WasmInstruction {
    fn from(definition: &InstructionDefinition) -> Self {
        Self {
            mnemonic: definition.mnemonic.clone(),
            description: definition.description.clone(),
            total_duration_ms: definition.total_duration_ms(),
            steps: definition.steps.clone(),
        }
    }
}

/// One drained notification with the snapshot taken when it fired.
#[derive(Debug, Serialize, Deserialize)]
pub struct WasmEventRecord {
    pub event: SequencerEvent,
    pub snapshot: ExecutionSnapshot,
}

/// Result of an instant run.
#[derive(Debug, Serialize, Deserialize)]
pub struct WasmRunResult {
    pub flags: FlagState,
    pub flag_bits: u16,
    pub operands: OperandState,
    pub difference: i32,
}

impl WasmRunResult {
    fn new(flags: FlagState, operands: OperandState) -> Self {
        Self {
            flags,
            flag_bits: flags.bits(),
            operands,
            difference: difference(operands.operand_a, operands.operand_b),
        }
    }
}

#[wasm_bindgen]
pub struct WasmSequencer {
    inner: Sequencer<EventLog>,
}

impl WasmSequencer {
    fn with_variant(variant: &str) -> Result<Self, String> {
        let phase_set =
            PhaseSet::from_name(variant).ok_or_else(|| format!("unknown variant: {variant}"))?;
        let config = SequencerConfig {
            phase_set,
            ..SequencerConfig::default()
        };
        Ok(Self {
            inner: Sequencer::new(config.catalog(), config, EventLog::new()),
        })
    }

    fn catalog_entries(&self) -> Vec<WasmInstruction> {
        self.inner
            .catalog()
            .instructions()
            .map(WasmInstruction::from)
            .collect()
    }

    fn take_events(&mut self) -> Vec<WasmEventRecord> {
        self.inner
            .observer_mut()
            .drain()
            .into_iter()
            .map(|(event, snapshot)| WasmEventRecord { event, snapshot })
            .collect()
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    Ok(serde_wasm_bindgen::to_value(value)?)
}

#[wasm_bindgen]
impl WasmSequencer {
    /// Creates an idle sequencer over the built-in catalog of `variant`
    /// (`classic`, `single-bus`, or `six-step`; defaults to `classic`).
    #[wasm_bindgen(constructor)]
    pub fn new(variant: Option<String>) -> Result<Self, JsError> {
        console_error_panic_hook::set_once();
        let variant = variant.as_deref().unwrap_or("classic");
        let sequencer = Self::with_variant(variant).map_err(|msg| JsError::new(&msg))?;
        console_log!(
            "{} catalog loaded ({} instructions)",
            sequencer.inner.config().phase_set,
            sequencer.inner.catalog().len()
        );
        Ok(sequencer)
    }

    /// Mnemonics in catalog order.
    pub fn mnemonics(&self) -> js_sys::Array {
        self.inner
            .catalog()
            .mnemonics()
            .map(JsValue::from_str)
            .collect()
    }

    /// Full catalog with micro-steps as an array of objects.
    pub fn instructions(&self) -> Result<JsValue, JsError> {
        to_js(&self.catalog_entries())
    }

    pub fn select(&mut self, mnemonic: &str) -> Result<(), JsError> {
        self.inner.select(mnemonic)?;
        Ok(())
    }

    /// Starts timed execution; the host then calls `tick` from its timer.
    pub fn start(&mut self, mnemonic: &str) -> Result<(), JsError> {
        self.inner.start(mnemonic)?;
        Ok(())
    }

    /// Advances the armed timer. Returns `false` once no timer is armed, at
    /// which point the host should clear its interval.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        self.inner.tick(elapsed_ms)
    }

    pub fn step(&mut self) {
        self.inner.step();
    }

    pub fn resume(&mut self) -> Result<(), JsError> {
        self.inner.resume()?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn set_operands(&mut self, operand_a: u16, operand_b: u16) {
        self.inner
            .set_operands(OperandState::new(operand_a, operand_b));
    }

    /// Computes the result immediately and returns flags with the operands.
    pub fn run_to_completion(
        &mut self,
        mnemonic: &str,
        operand_a: u16,
        operand_b: u16,
    ) -> Result<JsValue, JsError> {
        let operands = OperandState::new(operand_a, operand_b);
        let flags = self.inner.run_to_completion(mnemonic, operands)?;
        to_js(&WasmRunResult::new(flags, operands))
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Suggested `setInterval` period in milliseconds.
    pub fn tick_interval_ms(&self) -> u32 {
        self.inner.config().tick_interval_ms
    }

    pub fn snapshot(&self) -> Result<JsValue, JsError> {
        to_js(&self.inner.snapshot())
    }

    /// Returns and clears every notification recorded since the last drain.
    pub fn drain_events(&mut self) -> Result<JsValue, JsError> {
        to_js(&self.take_events())
    }

    /// Control-signal table for the panel.
    pub fn signal_table(&self) -> Result<JsValue, JsError> {
        to_js(&SIGNAL_DEFINITIONS)
    }

    /// Lines asserted during `phase`; empty for unknown or idle phases.
    pub fn active_signals(&self, phase: &str) -> js_sys::Array {
        PhaseTag::parse(phase)
            .map_or(&[][..], active_signals)
            .iter()
            .map(|name| JsValue::from_str(name))
            .collect()
    }
}
