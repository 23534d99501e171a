//! Phase sequencer: the instruction execution state machine.
//!
//! The sequencer owns the only mutable execution state. Commands take
//! `&mut self`, so a command can never interleave with a tick. Every state
//! change is reported to the observer together with a fresh snapshot.
//!
//! Manual steps execute a whole micro-step per call: `steps.len()` calls of
//! [`Sequencer::step`] from idle run one instruction to completion.

#![allow(clippy::cast_precision_loss)]

use crate::{
    alu, Catalog, Command, ExecutionSnapshot, FlagState, IdleCause, InstructionDefinition,
    InstructionRejection, MicroStep, NullObserver, OperandState, PhaseTag, SequencerConfig,
    SequencerError, SequencerEvent, SequencerObserver, SequencerState,
};

/// Handle for one armed timer generation.
///
/// Any command that cancels or re-arms the timer invalidates older tickets,
/// so a tick scheduled before `stop()` can never mutate a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket(u64);

impl TimerTicket {
    /// Generation number of this ticket.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Single-instruction phase sequencer.
#[derive(Debug)]
pub struct Sequencer<O = NullObserver> {
    catalog: Catalog,
    config: SequencerConfig,
    selected: Option<usize>,
    state: SequencerState,
    timer: Option<TimerTicket>,
    generation: u64,
    operands: OperandState,
    flags: Option<FlagState>,
    completed_runs: u64,
    observer: O,
}

impl Sequencer<NullObserver> {
    /// Sequencer over the configured built-in catalog without an observer.
    #[must_use]
    pub fn with_config(config: SequencerConfig) -> Self {
        Self::new(config.catalog(), config, NullObserver)
    }
}

impl<O: SequencerObserver> Sequencer<O> {
    /// Creates an idle sequencer over `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog, config: SequencerConfig, observer: O) -> Self {
        Self {
            catalog,
            operands: config.default_operands,
            config,
            selected: None,
            state: SequencerState::Idle,
            timer: None,
            generation: 0,
            flags: None,
            completed_runs: 0,
            observer,
        }
    }

    /// Selects an instruction without starting it.
    ///
    /// An active run is stopped first.
    ///
    /// # Errors
    ///
    /// [`SequencerError::InvalidInstruction`] for unknown or empty
    /// instructions; state is left unchanged.
    pub fn select(&mut self, mnemonic: &str) -> Result<(), SequencerError> {
        let index = self.resolve(Command::Select, mnemonic)?;
        self.stop();
        self.selected = Some(index);
        let mnemonic = self.catalog.get(index).map_or_else(String::new, |definition| {
            definition.mnemonic.clone()
        });
        log::debug!("selected `{mnemonic}`");
        self.emit(SequencerEvent::InstructionSelected { mnemonic });
        Ok(())
    }

    /// Starts timed execution of `mnemonic` at step 0.
    ///
    /// An active run is stopped first; its flags are never computed.
    ///
    /// # Errors
    ///
    /// [`SequencerError::InvalidInstruction`] for unknown or empty
    /// instructions; state is left unchanged.
    pub fn start(&mut self, mnemonic: &str) -> Result<TimerTicket, SequencerError> {
        let index = self.resolve(Command::Start, mnemonic)?;
        self.stop();
        self.selected = Some(index);
        log::debug!("start `{}`", mnemonic.trim());
        Ok(self.enter_timed(0))
    }

    /// Advances the armed timer by `elapsed_ms`.
    ///
    /// Returns `false` when no timer is armed.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        match self.timer {
            Some(ticket) => self.tick_timer(ticket, elapsed_ms),
            None => false,
        }
    }

    /// Advances the timer identified by `ticket` by `elapsed_ms`.
    ///
    /// Progress grows by `elapsed / duration × 100`, clamped to 100, and at
    /// most one step completes per tick. Returns `false` without touching any
    /// state when the ticket is stale.
    pub fn tick_timer(&mut self, ticket: TimerTicket, elapsed_ms: u32) -> bool {
        if self.timer != Some(ticket) {
            return false;
        }
        let SequencerState::Running {
            step_index,
            elapsed_ms: accumulated,
        } = self.state
        else {
            return false;
        };
        let Some(duration) = self.step_at(step_index).map(|step| step.duration_ms) else {
            return false;
        };

        let accumulated_now = accumulated.saturating_add(elapsed_ms).min(duration);
        if accumulated_now > accumulated {
            self.state = SequencerState::Running {
                step_index,
                elapsed_ms: accumulated_now,
            };
            let progress_percent = self.progress_percent();
            self.emit(SequencerEvent::ProgressAdvanced {
                step_index,
                progress_percent,
            });
        }
        if accumulated_now >= duration {
            self.advance_from(step_index, true);
        }
        true
    }

    /// Executes one whole micro-step.
    ///
    /// From idle executes step 0; from a timed run completes the current step
    /// and switches to manual mode; from manual mode executes the next step.
    /// Executing the final step computes flags and returns to idle. Without a
    /// selected instruction this is a no-op.
    pub fn step(&mut self) {
        if self.selected_definition().is_none() {
            log::debug!("step ignored: no instruction selected");
            return;
        }
        self.timer = None;

        match self.state {
            SequencerState::Running { step_index, .. } => {
                self.state = SequencerState::SteppedManually { step_index };
                self.emit(SequencerEvent::ProgressAdvanced {
                    step_index,
                    progress_percent: 100.0,
                });
                self.advance_from(step_index, false);
            }
            SequencerState::Idle => self.execute_manual(0),
            SequencerState::SteppedManually { step_index } => {
                self.execute_manual(step_index + 1);
            }
        }
    }

    /// Returns from manual mode to timed progression at the next step.
    ///
    /// # Errors
    ///
    /// [`SequencerError::InvalidCommand`] unless the sequencer is stepping
    /// manually.
    pub fn resume(&mut self) -> Result<TimerTicket, SequencerError> {
        let SequencerState::SteppedManually { step_index } = self.state else {
            let err = SequencerError::InvalidCommand {
                command: Command::Resume,
                mode: self.state.mode(),
            };
            log::warn!("{err}");
            return Err(err);
        };
        Ok(self.enter_timed(step_index + 1))
    }

    /// Cancels any timer and returns to idle without computing flags.
    ///
    /// No-op when already idle.
    pub fn stop(&mut self) {
        if self.state.is_idle() {
            return;
        }
        self.timer = None;
        self.state = SequencerState::Idle;
        log::debug!("stopped");
        self.emit(SequencerEvent::ReturnedToIdle {
            cause: IdleCause::Stopped,
        });
    }

    /// Computes the result of `mnemonic` immediately, skipping every phase.
    ///
    /// Any active run is stopped first. Leaves the sequencer idle with the
    /// instruction selected and `operands` latched.
    ///
    /// # Errors
    ///
    /// [`SequencerError::InvalidInstruction`] for unknown or empty
    /// instructions; state is left unchanged.
    pub fn run_to_completion(
        &mut self,
        mnemonic: &str,
        operands: OperandState,
    ) -> Result<FlagState, SequencerError> {
        let index = self.resolve(Command::RunToCompletion, mnemonic)?;
        self.stop();
        self.selected = Some(index);
        self.operands = operands;
        Ok(self.compute_flags())
    }

    /// Latches the operands read by the next flag computation.
    pub fn set_operands(&mut self, operands: OperandState) {
        self.operands = operands;
    }

    /// Snapshot of the current execution state.
    #[must_use]
    pub fn snapshot(&self) -> ExecutionSnapshot {
        let step_count = self.selected_definition().map_or(0, InstructionDefinition::len);
        let step_index = self.state.step_index();
        let phase = step_index
            .and_then(|index| self.step_at(index))
            .map_or(PhaseTag::Idle, |step| step.phase);
        let progress_percent = self.progress_percent();
        let overall_progress_percent = match step_index {
            Some(index) if step_count > 0 => {
                (index as f64).mul_add(100.0, progress_percent) / step_count as f64
            }
            _ => 0.0,
        };

        ExecutionSnapshot {
            phase,
            step_index,
            step_count,
            progress_percent,
            overall_progress_percent,
            is_running: self.is_running(),
            mode: self.state.mode(),
        }
    }

    /// State machine value.
    #[must_use]
    pub const fn state(&self) -> SequencerState {
        self.state
    }

    /// `true` while a step is in flight under an armed timer.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, SequencerState::Running { .. }) && self.timer.is_some()
    }

    /// Currently armed timer, if any.
    #[must_use]
    pub const fn timer(&self) -> Option<TimerTicket> {
        self.timer
    }

    /// Selected instruction, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&InstructionDefinition> {
        self.selected_definition()
    }

    /// Step currently in flight or last executed manually.
    #[must_use]
    pub fn current_step(&self) -> Option<&MicroStep> {
        self.state
            .step_index()
            .and_then(|index| self.step_at(index))
    }

    /// Read-only catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Configuration this sequencer was built with.
    #[must_use]
    pub const fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Latched operands.
    #[must_use]
    pub const fn operands(&self) -> OperandState {
        self.operands
    }

    /// Most recent flag result.
    #[must_use]
    pub const fn flags(&self) -> Option<FlagState> {
        self.flags
    }

    /// Number of instructions that reached flag computation.
    #[must_use]
    pub const fn completed_runs(&self) -> u64 {
        self.completed_runs
    }

    /// Observer receiving notifications.
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// Mutable access to the observer.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Consumes the sequencer, returning its observer.
    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Maps `mnemonic` to a catalog index. `Catalog::insert` already rejects
    /// empty step lists, so the `EmptySteps` arm only fires if that
    /// validation is bypassed.
    fn resolve(&self, command: Command, mnemonic: &str) -> Result<usize, SequencerError> {
        let result = self.catalog.find(mnemonic).map_or_else(
            || Err(SequencerError::unknown(mnemonic)),
            |index| match self.catalog.get(index) {
                Some(definition) if !definition.is_empty() => Ok(index),
                _ => Err(SequencerError::InvalidInstruction {
                    mnemonic: mnemonic.to_owned(),
                    reason: InstructionRejection::EmptySteps,
                }),
            },
        );
        if let Err(err) = &result {
            log::warn!("{} rejected: {err}", command.as_str());
        }
        result
    }

    fn selected_definition(&self) -> Option<&InstructionDefinition> {
        self.selected.and_then(|index| self.catalog.get(index))
    }

    fn step_at(&self, index: usize) -> Option<&MicroStep> {
        self.selected_definition()
            .and_then(|definition| definition.steps.get(index))
    }

    fn is_final(&self, index: usize) -> bool {
        self.selected_definition()
            .is_none_or(|definition| index + 1 >= definition.len())
    }

    fn progress_percent(&self) -> f64 {
        match self.state {
            SequencerState::Idle => 0.0,
            SequencerState::SteppedManually { .. } => 100.0,
            SequencerState::Running {
                step_index,
                elapsed_ms,
            } => self.step_at(step_index).map_or(0.0, |step| {
                (f64::from(elapsed_ms) * 100.0 / f64::from(step.duration_ms)).min(100.0)
            }),
        }
    }

    fn arm_timer(&mut self) -> TimerTicket {
        self.generation += 1;
        let ticket = TimerTicket(self.generation);
        self.timer = Some(ticket);
        ticket
    }

    fn enter_timed(&mut self, step_index: usize) -> TimerTicket {
        let ticket = self.arm_timer();
        self.state = SequencerState::Running {
            step_index,
            elapsed_ms: 0,
        };
        self.emit_step_entered(step_index);
        ticket
    }

    fn execute_manual(&mut self, step_index: usize) {
        self.state = SequencerState::SteppedManually { step_index };
        self.emit_step_entered(step_index);
        self.emit(SequencerEvent::ProgressAdvanced {
            step_index,
            progress_percent: 100.0,
        });
        self.advance_from(step_index, false);
    }

    /// Moves past a finished step. Timed runs enter the next step; manual
    /// runs wait for the next command. The final step always completes.
    fn advance_from(&mut self, step_index: usize, timed: bool) {
        if self.is_final(step_index) {
            self.compute_flags();
            self.timer = None;
            self.state = SequencerState::Idle;
            self.emit(SequencerEvent::ReturnedToIdle {
                cause: IdleCause::Completed,
            });
        } else if timed {
            self.state = SequencerState::Running {
                step_index: step_index + 1,
                elapsed_ms: 0,
            };
            self.emit_step_entered(step_index + 1);
        }
    }

    fn compute_flags(&mut self) -> FlagState {
        let operands = self.operands;
        let flags = alu::compare(operands.operand_a, operands.operand_b);
        self.flags = Some(flags);
        self.completed_runs += 1;
        log::info!(
            "{} completed: {} - {} = {} -> {flags:?}",
            self.selected_definition()
                .map_or("<none>", |definition| definition.mnemonic.as_str()),
            operands.operand_a,
            operands.operand_b,
            alu::difference(operands.operand_a, operands.operand_b),
        );
        self.emit(SequencerEvent::FlagsComputed { flags, operands });
        flags
    }

    fn emit_step_entered(&mut self, step_index: usize) {
        let phase = self
            .step_at(step_index)
            .map_or(PhaseTag::Idle, |step| step.phase);
        log::debug!("step {step_index} entered ({phase})");
        self.emit(SequencerEvent::StepEntered { step_index, phase });
    }

    fn emit(&mut self, event: SequencerEvent) {
        let snapshot = self.snapshot();
        self.observer.on_event(&event, &snapshot);
    }
}
