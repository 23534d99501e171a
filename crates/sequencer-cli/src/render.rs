//! Terminal rendering of catalogs, runs, and the control panel.

use std::io::{self, Write};

use sequencer_core::{
    active_signals, difference, signals_in, Catalog, ExecutionSnapshot, FlagState, IdleCause,
    InstructionDefinition, MicroStep, OperandState, PhaseTag, SequencerEvent, SequencerObserver,
    SignalCategory,
};

const BAR_WIDTH: usize = 30;

/// Prints run events as they happen.
///
/// `on_event` cannot fail, so the first write error is parked and reported by
/// [`TerminalObserver::finish`].
pub struct TerminalObserver<W: Write> {
    steps: Vec<MicroStep>,
    out: W,
    progress_bar: bool,
    bar_open: bool,
    error: Option<io::Error>,
}

impl<W: Write> TerminalObserver<W> {
    pub fn new(definition: &InstructionDefinition, out: W, progress_bar: bool) -> Self {
        Self {
            steps: definition.steps.clone(),
            out,
            progress_bar,
            bar_open: false,
            error: None,
        }
    }

    /// Returns the writer, or the first error hit while rendering.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.close_bar()?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn close_bar(&mut self) -> io::Result<()> {
        if self.bar_open {
            self.bar_open = false;
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn render(&mut self, event: &SequencerEvent, snapshot: &ExecutionSnapshot) -> io::Result<()> {
        match event {
            SequencerEvent::InstructionSelected { mnemonic } => {
                self.close_bar()?;
                writeln!(self.out, "selected {mnemonic}")
            }
            SequencerEvent::StepEntered { step_index, .. } => {
                self.close_bar()?;
                match self.steps.get(*step_index) {
                    Some(step) => {
                        write_step_header(&mut self.out, step, snapshot.step_count)?;
                        write_transfers(&mut self.out, step)
                    }
                    None => Ok(()),
                }
            }
            SequencerEvent::ProgressAdvanced {
                progress_percent, ..
            } if self.progress_bar => {
                self.bar_open = true;
                write!(
                    self.out,
                    "\r      {} {progress_percent:>5.1}%  overall {:>5.1}%",
                    bar(*progress_percent),
                    snapshot.overall_progress_percent
                )?;
                self.out.flush()
            }
            SequencerEvent::ProgressAdvanced { .. } => Ok(()),
            SequencerEvent::FlagsComputed { flags, operands } => {
                self.close_bar()?;
                write_flags(&mut self.out, *operands, *flags)
            }
            SequencerEvent::ReturnedToIdle { cause } => {
                self.close_bar()?;
                let cause = match cause {
                    IdleCause::Completed => "completed",
                    IdleCause::Stopped => "stopped",
                };
                writeln!(self.out, "idle ({cause})")
            }
        }
    }
}

impl<W: Write> SequencerObserver for TerminalObserver<W> {
    fn on_event(&mut self, event: &SequencerEvent, snapshot: &ExecutionSnapshot) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.render(event, snapshot) {
            self.error = Some(err);
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bar(progress_percent: f64) -> String {
    let filled = ((progress_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn write_step_header(out: &mut impl Write, step: &MicroStep, step_count: usize) -> io::Result<()> {
    writeln!(
        out,
        "[{}/{step_count}] {:<9} {} ({} ms)",
        step.id,
        step.phase.as_str().to_ascii_uppercase(),
        step.name,
        step.duration_ms
    )
}

fn write_transfers(out: &mut impl Write, step: &MicroStep) -> io::Result<()> {
    if step.signals.is_empty() {
        return Ok(());
    }
    writeln!(out, "      {}", step.signals.join("  "))
}

/// Operand values, the raw difference, and the packed flags.
pub fn write_flags(out: &mut impl Write, operands: OperandState, flags: FlagState) -> io::Result<()> {
    let OperandState {
        operand_a,
        operand_b,
    } = operands;
    writeln!(
        out,
        "AX = {operand_a} (0x{operand_a:04X}), BX = {operand_b} (0x{operand_b:04X}), AX - BX = {}",
        difference(operand_a, operand_b)
    )?;
    writeln!(
        out,
        "flags: CF={} ZF={} SF={} (0x{:04X})",
        u8::from(flags.carry),
        u8::from(flags.zero),
        u8::from(flags.sign),
        flags.bits()
    )
}

/// One line per instruction in `catalog`.
pub fn write_catalog(out: &mut impl Write, catalog: &Catalog) -> io::Result<()> {
    writeln!(
        out,
        "{} catalog ({} instructions)",
        catalog.phase_set(),
        catalog.len()
    )?;
    for definition in catalog.instructions() {
        writeln!(
            out,
            "  {:<14} {} steps {:>6} ms  {}",
            definition.mnemonic,
            definition.len(),
            definition.total_duration_ms(),
            definition.description
        )?;
    }
    Ok(())
}

/// Full micro-step table of one instruction.
pub fn write_definition(out: &mut impl Write, definition: &InstructionDefinition) -> io::Result<()> {
    writeln!(out, "{}: {}", definition.mnemonic, definition.description)?;
    for step in &definition.steps {
        write_step_header(out, step, definition.len())?;
        write_transfers(out, step)?;
    }
    writeln!(out, "total {} ms", definition.total_duration_ms())
}

/// Control panel grouped by category. With a phase, asserted lines are marked.
pub fn write_signals(out: &mut impl Write, phase: Option<PhaseTag>) -> io::Result<()> {
    let active = phase.map_or(&[][..], active_signals);
    if let Some(phase) = phase {
        writeln!(out, "{} ({phase})", phase.label())?;
    }
    for category in SignalCategory::ALL {
        writeln!(out, "{}", category.label())?;
        for signal in signals_in(category) {
            let marker = if active.contains(&signal.name) {
                '*'
            } else {
                ' '
            };
            writeln!(out, "  {marker} {:<10} {}", signal.name, signal.description)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{bar, write_flags, write_signals, TerminalObserver};
    use sequencer_core::{Catalog, FlagState, OperandState, PhaseTag, Sequencer, SequencerConfig};

    fn rendered(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).expect("utf-8 output")
    }

    #[test]
    fn bar_is_clamped_to_width() {
        assert_eq!(bar(0.0), format!("[{}]", ".".repeat(30)));
        assert_eq!(bar(100.0), format!("[{}]", "#".repeat(30)));
        assert_eq!(bar(250.0), format!("[{}]", "#".repeat(30)));
    }

    #[test]
    fn flags_line_reports_packed_bits() {
        let mut out = Vec::new();
        write_flags(
            &mut out,
            OperandState::new(10, 20),
            FlagState {
                carry: true,
                zero: false,
                sign: true,
            },
        )
        .expect("write to vec");
        let text = rendered(out);
        assert!(text.contains("AX - BX = -10"));
        assert!(text.contains("CF=1 ZF=0 SF=1 (0x0081)"));
    }

    #[test]
    fn signals_marks_active_lines_for_phase() {
        let mut out = Vec::new();
        write_signals(&mut out, Some(PhaseTag::Decode)).expect("write to vec");
        let text = rendered(out);
        assert!(text.contains("* DECODE"));
        assert!(text.contains("  MEM_READ"));
        assert!(!text.contains("* MEM_READ"));
    }

    #[test]
    fn observer_prints_each_step_and_result() {
        let catalog = Catalog::classic();
        let definition = catalog.lookup("JMP 2000H").expect("known mnemonic").clone();
        let observer = TerminalObserver::new(&definition, Vec::new(), false);
        let mut sequencer = Sequencer::new(catalog, SequencerConfig::default(), observer);
        sequencer.select("JMP 2000H").expect("known mnemonic");
        for _ in 0..definition.len() {
            sequencer.step();
        }

        let text = rendered(sequencer.into_observer().finish().expect("no write errors"));
        assert!(text.starts_with("selected JMP 2000H\n[1/4] FETCH"));
        assert!(text.contains("[4/4] EXECUTE   Update PC (600 ms)"));
        assert!(text.contains("flags: CF=1 ZF=0 SF=1"));
        assert!(text.ends_with("idle (completed)\n"));
    }
}
