//! CLI entry point for the `cpu-sim` phase sequencer front end.

use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{self, Write};

use anyhow::Context;
use sequencer_core::{
    drive, Catalog, IntervalClock, ManualClock, PhaseSet, PhaseTag, Sequencer, SequencerConfig,
    TICK_INTERVAL_MS,
};

mod render;

use render::{write_catalog, write_definition, write_signals, TerminalObserver};

const USAGE_TEXT: &str = "\
Usage: cpu-sim <command> [options]

Commands:
  list    [--variant <name>]               List the instruction catalog
  show    <mnemonic> [--variant <name>]    Print an instruction's micro-steps
  run     <mnemonic> [options]             Execute an instruction
  signals [<phase>]                        Print the control-signal panel

Run options:
  --variant <name>  classic (default), single-bus, or six-step
  --ax <value>      First operand, decimal or 0x-prefixed hex (default 10)
  --bx <value>      Second operand (default 20)
  --tick-ms <ms>    Tick quantum in milliseconds (default 50)
  --instant         Compute the result without visiting any phase
  --step            Execute one micro-step at a time, without a timer
  --no-sleep        Drive the timer with synthetic ticks
  -h, --help        Show this help message

Set RUST_LOG=debug to trace state transitions.

Examples:
  cpu-sim list --variant six-step
  cpu-sim show \"ADD R1, (R2)\"
  cpu-sim run \"CMP AX, BX\" --variant single-bus --ax 0x20 --bx 0x10
  cpu-sim signals fetch
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    List(PhaseSet),
    Show(ShowArgs),
    Run(RunArgs),
    Signals(Option<PhaseTag>),
}

#[derive(Debug, PartialEq, Eq)]
struct ShowArgs {
    mnemonic: String,
    variant: PhaseSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Animated,
    NoSleep,
    Step,
    Instant,
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    mnemonic: String,
    config: SequencerConfig,
    mode: RunMode,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "list" => parse_list_args(args)
            .map(Command::List)
            .map(ParseResult::Command),
        "show" => parse_show_args(args)
            .map(Command::Show)
            .map(ParseResult::Command),
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "signals" => parse_signals_args(args)
            .map(Command::Signals)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_variant(value: Option<OsString>) -> Result<PhaseSet, String> {
    let value = value.ok_or_else(|| "missing value for --variant".to_string())?;
    let name = value.to_string_lossy();
    PhaseSet::from_name(&name).ok_or_else(|| format!("unknown variant: {name}"))
}

fn parse_number(flag: &str, value: Option<OsString>) -> Result<u32, String> {
    let value = value.ok_or_else(|| format!("missing value for {flag}"))?;
    let text = value.to_string_lossy();
    let trimmed = text.trim();
    let parsed = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = trimmed
        .strip_suffix('h')
        .or_else(|| trimmed.strip_suffix('H'))
    {
        u32::from_str_radix(hex, 16)
    } else {
        trimmed.parse()
    };
    parsed.map_err(|_| format!("invalid value for {flag}: {text}"))
}

fn parse_operand(flag: &str, value: Option<OsString>) -> Result<u16, String> {
    let number = parse_number(flag, value)?;
    u16::try_from(number).map_err(|_| format!("{flag} does not fit in 16 bits: {number}"))
}

fn is_option(arg: &OsStr) -> bool {
    arg.to_string_lossy().starts_with('-')
}

fn parse_list_args(mut args: impl Iterator<Item = OsString>) -> Result<PhaseSet, String> {
    let mut variant = PhaseSet::default();

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }
        if arg == "--variant" {
            variant = parse_variant(args.next())?;
            continue;
        }
        if is_option(&arg) {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        return Err(format!("unexpected argument: {}", arg.to_string_lossy()));
    }

    Ok(variant)
}

fn parse_show_args(mut args: impl Iterator<Item = OsString>) -> Result<ShowArgs, String> {
    let mut mnemonic: Option<String> = None;
    let mut variant = PhaseSet::default();

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }
        if arg == "--variant" {
            variant = parse_variant(args.next())?;
            continue;
        }
        if is_option(&arg) {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        if mnemonic.is_some() {
            return Err("multiple mnemonics provided".to_string());
        }
        mnemonic = Some(arg.to_string_lossy().to_string());
    }

    let mnemonic = mnemonic.ok_or_else(|| "missing mnemonic".to_string())?;
    Ok(ShowArgs { mnemonic, variant })
}

fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut mnemonic: Option<String> = None;
    let mut config = SequencerConfig::default();
    let mut mode: Option<RunMode> = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        let flag = arg.to_string_lossy().to_string();
        let requested = match flag.as_str() {
            "--variant" => {
                config.phase_set = parse_variant(args.next())?;
                None
            }
            "--ax" => {
                config.default_operands.operand_a = parse_operand("--ax", args.next())?;
                None
            }
            "--bx" => {
                config.default_operands.operand_b = parse_operand("--bx", args.next())?;
                None
            }
            "--tick-ms" => {
                let tick = parse_number("--tick-ms", args.next())?;
                if tick == 0 {
                    return Err("--tick-ms must be at least 1".to_string());
                }
                config.tick_interval_ms = tick;
                None
            }
            "--instant" => Some(RunMode::Instant),
            "--step" => Some(RunMode::Step),
            "--no-sleep" => Some(RunMode::NoSleep),
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            _ => {
                if mnemonic.is_some() {
                    return Err("multiple mnemonics provided".to_string());
                }
                mnemonic = Some(flag);
                None
            }
        };

        if let Some(requested) = requested {
            if mode.is_some_and(|current| current != requested) {
                return Err("--instant, --step and --no-sleep are mutually exclusive".to_string());
            }
            mode = Some(requested);
        }
    }

    let mnemonic = mnemonic.ok_or_else(|| "missing mnemonic".to_string())?;
    Ok(RunArgs {
        mnemonic,
        config,
        mode: mode.unwrap_or(RunMode::Animated),
    })
}

fn parse_signals_args(args: impl Iterator<Item = OsString>) -> Result<Option<PhaseTag>, String> {
    let mut phase: Option<PhaseTag> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }
        if is_option(&arg) {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        if phase.is_some() {
            return Err("multiple phases provided".to_string());
        }
        let name = arg.to_string_lossy();
        phase = Some(PhaseTag::parse(&name).ok_or_else(|| format!("unknown phase: {name}"))?);
    }

    Ok(phase)
}

fn run_instruction(args: &RunArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let config = args.config;
    let catalog = config.catalog();
    let definition = catalog
        .lookup(&args.mnemonic)
        .with_context(|| format!("cannot run on the {} catalog", config.phase_set))?
        .clone();

    let observer = TerminalObserver::new(&definition, &mut *out, args.mode == RunMode::Animated);
    let mut sequencer = Sequencer::new(catalog, config, observer);

    match args.mode {
        RunMode::Instant => {
            sequencer.run_to_completion(&definition.mnemonic, config.default_operands)?;
        }
        RunMode::Step => {
            sequencer.select(&definition.mnemonic)?;
            for _ in 0..definition.len() {
                sequencer.step();
            }
        }
        RunMode::NoSleep => {
            sequencer.start(&definition.mnemonic)?;
            let outcome = drive(
                &mut sequencer,
                &mut ManualClock::new(config.tick_interval_ms),
            );
            log::debug!("{} synthetic ticks delivered", outcome.ticks);
        }
        RunMode::Animated => {
            sequencer.start(&definition.mnemonic)?;
            let outcome = drive(
                &mut sequencer,
                &mut IntervalClock::new(config.tick_interval_ms),
            );
            log::debug!("{} timed ticks delivered", outcome.ticks);
        }
    }

    sequencer
        .into_observer()
        .finish()
        .context("failed to write run output")?;
    Ok(())
}

fn execute(command: &Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::List(variant) => {
            write_catalog(out, &Catalog::for_phase_set(*variant))?;
        }
        Command::Show(args) => {
            let catalog = Catalog::for_phase_set(args.variant);
            let definition = catalog
                .lookup(&args.mnemonic)
                .with_context(|| format!("cannot show on the {} catalog", args.variant))?;
            write_definition(out, definition)?;
        }
        Command::Run(args) => run_instruction(args, out)?,
        Command::Signals(phase) => write_signals(out, *phase)?,
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(command)) => {
            log::debug!("default tick quantum {TICK_INTERVAL_MS} ms");
            match execute(&command, &mut io::stdout().lock()) {
                Ok(()) => 0,
                Err(err) => {
                    eprintln!("error: {err:#}");
                    1
                }
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_core::OperandState;

    fn args(values: &[&str]) -> impl Iterator<Item = OsString> {
        values
            .iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn run_output(values: &[&str]) -> String {
        let Ok(ParseResult::Command(command)) = parse_args(args(values)) else {
            panic!("expected a command for {values:?}");
        };
        let mut out = Vec::new();
        execute(&command, &mut out).expect("command should succeed");
        String::from_utf8(out).expect("utf-8 output")
    }

    #[test]
    fn parses_help_flag() {
        let result = parse_args(args(&["--help"])).expect("help should parse without error");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_command() {
        let error = parse_args(args(&["assemble"])).expect_err("unknown command should fail");
        assert!(error.contains("unknown command"));
    }

    #[test]
    fn parses_run_with_operands_and_variant() {
        let result = parse_run_args(args(&[
            "CMP AX, BX",
            "--variant",
            "six-step",
            "--ax",
            "0x20",
            "--bx",
            "10H",
            "--tick-ms",
            "25",
            "--no-sleep",
        ]))
        .expect("valid run args should parse");

        assert_eq!(
            result,
            RunArgs {
                mnemonic: "CMP AX, BX".to_string(),
                config: SequencerConfig {
                    phase_set: PhaseSet::SixStep,
                    tick_interval_ms: 25,
                    default_operands: OperandState::new(0x20, 0x10),
                },
                mode: RunMode::NoSleep,
            }
        );
    }

    #[test]
    fn run_defaults_to_animated_classic() {
        let result = parse_run_args(args(&["MOV AX, BX"])).expect("valid run args");
        assert_eq!(result.mode, RunMode::Animated);
        assert_eq!(result.config, SequencerConfig::default());
    }

    #[test]
    fn run_rejects_conflicting_modes() {
        let error = parse_run_args(args(&["MOV AX, BX", "--instant", "--step"]))
            .expect_err("conflicting modes should fail");
        assert!(error.contains("mutually exclusive"));
    }

    #[test]
    fn run_rejects_oversized_operand() {
        let error = parse_run_args(args(&["MOV AX, BX", "--ax", "70000"]))
            .expect_err("operand must fit in 16 bits");
        assert!(error.contains("16 bits"));
    }

    #[test]
    fn run_rejects_zero_tick() {
        let error = parse_run_args(args(&["MOV AX, BX", "--tick-ms", "0"]))
            .expect_err("zero tick should fail");
        assert!(error.contains("at least 1"));
    }

    #[test]
    fn parse_run_missing_mnemonic() {
        let error = parse_run_args(std::iter::empty()).expect_err("missing mnemonic");
        assert!(error.contains("missing mnemonic"));
    }

    #[test]
    fn parses_signals_phase() {
        assert_eq!(
            parse_signals_args(args(&["Fetch"])).expect("known phase"),
            Some(PhaseTag::Fetch)
        );
        assert!(parse_signals_args(args(&["retire"])).is_err());
    }

    #[test]
    fn list_rejects_unknown_variant() {
        let error = parse_list_args(args(&["--variant", "pipelined"]))
            .expect_err("unknown variant should fail");
        assert!(error.contains("unknown variant"));
    }

    #[test]
    fn list_prints_every_classic_instruction() {
        let output = run_output(&["list"]);
        assert!(output.starts_with("classic catalog (9 instructions)"));
        assert!(output.contains("ADD R1, (R2)"));
        assert!(output.contains("5200 ms"));
    }

    #[test]
    fn instant_run_prints_flags_without_steps() {
        let output = run_output(&["run", "CMP R1, R2", "--instant", "--ax", "15", "--bx", "15"]);
        assert!(!output.contains("[1/"));
        assert!(output.ends_with("CF=0 ZF=1 SF=0 (0x0040)\n"));
    }

    #[test]
    fn no_sleep_run_visits_every_step() {
        let output = run_output(&[
            "run",
            "CMP AX, BX",
            "--variant",
            "single-bus",
            "--no-sleep",
            "--ax",
            "20",
            "--bx",
            "10",
        ]);
        for step in 1..=5 {
            assert!(output.contains(&format!("[{step}/5] STEP{step}")), "{output}");
        }
        assert!(output.contains("CF=0 ZF=0 SF=0"));
    }

    #[test]
    fn unknown_mnemonic_is_reported_with_context() {
        let Ok(ParseResult::Command(command)) = parse_args(args(&["run", "HLT", "--step"])) else {
            panic!("expected run command");
        };
        let error = execute(&command, &mut Vec::<u8>::new()).expect_err("unknown mnemonic");
        let message = format!("{error:#}");
        assert!(message.contains("cannot run on the classic catalog"));
        assert!(message.contains("HLT"));
    }
}
