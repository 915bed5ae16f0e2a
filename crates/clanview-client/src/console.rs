//! Line-oriented operator console.

use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Instant;

use clanview_analytics::TrendAnalysis;
use clanview_model::ParameterSet;
use clanview_render::Surface;

use crate::error::{Error, Result};
use crate::link::Link;
use crate::session::Session;

pub const HELP: &str = "\
commands:
  start | pause | reset | step | refresh
  speed <1-200>             speed control position
  max-steps <50-2000>
  auto-stop                 toggle auto-stop
  grid <width> <height>     10-200 cells each
  param <name=value>... [--existing]
  config <mode> [file] [seed]
  history <10-500>          time-series length
  width <pixels>            view width
  analysis | status
  connect | disconnect
  help | quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Start,
    Pause,
    Reset,
    Step,
    Refresh,
    Speed(i64),
    MaxSteps(i64),
    AutoStop,
    Grid(i64, i64),
    Params {
        parameters: ParameterSet,
        apply_to_existing: bool,
    },
    Config {
        mode: String,
        config_file: Option<String>,
        seed: Option<u64>,
    },
    History(usize),
    Width(f64),
    Analysis,
    Status,
    Connect,
    Disconnect,
    Help,
    Quit,
}

fn number<T: FromStr>(arg: Option<&str>, what: &str) -> Result<T> {
    let raw = arg.ok_or_else(|| Error::InvalidInput(format!("missing {what}")))?;
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("invalid {what}: {raw}")))
}

impl FromStr for ConsoleCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(Error::InvalidInput("empty command".into()));
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "start" => ConsoleCommand::Start,
            "pause" => ConsoleCommand::Pause,
            "reset" => ConsoleCommand::Reset,
            "step" => ConsoleCommand::Step,
            "refresh" => ConsoleCommand::Refresh,
            "speed" => ConsoleCommand::Speed(number(words.next(), "speed")?),
            "max-steps" => ConsoleCommand::MaxSteps(number(words.next(), "max steps")?),
            "auto-stop" => ConsoleCommand::AutoStop,
            "grid" => {
                let width = number(words.next(), "grid width")?;
                let height = number(words.next(), "grid height")?;
                ConsoleCommand::Grid(width, height)
            }
            "param" | "params" => {
                let mut parameters = ParameterSet::new();
                let mut apply_to_existing = false;
                for word in words.by_ref() {
                    if word == "--existing" {
                        apply_to_existing = true;
                        continue;
                    }
                    let (name, value) = word.split_once('=').ok_or_else(|| {
                        Error::InvalidInput(format!("expected name=value, got {word}"))
                    })?;
                    let value: f64 = number(Some(value), name)?;
                    if !value.is_finite() {
                        return Err(Error::InvalidInput(format!("{name} must be finite")));
                    }
                    parameters.set(name, value);
                }
                if parameters.is_empty() {
                    return Err(Error::InvalidInput("no parameters given".into()));
                }
                ConsoleCommand::Params {
                    parameters,
                    apply_to_existing,
                }
            }
            "config" => {
                let mode = words
                    .next()
                    .ok_or_else(|| Error::InvalidInput("missing mode".into()))?
                    .to_string();
                let config_file = words.next().map(str::to_string);
                let seed = match words.next() {
                    Some(raw) => Some(number(Some(raw), "seed")?),
                    None => None,
                };
                ConsoleCommand::Config {
                    mode,
                    config_file,
                    seed,
                }
            }
            "history" => ConsoleCommand::History(number(words.next(), "history length")?),
            "width" => ConsoleCommand::Width(number(words.next(), "width")?),
            "analysis" => ConsoleCommand::Analysis,
            "status" => ConsoleCommand::Status,
            "connect" => ConsoleCommand::Connect,
            "disconnect" => ConsoleCommand::Disconnect,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(Error::InvalidInput(format!("unknown command: {other}"))),
        };

        if let Some(extra) = words.next() {
            return Err(Error::InvalidInput(format!("unexpected argument: {extra}")));
        }
        Ok(command)
    }
}

impl ConsoleCommand {
    /// Run against `session`, returning text to show the operator.
    ///
    /// Failures are already queued as notices, so errors are not repeated
    /// here.
    pub fn execute<L: Link, S: Surface>(
        self,
        session: &mut Session<L, S>,
        now: Instant,
    ) -> Option<String> {
        let outcome: Result<Option<String>> = match self {
            ConsoleCommand::Start => session.start_simulation().map(|_| None),
            ConsoleCommand::Pause => session.pause_simulation().map(|_| None),
            ConsoleCommand::Reset => session.reset_simulation().map(|_| None),
            ConsoleCommand::Step => session.step_simulation().map(|_| None),
            ConsoleCommand::Refresh => session.request_state().map(|_| None),
            ConsoleCommand::Speed(raw) => session
                .set_speed(raw)
                .map(|speed| Some(format!("speed {speed:.2}x"))),
            ConsoleCommand::MaxSteps(raw) => session
                .set_max_steps(raw)
                .map(|max_steps| Some(format!("max steps {max_steps}"))),
            ConsoleCommand::AutoStop => session
                .toggle_auto_stop()
                .map(|on| Some(format!("auto-stop {}", if on { "on" } else { "off" }))),
            ConsoleCommand::Grid(width, height) => {
                session.apply_grid_size(width, height).map(|_| None)
            }
            ConsoleCommand::Params {
                parameters,
                apply_to_existing,
            } => session
                .apply_parameters(parameters, apply_to_existing, now)
                .map(|_| None),
            ConsoleCommand::Config {
                mode,
                config_file,
                seed,
            } => session
                .apply_configuration(&mode, config_file, seed)
                .map(|_| None),
            ConsoleCommand::History(points) => {
                let applied = session.set_max_data_points(points);
                Ok(Some(format!("keeping {applied} samples")))
            }
            ConsoleCommand::Width(width) => {
                session.set_container_width(width);
                Ok(None)
            }
            ConsoleCommand::Analysis => Ok(Some(describe_analysis(&session.analyze()))),
            ConsoleCommand::Status => Ok(Some(status_report(session))),
            ConsoleCommand::Connect => {
                session.connect();
                Ok(None)
            }
            ConsoleCommand::Disconnect => {
                session.disconnect();
                Ok(None)
            }
            ConsoleCommand::Help => Ok(Some(HELP.to_string())),
            ConsoleCommand::Quit => Ok(None),
        };
        outcome.ok().flatten()
    }
}

/// Human-readable analysis report.
pub fn describe_analysis(analysis: &TrendAnalysis) -> String {
    match analysis {
        TrendAnalysis::InsufficientData { samples, required } => {
            format!("not enough data: {samples} of {required} samples")
        }
        TrendAnalysis::Ready(report) => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "steps {}-{} ({} samples)",
                report.first_step, report.last_step, report.samples
            );
            for (label, summary) in [("population", &report.population), ("resources", &report.resources)] {
                let _ = writeln!(
                    out,
                    "{label:<11} {:<10} avg {:.1} min {:.1} max {:.1} now {:.1}",
                    summary.trend, summary.average, summary.min, summary.max, summary.current
                );
            }
            let _ = write!(
                out,
                "correlation {:.3}, resource stability {:?}",
                report.correlation, report.resource_stability
            );
            out
        }
    }
}

/// One-screen summary of the session.
pub fn status_report<L: Link, S: Surface>(session: &Session<L, S>) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "connection {} | run {}{}",
        session.connection_state(),
        session.run_state(),
        if session.run_status().is_confirmed() { "" } else { " (pending)" }
    );
    if let Some(snapshot) = session.snapshot() {
        let _ = write!(
            out,
            " | step {} | {} agents | {}x{} grid",
            snapshot.step,
            snapshot.agents.len(),
            snapshot.cols(),
            snapshot.rows()
        );
    }
    let settings = session.settings();
    if let Some(max_steps) = settings.max_steps {
        let _ = write!(out, " | max {max_steps}");
    }
    if let Some(auto_stop) = settings.auto_stop {
        let _ = write!(out, " | auto-stop {}", if auto_stop { "on" } else { "off" });
    }
    let _ = write!(
        out,
        " | speed {} | {} samples",
        session.speed_control(),
        session.series().len()
    );
    if session.is_applying() {
        out.push_str(" | applying");
    }
    out
}
