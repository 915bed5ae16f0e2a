//! User intents: validation, connection gating and optimistic effects.

use std::time::Instant;

use clanview_model::{ClientCommand, GridSize, ParameterSet, ParameterUpdate};
use clanview_render::Surface;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::link::Link;
use crate::notice::NoticeLevel;
use crate::scheduler::{TaskHandle, TimerKind};
use crate::session::Session;
use crate::speed::{clamp_control, control_to_speed, SPEED_CONTROL_MID};
use crate::sync::SimulationRunState;

pub const MIN_GRID_DIMENSION: u32 = 10;
pub const MAX_GRID_DIMENSION: u32 = 200;

pub const MIN_MAX_STEPS: u32 = 50;
pub const MAX_MAX_STEPS: u32 = 2000;

/// Validate a requested grid size; out-of-range sizes are never sent.
pub fn validate_grid_size(width: i64, height: i64) -> Result<GridSize> {
    let range = MIN_GRID_DIMENSION as i64..=MAX_GRID_DIMENSION as i64;
    if !range.contains(&width) || !range.contains(&height) {
        return Err(Error::InvalidInput(format!(
            "grid size {width}x{height} outside {MIN_GRID_DIMENSION}-{MAX_GRID_DIMENSION}"
        )));
    }
    Ok(GridSize::new(width as u32, height as u32))
}

/// Clamp a max-steps request. Returns the value and whether it changed.
pub fn clamp_max_steps(raw: i64) -> (u32, bool) {
    let clamped = raw.clamp(MIN_MAX_STEPS as i64, MAX_MAX_STEPS as i64);
    (clamped as u32, clamped != raw)
}

/// Local state behind the controls.
#[derive(Debug)]
pub struct IntentState {
    pub(crate) speed_control: u16,
    pub(crate) parameters: ParameterSet,
    pending: Option<ParameterUpdate>,
    debounce_task: Option<TaskHandle>,
    /// A configuration, grid or parameter change awaits its answer
    pub(crate) applying: bool,
}

impl Default for IntentState {
    fn default() -> Self {
        Self {
            speed_control: SPEED_CONTROL_MID,
            parameters: ParameterSet::new(),
            pending: None,
            debounce_task: None,
            applying: false,
        }
    }
}

impl<L: Link, S: Surface> Session<L, S> {
    /// Reject `action` with a notice unless connected.
    fn require_connection(&mut self, action: &str) -> Result<()> {
        if self.connection.is_connected() {
            return Ok(());
        }
        warn!(action, "rejected while not connected");
        self.notices.push(
            NoticeLevel::Error,
            format!("Cannot {action}: not connected to the server"),
        );
        Err(Error::NotConnected)
    }

    /// Gate on the connection, then send.
    fn send_intent(&mut self, action: &str, command: ClientCommand) -> Result<()> {
        self.require_connection(action)?;
        if let Err(e) = self.connection.send(&command) {
            self.notices
                .push(NoticeLevel::Error, format!("Failed to {action}: {e}"));
            return Err(e);
        }
        Ok(())
    }

    pub fn start_simulation(&mut self) -> Result<()> {
        self.send_intent("start the simulation", ClientCommand::StartSimulation)?;
        self.sync.set_optimistic(SimulationRunState::Running);
        Ok(())
    }

    pub fn pause_simulation(&mut self) -> Result<()> {
        self.send_intent("pause the simulation", ClientCommand::PauseSimulation)?;
        self.sync.set_optimistic(SimulationRunState::Stopped);
        Ok(())
    }

    /// Reset the remote simulation and drop all local history.
    pub fn reset_simulation(&mut self) -> Result<()> {
        self.send_intent("reset the simulation", ClientCommand::ResetSimulation)?;
        self.sync.set_optimistic(SimulationRunState::Stopped);
        self.sync.discard_snapshot();
        self.clear_history();
        Ok(())
    }

    pub fn step_simulation(&mut self) -> Result<()> {
        self.send_intent("step the simulation", ClientCommand::StepSimulation)
    }

    /// Ask the server for a fresh snapshot.
    pub fn request_state(&mut self) -> Result<()> {
        self.send_intent("refresh state", ClientCommand::RequestState)
    }

    /// Move the speed control to `raw` (1-200) and send the mapped multiplier.
    pub fn set_speed(&mut self, raw: i64) -> Result<f64> {
        self.require_connection("change speed")?;
        let (control, clamped) = clamp_control(raw);
        if clamped {
            self.notices.push(
                NoticeLevel::Warning,
                format!("Speed control {raw} out of range, using {control}"),
            );
        }
        let speed = control_to_speed(control);
        self.send_intent("change speed", ClientCommand::UpdateSpeed { speed })?;
        self.intents.speed_control = control;
        Ok(speed)
    }

    pub fn set_max_steps(&mut self, raw: i64) -> Result<u32> {
        self.require_connection("set max steps")?;
        let (max_steps, clamped) = clamp_max_steps(raw);
        if clamped {
            self.notices.push(
                NoticeLevel::Warning,
                format!("Max steps {raw} out of range, using {max_steps}"),
            );
        }
        self.send_intent("set max steps", ClientCommand::SetMaxSteps { max_steps })?;
        Ok(max_steps)
    }

    /// Flip auto-stop relative to the last known server value.
    pub fn toggle_auto_stop(&mut self) -> Result<bool> {
        let auto_stop = !self.sync.settings().auto_stop.unwrap_or(true);
        self.send_intent("toggle auto-stop", ClientCommand::ToggleAutoStop { auto_stop })?;
        Ok(auto_stop)
    }

    pub fn apply_grid_size(&mut self, width: i64, height: i64) -> Result<()> {
        self.require_connection("resize the grid")?;
        let grid = match validate_grid_size(width, height) {
            Ok(grid) => grid,
            Err(e) => {
                self.notices.push(NoticeLevel::Error, e.to_string());
                return Err(e);
            }
        };
        self.send_intent(
            "resize the grid",
            ClientCommand::UpdateGridSize {
                width: grid.width,
                height: grid.height,
            },
        )?;
        self.intents.applying = true;
        Ok(())
    }

    pub fn apply_configuration(
        &mut self,
        mode: &str,
        config_file: Option<String>,
        seed: Option<u64>,
    ) -> Result<()> {
        self.send_intent(
            "apply the configuration",
            ClientCommand::ApplyConfiguration {
                mode: mode.to_string(),
                config_file,
                seed,
            },
        )?;
        self.intents.applying = true;
        Ok(())
    }

    /// Queue a parameter edit; it is sent once edits stop for the debounce
    /// period. A newer edit replaces the queued one.
    pub fn apply_parameters(
        &mut self,
        parameters: ParameterSet,
        apply_to_existing: bool,
        now: Instant,
    ) -> Result<()> {
        self.require_connection("update parameters")?;
        self.cancel_pending_parameters();
        self.intents.pending = Some(ParameterUpdate {
            parameters,
            apply_to_existing,
        });
        self.intents.debounce_task = Some(self.scheduler.schedule(
            now + self.config.parameter_debounce,
            TimerKind::ApplyParameters,
        ));
        debug!("parameter edit queued");
        Ok(())
    }

    pub(crate) fn flush_parameters(&mut self, handle: TaskHandle) {
        if self.intents.debounce_task != Some(handle) {
            return;
        }
        self.intents.debounce_task = None;
        let Some(update) = self.intents.pending.take() else {
            return;
        };
        let changed = update.parameters.clone();
        if self
            .send_intent("update parameters", ClientCommand::UpdateParameters(update))
            .is_ok()
        {
            self.intents.parameters.merge(&changed);
            self.intents.applying = true;
        }
    }

    pub(crate) fn cancel_pending_parameters(&mut self) {
        if let Some(handle) = self.intents.debounce_task.take() {
            self.scheduler.cancel(handle);
        }
        self.intents.pending = None;
    }

    /// Current speed control position.
    pub fn speed_control(&self) -> u16 {
        self.intents.speed_control
    }

    /// Last known parameter values.
    pub fn parameters(&self) -> &ParameterSet {
        &self.intents.parameters
    }

    pub fn is_applying(&self) -> bool {
        self.intents.applying
    }

    pub fn has_pending_parameters(&self) -> bool {
        self.intents.pending.is_some()
    }
}
