//! Authoritative snapshot and two-phase run state.

use std::fmt;

use clanview_model::{GridSize, SimulationConfig, Snapshot};
use tracing::debug;

/// Coarse run state of the remote simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationRunState {
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for SimulationRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SimulationRunState::Stopped => "stopped",
            SimulationRunState::Running => "running",
            SimulationRunState::Paused => "paused",
        };
        f.write_str(label)
    }
}

/// Run state tagged with whether the server has confirmed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Set locally by a user action, not yet echoed by the server
    Optimistic(SimulationRunState),
    Confirmed(SimulationRunState),
}

impl RunStatus {
    pub fn state(&self) -> SimulationRunState {
        match self {
            RunStatus::Optimistic(state) | RunStatus::Confirmed(state) => *state,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, RunStatus::Confirmed(_))
    }
}

/// Settings mirrored from the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationSettings {
    pub max_steps: Option<u32>,
    pub auto_stop: Option<bool>,
    pub grid_size: Option<GridSize>,
    pub speed: Option<f64>,
    pub extinction_threshold: Option<u32>,
    pub convergence_threshold: Option<u32>,
}

/// Holds the latest snapshot and reconciles run state with it.
#[derive(Debug)]
pub struct StateSynchronizer {
    snapshot: Option<Snapshot>,
    confirmed: SimulationRunState,
    optimistic: Option<SimulationRunState>,
    settings: SimulationSettings,
    snapshots_applied: u64,
}

impl Default for StateSynchronizer {
    fn default() -> Self {
        Self {
            snapshot: None,
            confirmed: SimulationRunState::Stopped,
            optimistic: None,
            settings: SimulationSettings::default(),
            snapshots_applied: 0,
        }
    }
}

impl StateSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot and derive run state from it.
    ///
    /// A non-running snapshot past step 0 reads as paused only when the
    /// last confirmed state was running or paused.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> &Snapshot {
        let derived = if snapshot.running {
            SimulationRunState::Running
        } else if snapshot.step > 0
            && matches!(
                self.confirmed,
                SimulationRunState::Running | SimulationRunState::Paused
            )
        {
            SimulationRunState::Paused
        } else {
            SimulationRunState::Stopped
        };
        self.confirm(derived);

        if let Some(max_steps) = snapshot.max_steps {
            self.settings.max_steps = Some(max_steps);
        }
        if let Some(auto_stop) = snapshot.auto_stop {
            self.settings.auto_stop = Some(auto_stop);
        }
        if let Some(grid_size) = snapshot.grid_size {
            self.settings.grid_size = Some(grid_size);
        }

        self.snapshots_applied += 1;
        debug!(step = snapshot.step, state = %derived, "snapshot applied");
        self.snapshot.insert(snapshot)
    }

    /// Record a server-confirmed state, dropping any optimistic guess.
    pub fn confirm(&mut self, state: SimulationRunState) {
        self.confirmed = state;
        self.optimistic = None;
    }

    /// Show `state` until the server says otherwise.
    pub fn set_optimistic(&mut self, state: SimulationRunState) {
        self.optimistic = Some(state);
    }

    /// The connection is gone; nothing can be running as far as we know.
    pub fn force_stopped(&mut self) {
        self.confirm(SimulationRunState::Stopped);
    }

    pub fn discard_snapshot(&mut self) {
        self.snapshot = None;
    }

    pub fn apply_config(&mut self, config: &SimulationConfig) {
        let settings = &mut self.settings;
        settings.max_steps = config.max_steps.or(settings.max_steps);
        settings.auto_stop = config.auto_stop.or(settings.auto_stop);
        settings.grid_size = config.grid_size.or(settings.grid_size);
        settings.extinction_threshold = config.extinction_threshold.or(settings.extinction_threshold);
        settings.convergence_threshold =
            config.convergence_threshold.or(settings.convergence_threshold);
    }

    pub fn status(&self) -> RunStatus {
        match self.optimistic {
            Some(state) => RunStatus::Optimistic(state),
            None => RunStatus::Confirmed(self.confirmed),
        }
    }

    pub fn run_state(&self) -> SimulationRunState {
        self.status().state()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SimulationSettings {
        &mut self.settings
    }

    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }
}
