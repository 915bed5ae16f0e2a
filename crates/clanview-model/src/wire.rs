//! Events exchanged with the simulation server.
//!
//! Events travel as Socket.IO event packets, `42["<name>", <payload>]`.
//! Payload-less commands carry only the name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::{GridSize, Snapshot};
use crate::socketio::{Packet, PacketError};

/// Named numeric simulation parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, f64>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Overwrite entries present in `other`, keeping the rest.
    pub fn merge(&mut self, other: &ParameterSet) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), *value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Server configuration as reported by `simulation_config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_steps: Option<u32>,
    pub auto_stop: Option<bool>,
    pub current_step: Option<u64>,
    pub extinction_threshold: Option<u32>,
    pub convergence_threshold: Option<u32>,
    pub grid_size: Option<GridSize>,
}

/// Final state of one agent in a termination summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOutcome {
    pub id: u32,
    pub final_size: u32,
    pub final_energy: f64,
    pub final_state: String,
}

/// Summary attached to `simulation_terminated`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSummary {
    pub total_steps: u64,
    pub simulation_time: f64,
    pub final_population: u64,
    #[serde(alias = "surviving_clans")]
    pub surviving_agents: u32,
    #[serde(alias = "clan_details")]
    pub agent_details: Vec<AgentOutcome>,
}

/// Events pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full snapshot, replaces the previous one
    SimulationState(Snapshot),
    SimulationStarted {
        #[serde(default)]
        status: Option<String>,
    },
    SimulationTerminated {
        reason: String,
        #[serde(default)]
        summary: Option<SimulationSummary>,
    },
    SimulationError {
        error: String,
    },
    SpeedUpdated {
        speed: f64,
    },
    CurrentSpeed {
        speed: f64,
    },
    SpeedUpdateError {
        error: String,
    },
    SimulationConfig(SimulationConfig),
    AutoStopUpdated {
        auto_stop: bool,
    },
    MaxStepsUpdated {
        max_steps: u32,
    },
    GridSizeUpdated(GridSize),
    GridSizeError {
        error: String,
    },
    ConfigurationApplied {
        #[serde(default)]
        message: Option<String>,
        /// New snapshot produced by the configuration change
        #[serde(default)]
        state: Option<Snapshot>,
    },
    ConfigurationError {
        error: String,
    },
    ParametersUpdated {
        parameters: ParameterSet,
    },
    ParametersError {
        error: String,
    },
    CurrentParameters {
        parameters: ParameterSet,
    },
}

impl ServerEvent {
    /// Build an event from a Socket.IO event name and its first argument.
    pub fn from_event(name: &str, payload: Option<Value>) -> Result<Self, serde_json::Error> {
        let data = payload.unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(serde_json::json!({ "event": name, "data": data }))
    }

    /// Decode one text frame carrying an event packet.
    pub fn parse(text: &str) -> Result<Self, PacketError> {
        match Packet::decode(text)? {
            Packet::Event { name, payload } => Ok(Self::from_event(&name, payload)?),
            other => Err(PacketError::Malformed(format!(
                "expected an event packet, got {other:?}"
            ))),
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SimulationState(_) => "simulation_state",
            ServerEvent::SimulationStarted { .. } => "simulation_started",
            ServerEvent::SimulationTerminated { .. } => "simulation_terminated",
            ServerEvent::SimulationError { .. } => "simulation_error",
            ServerEvent::SpeedUpdated { .. } => "speed_updated",
            ServerEvent::CurrentSpeed { .. } => "current_speed",
            ServerEvent::SpeedUpdateError { .. } => "speed_update_error",
            ServerEvent::SimulationConfig(_) => "simulation_config",
            ServerEvent::AutoStopUpdated { .. } => "auto_stop_updated",
            ServerEvent::MaxStepsUpdated { .. } => "max_steps_updated",
            ServerEvent::GridSizeUpdated(_) => "grid_size_updated",
            ServerEvent::GridSizeError { .. } => "grid_size_error",
            ServerEvent::ConfigurationApplied { .. } => "configuration_applied",
            ServerEvent::ConfigurationError { .. } => "configuration_error",
            ServerEvent::ParametersUpdated { .. } => "parameters_updated",
            ServerEvent::ParametersError { .. } => "parameters_error",
            ServerEvent::CurrentParameters { .. } => "current_parameters",
        }
    }
}

/// Parameter edit sent with `update_parameters`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterUpdate {
    #[serde(flatten)]
    pub parameters: ParameterSet,
    /// Also apply to agents that already exist
    pub apply_to_existing: bool,
}

/// Commands sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    RequestState,
    StartSimulation,
    PauseSimulation,
    ResetSimulation,
    StepSimulation,
    UpdateSpeed {
        speed: f64,
    },
    SetMaxSteps {
        max_steps: u32,
    },
    ToggleAutoStop {
        auto_stop: bool,
    },
    UpdateGridSize {
        width: u32,
        height: u32,
    },
    ApplyConfiguration {
        mode: String,
        config_file: Option<String>,
        seed: Option<u64>,
    },
    UpdateParameters(ParameterUpdate),
    GetSpeed,
    GetSimulationConfig,
    GetParameters,
}

impl ClientCommand {
    /// The Socket.IO event packet for this command.
    pub fn to_packet(&self) -> Result<Packet, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        let payload = value.as_object_mut().and_then(|object| object.remove("data"));
        Ok(Packet::Event {
            name: self.name().to_string(),
            payload,
        })
    }

    /// Encode as one text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        Ok(self.to_packet()?.encode())
    }

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::RequestState => "request_state",
            ClientCommand::StartSimulation => "start_simulation",
            ClientCommand::PauseSimulation => "pause_simulation",
            ClientCommand::ResetSimulation => "reset_simulation",
            ClientCommand::StepSimulation => "step_simulation",
            ClientCommand::UpdateSpeed { .. } => "update_speed",
            ClientCommand::SetMaxSteps { .. } => "set_max_steps",
            ClientCommand::ToggleAutoStop { .. } => "toggle_auto_stop",
            ClientCommand::UpdateGridSize { .. } => "update_grid_size",
            ClientCommand::ApplyConfiguration { .. } => "apply_configuration",
            ClientCommand::UpdateParameters(_) => "update_parameters",
            ClientCommand::GetSpeed => "get_speed",
            ClientCommand::GetSimulationConfig => "get_simulation_config",
            ClientCommand::GetParameters => "get_parameters",
        }
    }
}
