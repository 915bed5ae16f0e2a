//! Clanview data model
//!
//! Types shared by every clanview component: the authoritative
//! [`Snapshot`] pushed by the simulation server, the [`Agent`]s inside it,
//! and the event frames exchanged over the wire.
//!
//! # Wire format
//!
//! ```text
//! server -> client   42["simulation_state",{ ...snapshot... }]
//! client -> server   42["update_speed",{"speed":2.5}]
//! client -> server   42["request_state"]
//! ```
//!
//! Events ride on Socket.IO over an Engine.IO WebSocket; see [`socketio`].

mod snapshot;
pub mod socketio;
mod wire;

pub use snapshot::{Agent, AgentState, GridSize, Snapshot, SystemMetrics};
pub use socketio::{OpenInfo, Packet, PacketError};
pub use wire::{
    AgentOutcome, ClientCommand, ParameterSet, ParameterUpdate, ServerEvent, SimulationConfig,
    SimulationSummary,
};
