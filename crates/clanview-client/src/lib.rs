//! Clanview Client
//!
//! Live visualization and control client for a remote territorial clan
//! simulation. The server pushes full snapshots over a WebSocket; the client
//! renders them, keeps bounded history for charts, and sends operator
//! intents back.
//!
//! # Architecture
//!
//! ```text
//! WsLink ──► ConnectionManager ──► StateSynchronizer ──► Renderer
//!                                        │
//!                                        └──► TimeSeriesBuffer ──► trend_analysis
//!
//! operator ──► intents (dispatch) ──► ConnectionManager ──► WsLink
//! ```
//!
//! All session logic is synchronous and driven by explicit [`Instant`]s
//! through the [`Scheduler`]; [`runtime::run`] is the only async part.
//!
//! [`Instant`]: std::time::Instant

pub mod chart;
pub mod config;
pub mod connection;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod notice;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod speed;
pub mod sync;

pub use chart::{ChartSink, NullChart};
pub use config::{ClientConfig, IngestPolicy, ReconnectPolicy};
pub use connection::{ConnectionChange, ConnectionManager, ConnectionState};
pub use console::ConsoleCommand;
pub use error::{Error, Result};
pub use link::{Link, RecordingLink, TransportEvent};
pub use notice::{Notice, NoticeLevel};
pub use runtime::WsLink;
pub use scheduler::{Scheduler, TaskHandle, TimerKind};
pub use session::Session;
pub use sync::{RunStatus, SimulationRunState, SimulationSettings};
