//! Connection lifecycle, reconnection and heartbeat.

use std::fmt;
use std::time::{Duration, Instant};

use clanview_model::ClientCommand;
use tracing::{debug, error, info, warn};

use crate::config::ReconnectPolicy;
use crate::error::{Error, Result};
use crate::link::{Link, TransportEvent};
use crate::scheduler::{Scheduler, TaskHandle, TimerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Attempts exhausted; only an explicit connect leaves this state
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What a transport event meant for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionChange {
    Unchanged,
    Connected,
    /// Link dropped, a reconnect is scheduled
    Lost(String),
    /// Reconnect budget spent
    Failed,
}

/// Requests issued whenever a connection is established.
pub const INITIAL_REQUESTS: [ClientCommand; 4] = [
    ClientCommand::RequestState,
    ClientCommand::GetSpeed,
    ClientCommand::GetSimulationConfig,
    ClientCommand::GetParameters,
];

/// Owns the link and drives it through [`ConnectionState`].
pub struct ConnectionManager<L: Link> {
    link: L,
    state: ConnectionState,
    policy: ReconnectPolicy,
    heartbeat_interval: Duration,
    attempts: u32,
    reconnect_task: Option<TaskHandle>,
    heartbeat_task: Option<TaskHandle>,
    /// Set by an explicit disconnect; suppresses reconnection
    torn_down: bool,
}

impl<L: Link> ConnectionManager<L> {
    pub fn new(link: L, policy: ReconnectPolicy, heartbeat_interval: Duration) -> Self {
        Self {
            link,
            state: ConnectionState::Disconnected,
            policy,
            heartbeat_interval,
            attempts: 0,
            reconnect_task: None,
            heartbeat_task: None,
            torn_down: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Failed reconnect attempts since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Start a fresh connection, resetting the attempt budget.
    ///
    /// No-op while already connected or connecting.
    pub fn connect(&mut self, scheduler: &mut Scheduler) {
        if matches!(self.state, ConnectionState::Connected | ConnectionState::Connecting) {
            debug!(state = %self.state, "connect ignored");
            return;
        }
        self.cancel_timers(scheduler);
        self.attempts = 0;
        self.torn_down = false;
        self.state = ConnectionState::Connecting;
        info!("Connecting to simulation server");
        self.link.open();
    }

    /// Close the link and stop all reconnection activity.
    pub fn disconnect(&mut self, scheduler: &mut Scheduler) {
        self.torn_down = true;
        self.cancel_timers(scheduler);
        if self.state != ConnectionState::Disconnected {
            self.link.close();
        }
        self.state = ConnectionState::Disconnected;
        info!("Disconnected from simulation server");
    }

    /// Send a command; fails unless connected.
    pub fn send(&mut self, command: &ClientCommand) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let frame = command.to_frame()?;
        debug!(event = command.name(), "sending");
        self.link.send(frame)
    }

    /// React to a lifecycle event from the link.
    ///
    /// Frames are not lifecycle events and yield [`ConnectionChange::Unchanged`].
    pub fn on_transport(
        &mut self,
        event: &TransportEvent,
        scheduler: &mut Scheduler,
        now: Instant,
    ) -> ConnectionChange {
        if self.torn_down {
            debug!(?event, "ignoring transport event after disconnect");
            return ConnectionChange::Unchanged;
        }

        match event {
            TransportEvent::Opened => self.on_opened(scheduler, now),
            TransportEvent::OpenFailed(reason) | TransportEvent::Closed(reason) => {
                match self.state {
                    ConnectionState::Connected | ConnectionState::Connecting => {
                        self.on_lost(reason, scheduler, now)
                    }
                    ConnectionState::Reconnecting => self.on_attempt_failed(reason, scheduler, now),
                    ConnectionState::Disconnected | ConnectionState::Failed => {
                        ConnectionChange::Unchanged
                    }
                }
            }
            TransportEvent::Frame(_) => ConnectionChange::Unchanged,
        }
    }

    fn on_opened(&mut self, scheduler: &mut Scheduler, now: Instant) -> ConnectionChange {
        if let Some(handle) = self.reconnect_task.take() {
            scheduler.cancel(handle);
        }
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        info!("Connected to simulation server");

        for command in &INITIAL_REQUESTS {
            if let Err(e) = self.send(command) {
                warn!(event = command.name(), "initial request failed: {}", e);
            }
        }
        self.schedule_heartbeat(scheduler, now);
        ConnectionChange::Connected
    }

    fn on_lost(&mut self, reason: &str, scheduler: &mut Scheduler, now: Instant) -> ConnectionChange {
        warn!("Connection lost: {}", reason);
        if let Some(handle) = self.heartbeat_task.take() {
            scheduler.cancel(handle);
        }
        self.state = ConnectionState::Disconnected;
        self.schedule_reconnect(scheduler, now + self.policy.initial_delay);
        ConnectionChange::Lost(reason.to_string())
    }

    fn on_attempt_failed(
        &mut self,
        reason: &str,
        scheduler: &mut Scheduler,
        now: Instant,
    ) -> ConnectionChange {
        self.attempts += 1;
        if self.attempts >= self.policy.max_attempts {
            error!(
                attempts = self.attempts,
                "Reconnection failed permanently: {}", reason
            );
            self.cancel_timers(scheduler);
            self.state = ConnectionState::Failed;
            return ConnectionChange::Failed;
        }

        warn!(
            attempt = self.attempts,
            max = self.policy.max_attempts,
            "Reconnect attempt failed: {}", reason
        );
        self.schedule_reconnect(scheduler, now + self.policy.interval);
        ConnectionChange::Unchanged
    }

    /// A scheduled reconnect attempt is due.
    pub fn on_reconnect_due(&mut self, handle: TaskHandle) {
        if self.reconnect_task != Some(handle) {
            return;
        }
        self.reconnect_task = None;
        let waiting = matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Reconnecting
        );
        if self.torn_down || !waiting {
            return;
        }
        self.state = ConnectionState::Reconnecting;
        info!(attempt = self.attempts + 1, "Reconnecting");
        self.link.open();
    }

    /// The heartbeat is due: re-request state and re-arm.
    pub fn on_heartbeat_due(&mut self, handle: TaskHandle, scheduler: &mut Scheduler, now: Instant) {
        if self.heartbeat_task != Some(handle) {
            return;
        }
        self.heartbeat_task = None;
        if !self.is_connected() {
            return;
        }
        if let Err(e) = self.send(&ClientCommand::RequestState) {
            warn!("heartbeat request failed: {}", e);
        }
        self.schedule_heartbeat(scheduler, now);
    }

    fn schedule_reconnect(&mut self, scheduler: &mut Scheduler, at: Instant) {
        if let Some(handle) = self.reconnect_task.take() {
            scheduler.cancel(handle);
        }
        self.reconnect_task = Some(scheduler.schedule(at, TimerKind::ReconnectAttempt));
    }

    fn schedule_heartbeat(&mut self, scheduler: &mut Scheduler, now: Instant) {
        if let Some(handle) = self.heartbeat_task.take() {
            scheduler.cancel(handle);
        }
        self.heartbeat_task =
            Some(scheduler.schedule(now + self.heartbeat_interval, TimerKind::Heartbeat));
    }

    fn cancel_timers(&mut self, scheduler: &mut Scheduler) {
        for handle in [self.reconnect_task.take(), self.heartbeat_task.take()]
            .into_iter()
            .flatten()
        {
            scheduler.cancel(handle);
        }
    }
}
