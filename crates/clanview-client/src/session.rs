//! Composition root: one client session against one server.
//!
//! Inbound frames flow through the synchronizer, the renderer and the
//! time-series store in that order. Timers are delivered by [`Session::on_tick`].
//! User intents live in [`crate::dispatch`].

use std::time::Instant;

use clanview_analytics::{
    trend_analysis, IngestThrottle, SpatialDistribution, SpatialSeries, TimeSeriesBuffer,
    TrendAnalysis,
};
use clanview_model::{Packet, ServerEvent, SimulationSummary, Snapshot};
use clanview_render::{RenderConfig, RenderOutcome, Renderer, Surface};
use tracing::{debug, info, warn};

use crate::chart::{ChartSink, NullChart};
use crate::config::ClientConfig;
use crate::connection::{ConnectionChange, ConnectionManager, ConnectionState};
use crate::dispatch::IntentState;
use crate::link::{Link, TransportEvent};
use crate::notice::{Notice, NoticeLevel, Notices};
use crate::scheduler::{Scheduler, TaskHandle, TimerKind};
use crate::speed::speed_to_control;
use crate::sync::{RunStatus, SimulationRunState, SimulationSettings, StateSynchronizer};

pub struct Session<L: Link, S: Surface> {
    pub(crate) config: ClientConfig,
    pub(crate) scheduler: Scheduler,
    pub(crate) connection: ConnectionManager<L>,
    pub(crate) sync: StateSynchronizer,
    renderer: Renderer,
    surface: S,
    container_width: f64,
    pub(crate) series: TimeSeriesBuffer,
    pub(crate) spatial: SpatialSeries,
    pub(crate) throttle: IngestThrottle,
    pub(crate) chart: Box<dyn ChartSink>,
    pub(crate) intents: IntentState,
    pub(crate) notices: Notices,
    analytics_task: Option<TaskHandle>,
    last_analysis: Option<TrendAnalysis>,
    last_render: Option<RenderOutcome>,
    last_summary: Option<SimulationSummary>,
}

impl<L: Link, S: Surface> Session<L, S> {
    pub fn new(config: ClientConfig, link: L, surface: S) -> Self {
        let connection = ConnectionManager::new(
            link,
            config.reconnect.clone(),
            config.heartbeat_interval,
        );
        Self {
            scheduler: Scheduler::new(),
            connection,
            sync: StateSynchronizer::new(),
            renderer: Renderer::new(RenderConfig::default()),
            surface,
            container_width: config.container_width,
            series: TimeSeriesBuffer::new(config.max_data_points),
            spatial: SpatialSeries::new(config.max_data_points),
            throttle: IngestThrottle::new(config.ingest.every_messages, config.ingest.min_interval),
            chart: Box::new(NullChart),
            intents: IntentState::default(),
            notices: Notices::new(),
            analytics_task: None,
            last_analysis: None,
            last_render: None,
            last_summary: None,
            config,
        }
    }

    /// Open the connection and arm periodic analysis.
    pub fn start(&mut self, now: Instant) {
        self.connection.connect(&mut self.scheduler);
        if self.analytics_task.is_none() {
            self.analytics_task = Some(
                self.scheduler
                    .schedule(now + self.config.analytics_interval, TimerKind::Analytics),
            );
        }
    }

    /// Explicit connect, also the way out of [`ConnectionState::Failed`].
    pub fn connect(&mut self) {
        self.connection.connect(&mut self.scheduler);
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect(&mut self.scheduler);
        self.sync.force_stopped();
    }

    /// Tear everything down; no timers remain afterwards.
    pub fn shutdown(&mut self) {
        self.disconnect();
        if let Some(handle) = self.analytics_task.take() {
            self.scheduler.cancel(handle);
        }
        self.cancel_pending_parameters();
        info!("Session shut down");
    }

    pub fn set_chart(&mut self, chart: Box<dyn ChartSink>) {
        self.chart = chart;
    }

    /// Feed one transport event.
    pub fn handle_transport(&mut self, event: TransportEvent, now: Instant) {
        if let TransportEvent::Frame(text) = &event {
            self.handle_frame(text, now);
            return;
        }

        match self.connection.on_transport(&event, &mut self.scheduler, now) {
            ConnectionChange::Unchanged => {}
            ConnectionChange::Connected => {
                self.notices
                    .push(NoticeLevel::Success, "Connected to simulation server");
            }
            ConnectionChange::Lost(reason) => {
                self.sync.force_stopped();
                self.intents.applying = false;
                self.notices.push(
                    NoticeLevel::Warning,
                    format!("Connection lost ({reason}), reconnecting"),
                );
            }
            ConnectionChange::Failed => {
                self.sync.force_stopped();
                self.notices.push(
                    NoticeLevel::Error,
                    "Unable to reach the simulation server. Reload the client to try again.",
                );
            }
        }
    }

    /// Decode and apply one inbound Socket.IO frame. Malformed frames are dropped.
    pub fn handle_frame(&mut self, text: &str, now: Instant) {
        match Packet::decode(text) {
            Ok(Packet::Event { name, payload }) => match ServerEvent::from_event(&name, payload) {
                Ok(event) => self.handle_event(event, now),
                Err(e) => warn!(event = %name, "Dropping malformed event: {}", e),
            },
            Ok(Packet::ConnectError(message)) => {
                warn!("Server refused the namespace: {}", message);
            }
            Ok(packet) => debug!(?packet, "ignoring control packet"),
            Err(e) => warn!("Dropping malformed frame: {}", e),
        }
    }

    pub fn handle_event(&mut self, event: ServerEvent, now: Instant) {
        debug!(event = event.name(), "received");
        match event {
            ServerEvent::SimulationState(snapshot) => self.apply_snapshot(snapshot, now),
            ServerEvent::SimulationStarted { .. } => {
                self.sync.confirm(SimulationRunState::Running);
                self.notices.push(NoticeLevel::Success, "Simulation started");
            }
            ServerEvent::SimulationTerminated { reason, summary } => {
                self.sync.confirm(SimulationRunState::Stopped);
                let message = match &summary {
                    Some(s) => format!(
                        "Simulation finished ({reason}) after {} steps, {} agents surviving",
                        s.total_steps, s.surviving_agents
                    ),
                    None => format!("Simulation finished ({reason})"),
                };
                self.notices.push(NoticeLevel::Info, message);
                self.last_summary = summary;
            }
            ServerEvent::SimulationError { error } => {
                self.sync.confirm(SimulationRunState::Stopped);
                self.notices
                    .push(NoticeLevel::Error, format!("Simulation error: {error}"));
            }
            ServerEvent::SpeedUpdated { speed } | ServerEvent::CurrentSpeed { speed } => {
                self.sync.settings_mut().speed = Some(speed);
                self.intents.speed_control = speed_to_control(speed);
            }
            ServerEvent::SpeedUpdateError { error } => {
                self.notices
                    .push(NoticeLevel::Error, format!("Speed update failed: {error}"));
            }
            ServerEvent::SimulationConfig(config) => self.sync.apply_config(&config),
            ServerEvent::AutoStopUpdated { auto_stop } => {
                self.sync.settings_mut().auto_stop = Some(auto_stop);
                let label = if auto_stop { "enabled" } else { "disabled" };
                self.notices
                    .push(NoticeLevel::Info, format!("Auto-stop {label}"));
            }
            ServerEvent::MaxStepsUpdated { max_steps } => {
                self.sync.settings_mut().max_steps = Some(max_steps);
                self.notices
                    .push(NoticeLevel::Info, format!("Max steps set to {max_steps}"));
            }
            ServerEvent::GridSizeUpdated(grid_size) => {
                self.sync.settings_mut().grid_size = Some(grid_size);
                self.intents.applying = false;
                self.notices.push(
                    NoticeLevel::Success,
                    format!("Grid resized to {}x{}", grid_size.width, grid_size.height),
                );
            }
            ServerEvent::GridSizeError { error } => {
                self.intents.applying = false;
                self.notices
                    .push(NoticeLevel::Error, format!("Grid size rejected: {error}"));
            }
            ServerEvent::ConfigurationApplied { message, state } => {
                self.intents.applying = false;
                if let Some(snapshot) = state {
                    self.apply_snapshot(snapshot, now);
                }
                self.notices.push(
                    NoticeLevel::Success,
                    message.unwrap_or_else(|| "Configuration applied".to_string()),
                );
            }
            ServerEvent::ConfigurationError { error } => {
                self.intents.applying = false;
                self.notices
                    .push(NoticeLevel::Error, format!("Configuration failed: {error}"));
            }
            ServerEvent::ParametersUpdated { parameters } => {
                self.intents.applying = false;
                self.intents.parameters.merge(&parameters);
                self.notices.push(
                    NoticeLevel::Success,
                    format!("{} parameters updated", parameters.len()),
                );
            }
            ServerEvent::ParametersError { error } => {
                self.intents.applying = false;
                self.notices
                    .push(NoticeLevel::Error, format!("Parameter update failed: {error}"));
            }
            ServerEvent::CurrentParameters { parameters } => {
                self.intents.parameters = parameters;
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot, now: Instant) {
        let snapshot = self.sync.apply_snapshot(snapshot);
        self.last_render = Some(self.renderer.render(
            snapshot,
            self.container_width,
            &mut self.surface,
        ));

        let step = snapshot.step;
        // A paused server keeps answering heartbeats with the same step
        if self.series.latest().map(|(last, _, _)| last) == Some(step) {
            return;
        }
        if !self.throttle.admit(now) {
            return;
        }
        let population = snapshot.total_population();
        let resources = snapshot.total_resources();
        let distribution = SpatialDistribution::from_snapshot(snapshot);

        self.series.ingest(step, population, resources);
        self.spatial.ingest(
            step,
            distribution.controlled,
            distribution.free,
            distribution.disputed,
        );
        self.chart.push_series(step, population, resources);
        self.chart.push_spatial(step, &distribution);
    }

    /// Deliver every timer due at `now`.
    pub fn on_tick(&mut self, now: Instant) {
        for (handle, kind) in self.scheduler.take_due(now) {
            match kind {
                TimerKind::ReconnectAttempt => self.connection.on_reconnect_due(handle),
                TimerKind::Heartbeat => {
                    self.connection
                        .on_heartbeat_due(handle, &mut self.scheduler, now)
                }
                TimerKind::ApplyParameters => self.flush_parameters(handle),
                TimerKind::Analytics => self.run_periodic_analysis(handle, now),
            }
        }
    }

    fn run_periodic_analysis(&mut self, handle: TaskHandle, now: Instant) {
        if self.analytics_task != Some(handle) {
            return;
        }
        let analysis = trend_analysis(&self.series);
        if let TrendAnalysis::Ready(report) = &analysis {
            debug!(
                samples = report.samples,
                population = %report.population.trend,
                resources = %report.resources.trend,
                correlation = report.correlation,
                "periodic analysis"
            );
        }
        self.last_analysis = Some(analysis);
        self.analytics_task = Some(
            self.scheduler
                .schedule(now + self.config.analytics_interval, TimerKind::Analytics),
        );
    }

    /// Run trend analysis now against the current buffer.
    pub fn analyze(&mut self) -> TrendAnalysis {
        let analysis = trend_analysis(&self.series);
        self.last_analysis = Some(analysis.clone());
        analysis
    }

    /// Change the time-series bound, clamped into 10-500.
    pub fn set_max_data_points(&mut self, requested: usize) -> usize {
        let applied = self.series.set_max_points(requested);
        self.spatial.set_max_points(requested);
        if applied != requested {
            self.notices.push(
                NoticeLevel::Warning,
                format!("History length {requested} out of range, using {applied}"),
            );
        }
        applied
    }

    /// Resize the view and redraw the current snapshot at the new scale.
    pub fn set_container_width(&mut self, width: f64) {
        if !width.is_finite() || width <= 0.0 {
            warn!(width, "ignoring invalid container width");
            return;
        }
        self.container_width = width;
        if let Some(snapshot) = self.sync.snapshot() {
            self.last_render = Some(self.renderer.render(
                snapshot,
                self.container_width,
                &mut self.surface,
            ));
        }
    }

    pub(crate) fn clear_history(&mut self) {
        self.series.clear();
        self.spatial.clear();
        self.throttle.reset();
        self.chart.clear();
        self.last_analysis = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.attempts()
    }

    pub fn link(&self) -> &L {
        self.connection.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.connection.link_mut()
    }

    pub fn run_status(&self) -> RunStatus {
        self.sync.status()
    }

    pub fn run_state(&self) -> SimulationRunState {
        self.sync.run_state()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.sync.snapshot()
    }

    pub fn settings(&self) -> &SimulationSettings {
        self.sync.settings()
    }

    pub fn series(&self) -> &TimeSeriesBuffer {
        &self.series
    }

    pub fn spatial(&self) -> &SpatialSeries {
        &self.spatial
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn last_render(&self) -> Option<&RenderOutcome> {
        self.last_render.as_ref()
    }

    pub fn last_analysis(&self) -> Option<&TrendAnalysis> {
        self.last_analysis.as_ref()
    }

    pub fn last_summary(&self) -> Option<&SimulationSummary> {
        self.last_summary.as_ref()
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }
}
