//! Clanview Render Pipeline
//!
//! Draws simulation snapshots onto any [`Surface`].
//!
//! # Layers
//!
//! 1. **Resources**: linear heat-map, alpha proportional to `value / 100`
//! 2. **Grid lines**: only when cells are large enough to see them
//! 3. **Agents**: one shape per [`Species`], plus size labels, energy bars
//!    and combat rings depending on cell size and available data
//!
//! Cell size is `clamp(container_width / cols, 8, 16)`, recomputed every
//! frame. A snapshot without grid data is skipped and the surface keeps the
//! previous frame.

pub mod color;
mod pipeline;
mod scale;
mod species;
mod surface;

pub use color::Rgba;
pub use pipeline::{
    agent_radius, FrameStats, RenderConfig, RenderOutcome, Renderer, SkipReason, MIN_AGENT_RADIUS,
};
pub use scale::{cell_size, FrameGeometry, MAX_CELL_SIZE, MIN_CELL_SIZE};
pub use species::Species;
pub use surface::{DrawCommand, FrameRecorder, Point, Surface};
