//! Colors used by the render layers.

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Same color with alpha scaled from a `[0, 1]` fraction.
    pub fn with_alpha(self, alpha: f64) -> Self {
        let alpha = if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            a: (alpha * 255.0).round() as u8,
            ..self
        }
    }

    /// Pack as `0xAABBGGRR`.
    pub fn packed(&self) -> u32 {
        ((self.a as u32) << 24) | ((self.b as u32) << 16) | ((self.g as u32) << 8) | self.r as u32
    }
}

/// Surface background.
pub const BACKGROUND: Rgba = Rgba::opaque(18, 22, 28);

/// Resource heat hue; alpha carries the intensity.
pub const RESOURCE: Rgba = Rgba::opaque(0, 100, 0);

pub const GRID_LINE: Rgba = Rgba::new(255, 255, 255, 20);

pub const LABEL: Rgba = Rgba::opaque(255, 255, 255);

pub const ENERGY_TRACK: Rgba = Rgba::new(0, 0, 0, 140);

pub const ENERGY_HIGH: Rgba = Rgba::opaque(46, 204, 113);

pub const ENERGY_MEDIUM: Rgba = Rgba::opaque(243, 156, 18);

pub const ENERGY_LOW: Rgba = Rgba::opaque(231, 76, 60);

/// Outline for agents that are fighting or defending.
pub const COMBAT_RING: Rgba = Rgba::opaque(231, 76, 60);

/// Band color for an energy fraction: above 60%, 30-60%, below 30%.
pub fn energy_color(fraction: f64) -> Rgba {
    if fraction > 0.6 {
        ENERGY_HIGH
    } else if fraction >= 0.3 {
        ENERGY_MEDIUM
    } else {
        ENERGY_LOW
    }
}

/// Body color for an agent id; hues are spread 30 degrees apart.
pub fn agent_color(id: u32) -> Rgba {
    let hue = ((id as u64 * 30) % 360) as f64 / 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
    Rgba::opaque(
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

/// HSV to RGB conversion, all components in `[0, 1]`.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    let c = v * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h * 6.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (r + m, g + m, b + m)
}
