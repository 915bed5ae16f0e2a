//! Drawing surface abstraction and a recording implementation.

use crate::color::Rgba;

/// A point in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 2D drawing target, modelled on an immediate-mode canvas.
pub trait Surface {
    /// Resize the surface; implementations discard previous content.
    fn resize(&mut self, width: f64, height: f64);

    /// Fill the whole surface with `color`.
    fn clear(&mut self, color: Rgba);

    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: Rgba);

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba);

    fn stroke_circle(&mut self, center: Point, radius: f64, color: Rgba, line_width: f64);

    fn fill_polygon(&mut self, points: &[Point], color: Rgba);

    fn line(&mut self, from: Point, to: Point, color: Rgba, line_width: f64);

    /// Draw `text` centered on `at`.
    fn text(&mut self, at: Point, text: &str, color: Rgba, size: f64);
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    FillRect {
        origin: Point,
        width: f64,
        height: f64,
        color: Rgba,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: Rgba,
    },
    StrokeCircle {
        center: Point,
        radius: f64,
        color: Rgba,
        line_width: f64,
    },
    FillPolygon {
        points: Vec<Point>,
        color: Rgba,
    },
    Line {
        from: Point,
        to: Point,
        color: Rgba,
        line_width: f64,
    },
    Text {
        at: Point,
        text: String,
        color: Rgba,
        size: f64,
    },
}

/// Headless surface that records the calls of the latest frame.
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
    resizes: u64,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Calls recorded since the last resize.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of times the surface was resized, one per drawn frame.
    pub fn resizes(&self) -> u64 {
        self.resizes
    }

    /// Texts drawn in the current frame.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|cmd| matches(cmd)).count()
    }
}

impl Surface for FrameRecorder {
    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.commands.clear();
        self.resizes += 1;
    }

    fn clear(&mut self, color: Rgba) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { origin, width, height, color });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba) {
        self.commands.push(DrawCommand::FillCircle { center, radius, color });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: Rgba, line_width: f64) {
        self.commands.push(DrawCommand::StrokeCircle { center, radius, color, line_width });
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgba) {
        self.commands.push(DrawCommand::FillPolygon {
            points: points.to_vec(),
            color,
        });
    }

    fn line(&mut self, from: Point, to: Point, color: Rgba, line_width: f64) {
        self.commands.push(DrawCommand::Line { from, to, color, line_width });
    }

    fn text(&mut self, at: Point, text: &str, color: Rgba, size: f64) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            color,
            size,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::LABEL;

    #[test]
    fn resize_starts_a_new_frame() {
        let mut recorder = FrameRecorder::new();
        recorder.resize(100.0, 50.0);
        recorder.text(Point::new(1.0, 1.0), "12", LABEL, 9.0);
        assert_eq!(recorder.texts(), vec!["12"]);

        recorder.resize(80.0, 40.0);
        assert!(recorder.commands().is_empty());
        assert_eq!(recorder.resizes(), 2);
        assert_eq!(recorder.width(), 80.0);
        assert_eq!(recorder.height(), 40.0);
    }
}
