//! Agent species and their shapes.
//!
//! Each agent id maps to one species; every species has its own drawing
//! routine. Ids outside the mapped set fall back to [`Species::Marker`].

use std::f64::consts::{FRAC_PI_2, PI};

use crate::color::Rgba;
use crate::surface::{Point, Surface};

/// Visual category of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Circle,
    Triangle,
    Square,
    Diamond,
    Hexagon,
    /// Fallback for unmapped ids: a ringed dot
    Marker,
}

impl Species {
    /// Species with a dedicated id, in id order starting at 1.
    pub const MAPPED: [Species; 5] = [
        Species::Circle,
        Species::Triangle,
        Species::Square,
        Species::Diamond,
        Species::Hexagon,
    ];

    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Species::Circle,
            2 => Species::Triangle,
            3 => Species::Square,
            4 => Species::Diamond,
            5 => Species::Hexagon,
            _ => Species::Marker,
        }
    }

    /// Draw this species' body centered on `center`.
    pub fn draw<S: Surface + ?Sized>(self, surface: &mut S, center: Point, radius: f64, color: Rgba) {
        match self {
            Species::Circle => draw_circle(surface, center, radius, color),
            Species::Triangle => draw_triangle(surface, center, radius, color),
            Species::Square => draw_square(surface, center, radius, color),
            Species::Diamond => draw_diamond(surface, center, radius, color),
            Species::Hexagon => draw_hexagon(surface, center, radius, color),
            Species::Marker => draw_marker(surface, center, radius, color),
        }
    }
}

/// Vertices of a regular polygon starting at `start_angle`.
fn regular_polygon(center: Point, radius: f64, sides: usize, start_angle: f64) -> Vec<Point> {
    (0..sides)
        .map(|i| {
            let angle = start_angle + 2.0 * PI * i as f64 / sides as f64;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

fn draw_circle<S: Surface + ?Sized>(surface: &mut S, center: Point, radius: f64, color: Rgba) {
    surface.fill_circle(center, radius, color);
}

fn draw_triangle<S: Surface + ?Sized>(surface: &mut S, center: Point, radius: f64, color: Rgba) {
    // apex up
    surface.fill_polygon(&regular_polygon(center, radius, 3, -FRAC_PI_2), color);
}

fn draw_square<S: Surface + ?Sized>(surface: &mut S, center: Point, radius: f64, color: Rgba) {
    let half = radius * std::f64::consts::FRAC_1_SQRT_2;
    surface.fill_rect(
        Point::new(center.x - half, center.y - half),
        half * 2.0,
        half * 2.0,
        color,
    );
}

fn draw_diamond<S: Surface + ?Sized>(surface: &mut S, center: Point, radius: f64, color: Rgba) {
    surface.fill_polygon(&regular_polygon(center, radius, 4, -FRAC_PI_2), color);
}

fn draw_hexagon<S: Surface + ?Sized>(surface: &mut S, center: Point, radius: f64, color: Rgba) {
    surface.fill_polygon(&regular_polygon(center, radius, 6, 0.0), color);
}

fn draw_marker<S: Surface + ?Sized>(surface: &mut S, center: Point, radius: f64, color: Rgba) {
    surface.fill_circle(center, radius * 0.5, color);
    surface.stroke_circle(center, radius, color, 1.5);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, FrameRecorder};

    #[test]
    fn ids_map_to_species() {
        for (i, species) in Species::MAPPED.iter().enumerate() {
            assert_eq!(Species::from_id(i as u32 + 1), *species);
        }
        assert_eq!(Species::from_id(0), Species::Marker);
        assert_eq!(Species::from_id(6), Species::Marker);
        assert_eq!(Species::from_id(u32::MAX), Species::Marker);
    }

    #[test]
    fn polygon_species_emit_expected_vertices() {
        let color = Rgba::opaque(1, 2, 3);
        let center = Point::new(10.0, 10.0);
        for (species, sides) in [(Species::Triangle, 3), (Species::Diamond, 4), (Species::Hexagon, 6)] {
            let mut recorder = FrameRecorder::new();
            species.draw(&mut recorder, center, 5.0, color);
            match &recorder.commands()[0] {
                DrawCommand::FillPolygon { points, .. } => assert_eq!(points.len(), sides),
                other => panic!("{species:?} drew {other:?}"),
            }
        }
    }

    #[test]
    fn triangle_apex_points_up() {
        let points = regular_polygon(Point::new(0.0, 0.0), 2.0, 3, -FRAC_PI_2);
        assert!(points[0].x.abs() < 1e-12);
        assert!((points[0].y + 2.0).abs() < 1e-12);
    }

    #[test]
    fn marker_is_ringed() {
        let mut recorder = FrameRecorder::new();
        Species::Marker.draw(&mut recorder, Point::new(0.0, 0.0), 6.0, Rgba::opaque(9, 9, 9));
        assert_eq!(recorder.commands().len(), 2);
        assert!(matches!(recorder.commands()[1], DrawCommand::StrokeCircle { radius, .. } if radius == 6.0));
    }
}
