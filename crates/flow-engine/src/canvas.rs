//! Canvas viewport
//!
//! Pan and zoom state for the editing surface, and the mapping between
//! pointer coordinates and graph space:
//!
//! ```text
//! graph = (pointer - canvas_origin - pan) / zoom
//! ```

use crate::config::CanvasConfig;
use crate::constants::canvas::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use crate::types::Position;

/// Pan offset and zoom factor of the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pan: Position,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    step: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}

impl Viewport {
    /// Create a viewport at zoom 1 with no pan
    ///
    /// Bounds outside `0 < min_zoom <= max_zoom` or a non-positive step fall
    /// back to the defaults with a warning.
    pub fn new(config: &CanvasConfig) -> Self {
        let (min_zoom, max_zoom) = if config.min_zoom > 0.0
            && config.min_zoom <= config.max_zoom
            && config.max_zoom.is_finite()
        {
            (config.min_zoom, config.max_zoom)
        } else {
            log::warn!(
                "Invalid zoom bounds {}..{}, using {}..{}",
                config.min_zoom,
                config.max_zoom,
                MIN_ZOOM,
                MAX_ZOOM
            );
            (MIN_ZOOM, MAX_ZOOM)
        };
        let step = if config.zoom_step > 0.0 && config.zoom_step.is_finite() {
            config.zoom_step
        } else {
            log::warn!("Invalid zoom step {}, using {}", config.zoom_step, ZOOM_STEP);
            ZOOM_STEP
        };

        Self {
            pan: Position::default(),
            zoom: 1.0_f64.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            step,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Zoom as a whole percentage, e.g. `150`
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn pan(&self) -> Position {
        self.pan
    }

    /// Set the zoom, clamped to the configured bounds
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.zoom;
        }
        self.zoom = strip_drift(zoom).clamp(self.min_zoom, self.max_zoom);
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom + self.step)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom - self.step)
    }

    pub fn set_pan(&mut self, pan: Position) {
        self.pan = pan;
    }

    /// Shift the pan offset by a pointer-space delta
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.x += dx;
        self.pan.y += dy;
    }

    /// Back to zoom 1 with no pan
    pub fn reset(&mut self) {
        self.pan = Position::default();
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }

    /// Map a pointer coordinate to graph space
    pub fn to_graph(&self, pointer: Position, canvas_origin: Position) -> Position {
        Position::new(
            (pointer.x - canvas_origin.x - self.pan.x) / self.zoom,
            (pointer.y - canvas_origin.y - self.pan.y) / self.zoom,
        )
    }

    /// Map a graph-space position back to a pointer coordinate
    pub fn to_screen(&self, graph: Position, canvas_origin: Position) -> Position {
        Position::new(
            graph.x * self.zoom + self.pan.x + canvas_origin.x,
            graph.y * self.zoom + self.pan.y + canvas_origin.y,
        )
    }
}

// Repeated steps accumulate float error (1.0 + 0.1 * 3 != 1.3)
fn strip_drift(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        let viewport = Viewport::default();
        let p = viewport.to_graph(Position::new(300.0, 250.0), Position::new(100.0, 50.0));
        assert_eq!(p, Position::new(200.0, 200.0));
    }

    #[test]
    fn test_pan_and_zoom_mapping() {
        let mut viewport = Viewport::default();
        viewport.set_pan(Position::new(20.0, -10.0));
        viewport.set_zoom(2.0);

        let origin = Position::new(100.0, 50.0);
        let graph = viewport.to_graph(Position::new(520.0, 440.0), origin);
        assert_eq!(graph, Position::new(200.0, 200.0));
        assert_eq!(viewport.to_screen(graph, origin), Position::new(520.0, 440.0));
    }

    #[test]
    fn test_zoom_steps_and_bounds() {
        let mut viewport = Viewport::default();
        for _ in 0..5 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom(), 0.5);
        assert_eq!(viewport.zoom_out(), 0.5);

        viewport.reset();
        for _ in 0..3 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom(), 1.3);
        assert_eq!(viewport.zoom_percent(), 130);

        assert_eq!(viewport.set_zoom(9.0), 2.0);
        assert_eq!(viewport.zoom_in(), 2.0);
    }

    #[test]
    fn test_pan_by_accumulates() {
        let mut viewport = Viewport::default();
        viewport.pan_by(10.0, 5.0);
        viewport.pan_by(-4.0, 5.0);
        assert_eq!(viewport.pan(), Position::new(6.0, 10.0));

        viewport.reset();
        assert_eq!(viewport.pan(), Position::default());
        assert_eq!(viewport.zoom(), 1.0);
    }

    #[test]
    fn test_custom_bounds() {
        let config = CanvasConfig {
            min_zoom: 0.25,
            max_zoom: 4.0,
            zoom_step: 0.5,
        };
        let mut viewport = Viewport::new(&config);
        viewport.zoom_in();
        assert_eq!(viewport.zoom(), 1.5);
        assert_eq!(viewport.set_zoom(0.1), 0.25);
    }

    #[test]
    fn test_off_grid_bounds_are_reachable() {
        let config = CanvasConfig {
            min_zoom: 0.25,
            max_zoom: 4.0,
            zoom_step: 0.1,
        };
        let mut viewport = Viewport::new(&config);
        for _ in 0..10 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom(), 0.25);
        assert_eq!(viewport.zoom_in(), 0.35);
        assert_eq!(viewport.set_zoom(0.25), 0.25);

        let config = CanvasConfig {
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 0.25,
        };
        let mut viewport = Viewport::new(&config);
        assert_eq!(viewport.zoom_in(), 1.25);
        assert_eq!(viewport.zoom_out(), 1.0);
        assert_eq!(viewport.zoom_out(), 0.75);
    }

    #[test]
    fn test_invalid_bounds_fall_back_to_defaults() {
        let inverted = CanvasConfig {
            min_zoom: 3.0,
            max_zoom: 1.0,
            zoom_step: 0.1,
        };
        let mut viewport = Viewport::new(&inverted);
        assert_eq!(viewport.zoom(), 1.0);
        assert_eq!(viewport.set_zoom(9.0), MAX_ZOOM);
        assert_eq!(viewport.set_zoom(0.0), MIN_ZOOM);

        let flat_step = CanvasConfig {
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 0.0,
        };
        let mut viewport = Viewport::new(&flat_step);
        assert_eq!(viewport.zoom_in(), 1.1);
    }
}
