//! Capture planning for rendered exports.
//!
//! # Invariants
//! - The capture region covers every node extent plus padding.
//! - The longest output edge never exceeds `max_raster_dimension`.

use crate::config::ExportConfig;
use crate::model::node::SyncedNode;

/// Axis-aligned rectangle in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Pan/zoom transform of the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Region, scale and output size handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePlan {
    pub region: Rect,
    pub scale: f64,
    pub output_width: u32,
    pub output_height: u32,
}

impl CapturePlan {
    /// Viewport that puts the region's top-left corner at the origin.
    pub fn viewport(&self) -> ViewportTransform {
        ViewportTransform {
            x: -self.region.x * self.scale,
            y: -self.region.y * self.scale,
            zoom: self.scale,
        }
    }
}

/// Padded bounding box of all node extents; `None` for an empty graph.
pub fn bounding_box(nodes: &[SyncedNode], config: &ExportConfig) -> Option<Rect> {
    let first = nodes.first()?;
    let mut min_x = first.position.x;
    let mut min_y = first.position.y;
    let mut max_x = first.position.x + config.node_width;
    let mut max_y = first.position.y + config.node_height;

    for node in &nodes[1..] {
        min_x = min_x.min(node.position.x);
        min_y = min_y.min(node.position.y);
        max_x = max_x.max(node.position.x + config.node_width);
        max_y = max_y.max(node.position.y + config.node_height);
    }

    Some(Rect {
        x: min_x - config.padding,
        y: min_y - config.padding,
        width: max_x - min_x + config.padding * 2.0,
        height: max_y - min_y + config.padding * 2.0,
    })
}

/// Plans one capture: pixel ratio scale, shrunk so the longest edge fits.
pub fn plan_capture(nodes: &[SyncedNode], config: &ExportConfig) -> Option<CapturePlan> {
    let region = bounding_box(nodes, config)?;
    let longest = region.width.max(region.height);
    let mut scale = config.pixel_ratio;
    if longest * scale > config.max_raster_dimension {
        scale = config.max_raster_dimension / longest;
    }

    Some(CapturePlan {
        region,
        scale,
        output_width: to_pixels(region.width * scale, config.max_raster_dimension),
        output_height: to_pixels(region.height * scale, config.max_raster_dimension),
    })
}

fn to_pixels(value: f64, max: f64) -> u32 {
    value.round().clamp(1.0, max.floor()) as u32
}
