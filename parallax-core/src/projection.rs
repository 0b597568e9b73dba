/// Head-coupled off-axis projection
use crate::geometry::Point3D;
use crate::head::HeadOffset;

/// Points whose total depth falls to or below this are not drawn
pub const NEAR_EPSILON: f32 = 0.1;

/// Integer pixel coordinate on the output surface
pub type ScreenPoint = (i32, i32);

/// Off-axis projector for a fixed output surface.
///
/// The virtual eye sits `eye_depth` units in front of the screen plane and
/// is displaced by the (gain-scaled) head offset. A point at infinite depth
/// lands on the head offset itself, a point on the screen plane lands on its
/// own x/y, and everything in between is interpolated by `ratio`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffAxisProjector {
    pub eye_depth: f32,
    /// Pixels per room unit
    pub unit_scale: f32,
    /// Multiplier applied to the head offset before projecting
    pub head_gain: f32,
    pub width: u32,
    pub height: u32,
}

impl OffAxisProjector {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye_depth: 2.0,
            unit_scale: 350.0,
            head_gain: 1.0,
            width,
            height,
        }
    }

    /// Project `p` as seen from `head`, or `None` when `p` sits at or
    /// behind the eye plane.
    pub fn project(&self, p: &Point3D, head: HeadOffset) -> Option<ScreenPoint> {
        let hx = head.x * self.head_gain;
        let hy = head.y * self.head_gain;

        let total_depth = self.eye_depth + p.z;
        if total_depth <= NEAR_EPSILON {
            return None;
        }

        let ratio = self.eye_depth / total_depth;
        let screen_x = hx + (p.x - hx) * ratio;
        let screen_y = hy + (p.y - hy) * ratio;

        let px = self.width as f32 / 2.0 + screen_x * self.unit_scale;
        let py = self.height as f32 / 2.0 + screen_y * self.unit_scale;
        Some((px as i32, py as i32))
    }

    /// Project every point, keeping failures in place so indices still line up
    pub fn project_all(&self, points: &[Point3D], head: HeadOffset) -> Vec<Option<ScreenPoint>> {
        points.iter().map(|p| self.project(p, head)).collect()
    }
}

impl Default for OffAxisProjector {
    fn default() -> Self {
        Self::new(1000, 700)
    }
}
