/// Axis rotations and per-object rotation state
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::geometry::Point3D;

/// Rotate a point about X, then Y, then Z (radians, right-handed).
///
/// Each rotation consumes the output of the previous one. The order is part
/// of the visual behavior: swapping it changes how the cube tumbles.
pub fn rotate3d(p: &Point3D, ax: f32, ay: f32, az: f32) -> Point3D {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), ax);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), ay);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), az);

    let p = rx * p;
    let p = ry * p;
    rz * p
}

/// Translate a point by a room-space offset
pub fn translate(p: &Point3D, offset: &Point3D) -> Point3D {
    p + offset.coords
}

/// Per-axis multipliers applied to a single driving angle.
///
/// Distinct multipliers make the axes turn at different relative speeds,
/// which reads as tumbling instead of a uniform spin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Spin {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Spin about the Y axis only
    pub fn yaw(y: f32) -> Self {
        Self { x: 0.0, y, z: 0.0 }
    }

    pub fn angles(&self, angle: f32) -> (f32, f32, f32) {
        (angle * self.x, angle * self.y, angle * self.z)
    }
}

impl Default for Spin {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Accumulated driving angle, advanced once per frame
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationState {
    pub angle: f32,
}

impl RotationState {
    pub fn zero() -> Self {
        Self { angle: 0.0 }
    }

    /// Advance by `step` radians
    pub fn advance(&mut self, step: f32) {
        self.angle += step;
    }
}
