/// Geometry primitives and shape builders
use nalgebra::Point3;

use crate::transform::{rotate3d, translate, Spin};

/// Room-local point. z >= 0 is into the screen.
pub type Point3D = Point3<f32>;

/// Quad face: four vertex indices in a fixed winding order
pub type Face = [usize; 4];

/// Wireframe edge: a pair of vertex indices
pub type Edge = (usize, usize);

/// Cube faces: back, front, top, bottom, right, left
pub const CUBE_FACES: [Face; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [1, 2, 6, 5],
    [3, 0, 4, 7],
];

/// Diamond edges: equator to +z pole, equator to -z pole, then the equator
pub const DIAMOND_EDGES: [Edge; 12] = [
    (0, 4),
    (1, 4),
    (2, 4),
    (3, 4),
    (0, 5),
    (1, 5),
    (2, 5),
    (3, 5),
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
];

/// A solid made of quad faces, in room space
#[derive(Debug, Clone)]
pub struct Solid {
    pub vertices: Vec<Point3D>,
    pub faces: &'static [Face],
}

impl Solid {
    /// Mean z of a face's vertices
    pub fn face_depth(&self, face: &Face) -> f32 {
        face.iter().map(|&i| self.vertices[i].z).sum::<f32>() / face.len() as f32
    }
}

/// An edge-based shape, in room space
#[derive(Debug, Clone)]
pub struct Wireframe {
    pub vertices: Vec<Point3D>,
    pub edges: &'static [Edge],
}

/// Cube of half-extent `size`, tumbled by `spin` and moved to `center`
pub fn cube(center: &Point3D, size: f32, spin: &Spin, angle: f32) -> Solid {
    let s = size;
    let base = [
        Point3D::new(-s, -s, -s),
        Point3D::new(s, -s, -s),
        Point3D::new(s, s, -s),
        Point3D::new(-s, s, -s),
        Point3D::new(-s, -s, s),
        Point3D::new(s, -s, s),
        Point3D::new(s, s, s),
        Point3D::new(-s, s, s),
    ];

    let (ax, ay, az) = spin.angles(angle);
    let vertices = base
        .iter()
        .map(|p| translate(&rotate3d(p, ax, ay, az), center))
        .collect();

    Solid {
        vertices,
        faces: &CUBE_FACES,
    }
}

/// Octahedron with tips at `±d` on each axis, spun about Y only
pub fn diamond(center: &Point3D, d: f32, spin: &Spin, angle: f32) -> Wireframe {
    let base = [
        Point3D::new(0.0, d, 0.0),
        Point3D::new(d, 0.0, 0.0),
        Point3D::new(0.0, -d, 0.0),
        Point3D::new(-d, 0.0, 0.0),
        Point3D::new(0.0, 0.0, d),
        Point3D::new(0.0, 0.0, -d),
    ];

    let ay = angle * spin.y;
    let vertices = base
        .iter()
        .map(|p| translate(&rotate3d(p, 0.0, ay, 0.0), center))
        .collect();

    Wireframe {
        vertices,
        edges: &DIAMOND_EDGES,
    }
}

/// Static wireframe room, built directly in room space
#[derive(Debug, Clone, Default)]
pub struct RoomGrid {
    /// Lines running along z from the screen plane to the back wall
    pub segments: Vec<(Point3D, Point3D)>,
    /// Transverse rectangles, one per z slice, corners in drawing order
    pub frames: Vec<[Point3D; 4]>,
}

/// Room of half-width `w`, half-height `h` and the given depth.
///
/// Grid positions follow `start, start + spacing, ...` while below
/// `end + 0.1`, so the far edge is included when it lands on the grid.
pub fn room_grid(w: f32, h: f32, depth: f32, spacing: f32) -> RoomGrid {
    let mut grid = RoomGrid::default();

    for x in grid_steps(-w, w, spacing) {
        for y in [-h, h] {
            grid.segments
                .push((Point3D::new(x, y, 0.0), Point3D::new(x, y, depth)));
        }
    }

    for y in grid_steps(-h, h, spacing) {
        for x in [-w, w] {
            grid.segments
                .push((Point3D::new(x, y, 0.0), Point3D::new(x, y, depth)));
        }
    }

    for z in grid_steps(0.0, depth, spacing) {
        grid.frames.push([
            Point3D::new(-w, -h, z),
            Point3D::new(w, -h, z),
            Point3D::new(w, h, z),
            Point3D::new(-w, h, z),
        ]);
    }

    grid
}

fn grid_steps(start: f32, end: f32, spacing: f32) -> Vec<f32> {
    if spacing <= 0.0 {
        return Vec::new();
    }
    let limit = end + 0.1;
    (0..)
        .map(|i| start + i as f32 * spacing)
        .take_while(|v| *v < limit)
        .collect()
}
