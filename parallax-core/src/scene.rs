/// Scene object instances built from a config
use crate::config::{Config, Glow, ObjectConfig, RoomConfig, ShapeKind};
use crate::geometry::{cube, diamond, room_grid, Point3D, RoomGrid, Solid, Wireframe};
use crate::render::Rgb;
use crate::transform::Spin;

/// World-space geometry of one object for one frame
#[derive(Debug, Clone)]
pub enum Shape {
    Solid(Solid),
    Wireframe(Wireframe),
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub kind: ShapeKind,
    pub center: Point3D,
    pub size: f32,
    pub spin: Spin,
    pub style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Rgb,
    pub fill: Option<Rgb>,
    pub stroke: u32,
    pub glow: Option<Glow>,
}

impl SceneObject {
    pub fn from_config(config: &ObjectConfig) -> Self {
        Self {
            name: config.name.clone(),
            kind: config.shape,
            center: config.center_point(),
            size: config.size,
            spin: config.spin,
            style: Style {
                color: config.color,
                fill: config.fill,
                stroke: config.stroke,
                glow: config.glow,
            },
        }
    }

    /// Rebuild this object's geometry at the given driving angle
    pub fn shape(&self, angle: f32) -> Shape {
        match self.kind {
            ShapeKind::Cube => Shape::Solid(cube(&self.center, self.size, &self.spin, angle)),
            ShapeKind::Diamond => {
                Shape::Wireframe(diamond(&self.center, self.size, &self.spin, angle))
            }
        }
    }
}

/// The room and the objects floating in it
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Rgb,
    pub room: RoomGrid,
    pub room_color: Rgb,
    pub room_stroke: u32,
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn from_config(config: &Config) -> Self {
        let RoomConfig {
            half_width,
            half_height,
            depth,
            spacing,
            color,
            stroke,
        } = config.room;

        Self {
            background: config.display.background,
            room: room_grid(half_width, half_height, depth, spacing),
            room_color: color,
            room_stroke: stroke,
            objects: config.objects.iter().map(SceneObject::from_config).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_from_neon() {
        let scene = Scene::from_config(&Config::neon());
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.objects[0].kind, ShapeKind::Cube);
        assert_eq!(scene.objects[1].kind, ShapeKind::Diamond);
        assert_eq!(scene.room.frames.len(), 9);
        assert_eq!(scene.background, Rgb::BLACK);
    }

    #[test]
    fn test_shape_is_rebuilt_from_angle() {
        let scene = Scene::from_config(&Config::studio());
        let cube = &scene.objects[0];

        let Shape::Solid(a) = cube.shape(0.0) else {
            panic!("cube should be solid");
        };
        let Shape::Solid(b) = cube.shape(0.5) else {
            panic!("cube should be solid");
        };
        let Shape::Solid(c) = cube.shape(0.0) else {
            panic!("cube should be solid");
        };
        assert_ne!(a.vertices, b.vertices);
        assert_eq!(a.vertices, c.vertices);
    }
}
