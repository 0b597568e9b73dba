/// Runtime configuration and the built-in presets.
///
/// A config is always a complete preset with an optional TOML file layered
/// on top: tables merge key by key, any other value (including the
/// `objects` array) replaces the preset's value wholesale.
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::error::{ConfigError, Result};
use crate::geometry::Point3D;
use crate::projection::OffAxisProjector;
use crate::render::Rgb;
use crate::transform::Spin;

/// Widest accepted stroke, in pixels
pub const MAX_STROKE: u32 = 32;

/// Most glow passes an object may ask for
pub const MAX_GLOW_PASSES: u32 = 16;

/// Most grid steps along any room axis
pub const MAX_GRID_STEPS: f32 = 256.0;

/// Named starting points for a config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Small tumbling cube next to a glowing diamond
    #[default]
    Neon,
    /// Larger dark cube alone in the room, exaggerated head movement
    Studio,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Neon, Preset::Studio];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Neon => "neon",
            Preset::Studio => "studio",
        }
    }

    pub fn config(&self) -> Config {
        match self {
            Preset::Neon => Config::neon(),
            Preset::Studio => Config::studio(),
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "neon" => Ok(Preset::Neon),
            "studio" => Ok(Preset::Studio),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub display: DisplayConfig,
    pub room: RoomConfig,
    pub objects: Vec<ObjectConfig>,
}

/// Output surface, projection constants and frame pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Pixels per room unit
    pub unit_scale: f32,
    /// Distance from the virtual eye to the screen plane, in room units
    pub eye_depth: f32,
    /// Exaggeration applied to the tracked head offset
    pub head_gain: f32,
    /// Mirror the tracked x offset (selfie view)
    pub mirror: bool,
    pub fps: u32,
    /// Driving angle advance per frame, radians
    pub angle_step: f32,
    pub background: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub half_width: f32,
    pub half_height: f32,
    pub depth: f32,
    pub spacing: f32,
    pub color: Rgb,
    pub stroke: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Cube,
    Diamond,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    pub shape: ShapeKind,
    pub center: [f32; 3],
    /// Cube half-extent, or diamond tip distance
    pub size: f32,
    pub spin: Spin,
    /// Line or outline color
    pub color: Rgb,
    /// Face fill, solids only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgb>,
    pub stroke: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glow: Option<Glow>,
}

impl ObjectConfig {
    pub fn center_point(&self) -> Point3D {
        Point3D::new(self.center[0], self.center[1], self.center[2])
    }
}

/// Faux glow: the edge set is redrawn `passes` times, fading from white
/// toward the base color by `falloff` per pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    pub passes: u32,
    pub falloff: u8,
}

impl Config {
    pub fn neon() -> Self {
        Self {
            display: DisplayConfig {
                width: 1000,
                height: 700,
                unit_scale: 350.0,
                eye_depth: 2.0,
                head_gain: 1.0,
                mirror: true,
                fps: 60,
                angle_step: 0.02,
                background: Rgb::BLACK,
            },
            room: RoomConfig {
                half_width: 3.0,
                half_height: 2.2,
                depth: 8.0,
                spacing: 1.0,
                color: Rgb::NEON_BLUE,
                stroke: 1,
            },
            objects: vec![
                ObjectConfig {
                    name: "cube".to_string(),
                    shape: ShapeKind::Cube,
                    center: [0.0, 0.0, 4.0],
                    size: 0.35,
                    spin: Spin::new(0.6, 1.0, 0.4),
                    color: Rgb::RED,
                    fill: Some(Rgb::new(255, 50, 50)),
                    stroke: 2,
                    glow: None,
                },
                ObjectConfig {
                    name: "diamond".to_string(),
                    shape: ShapeKind::Diamond,
                    center: [1.3, 0.0, 4.0],
                    size: 0.55,
                    spin: Spin::yaw(0.6),
                    color: Rgb::RED,
                    fill: None,
                    stroke: 2,
                    glow: Some(Glow {
                        passes: 6,
                        falloff: 40,
                    }),
                },
            ],
        }
    }

    pub fn studio() -> Self {
        Self {
            display: DisplayConfig {
                width: 1000,
                height: 700,
                unit_scale: 300.0,
                eye_depth: 2.0,
                head_gain: 1.5,
                mirror: true,
                fps: 60,
                angle_step: 0.02,
                background: Rgb::new(10, 10, 10),
            },
            room: RoomConfig {
                half_width: 3.0,
                half_height: 2.0,
                depth: 8.0,
                spacing: 1.0,
                color: Rgb::NEON_BLUE,
                stroke: 1,
            },
            objects: vec![ObjectConfig {
                name: "cube".to_string(),
                shape: ShapeKind::Cube,
                center: [0.0, 0.0, 4.0],
                size: 0.5,
                spin: Spin::new(1.0, 0.5, 0.2),
                color: Rgb::RED,
                fill: Some(Rgb::new(100, 0, 0)),
                stroke: 3,
                glow: None,
            }],
        }
    }

    /// Layer a TOML document over `preset`
    pub fn from_toml_over(preset: Preset, text: &str) -> Result<Self> {
        let overlay: Table = text.parse()?;
        let mut base = Value::try_from(preset.config())?;
        merge(&mut base, Value::Table(overlay));

        let config: Config = base.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` over `preset`, or just the preset when no path is given
    pub fn load(preset: Preset, path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            let config = preset.config();
            config.validate()?;
            return Ok(config);
        };

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), %preset, "loading config file");
        Self::from_toml_over(preset, &text)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.display;
        if d.width == 0 || d.height == 0 {
            return invalid("display size must be non-zero");
        }
        positive("display.unit_scale", d.unit_scale)?;
        positive("display.eye_depth", d.eye_depth)?;
        if !d.head_gain.is_finite() {
            return invalid("display.head_gain must be finite");
        }
        if !d.angle_step.is_finite() {
            return invalid("display.angle_step must be finite");
        }
        if d.fps == 0 {
            return invalid("display.fps must be at least 1");
        }

        let r = &self.room;
        positive("room.half_width", r.half_width)?;
        positive("room.half_height", r.half_height)?;
        positive("room.depth", r.depth)?;
        positive("room.spacing", r.spacing)?;
        let extent = (2.0 * r.half_width).max(2.0 * r.half_height).max(r.depth);
        if extent / r.spacing > MAX_GRID_STEPS {
            return invalid(format!(
                "room.spacing {} is too fine for a room extent of {extent} (at most {MAX_GRID_STEPS} steps)",
                r.spacing
            ));
        }
        stroke("room.stroke", r.stroke)?;

        for object in &self.objects {
            positive(&format!("objects.{}.size", object.name), object.size)?;
            if object.center.iter().any(|c| !c.is_finite()) {
                return invalid(format!("objects.{}.center must be finite", object.name));
            }
            stroke(&format!("objects.{}.stroke", object.name), object.stroke)?;
            if let Some(glow) = object.glow {
                if glow.passes > MAX_GLOW_PASSES {
                    return invalid(format!(
                        "objects.{}.glow.passes must be at most {MAX_GLOW_PASSES}, got {}",
                        object.name, glow.passes
                    ));
                }
            }
        }
        Ok(())
    }

    /// Projector for this config's surface and constants
    pub fn projector(&self) -> OffAxisProjector {
        OffAxisProjector {
            eye_depth: self.display.eye_depth,
            unit_scale: self.display.unit_scale,
            head_gain: self.display.head_gain,
            width: self.display.width,
            height: self.display.height,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Preset::default().config()
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn positive(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        invalid(format!("{field} must be positive, got {value}"))
    }
}

fn stroke(field: &str, value: u32) -> Result<()> {
    if value <= MAX_STROKE {
        Ok(())
    } else {
        invalid(format!("{field} must be at most {MAX_STROKE}, got {value}"))
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(ConfigError::Invalid(msg.into()))
}
