/// Parallax Core Library - head-coupled off-axis rendering
///
/// This library provides the stateless core of the renderer: axis rotations,
/// the off-axis projection, shape builders, depth-sorted drawing onto an
/// abstract surface, configuration presets, and the shared head offset.

pub mod config;
pub mod error;
pub mod geometry;
pub mod head;
pub mod projection;
pub mod protocol;
pub mod render;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use config::{Config, Preset};
pub use error::ConfigError;
pub use geometry::{Edge, Face, Point3D};
pub use head::{HeadOffset, HeadSource, SharedHeadOffset};
pub use projection::{OffAxisProjector, ScreenPoint};
pub use render::{FrameStats, Renderer, Rgb, Surface};
pub use scene::Scene;
pub use transform::{rotate3d, RotationState, Spin};
