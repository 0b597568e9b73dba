/// Depth-sorted rendering onto an abstract drawing surface.
///
/// Every frame re-derives all geometry from the scene's base shapes and the
/// current driving angle, projects it for the current head offset and issues
/// draw calls. A point that fails to project removes exactly the primitives
/// that use it.
use std::cmp::Ordering;
use std::io;

use serde::{Deserialize, Serialize};

use crate::config::Glow;
use crate::geometry::{Point3D, RoomGrid, Solid, Wireframe};
use crate::head::HeadOffset;
use crate::projection::{OffAxisProjector, ScreenPoint};
use crate::scene::{Scene, Shape, Style};

/// 8-bit RGB color, written as `[r, g, b]` in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const NEON_BLUE: Rgb = Rgb::new(0, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lift every channel to at least `level`
    pub fn lifted(self, level: u8) -> Self {
        Self {
            r: self.r.max(level),
            g: self.g.max(level),
            b: self.b.max(level),
        }
    }

    /// Perceived brightness in [0, 255]
    pub fn luma(self) -> u8 {
        let y = 0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32;
        y.round().clamp(0.0, 255.0) as u8
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

/// 2D canvas the renderer draws on, in the projector's pixel space
pub trait Surface {
    fn clear(&mut self, color: Rgb);

    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Rgb);

    fn stroke_polygon(&mut self, points: &[ScreenPoint], color: Rgb, width: u32);

    fn line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgb, width: u32);

    /// Show the finished frame
    fn present(&mut self) -> io::Result<()>;
}

/// Primitive counts for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    pub skipped: usize,
}

impl FrameStats {
    fn record(&mut self, drawn: bool) {
        if drawn {
            self.drawn += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Face indices ordered farthest first by mean z.
///
/// The sort is stable, so faces at equal depth keep their table order and
/// repeated sorts of the same geometry give the same order.
pub fn depth_order(solid: &Solid) -> Vec<usize> {
    let depths: Vec<f32> = solid.faces.iter().map(|f| solid.face_depth(f)).collect();
    let mut order: Vec<usize> = (0..solid.faces.len()).collect();
    order.sort_by(|&a, &b| depths[b].partial_cmp(&depths[a]).unwrap_or(Ordering::Equal));
    order
}

/// Colors and widths for each glow pass, in drawing order.
///
/// Pass `i` is lifted toward white by `255 - i * falloff` and is `i` pixels
/// wider than the base stroke. Passes come out widest and dimmest first so
/// the bright core lands on top.
pub fn glow_passes(color: Rgb, stroke: u32, glow: &Glow) -> Vec<(Rgb, u32)> {
    (0..glow.passes)
        .rev()
        .map(|i| {
            let drop = (i as u64 * glow.falloff as u64).min(255) as u8;
            (color.lifted(255 - drop), stroke.saturating_add(i))
        })
        .collect()
}

pub struct Renderer {
    projector: OffAxisProjector,
}

impl Renderer {
    pub fn new(projector: OffAxisProjector) -> Self {
        Self { projector }
    }

    /// Clear and draw the room and every object. Does not present.
    pub fn render_frame<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        scene: &Scene,
        angle: f32,
        head: HeadOffset,
    ) -> FrameStats {
        let mut stats = FrameStats::default();
        surface.clear(scene.background);

        self.draw_room(surface, &scene.room, scene.room_color, scene.room_stroke, head, &mut stats);

        for object in &scene.objects {
            match object.shape(angle) {
                Shape::Solid(solid) => {
                    self.draw_solid(surface, &solid, &object.style, head, &mut stats)
                }
                Shape::Wireframe(wire) => {
                    self.draw_wireframe(surface, &wire, &object.style, head, &mut stats)
                }
            }
        }

        stats
    }

    pub fn draw_room<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        room: &RoomGrid,
        color: Rgb,
        stroke: u32,
        head: HeadOffset,
        stats: &mut FrameStats,
    ) {
        for (a, b) in &room.segments {
            stats.record(self.segment(surface, a, b, color, stroke, head));
        }

        for corners in &room.frames {
            let projected: Option<Vec<ScreenPoint>> =
                corners.iter().map(|p| self.projector.project(p, head)).collect();
            match projected {
                Some(pts) => {
                    for i in 0..pts.len() {
                        surface.line(pts[i], pts[(i + 1) % pts.len()], color, stroke);
                    }
                    stats.record(true);
                }
                None => stats.record(false),
            }
        }
    }

    /// Painter's algorithm: farthest face first, fill then outline
    pub fn draw_solid<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        solid: &Solid,
        style: &Style,
        head: HeadOffset,
        stats: &mut FrameStats,
    ) {
        let projected = self.projector.project_all(&solid.vertices, head);

        for face_index in depth_order(solid) {
            let face = &solid.faces[face_index];
            let pts: Option<Vec<ScreenPoint>> = face.iter().map(|&i| projected[i]).collect();
            let Some(pts) = pts else {
                stats.record(false);
                continue;
            };

            if let Some(fill) = style.fill {
                surface.fill_polygon(&pts, fill);
            }
            surface.stroke_polygon(&pts, style.color, style.stroke);
            stats.record(true);
        }
    }

    pub fn draw_wireframe<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        wire: &Wireframe,
        style: &Style,
        head: HeadOffset,
        stats: &mut FrameStats,
    ) {
        let projected = self.projector.project_all(&wire.vertices, head);
        let passes = match &style.glow {
            Some(glow) => glow_passes(style.color, style.stroke, glow),
            None => vec![(style.color, style.stroke)],
        };

        for &(a, b) in wire.edges {
            match (projected[a], projected[b]) {
                (Some(pa), Some(pb)) => {
                    for &(color, width) in &passes {
                        surface.line(pa, pb, color, width);
                    }
                    stats.record(true);
                }
                _ => stats.record(false),
            }
        }
    }

    fn segment<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        a: &Point3D,
        b: &Point3D,
        color: Rgb,
        width: u32,
        head: HeadOffset,
    ) -> bool {
        match (self.projector.project(a, head), self.projector.project(b, head)) {
            (Some(pa), Some(pb)) => {
                surface.line(pa, pb, color, width);
                true
            }
            _ => false,
        }
    }
}

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgb),
    FillPolygon(Vec<ScreenPoint>, Rgb),
    StrokePolygon(Vec<ScreenPoint>, Rgb, u32),
    Line(ScreenPoint, ScreenPoint, Rgb, u32),
}

/// Surface that records draw calls instead of rasterizing them
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
    pub frames: usize,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, color: Rgb) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Rgb) {
        self.commands.push(DrawCommand::FillPolygon(points.to_vec(), color));
    }

    fn stroke_polygon(&mut self, points: &[ScreenPoint], color: Rgb, width: u32) {
        self.commands
            .push(DrawCommand::StrokePolygon(points.to_vec(), color, width));
    }

    fn line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgb, width: u32) {
        self.commands.push(DrawCommand::Line(from, to, color, width));
    }

    fn present(&mut self) -> io::Result<()> {
        self.frames += 1;
        Ok(())
    }
}
