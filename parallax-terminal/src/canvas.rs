/// Character-cell rasterizer implementing the core drawing surface
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use parallax_core::{Rgb, ScreenPoint, Surface};
use std::io::{self, Write};

/// Character luminosity ramp for fills (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Glyph used for strokes
const STROKE_CHAR: char = '#';

/// Thickest brush, in cells either side of the stroke
const MAX_BRUSH_RADIUS: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub color: Rgb,
}

/// Terminal canvas.
///
/// Draw calls arrive in the projector's pixel space (`px_width` by
/// `px_height`) and are scaled down onto a grid of `cols` by `rows` cells.
pub struct TerminalCanvas<W: Write> {
    out: W,
    cols: usize,
    rows: usize,
    px_width: f32,
    px_height: f32,
    background: Rgb,
    cells: Vec<Cell>,
}

impl<W: Write> TerminalCanvas<W> {
    pub fn new(out: W, cols: usize, rows: usize, px_width: u32, px_height: u32) -> Self {
        Self {
            out,
            cols,
            rows,
            px_width: px_width.max(1) as f32,
            px_height: px_height.max(1) as f32,
            background: Rgb::BLACK,
            cells: vec![blank(Rgb::BLACK); cols * rows],
        }
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![blank(self.background); cols * rows];
    }

    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<Cell> {
        (col < self.cols && row < self.rows).then(|| self.cells[row * self.cols + col])
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Write text straight into the cell grid, clipped to the row
    pub fn text(&mut self, col: usize, row: usize, text: &str, color: Rgb) {
        if row >= self.rows {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let c = col + i;
            if c >= self.cols {
                break;
            }
            self.cells[row * self.cols + c] = Cell { ch, color };
        }
    }

    fn to_cell_space(&self, p: ScreenPoint) -> (f32, f32) {
        (
            p.0 as f32 * self.cols as f32 / self.px_width,
            p.1 as f32 * self.rows as f32 / self.px_height,
        )
    }

    /// Stroke width in pixels to a brush radius in cells
    fn brush_radius(&self, width: u32) -> i32 {
        let cells = width as f32 * self.cols as f32 / self.px_width;
        ((cells / 2.0).floor() as i32).min(MAX_BRUSH_RADIUS)
    }

    fn plot(&mut self, x: i32, y: i32, cell: Cell) {
        if x < 0 || y < 0 || x as usize >= self.cols || y as usize >= self.rows {
            return;
        }
        self.cells[y as usize * self.cols + x as usize] = cell;
    }

    fn stamp(&mut self, x: i32, y: i32, radius: i32, cell: Cell) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                self.plot(x + dx, y + dy, cell);
            }
        }
    }

    fn rasterize_line(&mut self, from: (f32, f32), to: (f32, f32), radius: i32, cell: Cell) {
        // Bresenham over cell coordinates
        let (mut x0, mut y0) = (from.0.floor() as i32, from.1.floor() as i32);
        let (x1, y1) = (to.0.floor() as i32, to.1.floor() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp(x0, y0, radius, cell);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn rasterize_triangle(&mut self, v: [(f32, f32); 3], cell: Cell) {
        let [v0, v1, v2] = v;

        // Bounding box, clipped to the grid
        let min_x = v0.0.min(v1.0).min(v2.0).floor().max(0.0) as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil().min(self.cols as f32 - 1.0) as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor().max(0.0) as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil().min(self.rows as f32 - 1.0) as i32;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                if let Some((w0, w1, w2)) = barycentric(v0, v1, v2, p) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        self.plot(x, y, cell);
                    }
                }
            }
        }
    }

    /// Flush the grid to the writer
    pub fn draw(&mut self) -> io::Result<()> {
        self.out.queue(cursor::MoveTo(0, 0))?;
        self.out.queue(SetBackgroundColor(to_color(self.background)))?;

        let mut current: Option<Rgb> = None;
        for row in 0..self.rows {
            self.out.queue(cursor::MoveTo(0, row as u16))?;
            for col in 0..self.cols {
                let cell = self.cells[row * self.cols + col];
                if current != Some(cell.color) {
                    self.out.queue(SetForegroundColor(to_color(cell.color)))?;
                    current = Some(cell.color);
                }
                self.out.queue(Print(cell.ch))?;
            }
        }
        self.out.queue(ResetColor)?;
        self.out.flush()
    }
}

impl<W: Write> Surface for TerminalCanvas<W> {
    fn clear(&mut self, color: Rgb) {
        self.background = color;
        self.cells.fill(blank(color));
    }

    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Rgb) {
        if points.len() < 3 {
            return;
        }
        let cell = Cell {
            ch: ramp_char(color),
            color,
        };
        let pts: Vec<(f32, f32)> = points.iter().map(|&p| self.to_cell_space(p)).collect();
        // Fan triangulation; faces are convex
        for i in 1..pts.len() - 1 {
            self.rasterize_triangle([pts[0], pts[i], pts[i + 1]], cell);
        }
    }

    fn stroke_polygon(&mut self, points: &[ScreenPoint], color: Rgb, width: u32) {
        for i in 0..points.len() {
            self.line(points[i], points[(i + 1) % points.len()], color, width);
        }
    }

    fn line(&mut self, from: ScreenPoint, to: ScreenPoint, color: Rgb, width: u32) {
        let cell = Cell {
            ch: STROKE_CHAR,
            color,
        };
        let radius = self.brush_radius(width);
        let (a, b) = (self.to_cell_space(from), self.to_cell_space(to));
        self.rasterize_line(a, b, radius, cell);
    }

    fn present(&mut self) -> io::Result<()> {
        self.draw()
    }
}

fn blank(background: Rgb) -> Cell {
    Cell {
        ch: ' ',
        color: background,
    }
}

fn ramp_char(color: Rgb) -> char {
    let index = color.luma() as usize * LUMINOSITY_RAMP.len() / 256;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 10 pixels per cell on both axes
    fn canvas() -> TerminalCanvas<Vec<u8>> {
        TerminalCanvas::new(Vec::new(), 100, 70, 1000, 700)
    }

    fn count(canvas: &TerminalCanvas<Vec<u8>>, ch: char) -> usize {
        let (cols, rows) = canvas.size();
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (c, r)))
            .filter(|&(c, r)| canvas.cell(c, r).map(|cell| cell.ch) == Some(ch))
            .count()
    }

    #[test]
    fn test_clear_sets_background() {
        let mut canvas = canvas();
        canvas.line((0, 0), (990, 0), Rgb::WHITE, 1);
        canvas.clear(Rgb::new(10, 10, 10));
        assert_eq!(count(&canvas, STROKE_CHAR), 0);
        assert_eq!(canvas.cell(5, 5).unwrap().color, Rgb::new(10, 10, 10));
    }

    #[test]
    fn test_horizontal_line() {
        let mut canvas = canvas();
        canvas.line((0, 105), (495, 105), Rgb::RED, 1);
        for col in 0..=49 {
            assert_eq!(canvas.cell(col, 10).unwrap().ch, STROKE_CHAR);
        }
        assert_eq!(canvas.cell(50, 10).unwrap().ch, ' ');
        assert_eq!(count(&canvas, STROKE_CHAR), 50);
    }

    #[test]
    fn test_diagonal_line_is_connected() {
        let mut canvas = canvas();
        canvas.line((0, 0), (300, 300), Rgb::RED, 1);
        for i in 0..=30 {
            assert_eq!(canvas.cell(i, i).unwrap().ch, STROKE_CHAR);
        }
    }

    #[test]
    fn test_wide_stroke_uses_brush() {
        let mut canvas = canvas();
        canvas.line((500, 350), (500, 350), Rgb::RED, 30);
        // 30 px is 3 cells wide: radius 1
        assert_eq!(count(&canvas, STROKE_CHAR), 9);
    }

    #[test]
    fn test_huge_stroke_is_capped() {
        let mut canvas = canvas();
        canvas.line((500, 350), (500, 350), Rgb::RED, u32::MAX);
        let side = (2 * MAX_BRUSH_RADIUS + 1) as usize;
        assert_eq!(count(&canvas, STROKE_CHAR), side * side);
    }

    #[test]
    fn test_fill_square() {
        let mut canvas = canvas();
        let square = [(100, 100), (200, 100), (200, 200), (100, 200)];
        canvas.fill_polygon(&square, Rgb::WHITE);

        let ch = ramp_char(Rgb::WHITE);
        assert_eq!(ch, '@');
        assert_eq!(count(&canvas, ch), 100);
        assert_eq!(canvas.cell(15, 15).unwrap().ch, ch);
        assert_eq!(canvas.cell(25, 25).unwrap().ch, ' ');
    }

    #[test]
    fn test_fill_ignores_winding() {
        let mut a = canvas();
        let mut b = canvas();
        let cw = [(100, 100), (200, 100), (200, 200), (100, 200)];
        let ccw = [(100, 200), (200, 200), (200, 100), (100, 100)];
        a.fill_polygon(&cw, Rgb::RED);
        b.fill_polygon(&ccw, Rgb::RED);
        assert_eq!(a.cells, b.cells);
    }

    #[test]
    fn test_offscreen_drawing_is_clipped() {
        let mut canvas = canvas();
        canvas.line((-5000, -5000), (-100, -100), Rgb::RED, 1);
        canvas.fill_polygon(&[(2000, 2000), (3000, 2000), (3000, 3000)], Rgb::RED);
        assert_eq!(count(&canvas, STROKE_CHAR), 0);
    }

    #[test]
    fn test_text_overlay_clips() {
        let mut canvas = TerminalCanvas::new(Vec::new(), 5, 2, 50, 20);
        canvas.text(2, 0, "hello", Rgb::WHITE);
        assert_eq!(canvas.cell(2, 0).unwrap().ch, 'h');
        assert_eq!(canvas.cell(4, 0).unwrap().ch, 'l');
        canvas.text(0, 9, "ignored", Rgb::WHITE);
    }

    #[test]
    fn test_present_writes_every_cell() {
        let mut canvas = TerminalCanvas::new(Vec::new(), 4, 2, 40, 20);
        canvas.clear(Rgb::BLACK);
        canvas.text(0, 0, "ab", Rgb::WHITE);
        canvas.present().unwrap();

        let out = String::from_utf8_lossy(canvas.writer());
        assert!(out.contains("ab"));
        assert!(out.contains("38;2;255;255;255"));
    }

    #[test]
    fn test_resize() {
        let mut canvas = canvas();
        canvas.resize(20, 10);
        assert_eq!(canvas.size(), (20, 10));
        assert!(canvas.cell(19, 9).is_some());
        assert!(canvas.cell(20, 9).is_none());
    }
}
