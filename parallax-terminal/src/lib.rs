/// Terminal front end for the head-coupled renderer
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, terminal,
};
use parallax_core::{Config, HeadSource, Renderer, Rgb, RotationState, Scene, Surface};
use std::io::{self, stdout, Stdout};
use std::time::{Duration, Instant};

pub mod canvas;
pub mod tracker;

pub use canvas::TerminalCanvas;

/// Head offset change per arrow key press
pub const KEY_STEP: f32 = 0.1;

const HUD_COLOR: Rgb = Rgb::new(255, 255, 0);

/// What a key press asks the app to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    Nudge(f32, f32),
    Recenter,
    ToggleHud,
    None,
}

/// Map a key event to an action
pub fn action_for(key: &KeyEvent) -> Action {
    if key.kind == KeyEventKind::Release {
        return Action::None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Left => Action::Nudge(-KEY_STEP, 0.0),
        KeyCode::Right => Action::Nudge(KEY_STEP, 0.0),
        KeyCode::Up => Action::Nudge(0.0, -KEY_STEP),
        KeyCode::Down => Action::Nudge(0.0, KEY_STEP),
        KeyCode::Char('c') => Action::Recenter,
        KeyCode::Char('h') => Action::ToggleHud,
        _ => Action::None,
    }
}

/// Main application struct for terminal rendering
pub struct TerminalApp {
    preset: String,
    scene: Scene,
    renderer: Renderer,
    canvas: TerminalCanvas<Stdout>,
    head: Box<dyn HeadSource>,
    rotation: RotationState,
    angle_step: f32,
    frame_time: Duration,
    running: bool,
    show_hud: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: &Config, preset: &str, head: Box<dyn HeadSource>) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        let display = &config.display;

        Ok(Self {
            preset: preset.to_string(),
            scene: Scene::from_config(config),
            renderer: Renderer::new(config.projector()),
            canvas: TerminalCanvas::new(
                stdout(),
                cols as usize,
                rows as usize,
                display.width,
                display.height,
            ),
            head,
            rotation: RotationState::zero(),
            angle_step: display.angle_step,
            frame_time: Duration::from_secs_f64(1.0 / display.fps.max(1) as f64),
            running: true,
            show_hud: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    /// Run until quit. The head source is stopped and the terminal restored
    /// on every exit path.
    pub fn run(&mut self) -> io::Result<()> {
        let setup = terminal::enable_raw_mode()
            .and_then(|_| execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide));

        let result = setup.and_then(|_| self.main_loop());

        self.shutdown();
        let restore = execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)
            .and_then(|_| terminal::disable_raw_mode());

        result.and(restore)
    }

    fn shutdown(&mut self) {
        self.running = false;
        self.head.stop();
        tracing::info!(angle = self.rotation.angle, "renderer shutting down");
    }

    fn main_loop(&mut self) -> io::Result<()> {
        tracing::info!(
            preset = %self.preset,
            head = self.head.name(),
            fps = 1.0 / self.frame_time.as_secs_f32(),
            "render loop started"
        );

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }
            if !self.running {
                break;
            }

            self.render()?;
            self.rotation.advance(self.angle_step);

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
                tracing::debug!(fps = self.fps, "frame rate");
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => match action_for(&key) {
                Action::Quit => self.running = false,
                Action::Nudge(dx, dy) => self.head.nudge(dx, dy),
                Action::Recenter => self.head.recenter(),
                Action::ToggleHud => self.show_hud = !self.show_hud,
                Action::None => {}
            },
            Event::Resize(cols, rows) => {
                tracing::debug!(cols, rows, "terminal resized");
                self.canvas.resize(cols as usize, rows as usize);
            }
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        // One snapshot per frame
        let head = self.head.latest();
        let stats = self
            .renderer
            .render_frame(&mut self.canvas, &self.scene, self.rotation.angle, head);

        if stats.skipped > 0 {
            tracing::trace!(skipped = stats.skipped, "primitives behind the eye plane");
        }

        if self.show_hud {
            let hud = format!(
                "Parallax [{}] | head {:+.2} {:+.2} ({}) | FPS: {:.1} | Arrows=Head C=Center H=HUD Q=Quit",
                self.preset,
                head.x,
                head.y,
                self.head.name(),
                self.fps
            );
            self.canvas.text(0, 0, &hud, HUD_COLOR);
        }

        self.canvas.present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(action_for(&key(KeyCode::Char('q'), KeyModifiers::NONE)), Action::Quit);
        assert_eq!(action_for(&key(KeyCode::Esc, KeyModifiers::NONE)), Action::Quit);
        assert_eq!(action_for(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)), Action::Quit);
    }

    #[test]
    fn test_head_keys() {
        assert_eq!(
            action_for(&key(KeyCode::Left, KeyModifiers::NONE)),
            Action::Nudge(-KEY_STEP, 0.0)
        );
        assert_eq!(
            action_for(&key(KeyCode::Down, KeyModifiers::NONE)),
            Action::Nudge(0.0, KEY_STEP)
        );
        assert_eq!(action_for(&key(KeyCode::Char('c'), KeyModifiers::NONE)), Action::Recenter);
        assert_eq!(action_for(&key(KeyCode::Char('h'), KeyModifiers::NONE)), Action::ToggleHud);
        assert_eq!(action_for(&key(KeyCode::Char('x'), KeyModifiers::NONE)), Action::None);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut release = key(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(action_for(&release), Action::None);
    }
}
