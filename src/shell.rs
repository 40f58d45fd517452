//! The application context: owns the window, its remembered geometry and the
//! files it is persisted to, and reacts to one `ShellEvent` at a time.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::constants::{files, window};
use crate::event_log::EventLog;
use crate::geometry::{
    clamp_to_screen, enforce_min_size, GeometryRequest, GestureTracker, Point, Rect, Size,
};
use crate::persistence::{ConfigStore, WindowConfig};

/// Everything the shell needs from the windowing system
pub trait WindowBackend {
    fn screen_size(&self) -> Size;

    /// Move without resizing
    fn move_to(&mut self, origin: Point) -> Result<()>;

    /// Resize without moving
    fn resize_to(&mut self, size: Size) -> Result<()>;

    fn paint(&mut self, text: &str) -> Result<()>;

    /// Run the modal About dialog until it is dismissed
    fn show_about(&mut self) -> Result<DialogOutcome>;

    /// Destroy the window. A `ShellEvent::Destroyed` follows.
    fn destroy(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Ok,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    About,
    Exit,
}

/// Window notifications, already decoded from the windowing system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    Moved(Rect),
    Resized(Rect),
    GestureStarted(Rect),
    GestureEnded(Rect),
    Paint,
    Command(Command),
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// File locations and the minimum tracking size
#[derive(Debug, Clone)]
pub struct ShellSettings {
    pub config_path: PathBuf,
    pub log_path: PathBuf,
    pub min_track_size: Size,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(files::CONFIG_FILE),
            log_path: PathBuf::from(files::LOG_FILE),
            min_track_size: Size::new(window::MIN_WIDTH, window::MIN_HEIGHT),
        }
    }
}

pub struct WindowShell<B> {
    backend: B,
    config: WindowConfig,
    store: ConfigStore,
    log: EventLog,
    gesture: GestureTracker,
    /// Geometry changes asked of the backend, not yet reported back
    requested: Vec<GeometryRequest>,
    min_track_size: Size,
}

impl<B: WindowBackend> WindowShell<B> {
    pub fn new(
        backend: B,
        config: WindowConfig,
        store: ConfigStore,
        log: EventLog,
        min_track_size: Size,
    ) -> Self {
        Self {
            backend,
            config,
            store,
            log,
            gesture: GestureTracker::new(),
            requested: Vec::new(),
            min_track_size,
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Hand over the corrections made since the last call, so their
    /// notifications are not mistaken for the user dragging the window
    pub fn take_requests(&mut self) -> Vec<GeometryRequest> {
        std::mem::take(&mut self.requested)
    }

    pub fn handle(&mut self, event: ShellEvent) -> Result<Flow> {
        match event {
            ShellEvent::Moved(rect) => self.on_moved(rect)?,
            ShellEvent::Resized(rect) => self.on_resized(rect)?,
            ShellEvent::GestureStarted(rect) => {
                if !self.gesture.begin(rect) {
                    debug!(?rect, state = ?self.gesture.state(), "gesture already in progress");
                }
            }
            ShellEvent::GestureEnded(rect) => {
                if let Some(message) = self.gesture.end(rect).and_then(|d| d.message()) {
                    let _ = self.log.log(&message);
                }
            }
            ShellEvent::Paint => self.backend.paint(window::GREETING)?,
            ShellEvent::Command(Command::About) => {
                let outcome = self.backend.show_about()?;
                debug!(?outcome, "about dialog closed");
            }
            ShellEvent::Command(Command::Exit) => {
                info!("exit requested");
                self.backend.destroy()?;
            }
            ShellEvent::Destroyed => {
                if let Err(e) = self.store.save(&self.config, &self.log) {
                    warn!(error = %e, "continuing shutdown without saved geometry");
                }
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn on_moved(&mut self, rect: Rect) -> Result<()> {
        self.config.set_origin(rect.origin());

        // The corrective move comes back as another Moved event, which is
        // already on screen and therefore stops here.
        if let Some(corrected) = clamp_to_screen(rect, self.backend.screen_size()) {
            debug!(from = ?rect, to = ?corrected, "snapping window back on screen");
            self.config.set_origin(corrected.origin());
            self.backend.move_to(corrected.origin())?;
            self.requested.push(GeometryRequest::Move(corrected.origin()));
        }
        Ok(())
    }

    fn on_resized(&mut self, rect: Rect) -> Result<()> {
        let size = enforce_min_size(rect.size(), self.min_track_size);
        self.config.set_size(size);

        if size != rect.size() {
            debug!(requested = %rect.size(), applied = %size, "enforcing minimum tracking size");
            self.backend.resize_to(size)?;
            self.requested.push(GeometryRequest::Resize(size));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::fs;

    #[test]
    fn test_move_on_screen_updates_config_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        let flow = shell.handle(ShellEvent::Moved(Rect::new(100, 50, 300, 200))).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!((shell.config().x, shell.config().y), (100, 50));
        assert!(shell.backend().calls.is_empty());
    }

    #[test]
    fn test_move_off_screen_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::Moved(Rect::new(-50, 0, 300, 200))).unwrap();
        assert_eq!(shell.backend().calls, vec![Call::MoveTo(Point::new(0, 0))]);
        assert_eq!((shell.config().x, shell.config().y), (0, 0));

        // The corrective move reports back on screen and does not move again
        shell.handle(ShellEvent::Moved(Rect::new(0, 0, 300, 200))).unwrap();
        assert_eq!(shell.backend().calls.len(), 1);
    }

    #[test]
    fn test_resize_records_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::Resized(Rect::new(0, 0, 800, 600))).unwrap();
        assert_eq!((shell.config().width, shell.config().height), (800, 600));
        assert!(shell.backend().calls.is_empty());
    }

    #[test]
    fn test_resize_below_floor_is_raised() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::Resized(Rect::new(0, 0, 120, 90))).unwrap();
        assert_eq!(
            shell.backend().calls,
            vec![Call::ResizeTo(Size::new(window::MIN_WIDTH, window::MIN_HEIGHT))]
        );
        assert_eq!(
            (shell.config().width, shell.config().height),
            (window::MIN_WIDTH, window::MIN_HEIGHT)
        );
    }

    #[test]
    fn test_gesture_logs_move_only_when_both_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::GestureStarted(Rect::new(0, 0, 300, 200))).unwrap();
        shell.handle(ShellEvent::GestureEnded(Rect::new(50, 0, 400, 200))).unwrap();

        let lines = log_lines(&dir);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("Window moved from (0,0) to (50,0)"));
    }

    #[test]
    fn test_gesture_logs_resize() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::GestureStarted(Rect::new(0, 0, 300, 200))).unwrap();
        shell.handle(ShellEvent::GestureEnded(Rect::new(0, 0, 400, 250))).unwrap();

        let lines = log_lines(&dir);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("Size changed from (300,200) to (400,250)"));
    }

    #[test]
    fn test_unchanged_gesture_logs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::GestureStarted(Rect::new(0, 0, 300, 200))).unwrap();
        shell.handle(ShellEvent::GestureEnded(Rect::new(0, 0, 300, 200))).unwrap();
        shell.handle(ShellEvent::GestureEnded(Rect::new(9, 9, 300, 200))).unwrap();

        assert!(log_lines(&dir).is_empty());
    }

    #[test]
    fn test_paint_draws_greeting() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::Paint).unwrap();
        assert_eq!(
            shell.backend().calls,
            vec![Call::Paint("Mirada technical challenge".to_string())]
        );
    }

    #[test]
    fn test_about_either_button_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        let flow = shell.handle(ShellEvent::Command(Command::About)).unwrap();
        assert_eq!(flow, Flow::Continue);

        shell.backend_mut().about_outcome = DialogOutcome::Cancel;
        let flow = shell.handle(ShellEvent::Command(Command::About)).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(shell.backend().calls, vec![Call::ShowAbout, Call::ShowAbout]);
    }

    #[test]
    fn test_exit_destroys_then_destroyed_saves_and_quits() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);

        shell.handle(ShellEvent::Moved(Rect::new(10, 20, 800, 600))).unwrap();
        shell.handle(ShellEvent::Resized(Rect::new(10, 20, 800, 600))).unwrap();

        let flow = shell.handle(ShellEvent::Command(Command::Exit)).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(shell.backend().calls, vec![Call::Destroy]);

        let flow = shell.handle(ShellEvent::Destroyed).unwrap();
        assert_eq!(flow, Flow::Quit);
        assert_eq!(
            fs::read_to_string(dir.path().join("config.ini")).unwrap(),
            "10 20 800 600"
        );
        assert!(log_lines(&dir).last().unwrap().ends_with("Saving configuration..."));
    }

    #[test]
    fn test_destroyed_quits_even_when_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = WindowShell::new(
            FakeBackend::new(),
            WindowConfig::default(),
            ConfigStore::new(dir.path().join("missing").join("config.ini")),
            EventLog::new(dir.path().join("app.log")),
            Size::new(window::MIN_WIDTH, window::MIN_HEIGHT),
        );

        assert_eq!(shell.handle(ShellEvent::Destroyed).unwrap(), Flow::Quit);
    }
}
