use anyhow::Result;
use tracing::{debug, error, trace};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;

use crate::constants::keysym;
use crate::geometry::{GeometryRequest, Rect};
use crate::main_window::menu_hit;
use crate::shell::{Command, Flow, ShellEvent, WindowBackend, WindowShell};
use crate::x11_utils::{has_modifier, is_synthetic, pointer_buttons_held, window_rect, AppContext};

/// Keyboard shortcuts of the main window
pub fn accelerator(sym: Keysym, state: KeyButMask) -> Option<Command> {
    let alt = has_modifier(state, KeyButMask::MOD1);
    let control = has_modifier(state, KeyButMask::CONTROL);
    match sym {
        keysym::F1 => Some(Command::About),
        keysym::QUESTION | keysym::SLASH if alt => Some(Command::About),
        keysym::LOWER_Q if control => Some(Command::Exit),
        _ => None,
    }
}

/// Turns X11 events for the main window into `ShellEvent`s.
///
/// X11 has no "move/resize started/finished" notification, so a gesture is
/// inferred. It starts at the first geometry change made while a pointer
/// button is held, carrying the geometry from before the change. Changes
/// the program requested itself, or made with no button held (window
/// manager placement, maximizing), never start one. It ends at the first
/// point where no button is held: a geometry report, any other event, the
/// event queue running dry, or the window being destroyed.
#[derive(Debug)]
pub struct EventTranslator {
    window: Window,
    last_rect: Option<Rect>,
    in_gesture: bool,
    expected: Vec<GeometryRequest>,
}

impl EventTranslator {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            last_rect: None,
            in_gesture: false,
            expected: Vec::new(),
        }
    }

    pub fn in_gesture(&self) -> bool {
        self.in_gesture
    }

    /// Geometry changes the shell just asked for. Their reports update the
    /// stored geometry without counting as a user gesture.
    pub fn expect(&mut self, requests: impl IntoIterator<Item = GeometryRequest>) {
        self.expected.extend(requests);
    }

    pub fn translate(&mut self, ctx: &AppContext, event: Event) -> Result<Vec<ShellEvent>> {
        let events = match event {
            Event::ConfigureNotify(e) if e.window == self.window => {
                // Synthetic notifications from the window manager carry root
                // coordinates; real ones are relative to the frame.
                let rect = if is_synthetic(e.response_type) {
                    Rect::new(
                        i32::from(e.x),
                        i32::from(e.y),
                        i32::from(e.width),
                        i32::from(e.height),
                    )
                } else {
                    window_rect(ctx.conn, ctx.screen, self.window)?
                };
                let held = pointer_buttons_held(ctx.conn, ctx.screen)?;
                self.on_geometry(rect, held)
            }
            Event::DestroyNotify(e) if e.window == self.window => self.on_destroyed(),
            other => {
                let mut events = Vec::new();
                if self.in_gesture {
                    let held = pointer_buttons_held(ctx.conn, ctx.screen)?;
                    events.extend(self.end_if_released(held));
                }
                events.extend(self.translate_input(ctx, other));
                events
            }
        };
        Ok(events)
    }

    fn translate_input(&self, ctx: &AppContext, event: Event) -> Option<ShellEvent> {
        match event {
            Event::Expose(e) if e.window == self.window && e.count == 0 => Some(ShellEvent::Paint),
            Event::ClientMessage(e) if e.window == self.window && ctx.atoms.is_delete_request(&e) => {
                Some(ShellEvent::Command(Command::Exit))
            }
            Event::ButtonPress(e) if e.event == self.window && e.detail == 1 => {
                menu_hit(i32::from(e.event_x), i32::from(e.event_y)).map(ShellEvent::Command)
            }
            Event::KeyPress(e) if e.event == self.window => {
                let shifted = has_modifier(e.state, KeyButMask::SHIFT);
                ctx.keymap
                    .keysym(e.detail, shifted)
                    .and_then(|sym| accelerator(sym, e.state))
                    .map(ShellEvent::Command)
            }
            other => {
                trace!(event = ?other, "ignoring event");
                None
            }
        }
    }

    /// New client-area geometry observed, with the pointer button state at
    /// the time it was seen
    pub fn on_geometry(&mut self, rect: Rect, buttons_held: bool) -> Vec<ShellEvent> {
        let Some(previous) = self.last_rect.replace(rect) else {
            // First report after mapping: record where the window ended up
            return vec![ShellEvent::Moved(rect), ShellEvent::Resized(rect)];
        };
        let requested = self.take_expected(rect);

        let mut events = Vec::new();
        if previous != rect {
            if !self.in_gesture && buttons_held && !requested {
                debug!(?previous, "gesture started");
                self.in_gesture = true;
                events.push(ShellEvent::GestureStarted(previous));
            }
            if previous.origin() != rect.origin() {
                events.push(ShellEvent::Moved(rect));
            }
            if previous.size() != rect.size() {
                events.push(ShellEvent::Resized(rect));
            }
        }
        // A report that arrives after the release still belongs to the drag
        events.extend(self.end_if_released(buttons_held));
        events
    }

    /// Close the open gesture unless a pointer button is still down. Called
    /// when the event queue runs dry and before any later event is handled.
    pub fn end_if_released(&mut self, buttons_held: bool) -> Option<ShellEvent> {
        if !self.in_gesture || buttons_held {
            return None;
        }
        self.in_gesture = false;
        let rect = self.last_rect?;
        debug!(?rect, "gesture ended");
        Some(ShellEvent::GestureEnded(rect))
    }

    /// The window is gone: an open gesture ends where the window last was
    pub fn on_destroyed(&mut self) -> Vec<ShellEvent> {
        let mut events: Vec<_> = self.end_if_released(false).into_iter().collect();
        events.push(ShellEvent::Destroyed);
        events
    }

    /// Drop the requests `rect` satisfies; true if there were any
    fn take_expected(&mut self, rect: Rect) -> bool {
        let before = self.expected.len();
        self.expected.retain(|request| !request.matches(rect));
        self.expected.len() != before
    }
}

/// Run events through the shell, then tell the translator which geometry
/// changes the shell asked for along the way. Errors are logged and the
/// remaining events still run.
pub fn dispatch<B: WindowBackend>(
    shell: &mut WindowShell<B>,
    translator: &mut EventTranslator,
    events: impl IntoIterator<Item = ShellEvent>,
) -> Flow {
    let mut flow = Flow::Continue;
    for event in events {
        flow = shell
            .handle(event)
            .inspect_err(|err| error!("encountered error in 'handle': event={event:?}, err={err:#?}"))
            .unwrap_or(Flow::Continue);
        if flow == Flow::Quit {
            break;
        }
    }
    translator.expect(shell.take_requests());
    flow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Size};
    use crate::shell::test_support::{log_lines, test_shell, Call};

    #[test]
    fn test_first_geometry_is_recorded_without_gesture() {
        let mut translator = EventTranslator::new(1);
        let rect = Rect::new(10, 20, 300, 200);

        assert_eq!(
            translator.on_geometry(rect, false),
            vec![ShellEvent::Moved(rect), ShellEvent::Resized(rect)]
        );
        assert!(!translator.in_gesture());
        assert_eq!(translator.end_if_released(false), None);
    }

    #[test]
    fn test_move_burst_is_one_gesture() {
        let mut translator = EventTranslator::new(1);
        let start = Rect::new(0, 0, 300, 200);
        translator.on_geometry(start, false);

        let step = Rect::new(10, 0, 300, 200);
        assert_eq!(
            translator.on_geometry(step, true),
            vec![ShellEvent::GestureStarted(start), ShellEvent::Moved(step)]
        );

        let end = Rect::new(50, 0, 300, 200);
        assert_eq!(translator.on_geometry(end, true), vec![ShellEvent::Moved(end)]);

        // Button still down: the drag is not over
        assert_eq!(translator.end_if_released(true), None);
        assert_eq!(
            translator.end_if_released(false),
            Some(ShellEvent::GestureEnded(end))
        );
        assert!(!translator.in_gesture());
    }

    #[test]
    fn test_resize_reports_size_only() {
        let mut translator = EventTranslator::new(1);
        let start = Rect::new(0, 0, 300, 200);
        translator.on_geometry(start, false);

        let bigger = Rect::new(0, 0, 400, 260);
        assert_eq!(
            translator.on_geometry(bigger, true),
            vec![ShellEvent::GestureStarted(start), ShellEvent::Resized(bigger)]
        );
    }

    #[test]
    fn test_unchanged_geometry_is_ignored() {
        let mut translator = EventTranslator::new(1);
        let rect = Rect::new(0, 0, 300, 200);
        translator.on_geometry(rect, false);

        assert!(translator.on_geometry(rect, true).is_empty());
        assert!(!translator.in_gesture());
    }

    #[test]
    fn test_change_without_button_is_not_a_gesture() {
        // Window manager maximizing the window after it was mapped
        let mut translator = EventTranslator::new(1);
        translator.on_geometry(Rect::new(100, 100, 640, 480), false);

        let maximized = Rect::new(0, 0, 1920, 1080);
        assert_eq!(
            translator.on_geometry(maximized, false),
            vec![ShellEvent::Moved(maximized), ShellEvent::Resized(maximized)]
        );
        assert!(!translator.in_gesture());
    }

    #[test]
    fn test_release_report_ends_gesture_with_final_geometry() {
        let mut translator = EventTranslator::new(1);
        let start = Rect::new(0, 0, 300, 200);
        translator.on_geometry(start, false);
        translator.on_geometry(Rect::new(20, 0, 300, 200), true);

        let last = Rect::new(30, 0, 300, 200);
        assert_eq!(
            translator.on_geometry(last, false),
            vec![ShellEvent::Moved(last), ShellEvent::GestureEnded(last)]
        );
        assert!(!translator.in_gesture());
    }

    #[test]
    fn test_second_drag_after_release_is_separate() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);
        let mut translator = EventTranslator::new(1);

        let events = translator.on_geometry(Rect::new(0, 0, 300, 200), false);
        dispatch(&mut shell, &mut translator, events);
        let events = translator.on_geometry(Rect::new(40, 0, 300, 200), true);
        dispatch(&mut shell, &mut translator, events);
        // The queue ran dry mid-drag, the release itself is not reported
        assert_eq!(translator.end_if_released(true), None);

        // The next event sees no button held and closes the first drag
        let closed = translator.end_if_released(false);
        dispatch(&mut shell, &mut translator, closed);

        let events = translator.on_geometry(Rect::new(40, 0, 400, 300), true);
        dispatch(&mut shell, &mut translator, events);
        let closed = translator.end_if_released(false);
        dispatch(&mut shell, &mut translator, closed);

        let lines = log_lines(&dir);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Window moved from (0,0) to (40,0)"));
        assert!(lines[1].ends_with("Size changed from (300,200) to (400,300)"));
    }

    #[test]
    fn test_corrective_move_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);
        let mut translator = EventTranslator::new(1);

        // Stored position was off screen; the shell moves the window back
        let events = translator.on_geometry(Rect::new(-50, 0, 300, 200), false);
        assert_eq!(dispatch(&mut shell, &mut translator, events), Flow::Continue);

        // The server reports the corrected position; even with a button
        // held it is the program's own move
        let corrected = Rect::new(0, 0, 300, 200);
        let events = translator.on_geometry(corrected, true);
        assert_eq!(events, vec![ShellEvent::Moved(corrected)]);
        dispatch(&mut shell, &mut translator, events);
        assert_eq!(translator.end_if_released(false), None);

        assert_eq!(shell.backend().calls, vec![Call::MoveTo(Point::new(0, 0))]);
        assert_eq!((shell.config().x, shell.config().y), (0, 0));
        assert!(log_lines(&dir).is_empty());
    }

    #[test]
    fn test_minimum_size_correction_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);
        let mut translator = EventTranslator::new(1);

        let events = translator.on_geometry(Rect::new(0, 0, 200, 150), false);
        dispatch(&mut shell, &mut translator, events);

        // A resize below the floor, applied without a drag
        let events = translator.on_geometry(Rect::new(0, 0, 100, 100), false);
        dispatch(&mut shell, &mut translator, events);
        let events = translator.on_geometry(Rect::new(0, 0, 200, 150), false);
        dispatch(&mut shell, &mut translator, events);
        assert_eq!(translator.end_if_released(false), None);

        assert_eq!(shell.backend().calls, vec![Call::ResizeTo(Size::new(200, 150))]);
        assert_eq!((shell.config().width, shell.config().height), (200, 150));
        assert!(log_lines(&dir).is_empty());
    }

    #[test]
    fn test_drag_then_exit_is_logged_before_saving() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = test_shell(&dir);
        let mut translator = EventTranslator::new(1);

        let events = translator.on_geometry(Rect::new(0, 0, 300, 200), false);
        dispatch(&mut shell, &mut translator, events);
        let events = translator.on_geometry(Rect::new(40, 20, 300, 200), true);
        dispatch(&mut shell, &mut translator, events);
        let events = translator.on_geometry(Rect::new(80, 40, 300, 200), true);
        dispatch(&mut shell, &mut translator, events);
        assert_eq!(translator.end_if_released(true), None);

        let exit = [ShellEvent::Command(Command::Exit)];
        assert_eq!(dispatch(&mut shell, &mut translator, exit), Flow::Continue);
        assert_eq!(shell.backend().calls, vec![Call::Destroy]);

        let events = translator.on_destroyed();
        assert_eq!(
            events,
            vec![
                ShellEvent::GestureEnded(Rect::new(80, 40, 300, 200)),
                ShellEvent::Destroyed,
            ]
        );
        assert_eq!(dispatch(&mut shell, &mut translator, events), Flow::Quit);

        let lines = log_lines(&dir);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Window moved from (0,0) to (80,40)"));
        assert!(lines[1].ends_with("Saving configuration..."));
        let saved = std::fs::read_to_string(dir.path().join("config.ini")).unwrap();
        assert_eq!(saved.trim(), "80 40 300 200");
    }

    #[test]
    fn test_destroy_without_gesture() {
        let mut translator = EventTranslator::new(1);
        translator.on_geometry(Rect::new(0, 0, 300, 200), false);
        assert_eq!(translator.on_destroyed(), vec![ShellEvent::Destroyed]);
    }

    #[test]
    fn test_accelerators() {
        let none = KeyButMask::from(0u16);
        assert_eq!(accelerator(keysym::F1, none), Some(Command::About));
        assert_eq!(accelerator(keysym::QUESTION, KeyButMask::MOD1), Some(Command::About));
        assert_eq!(accelerator(keysym::SLASH, KeyButMask::MOD1), Some(Command::About));
        assert_eq!(accelerator(keysym::SLASH, none), None);
        assert_eq!(accelerator(keysym::LOWER_Q, KeyButMask::CONTROL), Some(Command::Exit));
        assert_eq!(accelerator(keysym::LOWER_Q, none), None);
    }
}
