use std::collections::VecDeque;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{error, info};
use x11rb::connection::Connection;
use x11rb::properties::{WmHints, WmHintsState, WmSizeHints, WmSizeHintsSpecification};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::about::AboutDialog;
use crate::constants::window;
use crate::error::ShellError;
use crate::geometry::{Point, Rect, Size};
use crate::persistence::Placement;
use crate::shell::{Command, DialogOutcome, WindowBackend};
use crate::x11_utils::{to_i16, to_u16, AppContext};

/// Initial show state, the only knob exposed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ShowMode {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// Clickable entries along the top of the client area
const MENU: [(&str, Command); 2] = [("Exit", Command::Exit), ("About...", Command::About)];
const MENU_ITEM_WIDTH: i32 = 72;
const TEXT_BASELINE: i16 = 14;

/// Menu entry under a click at (x, y) in window coordinates
pub fn menu_hit(x: i32, y: i32) -> Option<Command> {
    MENU.iter()
        .enumerate()
        .find(|(index, _)| {
            Rect::new(
                *index as i32 * MENU_ITEM_WIDTH,
                0,
                MENU_ITEM_WIDTH,
                i32::from(window::MENU_HEIGHT),
            )
            .contains(x, y)
        })
        .map(|(_, (_, command))| *command)
}

/// The application's top-level X11 window
pub struct MainWindow<'a> {
    pub window: Window,
    gc: Gcontext,
    destroyed: bool,
    /// Events for other windows that arrived while a modal dialog was up
    deferred: VecDeque<Event>,
    ctx: AppContext<'a>,
}

impl<'a> MainWindow<'a> {
    pub fn create(
        ctx: AppContext<'a>,
        placement: Placement,
        min_track_size: Size,
        show: ShowMode,
    ) -> Result<Self, ShellError> {
        Self::try_create(ctx, placement, min_track_size, show).map_err(|e| {
            ShellError::WindowCreationFailed {
                reason: format!("{e:#}"),
            }
        })
    }

    fn try_create(
        ctx: AppContext<'a>,
        placement: Placement,
        min_track_size: Size,
        show: ShowMode,
    ) -> Result<Self> {
        let origin = placement.origin.unwrap_or_default();
        info!(
            ?placement,
            ?show,
            "creating main window"
        );

        let window = ctx.conn.generate_id()
            .context("Failed to generate X11 window ID")?;
        ctx.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            ctx.screen.root,
            to_i16(origin.x),
            to_i16(origin.y),
            to_u16(placement.size.width),
            to_u16(placement.size.height),
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(ctx.screen.white_pixel)
                .event_mask(
                    EventMask::EXPOSURE
                        | EventMask::STRUCTURE_NOTIFY
                        | EventMask::KEY_PRESS
                        | EventMask::BUTTON_PRESS,
                ),
        )
        .context("Failed to create main window")?;

        // Destroy the half-built window if a later step fails
        struct WindowGuard<'c> {
            conn: &'c RustConnection,
            window: Window,
            should_cleanup: bool,
        }

        impl Drop for WindowGuard<'_> {
            fn drop(&mut self) {
                if self.should_cleanup {
                    if let Err(e) = self.conn.destroy_window(self.window) {
                        error!("Failed to cleanup window {} after initialization failure: {}", self.window, e);
                    }
                    let _ = self.conn.flush();
                }
            }
        }

        let mut window_guard = WindowGuard {
            conn: ctx.conn,
            window,
            should_cleanup: true,
        };

        Self::setup_window_properties(&ctx, window, placement, min_track_size, show)?;
        let gc = Self::create_gc(&ctx, window)?;

        ctx.conn.map_window(window)
            .context("Failed to map main window")?;
        ctx.conn.flush()
            .context("Failed to flush X11 connection after mapping main window")?;
        info!(window, "mapped main window");

        window_guard.should_cleanup = false;
        Ok(Self {
            window,
            gc,
            destroyed: false,
            deferred: VecDeque::new(),
            ctx,
        })
    }

    fn setup_window_properties(
        ctx: &AppContext,
        window: Window,
        placement: Placement,
        min_track_size: Size,
        show: ShowMode,
    ) -> Result<()> {
        let conn = ctx.conn;
        let atoms = ctx.atoms;

        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            window::TITLE.as_bytes(),
        )
        .context("Failed to set WM_NAME")?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            atoms.net_wm_name,
            atoms.utf8_string,
            window::TITLE.as_bytes(),
        )
        .context("Failed to set _NET_WM_NAME")?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            window::WM_CLASS,
        )
        .context("Failed to set WM_CLASS")?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms.wm_protocols,
            AtomEnum::ATOM,
            &[atoms.wm_delete_window],
        )
        .context("Failed to set WM_PROTOCOLS")?;

        // Static gravity keeps requested and reported coordinates on the
        // client area, whatever the frame looks like.
        let mut size_hints = WmSizeHints::new();
        size_hints.min_size = Some((min_track_size.width, min_track_size.height));
        size_hints.win_gravity = Some(Gravity::STATIC);
        size_hints.size = Some((
            WmSizeHintsSpecification::ProgramSpecified,
            placement.size.width,
            placement.size.height,
        ));
        if let Some(origin) = placement.origin {
            size_hints.position = Some((WmSizeHintsSpecification::UserSpecified, origin.x, origin.y));
        }
        size_hints
            .set_normal_hints(conn, window)
            .context("Failed to set WM_NORMAL_HINTS")?;

        match show {
            ShowMode::Normal => {}
            ShowMode::Minimized => {
                let mut hints = WmHints::new();
                hints.input = Some(true);
                hints.initial_state = Some(WmHintsState::Iconic);
                hints.set(conn, window).context("Failed to set WM_HINTS")?;
            }
            ShowMode::Maximized => {
                conn.change_property32(
                    PropMode::REPLACE,
                    window,
                    atoms.net_wm_state,
                    AtomEnum::ATOM,
                    &[atoms.net_wm_state_maximized_vert, atoms.net_wm_state_maximized_horz],
                )
                .context("Failed to set _NET_WM_STATE")?;
            }
        }
        Ok(())
    }

    fn create_gc(ctx: &AppContext, window: Window) -> Result<Gcontext> {
        let font = ctx.conn.generate_id()
            .context("Failed to generate font ID")?;
        ctx.conn.open_font(font, window::FONT_NAME)
            .context("Failed to open core font")?;
        let gc = ctx.conn.generate_id()
            .context("Failed to generate graphics context ID")?;
        ctx.conn.create_gc(
            gc,
            window,
            &CreateGCAux::new()
                .foreground(ctx.screen.black_pixel)
                .background(ctx.screen.white_pixel)
                .font(font),
        )
        .context("Failed to create graphics context")?;
        ctx.conn.close_font(font)
            .context("Failed to close core font")?;
        Ok(gc)
    }

    /// Queue an event that belongs to someone else while a modal loop runs
    pub fn defer(&mut self, event: Event) {
        self.deferred.push_back(event);
    }

    pub fn next_deferred(&mut self) -> Option<Event> {
        self.deferred.pop_front()
    }

    /// Record that the server already destroyed the window
    pub fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    fn draw_menu(&self) -> Result<()> {
        let conn = self.ctx.conn;
        let width = MENU_ITEM_WIDTH as u16;
        for (index, (label, _)) in MENU.iter().enumerate() {
            let x = (index as i32 * MENU_ITEM_WIDTH) as i16;
            conn.poly_rectangle(
                self.window,
                self.gc,
                &[Rectangle {
                    x,
                    y: 0,
                    width: width - 1,
                    height: window::MENU_HEIGHT as u16 - 1,
                }],
            )
            .context("Failed to draw menu item border")?;
            conn.image_text8(self.window, self.gc, x + 6, TEXT_BASELINE, label.as_bytes())
                .context(format!("Failed to draw menu item '{}'", label))?;
        }
        Ok(())
    }
}

impl WindowBackend for MainWindow<'_> {
    fn screen_size(&self) -> Size {
        Size::new(
            i32::from(self.ctx.screen.width_in_pixels),
            i32::from(self.ctx.screen.height_in_pixels),
        )
    }

    fn move_to(&mut self, origin: Point) -> Result<()> {
        self.ctx.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().x(origin.x).y(origin.y),
        )
        .context(format!("Failed to reposition main window to {}", origin))?;
        self.ctx.conn.flush()
            .context("Failed to flush X11 connection after reposition")?;
        Ok(())
    }

    fn resize_to(&mut self, size: Size) -> Result<()> {
        self.ctx.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .width(u32::from(to_u16(size.width)))
                .height(u32::from(to_u16(size.height))),
        )
        .context(format!("Failed to resize main window to {}", size))?;
        self.ctx.conn.flush()
            .context("Failed to flush X11 connection after resize")?;
        Ok(())
    }

    fn paint(&mut self, text: &str) -> Result<()> {
        self.ctx.conn.clear_area(false, self.window, 0, 0, 0, 0)
            .context("Failed to clear main window")?;
        self.draw_menu()?;
        self.ctx.conn.image_text8(
            self.window,
            self.gc,
            5,
            window::MENU_HEIGHT + 5 + TEXT_BASELINE,
            text.as_bytes(),
        )
        .context("Failed to draw greeting")?;
        self.ctx.conn.flush()
            .context("Failed to flush X11 connection after paint")?;
        Ok(())
    }

    fn show_about(&mut self) -> Result<DialogOutcome> {
        let dialog = AboutDialog::new(self.ctx, self.window)?;
        dialog.run(|event| self.defer(event))
    }

    fn destroy(&mut self) -> Result<()> {
        self.ctx.conn.destroy_window(self.window)
            .context("Failed to destroy main window")?;
        self.ctx.conn.flush()
            .context("Failed to flush X11 connection after destroying main window")?;
        Ok(())
    }
}

impl Drop for MainWindow<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.conn.free_gc(self.gc) {
            error!("Failed to free GC {}: {}", self.gc, e);
        }

        if !self.destroyed {
            if let Err(e) = self.ctx.conn.destroy_window(self.window) {
                error!("Failed to destroy main window {}: {}", self.window, e);
            }
        }

        if let Err(e) = self.ctx.conn.flush() {
            error!("Failed to flush X11 connection during cleanup: {}", e);
        }
    }
}
