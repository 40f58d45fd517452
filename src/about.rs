//! Modal "About" box: a transient window with two buttons that runs its own
//! event loop until dismissed.

use anyhow::{Context, Result};
use tracing::{debug, error};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::constants::{dialog, keysym, window};
use crate::geometry::Rect;
use crate::shell::DialogOutcome;
use crate::x11_utils::{has_modifier, to_i16, window_rect, AppContext};

#[derive(Debug, Clone, Copy)]
struct Button {
    label: &'static str,
    outcome: DialogOutcome,
    rect: Rect,
}

fn layout_buttons() -> [Button; 2] {
    let width = i32::from(dialog::BUTTON_WIDTH);
    let height = i32::from(dialog::BUTTON_HEIGHT);
    let margin = i32::from(dialog::BUTTON_MARGIN);
    let y = i32::from(dialog::HEIGHT) - height - margin;
    let cancel_x = i32::from(dialog::WIDTH) - width - margin;
    let ok_x = cancel_x - width - margin;
    [
        Button {
            label: "OK",
            outcome: DialogOutcome::Ok,
            rect: Rect::new(ok_x, y, width, height),
        },
        Button {
            label: "Cancel",
            outcome: DialogOutcome::Cancel,
            rect: Rect::new(cancel_x, y, width, height),
        },
    ]
}

/// Map a key to the dialog's default (Return) or cancel (Escape) action
fn outcome_for_keysym(sym: Keysym) -> Option<DialogOutcome> {
    match sym {
        keysym::RETURN | keysym::KP_ENTER => Some(DialogOutcome::Ok),
        keysym::ESCAPE => Some(DialogOutcome::Cancel),
        _ => None,
    }
}

pub struct AboutDialog<'a> {
    window: Window,
    gc: Gcontext,
    buttons: [Button; 2],
    ctx: AppContext<'a>,
}

impl<'a> AboutDialog<'a> {
    pub fn new(ctx: AppContext<'a>, owner: Window) -> Result<Self> {
        let conn = ctx.conn;
        let atoms = ctx.atoms;

        // Center over the owner
        let owner_geom = window_rect(conn, ctx.screen, owner)?;
        let x = owner_geom.x + (owner_geom.width - i32::from(dialog::WIDTH)) / 2;
        let y = owner_geom.y + (owner_geom.height - i32::from(dialog::HEIGHT)) / 2;

        let dialog_window = conn.generate_id()
            .context("Failed to generate About dialog window ID")?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            dialog_window,
            ctx.screen.root,
            to_i16(x),
            to_i16(y),
            dialog::WIDTH,
            dialog::HEIGHT,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(ctx.screen.white_pixel)
                .event_mask(EventMask::EXPOSURE | EventMask::KEY_PRESS | EventMask::BUTTON_PRESS),
        )
        .context("Failed to create About dialog window")?;

        conn.change_property8(
            PropMode::REPLACE,
            dialog_window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            dialog::TITLE.as_bytes(),
        )
        .context("Failed to set About dialog title")?;
        conn.change_property32(
            PropMode::REPLACE,
            dialog_window,
            AtomEnum::WM_TRANSIENT_FOR,
            AtomEnum::WINDOW,
            &[owner],
        )
        .context("Failed to set WM_TRANSIENT_FOR")?;
        conn.change_property32(
            PropMode::REPLACE,
            dialog_window,
            atoms.net_wm_window_type,
            AtomEnum::ATOM,
            &[atoms.net_wm_window_type_dialog],
        )
        .context("Failed to set _NET_WM_WINDOW_TYPE")?;
        conn.change_property32(
            PropMode::REPLACE,
            dialog_window,
            atoms.net_wm_state,
            AtomEnum::ATOM,
            &[atoms.net_wm_state_modal],
        )
        .context("Failed to set _NET_WM_STATE")?;
        conn.change_property32(
            PropMode::REPLACE,
            dialog_window,
            atoms.wm_protocols,
            AtomEnum::ATOM,
            &[atoms.wm_delete_window],
        )
        .context("Failed to set WM_PROTOCOLS on About dialog")?;

        let font = conn.generate_id()
            .context("Failed to generate font ID")?;
        conn.open_font(font, window::FONT_NAME)
            .context("Failed to open core font")?;
        let gc = conn.generate_id()
            .context("Failed to generate graphics context ID")?;
        conn.create_gc(
            gc,
            dialog_window,
            &CreateGCAux::new()
                .foreground(ctx.screen.black_pixel)
                .background(ctx.screen.white_pixel)
                .font(font),
        )
        .context("Failed to create About dialog graphics context")?;
        conn.close_font(font)
            .context("Failed to close core font")?;

        conn.map_window(dialog_window)
            .context("Failed to map About dialog")?;
        conn.flush()
            .context("Failed to flush X11 connection after mapping About dialog")?;

        Ok(Self {
            window: dialog_window,
            gc,
            buttons: layout_buttons(),
            ctx,
        })
    }

    /// Block until OK or Cancel. Events meant for other windows are handed to
    /// `defer`; input for them is dropped while the dialog is up.
    pub fn run(self, mut defer: impl FnMut(Event)) -> Result<DialogOutcome> {
        loop {
            let event = self.ctx.conn.wait_for_event()
                .context("Failed to wait for About dialog event")?;
            match event {
                Event::Expose(e) if e.window == self.window => {
                    if e.count == 0 {
                        self.draw()?;
                    }
                }
                Event::ButtonPress(e) if e.event == self.window => {
                    let hit = self
                        .buttons
                        .iter()
                        .find(|b| b.rect.contains(i32::from(e.event_x), i32::from(e.event_y)));
                    if let Some(button) = hit {
                        return Ok(button.outcome);
                    }
                }
                Event::KeyPress(e) if e.event == self.window => {
                    let shifted = has_modifier(e.state, KeyButMask::SHIFT);
                    if let Some(outcome) = self
                        .ctx
                        .keymap
                        .keysym(e.detail, shifted)
                        .and_then(outcome_for_keysym)
                    {
                        return Ok(outcome);
                    }
                }
                Event::ClientMessage(e) if e.window == self.window => {
                    if self.ctx.atoms.is_delete_request(&e) {
                        return Ok(DialogOutcome::Cancel);
                    }
                }
                Event::KeyPress(_) | Event::KeyRelease(_) | Event::ButtonPress(_) | Event::ButtonRelease(_) => {
                    debug!("dropping input for other windows while About is open");
                }
                other => defer(other),
            }
        }
    }

    fn draw(&self) -> Result<()> {
        let conn = self.ctx.conn;
        let version = format!("{} {}", window::TITLE, env!("CARGO_PKG_VERSION"));
        conn.image_text8(self.window, self.gc, 16, 28, version.as_bytes())
            .context("Failed to draw About text")?;
        conn.image_text8(self.window, self.gc, 16, 46, dialog::DESCRIPTION.as_bytes())
            .context("Failed to draw About text")?;

        for button in &self.buttons {
            let rect = button.rect;
            conn.poly_rectangle(
                self.window,
                self.gc,
                &[Rectangle {
                    x: rect.x as i16,
                    y: rect.y as i16,
                    width: rect.width as u16,
                    height: rect.height as u16,
                }],
            )
            .context(format!("Failed to draw '{}' button", button.label))?;
            let text_x = rect.x + (rect.width - 6 * button.label.len() as i32) / 2;
            conn.image_text8(
                self.window,
                self.gc,
                text_x as i16,
                (rect.y + rect.height / 2 + 4) as i16,
                button.label.as_bytes(),
            )
            .context(format!("Failed to draw '{}' label", button.label))?;
        }
        conn.flush()
            .context("Failed to flush X11 connection after drawing About dialog")?;
        Ok(())
    }
}

impl Drop for AboutDialog<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.conn.free_gc(self.gc) {
            error!("Failed to free About dialog GC {}: {}", self.gc, e);
        }
        if let Err(e) = self.ctx.conn.destroy_window(self.window) {
            error!("Failed to destroy About dialog {}: {}", self.window, e);
        }
        if let Err(e) = self.ctx.conn.flush() {
            error!("Failed to flush X11 connection after closing About dialog: {}", e);
        }
    }
}
