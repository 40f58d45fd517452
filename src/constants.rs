//! Application-wide constants
//!
//! File names, window defaults, log messages and X11 magic numbers live here so
//! the rest of the crate never spells out a literal twice.

/// Persistent file locations (relative to the working directory)
pub mod files {
    /// Window geometry, four whitespace-separated integers
    pub const CONFIG_FILE: &str = "config.ini";

    /// Append-only event log
    pub const LOG_FILE: &str = "app.log";
}

/// Main window defaults
pub mod window {
    /// Sentinel meaning "let the window system choose" (x and width only)
    pub const USE_DEFAULT: i32 = i32::MIN;

    /// Minimum tracking width
    pub const MIN_WIDTH: i32 = 200;

    /// Minimum tracking height
    pub const MIN_HEIGHT: i32 = 150;

    /// Size used when the stored width is the sentinel
    pub const DEFAULT_WIDTH: i32 = 640;
    pub const DEFAULT_HEIGHT: i32 = 480;

    pub const TITLE: &str = "winkeep";

    /// WM_CLASS instance and class, NUL separated
    pub const WM_CLASS: &[u8] = b"winkeep\0Winkeep\0";

    /// Text drawn into the client area on every paint
    pub const GREETING: &str = "Mirada technical challenge";

    /// Height of the menu strip along the top edge
    pub const MENU_HEIGHT: i16 = 20;

    /// Core X font used for all text
    pub const FONT_NAME: &[u8] = b"fixed";
}

/// Fixed event log messages
pub mod messages {
    pub const LOADING_CONFIG: &str = "Loading configuration...";
    pub const SAVING_CONFIG: &str = "Saving configuration...";
}

/// Keysyms used by the accelerators and the About dialog
pub mod keysym {
    pub const F1: u32 = 0xffbe;
    pub const ESCAPE: u32 = 0xff1b;
    pub const RETURN: u32 = 0xff0d;
    pub const KP_ENTER: u32 = 0xff8d;
    pub const LOWER_Q: u32 = 0x0071;
    pub const QUESTION: u32 = 0x003f;
    pub const SLASH: u32 = 0x002f;
}

/// About dialog layout
pub mod dialog {
    pub const WIDTH: u16 = 280;
    pub const HEIGHT: u16 = 120;
    pub const BUTTON_WIDTH: u16 = 70;
    pub const BUTTON_HEIGHT: u16 = 24;
    pub const BUTTON_MARGIN: i16 = 12;
    pub const TITLE: &str = "About winkeep";
    pub const DESCRIPTION: &str = "Window geometry is saved on exit";
}

/// X11 protocol constants
pub mod x11 {
    /// High bit of response_type marks events sent with SendEvent
    pub const SYNTHETIC_EVENT_FLAG: u8 = 0x80;
}
