use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::constants::{messages, window};
use crate::error::ShellError;
use crate::event_log::EventLog;
use crate::geometry::{enforce_min_size, Point, Size};

/// Last known window placement, written to disk on shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new(window::USE_DEFAULT, 0, window::USE_DEFAULT, 0)
    }
}

/// Where and how large the window should be created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// `None` lets the window manager pick the position
    pub origin: Option<Point>,
    pub size: Size,
}

impl WindowConfig {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Parse `X Y WIDTH HEIGHT`.
    ///
    /// Fields are read in order, each as the longest integer at the cursor
    /// after skipping whitespace, so `600abc` yields 600 and leaves `abc`
    /// for the next field. Parsing stops at the first field without a valid
    /// integer and whatever was not reached keeps its default.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let fields = [
            &mut config.x,
            &mut config.y,
            &mut config.width,
            &mut config.height,
        ];

        let mut rest = text;
        for field in fields {
            match leading_int(rest.trim_start()) {
                Some((value, tail)) => {
                    *field = value;
                    rest = tail;
                }
                None => break,
            }
        }
        config
    }

    pub fn to_line(&self) -> String {
        format!("{} {} {} {}", self.x, self.y, self.width, self.height)
    }

    pub fn placement(&self, floor: Size) -> Placement {
        let origin = (self.x != window::USE_DEFAULT).then(|| Point::new(self.x, self.y));
        let size = if self.width == window::USE_DEFAULT {
            Size::new(window::DEFAULT_WIDTH, window::DEFAULT_HEIGHT)
        } else {
            enforce_min_size(Size::new(self.width, self.height), floor)
        };
        Placement { origin, size }
    }

    pub fn set_origin(&mut self, origin: Point) {
        self.x = origin.x;
        self.y = origin.y;
    }

    pub fn set_size(&mut self, size: Size) {
        self.width = size.width;
        self.height = size.height;
    }
}

/// Split an optionally signed decimal integer off the front of `text`.
/// `None` if there are no digits or the value does not fit an `i32`.
fn leading_int(text: &str) -> Option<(i32, &str)> {
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    let (number, tail) = text.split_at(sign_len + digits);
    number.parse().ok().map(|value| (value, tail))
}

/// Reads and writes the geometry file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored geometry, falling back to defaults for anything that
    /// cannot be read
    pub fn load(&self, log: &EventLog) -> WindowConfig {
        let _ = log.log(messages::LOADING_CONFIG);

        match self.read() {
            Ok(text) => {
                let config = WindowConfig::parse(&text);
                info!(path = %self.path.display(), ?config, "loaded window configuration");
                config
            }
            Err(e) => {
                debug!(error = %e, "using default window configuration");
                WindowConfig::default()
            }
        }
    }

    /// Overwrite the geometry file. Best-effort: the error is returned for
    /// tracing only.
    pub fn save(&self, config: &WindowConfig, log: &EventLog) -> Result<(), ShellError> {
        let _ = log.log(messages::SAVING_CONFIG);

        fs::write(&self.path, config.to_line())
            .map_err(|e| ShellError::storage(&self.path, e))
            .inspect(|_| info!(path = %self.path.display(), ?config, "saved window configuration"))
            .inspect_err(|e| warn!(error = %e, "window configuration not saved"))
    }

    fn read(&self) -> Result<String, ShellError> {
        fs::read_to_string(&self.path).map_err(|e| ShellError::storage(&self.path, e))
    }
}
