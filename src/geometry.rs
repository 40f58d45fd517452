//! Window geometry rules: screen clamping, the minimum tracking size and the
//! move/resize gesture bookkeeping that decides what gets logged.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.width, self.height)
    }
}

/// Window rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }
}

/// Translate `rect` so it lies inside `[0, screen.width] x [0, screen.height]`
/// without changing its size.
///
/// Each axis is handled on its own: a violated low edge is pinned to 0 first,
/// then a violated high edge is pinned to the screen extent, so a window wider
/// than the screen ends up flush with the right edge.
/// Returns `None` when nothing needs to move.
pub fn clamp_to_screen(rect: Rect, screen: Size) -> Option<Rect> {
    let x = clamp_axis(rect.left(), rect.width, screen.width);
    let y = clamp_axis(rect.top(), rect.height, screen.height);

    let corrected = Rect::new(x, y, rect.width, rect.height);
    (corrected != rect).then_some(corrected)
}

fn clamp_axis(start: i32, extent: i32, limit: i32) -> i32 {
    // Widened so that edges near i32::MAX/MIN cannot wrap
    let (extent, limit) = (i64::from(extent), i64::from(limit));
    let mut start = i64::from(start).max(0);
    if start + extent > limit {
        start = limit - extent;
    }
    start.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// A geometry change the program asked the window system for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryRequest {
    Move(Point),
    Resize(Size),
}

impl GeometryRequest {
    /// Whether `rect` is what this request asked for
    pub fn matches(&self, rect: Rect) -> bool {
        match *self {
            GeometryRequest::Move(origin) => rect.origin() == origin,
            GeometryRequest::Resize(size) => rect.size() == size,
        }
    }
}

/// Raise `size` to at least `floor` in both dimensions
pub fn enforce_min_size(size: Size, floor: Size) -> Size {
    Size::new(size.width.max(floor.width), size.height.max(floor.height))
}

/// Geometry captured when a move/resize gesture starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySnapshot {
    pub position: Point,
    pub size: Size,
}

impl GeometrySnapshot {
    pub fn capture(rect: Rect) -> Self {
        Self {
            position: rect.origin(),
            size: rect.size(),
        }
    }
}

/// What a finished gesture should write to the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDecision {
    Moved { from: Point, to: Point },
    Resized { from: Size, to: Size },
    Unchanged,
}

impl LogDecision {
    pub fn message(&self) -> Option<String> {
        match self {
            LogDecision::Moved { from, to } => Some(format!("Window moved from {from} to {to}")),
            LogDecision::Resized { from, to } => Some(format!("Size changed from {from} to {to}")),
            LogDecision::Unchanged => None,
        }
    }
}

/// Compare the start of a gesture with where it ended.
///
/// Position wins: if the window moved, a size change in the same gesture is
/// not reported.
pub fn end_gesture(initial: GeometrySnapshot, final_rect: Rect) -> LogDecision {
    let position = final_rect.origin();
    let size = final_rect.size();

    if initial.position != position {
        LogDecision::Moved {
            from: initial.position,
            to: position,
        }
    } else if initial.size != size {
        LogDecision::Resized {
            from: initial.size,
            to: size,
        }
    } else {
        LogDecision::Unchanged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging(GeometrySnapshot),
}

/// Idle -> Dragging -> Idle, one gesture at a time
#[derive(Debug, Default)]
pub struct GestureTracker {
    state: GestureState,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Returns false if a gesture was already in progress (nothing changes)
    pub fn begin(&mut self, rect: Rect) -> bool {
        match self.state {
            GestureState::Idle => {
                self.state = GestureState::Dragging(GeometrySnapshot::capture(rect));
                true
            }
            GestureState::Dragging(_) => false,
        }
    }

    /// `None` when no gesture was in progress
    pub fn end(&mut self, rect: Rect) -> Option<LogDecision> {
        match std::mem::take(&mut self.state) {
            GestureState::Dragging(initial) => Some(end_gesture(initial, rect)),
            GestureState::Idle => None,
        }
    }
}
