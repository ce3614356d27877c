//! Host window placement
//!
//! The host window (and the flip suppression window behind it) cover a
//! rectangle derived once per run from the source window and the
//! [`MultiMonitorUsage`] policy.

use crate::config::MultiMonitorUsage;
use crate::error::{RuntimeError, RuntimeResult};
use crate::platform::SourceWindow;

/// Screen rectangle in virtual desktop coordinates, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// True when the two rectangles share a non-empty area
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Bounding rectangle of both; an empty operand does not contribute
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Monitor layout queries needed to place the host window
pub trait DisplayTopology {
    /// Rectangle of the monitor nearest to `source`
    fn nearest_monitor_rect(&self, source: SourceWindow) -> RuntimeResult<Rect>;

    /// Visible frame of the source window
    fn window_frame_rect(&self, source: SourceWindow) -> RuntimeResult<Rect>;

    /// Rectangles of every attached monitor
    fn monitor_rects(&self) -> RuntimeResult<Vec<Rect>>;

    /// Bounding rectangle of the whole virtual screen
    fn virtual_screen_rect(&self) -> Rect;
}

/// Compute the host window rectangle for a run.
pub fn calc_host_wnd_rect(
    source: SourceWindow,
    usage: MultiMonitorUsage,
    display: &dyn DisplayTopology,
) -> RuntimeResult<Rect> {
    match usage {
        MultiMonitorUsage::Nearest => display.nearest_monitor_rect(source),
        MultiMonitorUsage::Intersected => {
            let frame = display.window_frame_rect(source)?;
            let union = display
                .monitor_rects()?
                .iter()
                .filter(|monitor| frame.overlaps(monitor))
                .fold(Rect::default(), |acc, monitor| acc.union(monitor));

            if union.is_empty() {
                return Err(RuntimeError::DegenerateHostRect {
                    width: union.width(),
                    height: union.height(),
                });
            }
            Ok(union)
        }
        MultiMonitorUsage::All => Ok(display.virtual_screen_rect()),
    }
}
