//! Per-frame request coalescing
//!
//! Everything here runs on one thread between frame ticks. Requests made
//! during a frame are not queued: any number of them collapse into a single
//! piece of work handed out at the next tick.

use glam::UVec2;

/// A request that is satisfied at most once per tick.
///
/// Requests carry a value; when several arrive before the tick, the latest
/// value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest<T> {
    pending: Option<T>,
    coalesced: usize,
}

impl<T> Default for FrameRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameRequest<T> {
    pub const fn new() -> Self {
        Self {
            pending: None,
            coalesced: 0,
        }
    }

    /// Schedule `value` for the next tick.
    ///
    /// Returns `true` if nothing was pending yet, i.e. this request is the
    /// one that schedules the tick.
    pub fn request(&mut self, value: T) -> bool {
        let first = self.pending.is_none();
        if !first {
            self.coalesced += 1;
        }
        self.pending = Some(value);
        first
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Requests absorbed into an already pending one since the last take
    #[inline]
    pub fn coalesced(&self) -> usize {
        self.coalesced
    }

    /// Hand out the pending value, leaving nothing scheduled
    pub fn take(&mut self) -> Option<T> {
        self.coalesced = 0;
        self.pending.take()
    }

    /// Drop any pending request
    pub fn cancel(&mut self) {
        self.coalesced = 0;
        self.pending = None;
    }
}

/// Work to perform on one frame tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameWork {
    /// Redraw the visible tiles
    pub redraw: bool,
    /// Refresh the host's GUI (zoom readout, colour swatches, ...)
    pub gui_update: bool,
    /// New viewport size, if one or more resizes arrived
    pub resize: Option<UVec2>,
}

impl FrameWork {
    /// Whether the tick has nothing to do
    pub fn is_idle(&self) -> bool {
        !self.redraw && !self.gui_update && self.resize.is_none()
    }
}

/// The frame requests of one painting surface.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    redraw: FrameRequest<()>,
    gui_update: FrameRequest<()>,
    resize: FrameRequest<UVec2>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_redraw(&mut self) -> bool {
        self.redraw.request(())
    }

    pub fn request_gui_update(&mut self) -> bool {
        self.gui_update.request(())
    }

    /// Schedule a resize; a resize always implies a redraw
    pub fn request_resize(&mut self, size: UVec2) {
        self.resize.request(size);
        self.redraw.request(());
    }

    /// Whether anything is waiting for the next tick
    pub fn has_pending(&self) -> bool {
        self.redraw.is_pending() || self.gui_update.is_pending() || self.resize.is_pending()
    }

    /// Collect and clear everything requested since the previous tick
    pub fn tick(&mut self) -> FrameWork {
        FrameWork {
            redraw: self.redraw.take().is_some(),
            gui_update: self.gui_update.take().is_some(),
            resize: self.resize.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_collapse() {
        let mut request = FrameRequest::new();
        assert!(request.request(()));
        assert!(!request.request(()));
        assert!(!request.request(()));
        assert_eq!(request.coalesced(), 2);

        assert_eq!(request.take(), Some(()));
        assert_eq!(request.take(), None);
        assert_eq!(request.coalesced(), 0);
    }

    #[test]
    fn test_latest_value_wins() {
        let mut request = FrameRequest::new();
        request.request(UVec2::new(640, 480));
        request.request(UVec2::new(800, 600));
        assert_eq!(request.peek(), Some(&UVec2::new(800, 600)));
        assert_eq!(request.take(), Some(UVec2::new(800, 600)));
        assert!(!request.is_pending());
    }

    #[test]
    fn test_cancel() {
        let mut request = FrameRequest::new();
        request.request(1);
        request.cancel();
        assert_eq!(request.take(), None);
    }

    #[test]
    fn test_scheduler_tick_drains() {
        let mut scheduler = FrameScheduler::new();
        assert!(scheduler.tick().is_idle());

        assert!(scheduler.request_redraw());
        assert!(!scheduler.request_redraw());
        scheduler.request_gui_update();
        assert!(scheduler.has_pending());

        let work = scheduler.tick();
        assert!(work.redraw && work.gui_update);
        assert_eq!(work.resize, None);
        assert!(!scheduler.has_pending());
        assert!(scheduler.tick().is_idle());
    }

    #[test]
    fn test_resize_implies_redraw() {
        let mut scheduler = FrameScheduler::new();
        scheduler.request_resize(UVec2::new(10, 10));
        scheduler.request_resize(UVec2::new(20, 30));
        let work = scheduler.tick();
        assert!(work.redraw);
        assert!(!work.gui_update);
        assert_eq!(work.resize, Some(UVec2::new(20, 30)));
    }
}
