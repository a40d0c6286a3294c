//! Animation-frame clock plumbing.
//!
//! Animators never own a timer. The host (a browser bridge, a winit loop,
//! the headless CLI) implements [`FrameScheduler`] and calls the
//! animator's `on_frame` whenever a requested frame fires.

/// Identifier of a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host frame clock: one callback per display refresh.
pub trait FrameScheduler {
    /// Ask for one callback on the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancel a previously requested callback. Unknown handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Scheduler whose frames fire when the host loop says so.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<FrameHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending.contains(&handle)
    }

    /// Fire every pending frame: returns their handles and clears the queue.
    pub fn take_pending(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
    }
}

/// Limits redraws to one per `interval_ms` of frame-clock time.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval_ms: f64,
    last_tick: f64,
}

impl FrameThrottle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_tick: 0.0,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// True (and records the tick) when at least one interval has passed.
    pub fn ready(&mut self, now_ms: f64) -> bool {
        if now_ms - self.last_tick >= self.interval_ms {
            self.last_tick = now_ms;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_tick = 0.0;
    }
}
