//! Frame pacing.
//!
//! [`FrameClock`] hands out clamped frame deltas and the deadline of the
//! next frame, which the event loop waits for with `ControlFlow::WaitUntil`.

use instant::{Duration, Instant};

pub const MIN_DT: Duration = Duration::from_micros(100);
pub const MAX_DT: Duration = Duration::from_millis(250);

#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Seconds since the clock started, built from the clamped deltas.
    pub elapsed: f32,
    pub frame_index: u64,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    next_frame: Instant,
    interval: Duration,
    elapsed: f32,
    frame_index: u64,
}

impl FrameClock {
    pub fn new(target_fps: u32) -> Self {
        Self::starting_at(Instant::now(), target_fps)
    }

    pub fn starting_at(now: Instant, target_fps: u32) -> Self {
        let interval = Duration::from_nanos(1_000_000_000 / target_fps.max(1) as u64);
        Self {
            last: now,
            next_frame: now,
            interval,
            elapsed: 0.0,
            frame_index: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next frame should start.
    pub fn next_frame(&self) -> Instant {
        self.next_frame
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_frame
    }

    /// Forgets the time spent while no frames were drawn.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last = now;
        self.next_frame = now;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(MIN_DT, MAX_DT)
            .as_secs_f32();
        self.last = now;
        self.elapsed += dt;

        // keep the cadence, but don't try to catch up after a stall
        self.next_frame += self.interval;
        if self.next_frame < now {
            self.next_frame = now + self.interval;
        }

        let time = FrameTime {
            dt,
            elapsed: self.elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}
