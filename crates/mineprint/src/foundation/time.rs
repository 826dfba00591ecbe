//! Time management utilities

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Frame clock: time between ticks and since the last reset
pub struct Timer {
    last_tick: Instant,
    delta: Duration,
    total: Duration,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Start a clock with no ticks recorded
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta: Duration::ZERO,
            total: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Start counting from now, discarding all accumulated time
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Mark the start of a frame and return the seconds since the previous one
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta = now.duration_since(self.last_tick);
        self.total += self.delta;
        self.last_tick = now;
        self.frame_count += 1;
        self.delta.as_secs_f32()
    }

    /// Seconds between the last two ticks
    pub fn delta_time(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Seconds accumulated over all ticks since the last reset
    pub fn total_time(&self) -> f32 {
        self.total.as_secs_f32()
    }

    /// Number of ticks since the last reset
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Instant,
    end_time: Option<Instant>,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start_new()
    }
}

impl Stopwatch {
    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
        }
    }

    /// Reset and start measuring again
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
        self.end_time = None;
    }

    /// Freeze the elapsed time at the current instant
    pub fn stop(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Elapsed time until `stop`, or until now if still running
    pub fn elapsed(&self) -> Duration {
        self.end_time
            .unwrap_or_else(Instant::now)
            .duration_since(self.start_time)
    }

    /// Get the elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Check if the stopwatch is currently running
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Rolling average of per-frame FPS samples.
///
/// Empty slots (zero) repeat the most recent non-zero sample seen before them
/// so a freshly started counter does not report a diluted average.
pub struct FpsCounter {
    samples: [u16; Self::MAX_SAMPLES],
    next: usize,
    fps: u16,
    dirty: bool,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    /// Number of samples in the ring
    pub const MAX_SAMPLES: usize = 200;

    /// Create an empty counter
    pub fn new() -> Self {
        Self {
            samples: [0; Self::MAX_SAMPLES],
            next: 0,
            fps: 0,
            dirty: true,
        }
    }

    /// Record one frame's instantaneous FPS
    pub fn add_sample(&mut self, fps: u16) {
        self.samples[self.next] = fps;
        self.next = (self.next + 1) % Self::MAX_SAMPLES;
        self.dirty = true;
    }

    /// Averaged FPS over the ring
    pub fn fps(&mut self) -> u16 {
        if self.dirty {
            self.recalculate();
        }
        self.fps
    }

    /// Average frame time in milliseconds, or zero before any samples
    pub fn average_frame_time_ms(&mut self) -> f64 {
        match self.fps() {
            0 => 0.0,
            fps => 1000.0 / f64::from(fps),
        }
    }

    fn recalculate(&mut self) {
        let mut total: u32 = 0;
        let mut last: u16 = 0;
        for &sample in &self.samples {
            if sample != 0 {
                last = sample;
            }
            total += u32::from(last);
        }
        self.fps = u16::try_from(total / Self::MAX_SAMPLES as u32).unwrap_or(u16::MAX);
        self.dirty = false;
    }
}

/// Timing of the frame being built, handed to per-frame callbacks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInfo {
    /// Frames presented before this one
    pub frame_index: u64,
    /// Seconds since the previous frame started
    pub delta_seconds: f32,
    /// Rolling average frames per second
    pub fps: u16,
}

thread_local! {
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Logs the time spent in a scope when dropped, indented by nesting depth.
///
/// ```rust,no_run
/// use mineprint::foundation::time::ScopedTimer;
///
/// let _timer = ScopedTimer::new("load settings");
/// ```
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    depth: usize,
}

impl ScopedTimer {
    /// Start timing a named scope
    pub fn new(name: &'static str) -> Self {
        let depth = SCOPE_DEPTH.with(|d| {
            let depth = d.get();
            d.set(depth + 1);
            depth
        });
        Self {
            name,
            start: Instant::now(),
            depth,
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let millis = self.start.elapsed().as_secs_f64() * 1000.0;
        log::info!("{:>width$}{}: {:.3}ms", "", self.name, millis, width = self.depth * 2);
        SCOPE_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fps_counter_empty() {
        let mut counter = FpsCounter::new();
        assert_eq!(counter.fps(), 0);
        assert_relative_eq!(counter.average_frame_time_ms(), 0.0);
    }

    #[test]
    fn test_fps_counter_carries_last_sample_forward() {
        let mut counter = FpsCounter::new();
        counter.add_sample(60);
        // One real sample followed by 199 empty slots that repeat it.
        assert_eq!(counter.fps(), 60);
        assert_relative_eq!(counter.average_frame_time_ms(), 1000.0 / 60.0);
    }

    #[test]
    fn test_fps_counter_averages_full_ring() {
        let mut counter = FpsCounter::new();
        for i in 0..FpsCounter::MAX_SAMPLES {
            counter.add_sample(if i % 2 == 0 { 100 } else { 50 });
        }
        assert_eq!(counter.fps(), 75);

        // Overwrites wrap around to the start of the ring.
        for _ in 0..FpsCounter::MAX_SAMPLES {
            counter.add_sample(30);
        }
        assert_eq!(counter.fps(), 30);
    }

    #[test]
    fn test_stopwatch_stop_freezes_elapsed() {
        let mut watch = Stopwatch::start_new();
        watch.stop();
        let first = watch.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(watch.elapsed(), first);
        assert!(!watch.is_running());

        watch.restart();
        assert!(watch.is_running());
    }

    #[test]
    fn test_timer_ticks_and_resets() {
        let mut timer = Timer::new();
        timer.tick();
        std::thread::sleep(Duration::from_millis(2));
        let delta = timer.tick();
        assert_eq!(timer.frame_count(), 2);
        assert!(delta > 0.0);
        assert_relative_eq!(timer.delta_time(), delta);
        assert!(timer.total_time() >= delta);

        timer.reset();
        assert_eq!(timer.frame_count(), 0);
        assert_relative_eq!(timer.total_time(), 0.0);
    }

    #[test]
    fn test_scoped_timer_depth_unwinds() {
        {
            let _outer = ScopedTimer::new("outer");
            let inner = ScopedTimer::new("inner");
            assert_eq!(inner.depth, 1);
        }
        assert_eq!(SCOPE_DEPTH.with(Cell::get), 0);
    }
}
