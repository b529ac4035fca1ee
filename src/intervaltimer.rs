use std::time::{Duration, Instant};

use log;

pub struct IntervalTimer {
    interval: Duration,
    next_tick: Instant,
    measure_fps: bool,
    last_fps_print: Instant,
    frames: u32,
}

impl IntervalTimer {
    pub fn new(interval: Duration, measure_fps: bool) -> IntervalTimer {
        let now = Instant::now();

        IntervalTimer {
            interval,
            next_tick: now + interval,
            measure_fps,
            last_fps_print: now,
            frames: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Zero once the deadline has passed.
    pub fn time_until_next_tick(&self) -> Duration {
        self.next_tick.saturating_duration_since(Instant::now())
    }

    /// Marks the current deadline as served and schedules the next one.
    pub fn tick(&mut self) {
        if self.measure_fps {
            self.update_fps();
        }

        let now = Instant::now();
        self.next_tick = if self.next_tick + self.interval > now {
            self.next_tick + self.interval
        } else {
            log::warn!("Tick loop skipped a frame");
            now + self.interval
        };
    }

    fn update_fps(&mut self) {
        self.frames += 1;

        if Instant::now() - self.last_fps_print > Duration::from_secs(1) {
            log::debug!("FPS: {}", self.frames);
            self.frames = 0;
            self.last_fps_print = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_tick_is_one_interval_away() {
        let timer = IntervalTimer::new(Duration::from_secs(60), false);
        let remaining = timer.time_until_next_tick();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(59));
    }

    #[test]
    fn tick_pushes_deadline_forward() {
        let mut timer = IntervalTimer::new(Duration::from_secs(60), true);
        timer.tick();
        assert!(timer.time_until_next_tick() > Duration::from_secs(60));
    }

    #[test]
    fn overdue_deadline_restarts_from_now() {
        let mut timer = IntervalTimer::new(Duration::from_millis(1), false);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.time_until_next_tick(), Duration::ZERO);

        timer.tick();
        assert!(timer.time_until_next_tick() <= Duration::from_millis(1));
    }
}
