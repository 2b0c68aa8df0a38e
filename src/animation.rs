use std::time::Duration;

use crate::config::LayoutConfig;
use crate::tween::Progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Animating { started: Duration },
}

/// What one tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub redraw: bool,
    pub progress: Progress,
    /// When the host should tick again; `None` once the tween is over.
    pub next_tick: Option<Duration>,
}

/// Fixed-length tween clock. Timestamps are offsets from any fixed origin
/// the host picks; they only need to be non-decreasing.
#[derive(Debug, Clone)]
pub struct Scheduler {
    state: SchedulerState,
    progress: Progress,
    tween_length: Duration,
    tick_interval: Duration,
    curvature: f64,
}

impl Scheduler {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            state: SchedulerState::Idle,
            progress: Progress::DONE,
            tween_length: millis(config.tween_length_ms),
            tick_interval: millis(config.tick_interval_ms),
            curvature: config.tween_curvature,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn is_idle(&self) -> bool {
        self.state == SchedulerState::Idle
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn tween_length(&self) -> Duration {
        self.tween_length
    }

    /// Starts a new tween at `now`. Called right before the layout assigns
    /// new targets, so every tween starts from what is on screen.
    pub fn restart(&mut self, now: Duration) {
        self.state = SchedulerState::Animating { started: now };
        self.progress = Progress::new(0.0, self.curvature);
    }

    /// Advances the clock. Only a running tween asks for a redraw; the tick
    /// that reaches the end asks for one last frame.
    pub fn tick(&mut self, now: Duration) -> Tick {
        let SchedulerState::Animating { started } = self.state else {
            return Tick {
                redraw: false,
                progress: self.progress,
                next_tick: None,
            };
        };

        let elapsed = now.saturating_sub(started);
        let raw = if self.tween_length.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / self.tween_length.as_secs_f64()
        };
        // never run backwards, even if the host clock does
        let raw = raw.max(self.progress.raw);

        let next_tick = if raw >= 1.0 {
            self.state = SchedulerState::Idle;
            self.progress = Progress::DONE;
            None
        } else {
            self.progress = Progress::new(raw, self.curvature);
            Some(now + self.tick_interval)
        };
        Tick {
            redraw: true,
            progress: self.progress,
            next_tick,
        }
    }
}

fn millis(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value / 1000.0)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn idle_scheduler_does_not_redraw() {
        let mut scheduler = Scheduler::new(&LayoutConfig::default());
        let tick = scheduler.tick(ms(5));
        assert!(!tick.redraw);
        assert!(tick.progress.is_done());
    }

    #[test]
    fn progress_is_monotonic_and_finishes_on_time() {
        let config = LayoutConfig::default();
        let mut scheduler = Scheduler::new(&config);
        scheduler.restart(ms(1_000));
        assert_eq!(scheduler.progress().raw, 0.0);

        let mut last = 0.0;
        let mut now = ms(1_000);
        let mut ticks = 0;
        while !scheduler.is_idle() {
            let tick = scheduler.tick(now);
            ticks += 1;
            assert!(tick.redraw);
            assert!(tick.progress.raw >= last);
            last = tick.progress.raw;
            match tick.next_tick {
                Some(next) => {
                    assert_eq!(next, now + scheduler.tick_interval());
                    now = next;
                }
                None => assert!(tick.progress.is_done()),
            }
        }
        assert_eq!(last, 1.0);
        assert!(now - ms(1_000) <= ms(850 + 20));
        // 0, 20, .., 860 ms after the restart
        assert_eq!(ticks, 44);
        let idle = scheduler.tick(now + ms(20));
        assert!(!idle.redraw);
        assert_eq!(idle.next_tick, None);
    }

    #[test]
    fn clock_going_backwards_holds_progress() {
        let mut scheduler = Scheduler::new(&LayoutConfig::default());
        scheduler.restart(ms(100));
        let ahead = scheduler.tick(ms(500)).progress.raw;
        let behind = scheduler.tick(ms(300)).progress.raw;
        assert_eq!(ahead, behind);
    }

    #[test]
    fn restart_mid_tween_resets_progress() {
        let mut scheduler = Scheduler::new(&LayoutConfig::default());
        scheduler.restart(ms(0));
        scheduler.tick(ms(400));
        scheduler.restart(ms(400));
        assert_eq!(scheduler.progress().raw, 0.0);
        assert_eq!(scheduler.state(), SchedulerState::Animating { started: ms(400) });
    }

    #[test]
    fn zero_length_tween_finishes_immediately() {
        let config = LayoutConfig {
            tween_length_ms: 0.0,
            ..LayoutConfig::default()
        };
        let mut scheduler = Scheduler::new(&config);
        scheduler.restart(ms(10));
        let tick = scheduler.tick(ms(10));
        assert!(tick.redraw && tick.progress.is_done());
        assert!(scheduler.is_idle());
    }
}
