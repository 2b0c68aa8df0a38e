use serde::Serialize;

/// Eased animation progress shared by every tween in a frame.
///
/// `raw` is linear time progress in `[0, 1]`; `factor` is the sigmoid-eased
/// value that tweens actually interpolate with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub raw: f64,
    pub factor: f64,
}

impl Progress {
    pub const DONE: Progress = Progress {
        raw: 1.0,
        factor: 1.0,
    };

    pub fn new(raw: f64, curvature: f64) -> Self {
        let raw = if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            raw,
            factor: tween_factor(raw, curvature),
        }
    }

    pub fn is_done(&self) -> bool {
        self.raw >= 1.0
    }
}

/// Sigmoid remap normalized so that `tween_factor(0) == 0` and
/// `tween_factor(1) == 1`.
pub fn tween_factor(progress: f64, curvature: f64) -> f64 {
    if progress >= 1.0 {
        return 1.0;
    }
    if progress <= 0.0 {
        return 0.0;
    }
    if curvature <= 0.0 {
        return progress;
    }
    let max = 1.0 / (1.0 + (-curvature / 2.0).exp());
    let sigmoid = 1.0 / (1.0 + (-curvature * (progress - 0.5)).exp());
    ((sigmoid - 0.5) / (max - 0.5) / 2.0 + 0.5).clamp(0.0, 1.0)
}

/// An animated scalar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Tween {
    pub start: f64,
    pub end: f64,
}

impl Tween {
    pub fn new(value: f64) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    pub fn current(&self, progress: Progress) -> f64 {
        if progress.is_done() || self.start == self.end {
            self.end
        } else {
            self.start + progress.factor * (self.end - self.start)
        }
    }

    /// Retargets without a visual jump: whatever is on screen becomes the
    /// new start.
    pub fn set_target(&mut self, target: f64, progress: Progress) {
        self.start = self.current(progress);
        self.end = target;
    }

    pub fn set(&mut self, value: f64) {
        self.start = value;
        self.end = value;
    }
}

/// Linear map of `value` from `[from_start, from_end]` onto
/// `[to_start, to_end]`. Degenerate source ranges map to `to_start`.
pub fn lerp(value: f64, from_start: f64, from_end: f64, to_start: f64, to_end: f64) -> f64 {
    let span = from_end - from_start;
    if span == 0.0 || !span.is_finite() {
        return to_start;
    }
    (value - from_start) * (to_end - to_start) / span + to_start
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVATURE: f64 = 13.0;

    #[test]
    fn tween_factor_hits_endpoints() {
        assert_eq!(tween_factor(0.0, CURVATURE), 0.0);
        assert_eq!(tween_factor(1.0, CURVATURE), 1.0);
        assert!((tween_factor(0.5, CURVATURE) - 0.5).abs() < 1e-12);
        // just inside the endpoints the closed form must agree
        assert!(tween_factor(1e-9, CURVATURE) < 1e-6);
        assert!(tween_factor(1.0 - 1e-9, CURVATURE) > 1.0 - 1e-6);
    }

    #[test]
    fn tween_factor_is_monotonic() {
        let mut last = 0.0;
        for step in 0..=100 {
            let value = tween_factor(step as f64 / 100.0, CURVATURE);
            assert!(value >= last, "step {step}: {value} < {last}");
            last = value;
        }
    }

    #[test]
    fn current_returns_end_when_done() {
        let tween = Tween {
            start: 2.0,
            end: 10.0,
        };
        assert_eq!(tween.current(Progress::DONE), 10.0);
        assert_eq!(tween.current(Progress::new(0.0, CURVATURE)), 2.0);
    }

    #[test]
    fn set_target_is_continuous_mid_animation() {
        let mut tween = Tween {
            start: 0.0,
            end: 100.0,
        };
        for raw in [0.0, 0.13, 0.5, 0.77, 0.99] {
            let progress = Progress::new(raw, CURVATURE);
            let before = tween.current(progress);
            tween.set_target(-40.0 + raw * 3.0, progress);
            let after = tween.current(Progress::new(0.0, CURVATURE));
            assert!((before - after).abs() < 1e-9, "jump at {raw}");
            tween.end = 100.0;
        }
    }

    #[test]
    fn lerp_handles_degenerate_range() {
        assert_eq!(lerp(5.0, 1.0, 1.0, 3.0, 9.0), 3.0);
        assert_eq!(lerp(0.5, 0.0, 1.0, 10.0, 20.0), 15.0);
    }
}
