//! Procedural body motion: impact pitch kick plus lean/pitch springs
//!
//! Purely cosmetic; nothing here feeds back into movement or damage.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::tuning::FeedbackTuning;

/// Smallest smoothing time accepted by [`smooth_damp`]
const MIN_SMOOTH_TIME: f32 = 1.0e-4;

/// Critically damped approach of `current` toward `target`
///
/// Returns the new value and updates `velocity` in place. Never overshoots.
pub fn smooth_damp(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    if !(dt > 0.0) {
        return current;
    }
    let smooth_time = smooth_time.max(MIN_SMOOTH_TIME);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    // Polynomial approximation of e^-x
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = (output - target) / dt;
    }
    output
}

/// Damped spring used for body lean and pitch (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spring {
    pub value: f32,
    pub velocity: f32,
}

impl Spring {
    /// Step toward `target`, clamping the result to `[-limit, limit]`
    pub fn step(&mut self, target: f32, stiffness: f32, damping: f32, limit: f32, dt: f32) -> f32 {
        if !(dt > 0.0) || !target.is_finite() {
            return self.value;
        }
        self.velocity += (target - self.value) * stiffness * dt;
        self.velocity *= (1.0 - damping * dt).max(0.0);
        self.value += self.velocity * dt;

        if self.value.abs() > limit {
            self.value = self.value.clamp(-limit, limit);
            self.velocity = 0.0;
        }
        self.value
    }
}

/// Transient pitch caused by running into something
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionFeedback {
    pub tuning: FeedbackTuning,
    target_pitch: f32,
    timer: f32,
    pitch: f32,
    velocity: f32,
}

impl CollisionFeedback {
    pub fn new(tuning: FeedbackTuning) -> Self {
        Self {
            tuning,
            target_pitch: 0.0,
            timer: 0.0,
            pitch: 0.0,
            velocity: 0.0,
        }
    }

    /// Register an impact with a surface whose normal points back at the vehicle
    pub fn impact(&mut self, forward: Vec3, right: Vec3, normal: Vec3, speed: f32, max_speed: f32) {
        let forward_dot = forward.dot(normal);
        let right_dot = right.dot(normal);
        let speed_factor = if max_speed > 0.0 {
            (speed.abs() / max_speed).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let intensity = self.tuning.collision_pitch_intensity * speed_factor;

        // Only head-on and rear impacts pitch the body; side hits do not
        self.target_pitch = if forward_dot.abs() > right_dot.abs() {
            if forward_dot > 0.3 {
                -intensity
            } else if forward_dot < -0.3 {
                intensity
            } else {
                0.0
            }
        } else {
            0.0
        };
        self.timer = self.tuning.collision_duration * (0.5 + 0.5 * speed_factor);
    }

    pub fn update(&mut self, dt: f32) -> f32 {
        if !(dt > 0.0) {
            return self.pitch;
        }
        if self.timer > 0.0 {
            self.timer -= dt;
            let duration = self.tuning.collision_duration.max(MIN_SMOOTH_TIME);
            let normalized = 1.0 - self.timer / duration;
            let goal = self.target_pitch * (-normalized * 5.0).exp();
            self.pitch = smooth_damp(self.pitch, goal, &mut self.velocity, 0.1, dt);
        } else {
            self.pitch = smooth_damp(self.pitch, 0.0, &mut self.velocity, 0.2, dt);
        }
        self.pitch
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn is_active(&self) -> bool {
        self.timer > 0.0
    }
}

impl Default for CollisionFeedback {
    fn default() -> Self {
        Self::new(FeedbackTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_smooth_damp_converges_without_overshoot() {
        let mut velocity = 0.0;
        let mut value = 0.0;
        for _ in 0..120 {
            value = smooth_damp(value, 10.0, &mut velocity, 0.1, DT);
            assert!(value <= 10.0);
        }
        assert!((value - 10.0).abs() < 1e-2);
    }

    #[test]
    fn test_smooth_damp_zero_dt_is_identity() {
        let mut velocity = 3.0;
        assert_eq!(smooth_damp(1.0, 5.0, &mut velocity, 0.1, 0.0), 1.0);
        assert_eq!(velocity, 3.0);
    }

    #[test]
    fn test_head_on_impact_pitches_nose_up() {
        let mut feedback = CollisionFeedback::default();
        // Wall ahead: its normal points back at us, along -forward
        feedback.impact(Vec3::Z, Vec3::X, -Vec3::Z, 10.0, 10.0);
        assert!(feedback.is_active());

        let mut peak: f32 = 0.0;
        for _ in 0..10 {
            peak = peak.max(feedback.update(DT));
        }
        assert!(peak > 1.0);
    }

    #[test]
    fn test_side_impact_has_no_pitch() {
        let mut feedback = CollisionFeedback::default();
        feedback.impact(Vec3::Z, Vec3::X, Vec3::X, 10.0, 10.0);
        for _ in 0..30 {
            assert_eq!(feedback.update(DT), 0.0);
        }
    }

    #[test]
    fn test_pitch_settles_back_to_zero() {
        let mut feedback = CollisionFeedback::default();
        feedback.impact(Vec3::Z, Vec3::X, Vec3::Z, 10.0, 10.0);
        assert!(feedback.update(DT) < 0.0);
        for _ in 0..180 {
            feedback.update(DT);
        }
        assert!(!feedback.is_active());
        assert!(feedback.pitch().abs() < 0.05);
    }

    #[test]
    fn test_impact_timer_scales_with_speed() {
        let mut slow = CollisionFeedback::default();
        slow.impact(Vec3::Z, Vec3::X, Vec3::Z, 0.0, 10.0);
        // Half the duration at zero speed: 0.25 s
        for _ in 0..14 {
            slow.update(DT);
        }
        assert!(slow.is_active());
        for _ in 0..2 {
            slow.update(DT);
        }
        assert!(!slow.is_active());
    }

    #[test]
    fn test_spring_clamps_to_limit() {
        let mut spring = Spring::default();
        for _ in 0..600 {
            spring.step(50.0, 6.0, 4.0, 10.0, DT);
            assert!(spring.value.abs() <= 10.0);
        }
        assert_eq!(spring.value, 10.0);
        assert_eq!(spring.step(50.0, 6.0, 4.0, 10.0, 0.0), 10.0);
    }
}
