//! Kinematic platform motion publishing per-step velocity and delta.
#![forbid(unsafe_code)]

use rapier2d::math::Vector;
use rapier2d::prelude::Real;

/// Motion source sampled once per fixed step. Returns the position the
/// platform should occupy after the step.
pub trait MotionTrack {
    fn advance(&mut self, start: Vector<Real>, dt: Real) -> Vector<Real>;
}

/// Ping-pong lerp between `start` and `start + travel` with independent
/// forward and back travel times. Non-positive times freeze the platform.
#[derive(Clone, Copy, Debug)]
pub struct PingPongTrack {
    travel: Vector<Real>,
    forward_time: Real,
    back_time: Real,
    forward: bool,
    t: Real,
}

impl PingPongTrack {
    pub fn new(travel: Vector<Real>, forward_time: Real, back_time: Real) -> Self {
        Self {
            travel,
            forward_time,
            back_time,
            forward: true,
            t: 0.0,
        }
    }
}

impl MotionTrack for PingPongTrack {
    fn advance(&mut self, start: Vector<Real>, dt: Real) -> Vector<Real> {
        if self.forward_time <= 0.0 || self.back_time <= 0.0 {
            return start + self.travel * self.t;
        }
        if self.forward {
            self.t = (self.t + dt / self.forward_time).clamp(0.0, 1.0);
            if self.t >= 1.0 {
                self.forward = false;
            }
        } else {
            self.t = (self.t - dt / self.back_time).clamp(0.0, 1.0);
            if self.t <= 0.0 {
                self.forward = true;
            }
        }
        start + self.travel * self.t
    }
}

/// Drives a platform along a track and publishes the velocity and position
/// delta of the move it just performed. Riders read the published values;
/// the mover must advance before any rider steps.
#[derive(Clone, Copy, Debug)]
pub struct KinematicMover {
    start: Vector<Real>,
    position: Vector<Real>,
    velocity: Vector<Real>,
    delta: Vector<Real>,
}

impl KinematicMover {
    pub fn new(start: Vector<Real>) -> Self {
        Self {
            start,
            position: start,
            velocity: Vector::zeros(),
            delta: Vector::zeros(),
        }
    }

    /// Samples the track and returns the position the platform body should
    /// be moved to this step.
    pub fn advance(&mut self, track: &mut dyn MotionTrack, dt: Real) -> Vector<Real> {
        let previous = self.position;
        self.position = track.advance(self.start, dt);
        self.delta = self.position - previous;
        self.velocity = if dt > 0.0 {
            self.delta / dt
        } else {
            Vector::zeros()
        };
        self.position
    }

    pub fn position(&self) -> Vector<Real> {
        self.position
    }

    pub fn velocity(&self) -> Vector<Real> {
        self.velocity
    }

    pub fn delta(&self) -> Vector<Real> {
        self.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_pong_reverses_at_ends() {
        let start = Vector::new(2.0, 1.0);
        let mut track = PingPongTrack::new(Vector::new(4.0, 0.0), 1.0, 1.0);
        let mut mover = KinematicMover::new(start);

        let dt = 0.25;
        for _ in 0..4 {
            mover.advance(&mut track, dt);
        }
        assert!((mover.position().x - 6.0).abs() < 1.0e-5);

        mover.advance(&mut track, dt);
        assert!(mover.position().x < 6.0);
        assert!(mover.velocity().x < 0.0);
    }

    #[test]
    fn publishes_delta_and_velocity_of_last_move() {
        let start = Vector::new(0.0, 0.0);
        let mut track = PingPongTrack::new(Vector::new(5.0, 0.0), 1.0, 1.0);
        let mut mover = KinematicMover::new(start);

        let dt = 0.1;
        mover.advance(&mut track, dt);
        assert!((mover.delta().x - 0.5).abs() < 1.0e-5);
        assert!((mover.velocity().x - 5.0).abs() < 1.0e-4);
    }

    #[test]
    fn degenerate_times_freeze_the_platform() {
        let start = Vector::new(0.0, 0.0);
        let mut track = PingPongTrack::new(Vector::new(5.0, 0.0), 0.0, 1.0);
        let mut mover = KinematicMover::new(start);

        for _ in 0..10 {
            mover.advance(&mut track, 0.1);
        }
        assert_eq!(mover.position().x, 0.0);
        assert_eq!(mover.velocity().x, 0.0);
    }
}
