//! Latched input intents consumed once per fixed step.

use rapier2d::prelude::Real;

/// Snapshot handed to the pipeline at the start of a step.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputIntent {
    pub move_axis: [Real; 2],
    pub jump_held: bool,
    pub jump_pressed: bool,
    pub crouch_held: bool,
}

/// Latches asynchronous input signals. Signals coalesce to their latest
/// value between steps, except jump presses, which stick until consumed
/// so buffering survives coalescing.
#[derive(Debug, Default)]
pub struct InputLatch {
    move_axis: [Real; 2],
    jump_held: bool,
    jump_pressed: bool,
    crouch_held: bool,
}

impl InputLatch {
    pub fn handle_move(&mut self, axis: [Real; 2]) {
        self.move_axis = normalize_axis(axis);
    }

    /// Jump signal: positive values are presses, zero is a release.
    pub fn handle_jump(&mut self, value: Real) {
        if value > 0.0 {
            self.jump_pressed = true;
            self.jump_held = true;
        } else {
            self.jump_held = false;
        }
    }

    pub fn handle_crouch(&mut self, held: bool) {
        self.crouch_held = held;
    }

    /// Consumes the press edge and returns the step's intent.
    pub fn consume(&mut self) -> InputIntent {
        let pressed = self.jump_pressed;
        self.jump_pressed = false;
        InputIntent {
            move_axis: self.move_axis,
            jump_held: self.jump_held,
            jump_pressed: pressed,
            crouch_held: self.crouch_held,
        }
    }
}

fn normalize_axis(axis: [Real; 2]) -> [Real; 2] {
    let len = (axis[0] * axis[0] + axis[1] * axis[1]).sqrt();
    if len > 1.0 {
        [axis[0] / len, axis[1] / len]
    } else {
        axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_survives_coalescing_until_consumed() {
        let mut latch = InputLatch::default();
        latch.handle_jump(1.0);
        latch.handle_jump(0.0);

        let intent = latch.consume();
        assert!(intent.jump_pressed);
        assert!(!intent.jump_held);

        let intent = latch.consume();
        assert!(!intent.jump_pressed);
    }

    #[test]
    fn move_coalesces_to_latest_value() {
        let mut latch = InputLatch::default();
        latch.handle_move([1.0, 0.0]);
        latch.handle_move([-0.5, 0.0]);
        assert_eq!(latch.consume().move_axis[0], -0.5);
    }

    #[test]
    fn oversized_axis_is_normalized() {
        let mut latch = InputLatch::default();
        latch.handle_move([3.0, 4.0]);
        let axis = latch.consume().move_axis;
        let len = (axis[0] * axis[0] + axis[1] * axis[1]).sqrt();
        assert!((len - 1.0).abs() < 1.0e-5);
    }
}
