//! Platformer movement motor: jump admission, gravity, response curves,
//! crouch gating and platform-ride carry. Pure state machine, no geometry.
#![forbid(unsafe_code)]

use character_probes::PlatformMotion;
use platformer_core::logging;
use rapier2d::math::Vector;
use rapier2d::prelude::Real;

/// Floor for time-denominated parameters; guards division by zero from
/// degenerate configuration.
const MIN_TIME: Real = 1.0e-3;
const INPUT_DEADZONE: Real = 0.01;
/// Platform vertical speed above which the body is carried upward
/// directly instead of being pressed into the platform.
const PLATFORM_LIFT_THRESHOLD: Real = 0.01;

#[derive(Clone, Copy, Debug)]
pub struct MotorConfig {
    pub max_run_speed: Real,
    pub time_to_max_speed: Real,
    pub time_to_stop: Real,
    pub air_acceleration_multiplier: Real,
    pub air_deceleration_multiplier: Real,
    pub acceleration_curve_exponent: Real,
    pub deceleration_curve_exponent: Real,
    pub max_jump_height: Real,
    pub time_to_jump_apex: Real,
    pub max_jumps: u32,
    pub gravity_multiplier: Real,
    /// Terminal fall speed, negative.
    pub max_fall_speed: Real,
    pub coyote_time: Real,
    pub jump_buffer_time: Real,
    pub jump_cooldown_time: Real,
    pub crouch_time_to_fall: Real,
    pub time_to_fall_through_platform: Real,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            max_run_speed: 10.0,
            time_to_max_speed: 0.5,
            time_to_stop: 0.2,
            air_acceleration_multiplier: 0.5,
            air_deceleration_multiplier: 0.5,
            acceleration_curve_exponent: 2.0,
            deceleration_curve_exponent: 2.0,
            max_jump_height: 5.0,
            time_to_jump_apex: 0.5,
            max_jumps: 2,
            gravity_multiplier: 3.0,
            max_fall_speed: -50.0,
            coyote_time: 0.2,
            jump_buffer_time: 0.2,
            jump_cooldown_time: 0.2,
            crouch_time_to_fall: 0.25,
            time_to_fall_through_platform: 0.25,
        }
    }
}

impl MotorConfig {
    /// Replaces degenerate values with safe minima. Each substitution is
    /// reported once; the per-step path assumes a sanitized config.
    pub fn sanitized(mut self) -> Self {
        for (name, value) in [
            ("time_to_jump_apex", &mut self.time_to_jump_apex),
            ("time_to_max_speed", &mut self.time_to_max_speed),
            ("time_to_stop", &mut self.time_to_stop),
            ("crouch_time_to_fall", &mut self.crouch_time_to_fall),
            (
                "time_to_fall_through_platform",
                &mut self.time_to_fall_through_platform,
            ),
        ] {
            if *value <= 0.0 {
                logging::warn(format!(
                    "motor config: {} must be positive, using {}",
                    name, MIN_TIME
                ));
                *value = MIN_TIME;
            }
        }
        if self.max_jumps == 0 {
            logging::warn("motor config: max_jumps must be at least 1, using 1");
            self.max_jumps = 1;
        }
        for (name, value) in [
            (
                "acceleration_curve_exponent",
                &mut self.acceleration_curve_exponent,
            ),
            (
                "deceleration_curve_exponent",
                &mut self.deceleration_curve_exponent,
            ),
        ] {
            if *value <= 0.0 {
                logging::warn(format!(
                    "motor config: {} must be positive, using 1",
                    name
                ));
                *value = 1.0;
            }
        }
        self
    }

    /// Launch speed producing an apex of `max_jump_height` at
    /// `time_to_jump_apex` under the matching gravity constant.
    pub fn jump_velocity(&self) -> Real {
        2.0 * self.max_jump_height / self.time_to_jump_apex
    }

    pub fn gravity(&self) -> Real {
        -2.0 * self.max_jump_height / (self.time_to_jump_apex * self.time_to_jump_apex)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MotorInput {
    /// Horizontal move axis in [-1, 1].
    pub move_x: Real,
    pub jump_held: bool,
    /// Press edge observed since the previous step.
    pub jump_pressed: bool,
    pub crouch_held: bool,
}

/// Support facts the ground sensor measured before the motor runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SupportState {
    pub grounded: bool,
    /// Motion of the supporting platform, when the support is kinematic.
    pub platform: Option<PlatformMotion>,
}

/// Edge flags raised during one step, at most once each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepEvents {
    pub jumped: bool,
    pub ground_jump: bool,
    pub air_jump: bool,
    pub left_ground: bool,
    pub landed: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct MotorOutput {
    pub velocity: Vector<Real>,
    /// Platform-ride translation to add to position this step, separate
    /// from velocity so gravity never double-integrates it.
    pub ride_translation: Vector<Real>,
    pub events: StepEvents,
    /// One-way platforms are ignored by the ground sensor while engaged.
    pub pass_through: bool,
    pub jump_in_cooldown: bool,
}

/// Derived jump flags, exposed for animation and tests.
#[derive(Clone, Copy, Debug)]
pub struct JumpSnapshot {
    pub available_jumps: u32,
    pub waiting_for_jump: bool,
    pub jump_in_cooldown: bool,
    pub in_air_from_jumping: bool,
    pub in_air_from_falling: bool,
    pub coyote_active: bool,
    pub fast_fall_active: bool,
}

pub struct Motor {
    config: MotorConfig,
    available_jumps: u32,
    time_since_jump_press: Real,
    time_since_last_jump: Real,
    time_since_left_ground: Real,
    waiting_for_jump: bool,
    jump_in_cooldown: bool,
    coyote_active: bool,
    fast_fall: bool,
    in_air_from_jumping: bool,
    in_air_from_falling: bool,
    was_grounded: bool,
    was_riding: bool,
    last_platform: Option<PlatformMotion>,
    carry_velocity: Real,
    crouch_timer: Real,
    pass_through: bool,
}

impl Motor {
    pub fn new(config: MotorConfig) -> Self {
        let config = config.sanitized();
        Self {
            available_jumps: config.max_jumps,
            // A fresh body is neither buffering a jump nor in cooldown.
            time_since_jump_press: config.jump_buffer_time,
            time_since_last_jump: config.jump_cooldown_time,
            time_since_left_ground: 0.0,
            waiting_for_jump: false,
            jump_in_cooldown: false,
            coyote_active: false,
            fast_fall: false,
            in_air_from_jumping: false,
            in_air_from_falling: false,
            was_grounded: false,
            was_riding: false,
            last_platform: None,
            carry_velocity: 0.0,
            crouch_timer: 0.0,
            pass_through: false,
            config,
        }
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    pub fn pass_through(&self) -> bool {
        self.pass_through
    }

    pub fn carry_velocity(&self) -> Real {
        self.carry_velocity
    }

    pub fn jump_snapshot(&self) -> JumpSnapshot {
        JumpSnapshot {
            available_jumps: self.available_jumps,
            waiting_for_jump: self.waiting_for_jump,
            jump_in_cooldown: self.jump_in_cooldown,
            in_air_from_jumping: self.in_air_from_jumping,
            in_air_from_falling: self.in_air_from_falling,
            coyote_active: self.coyote_active,
            fast_fall_active: self.fast_fall,
        }
    }

    pub fn reset_state(&mut self) {
        *self = Self::new(self.config);
    }

    pub fn step(
        &mut self,
        input: MotorInput,
        support: SupportState,
        velocity: Vector<Real>,
        dt: Real,
    ) -> MotorOutput {
        let dt = dt.max(0.0);
        let mut velocity = velocity;
        let mut events = StepEvents::default();
        let mut ride_translation = Vector::zeros();

        if input.jump_pressed {
            self.time_since_jump_press = 0.0;
        }

        self.update_crouch_gate(input.crouch_held, dt);

        let grounded = support.grounded;
        if grounded {
            self.time_since_left_ground = 0.0;
            self.in_air_from_jumping = false;
            self.in_air_from_falling = false;
            self.available_jumps = self.config.max_jumps;
        }
        if self.was_grounded && !grounded {
            // The initial fall is charged against the budget, so a single
            // air jump remains for a double-jump configuration.
            self.available_jumps = self.available_jumps.saturating_sub(1);
            if self.jump_in_cooldown {
                self.in_air_from_jumping = true;
            } else {
                self.in_air_from_falling = true;
            }
            events.left_ground = true;
        }
        if !self.was_grounded && grounded {
            events.landed = true;
            self.carry_velocity = 0.0;
        }

        if self.waiting_for_jump && !self.jump_in_cooldown {
            if grounded || self.coyote_active {
                self.execute_jump(&mut velocity, &mut events, false);
            } else if self.available_jumps > 0 {
                self.available_jumps -= 1;
                self.execute_jump(&mut velocity, &mut events, true);
            }
        }

        if self.in_air_from_falling {
            self.time_since_left_ground += dt;
            self.coyote_active = self.time_since_left_ground < self.config.coyote_time;
        } else {
            self.coyote_active = false;
        }

        self.time_since_jump_press += dt;
        self.waiting_for_jump = self.time_since_jump_press < self.config.jump_buffer_time;
        self.time_since_last_jump += dt;
        self.jump_in_cooldown = self.time_since_last_jump < self.config.jump_cooldown_time;

        // Gravity
        self.fast_fall = !grounded
            && !self.coyote_active
            && (!input.jump_held || velocity.y < 0.0);
        if grounded {
            if !self.jump_in_cooldown {
                velocity.y = 0.0;
            }
        } else {
            let mut gravity = self.config.gravity() * dt;
            if self.fast_fall {
                gravity *= self.config.gravity_multiplier;
            }
            velocity.y += gravity;
        }
        velocity.y = velocity.y.max(self.config.max_fall_speed);

        // Horizontal response; the carry share stays outside the
        // player-controlled curve so input cannot cancel it instantly.
        let controlled = velocity.x - self.carry_velocity;
        let controlled = self.horizontal_response(controlled, input.move_x, grounded, dt);
        self.carry_velocity = self.decelerate(self.carry_velocity, grounded, dt);
        velocity.x = controlled + self.carry_velocity;

        // Platform ride
        let riding = grounded && support.platform.is_some();
        if let Some(platform) = support.platform {
            if grounded {
                ride_translation.x = platform.delta.x;
                if platform.velocity.y > PLATFORM_LIFT_THRESHOLD {
                    velocity.y = platform.velocity.y;
                }
                self.last_platform = Some(platform);
            }
        }
        if self.was_riding && !riding {
            if let Some(platform) = self.last_platform.take() {
                self.carry_velocity = platform.velocity.x;
                velocity.x += self.carry_velocity;
                if platform.velocity.y > 0.0 {
                    velocity.y = velocity.y.max(platform.velocity.y);
                }
            }
        }
        self.was_riding = riding;
        self.was_grounded = grounded;

        MotorOutput {
            velocity,
            ride_translation,
            events,
            pass_through: self.pass_through,
            jump_in_cooldown: self.jump_in_cooldown,
        }
    }

    /// Signed crouch timer with hysteresis: the gate engages at the
    /// positive ceiling and disengages at the negative floor, never in
    /// between.
    fn update_crouch_gate(&mut self, crouch_held: bool, dt: Real) {
        self.crouch_timer = if crouch_held {
            (self.crouch_timer + dt).min(self.config.crouch_time_to_fall)
        } else {
            (self.crouch_timer - dt).max(-self.config.time_to_fall_through_platform)
        };
        if self.crouch_timer >= self.config.crouch_time_to_fall {
            self.pass_through = true;
        } else if self.crouch_timer <= -self.config.time_to_fall_through_platform {
            self.pass_through = false;
        }
    }

    fn execute_jump(
        &mut self,
        velocity: &mut Vector<Real>,
        events: &mut StepEvents,
        air: bool,
    ) {
        velocity.y = self.config.jump_velocity();
        self.in_air_from_jumping = true;
        self.in_air_from_falling = false;
        self.coyote_active = false;
        self.time_since_last_jump = 0.0;
        self.jump_in_cooldown = true;
        // Consume the buffered press so one press never admits two jumps.
        self.time_since_jump_press = self.config.jump_buffer_time;
        self.waiting_for_jump = false;
        events.jumped = true;
        if air {
            events.air_jump = true;
        } else {
            events.ground_jump = true;
        }
    }

    /// Curve-based horizontal response. The response curve maps a curve
    /// position in [0, 1] to a speed fraction via `pos^(1/exponent)`;
    /// advancing along the curve at a constant rate reproduces the tuned
    /// time-to-max-speed while the exponent alone shapes the feel.
    fn horizontal_response(&self, vx: Real, move_x: Real, grounded: bool, dt: Real) -> Real {
        let cfg = &self.config;
        let pressing_left = move_x < -INPUT_DEADZONE && vx <= 0.0;
        let pressing_right = move_x > INPUT_DEADZONE && vx >= 0.0;
        if !(pressing_left || pressing_right) {
            return self.decelerate(vx, grounded, dt);
        }

        let percent = (vx.abs() / cfg.max_run_speed).clamp(0.0, 1.0);
        let mut rate = dt / cfg.time_to_max_speed;
        if !grounded {
            rate *= cfg.air_acceleration_multiplier;
        }
        let exponent = cfg.acceleration_curve_exponent;
        let curve_pos = (percent.powf(exponent) + rate).clamp(0.0, 1.0);
        cfg.max_run_speed * curve_pos.powf(1.0 / exponent) * move_x.signum()
    }

    /// Symmetric decay toward zero, signed by the current direction so
    /// braking never flips sign within a step. Also decays the
    /// out-of-control carry inherited from platforms.
    fn decelerate(&self, vx: Real, grounded: bool, dt: Real) -> Real {
        if vx == 0.0 {
            return 0.0;
        }
        let cfg = &self.config;
        let percent = (vx.abs() / cfg.max_run_speed).clamp(0.0, 1.0);
        let mut rate = dt / cfg.time_to_stop;
        if !grounded {
            rate *= cfg.air_deceleration_multiplier;
        }
        let exponent = cfg.deceleration_curve_exponent;
        let curve_pos = (percent.powf(exponent) - rate).clamp(0.0, 1.0);
        cfg.max_run_speed * curve_pos.powf(1.0 / exponent) * vx.signum()
    }
}
