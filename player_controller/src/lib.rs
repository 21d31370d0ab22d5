//! Fixed-step platformer character controller.
//!
//! Composition of the movement motor and the geometry probes into one
//! deterministic per-tick pipeline. The step scheduler must advance
//! platforms (and the geometry world) before ticking controllers, so
//! riders read freshly published platform motion.
#![forbid(unsafe_code)]

pub mod events;
pub mod input;
pub mod profile;

use std::fmt;

use character_motor::{Motor, MotorInput, StepEvents, SupportState};
use character_probes::{
    BodyExtents, CornerCorrector, CrushDetector, GeometryQuery, GroundSensor, GroundSnapper,
    PlatformSource, SurfaceId,
};
use platformer_core::logging;
use rapier2d::math::Vector;
use rapier2d::prelude::Real;

use crate::events::{ControllerEvent, EventHub};
use crate::input::InputLatch;
use crate::profile::TuningProfile;

/// Kinematic state owned exclusively by one controller instance.
#[derive(Clone, Copy, Debug)]
pub struct BodyState {
    pub position: Vector<Real>,
    pub velocity: Vector<Real>,
    pub half_width: Real,
    pub half_height: Real,
}

impl BodyState {
    pub fn at_rest(position: Vector<Real>, half_width: Real, half_height: Real) -> Self {
        Self {
            position,
            velocity: Vector::zeros(),
            half_width,
            half_height,
        }
    }

    fn extents(&self) -> BodyExtents {
        BodyExtents {
            half_width: self.half_width,
            half_height: self.half_height,
        }
    }
}

#[derive(Debug)]
pub enum ControllerError {
    /// The body's half-extents are non-positive or non-finite; the
    /// controller refuses to activate rather than misbehave mid-step.
    InvalidExtents { half_width: Real, half_height: Real },
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::InvalidExtents {
                half_width,
                half_height,
            } => write!(
                f,
                "invalid body extents: half_width {}, half_height {}",
                half_width, half_height
            ),
        }
    }
}

impl std::error::Error for ControllerError {}

/// Per-step summary returned to the caller.
#[derive(Clone, Copy, Debug)]
pub struct StepFrame {
    pub position: Vector<Real>,
    pub velocity: Vector<Real>,
    pub grounded: bool,
    pub on_one_way_platform: bool,
    pub riding_platform: bool,
    pub crushed: bool,
    pub events: StepEvents,
}

pub struct PlatformerController {
    body: BodyState,
    motor: Motor,
    sensor: GroundSensor,
    corner: CornerCorrector,
    snapper: GroundSnapper,
    crush: CrushDetector,
    input: InputLatch,
    events: EventHub,
    riding_surface: Option<SurfaceId>,
}

impl PlatformerController {
    /// Validates the body and the profile once; degenerate tuning values
    /// are reported here and replaced with safe minima by the motor.
    pub fn new(profile: &TuningProfile, body: BodyState) -> Result<Self, ControllerError> {
        if !(body.half_width > 0.0 && body.half_width.is_finite())
            || !(body.half_height > 0.0 && body.half_height.is_finite())
        {
            let err = ControllerError::InvalidExtents {
                half_width: body.half_width,
                half_height: body.half_height,
            };
            logging::error(err.to_string());
            return Err(err);
        }
        for warning in profile.validate() {
            logging::warn(format!("tuning profile: {}", warning));
        }
        let probes = profile.probe_profile();
        Ok(Self {
            body,
            motor: Motor::new(profile.motor_config()),
            sensor: GroundSensor::new(probes),
            corner: CornerCorrector::new(probes),
            snapper: GroundSnapper::new(probes),
            crush: CrushDetector::new(probes),
            input: InputLatch::default(),
            events: EventHub::default(),
            riding_surface: None,
        })
    }

    pub fn body(&self) -> &BodyState {
        &self.body
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    /// Registration surface for the input dispatch collaborator.
    pub fn input_mut(&mut self) -> &mut InputLatch {
        &mut self.input
    }

    /// Registration surface for effect/animation observers.
    pub fn events_mut(&mut self) -> &mut EventHub {
        &mut self.events
    }

    pub fn tick<G>(&mut self, world: &G, dt: Real) -> StepFrame
    where
        G: GeometryQuery + PlatformSource,
    {
        let intent = self.input.consume();
        let extents = self.body.extents();

        // Ground support, classified with the previous step's gate.
        let contact = self.sensor.probe(
            world,
            self.body.position,
            extents,
            self.body.velocity.y,
            self.motor.pass_through(),
            dt,
        );
        let platform = contact
            .surface
            .and_then(|surface| world.platform_motion(surface));
        self.riding_surface = if contact.grounded && platform.is_some() {
            contact.surface
        } else {
            None
        };

        // Crouch gate, jump admission, gravity, response curves and
        // platform ride all advance inside the motor.
        let output = self.motor.step(
            MotorInput {
                move_x: intent.move_axis[0],
                jump_held: intent.jump_held,
                jump_pressed: intent.jump_pressed,
                crouch_held: intent.crouch_held,
            },
            SupportState {
                grounded: contact.grounded,
                platform,
            },
            self.body.velocity,
            dt,
        );
        self.body.velocity = output.velocity;

        // Corner correction nudges position before the motion integrates.
        if let Some(nudge) =
            self.corner
                .correct(world, self.body.position, extents, self.body.velocity, dt)
        {
            self.body.position += nudge;
        }

        self.body.position += self.body.velocity * dt + output.ride_translation;

        if let Some(shift) = self.snapper.snap(
            &contact,
            self.body.velocity.y,
            intent.jump_held,
            output.jump_in_cooldown,
        ) {
            self.body.position.y += shift;
        }

        let riding = self.riding_surface.is_some();
        let crushed = self.crush.detect(
            world,
            self.body.position,
            extents,
            &contact,
            riding,
            |surface| world.platform_motion(surface).is_some(),
        );

        self.publish(output.events, crushed);

        StepFrame {
            position: self.body.position,
            velocity: self.body.velocity,
            grounded: contact.grounded,
            on_one_way_platform: contact.one_way,
            riding_platform: riding,
            crushed,
            events: output.events,
        }
    }

    fn publish(&mut self, events: StepEvents, crushed: bool) {
        if events.jumped {
            self.events.publish(ControllerEvent::Jumped);
        }
        if events.ground_jump {
            self.events.publish(ControllerEvent::GroundJumped);
        }
        if events.air_jump {
            self.events.publish(ControllerEvent::AirJumped);
        }
        if events.left_ground {
            self.events.publish(ControllerEvent::LeftGround);
        }
        if events.landed {
            self.events.publish(ControllerEvent::Landed);
        }
        if crushed {
            self.events.publish(ControllerEvent::Crushed);
        }
    }
}
