//! Tuning profile: externally supplied configuration for one controller
//! instance, loadable from TOML and validated once at load.

use std::fmt;

use character_motor::MotorConfig;
use character_probes::ProbeProfile;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TuningProfile {
    pub max_run_speed: f32,
    pub time_to_max_speed: f32,
    pub time_to_stop: f32,
    pub air_acceleration_multiplier: f32,
    pub air_deceleration_multiplier: f32,
    pub acceleration_curve_exponent: f32,
    pub deceleration_curve_exponent: f32,
    pub max_jump_height: f32,
    pub time_to_jump_apex: f32,
    pub max_jumps: u32,
    pub gravity_multiplier: f32,
    pub max_fall_speed: f32,
    pub coyote_time: f32,
    pub jump_buffer_time: f32,
    pub jump_cooldown_time: f32,
    pub crouch_time_to_fall: f32,
    pub time_to_fall_through_platform: f32,
    pub ground_probe_thickness: f32,
    pub corner_correction_width_ratio: f32,
    pub corner_correction_height_ratio: f32,
}

impl Default for TuningProfile {
    fn default() -> Self {
        let motor = MotorConfig::default();
        let probes = ProbeProfile::default();
        Self {
            max_run_speed: motor.max_run_speed,
            time_to_max_speed: motor.time_to_max_speed,
            time_to_stop: motor.time_to_stop,
            air_acceleration_multiplier: motor.air_acceleration_multiplier,
            air_deceleration_multiplier: motor.air_deceleration_multiplier,
            acceleration_curve_exponent: motor.acceleration_curve_exponent,
            deceleration_curve_exponent: motor.deceleration_curve_exponent,
            max_jump_height: motor.max_jump_height,
            time_to_jump_apex: motor.time_to_jump_apex,
            max_jumps: motor.max_jumps,
            gravity_multiplier: motor.gravity_multiplier,
            max_fall_speed: motor.max_fall_speed,
            coyote_time: motor.coyote_time,
            jump_buffer_time: motor.jump_buffer_time,
            jump_cooldown_time: motor.jump_cooldown_time,
            crouch_time_to_fall: motor.crouch_time_to_fall,
            time_to_fall_through_platform: motor.time_to_fall_through_platform,
            ground_probe_thickness: probes.ground_probe_thickness,
            corner_correction_width_ratio: probes.corner_correction_width_ratio,
            corner_correction_height_ratio: probes.corner_correction_height_ratio,
        }
    }
}

#[derive(Debug)]
pub enum ProfileError {
    Parse(toml::de::Error),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::Parse(err) => write!(f, "tuning profile parse error: {}", err),
        }
    }
}

impl std::error::Error for ProfileError {}

impl TuningProfile {
    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        toml::from_str(text).map_err(ProfileError::Parse)
    }

    /// Collects human-readable warnings for degenerate values. The
    /// controller reports these once at initialization; the motor then
    /// substitutes safe minima for the offenders.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, value) in [
            ("time_to_jump_apex", self.time_to_jump_apex),
            ("time_to_max_speed", self.time_to_max_speed),
            ("time_to_stop", self.time_to_stop),
            ("crouch_time_to_fall", self.crouch_time_to_fall),
            (
                "time_to_fall_through_platform",
                self.time_to_fall_through_platform,
            ),
        ] {
            if value <= 0.0 {
                warnings.push(format!("{} must be positive (got {})", name, value));
            }
        }
        if self.max_jumps == 0 {
            warnings.push("max_jumps must be at least 1".to_string());
        }
        if self.max_fall_speed >= 0.0 {
            warnings.push(format!(
                "max_fall_speed should be negative (got {})",
                self.max_fall_speed
            ));
        }
        if self.ground_probe_thickness <= 0.0 {
            warnings.push(format!(
                "ground_probe_thickness must be positive (got {})",
                self.ground_probe_thickness
            ));
        }
        warnings
    }

    pub fn motor_config(&self) -> MotorConfig {
        MotorConfig {
            max_run_speed: self.max_run_speed,
            time_to_max_speed: self.time_to_max_speed,
            time_to_stop: self.time_to_stop,
            air_acceleration_multiplier: self.air_acceleration_multiplier,
            air_deceleration_multiplier: self.air_deceleration_multiplier,
            acceleration_curve_exponent: self.acceleration_curve_exponent,
            deceleration_curve_exponent: self.deceleration_curve_exponent,
            max_jump_height: self.max_jump_height,
            time_to_jump_apex: self.time_to_jump_apex,
            max_jumps: self.max_jumps,
            gravity_multiplier: self.gravity_multiplier,
            max_fall_speed: self.max_fall_speed,
            coyote_time: self.coyote_time,
            jump_buffer_time: self.jump_buffer_time,
            jump_cooldown_time: self.jump_cooldown_time,
            crouch_time_to_fall: self.crouch_time_to_fall,
            time_to_fall_through_platform: self.time_to_fall_through_platform,
        }
    }

    pub fn probe_profile(&self) -> ProbeProfile {
        ProbeProfile {
            ground_probe_thickness: self.ground_probe_thickness,
            corner_correction_width_ratio: self.corner_correction_width_ratio,
            corner_correction_height_ratio: self.corner_correction_height_ratio,
            ..ProbeProfile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_partial_profile_over_defaults() {
        let profile = TuningProfile::from_toml_str(
            r#"
            max_run_speed = 15.0
            time_to_max_speed = 0.2
            max_jumps = 3
            "#,
        )
        .unwrap();
        assert_eq!(profile.max_run_speed, 15.0);
        assert_eq!(profile.max_jumps, 3);
        // Untouched fields keep their defaults.
        assert_eq!(profile.coyote_time, TuningProfile::default().coyote_time);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = TuningProfile::from_toml_str("jump_power = 3.0");
        assert!(result.is_err());
    }

    #[test]
    fn degenerate_values_produce_warnings() {
        let profile = TuningProfile {
            time_to_jump_apex: 0.0,
            max_jumps: 0,
            max_fall_speed: 10.0,
            ..TuningProfile::default()
        };
        let warnings = profile.validate();
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn default_profile_is_clean() {
        assert!(TuningProfile::default().validate().is_empty());
    }
}
