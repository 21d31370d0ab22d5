//! Geometry-facing probe stages: ground sensing, corner correction,
//! ground snapping and crush detection over an injected query interface.
#![forbid(unsafe_code)]

use rapier2d::math::Vector;
use rapier2d::prelude::Real;

/// Identity of a struck body, stable for the lifetime of the geometry
/// world that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// Named collision sets the probes query against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeMask {
    SolidGround,
    OneWayPlatform,
    CornerCorrection,
}

#[derive(Clone, Copy, Debug)]
pub struct ProbeHit {
    /// Distance travelled before contact; zero when already touching.
    pub distance: Real,
    pub surface: Option<SurfaceId>,
}

/// Synchronous directional probes against external geometry. Boxes are
/// swept by their center; rays are segments from `origin`.
pub trait GeometryQuery {
    fn cast_box(
        &self,
        center: Vector<Real>,
        half_extents: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: ProbeMask,
    ) -> Option<ProbeHit>;

    fn cast_ray(
        &self,
        origin: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: ProbeMask,
    ) -> Option<ProbeHit>;
}

/// Last-step velocity and position delta published by a kinematic
/// platform. The controller only reads these; the platform owns them.
#[derive(Clone, Copy, Debug)]
pub struct PlatformMotion {
    pub velocity: Vector<Real>,
    pub delta: Vector<Real>,
}

/// Lookup from a struck surface to its platform motion, when the surface
/// belongs to a kinematic platform.
pub trait PlatformSource {
    fn platform_motion(&self, surface: SurfaceId) -> Option<PlatformMotion>;
}

#[derive(Clone, Copy, Debug)]
pub struct BodyExtents {
    pub half_width: Real,
    pub half_height: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct ProbeProfile {
    /// Thickness of the ground/ceiling probe boxes in meters.
    pub ground_probe_thickness: Real,
    /// Fraction of half-width a rising body may overlap a ceiling corner
    /// and still be nudged sideways past it.
    pub corner_correction_width_ratio: Real,
    /// Fraction of body height treated as a climbable step rather than a
    /// wall when moving horizontally.
    pub corner_correction_height_ratio: Real,
    /// Gap left between the body and the ground after snapping.
    pub snap_epsilon: Real,
}

impl Default for ProbeProfile {
    fn default() -> Self {
        Self {
            ground_probe_thickness: 0.2,
            corner_correction_width_ratio: 0.5,
            corner_correction_height_ratio: 0.25,
            snap_epsilon: 1.0e-3,
        }
    }
}

/// Support classification for one step. `distance` is infinite while
/// airborne.
#[derive(Clone, Copy, Debug)]
pub struct GroundContact {
    pub grounded: bool,
    pub distance: Real,
    pub surface: Option<SurfaceId>,
    pub one_way: bool,
}

impl GroundContact {
    pub fn airborne() -> Self {
        Self {
            grounded: false,
            distance: Real::INFINITY,
            surface: None,
            one_way: false,
        }
    }
}

pub struct GroundSensor {
    profile: ProbeProfile,
}

impl GroundSensor {
    pub fn new(profile: ProbeProfile) -> Self {
        Self { profile }
    }

    /// Probes beneath the body. Solid hits always count as support;
    /// one-way hits count only while descending or resting with the
    /// pass-through gate disengaged. A rising body is never grounded.
    pub fn probe<G: GeometryQuery>(
        &self,
        world: &G,
        position: Vector<Real>,
        extents: BodyExtents,
        velocity_y: Real,
        pass_through: bool,
        dt: Real,
    ) -> GroundContact {
        if velocity_y > 0.0 {
            return GroundContact::airborne();
        }

        let thickness = self.profile.ground_probe_thickness;
        let reach = thickness.max(-velocity_y * dt);
        let half_extents = Vector::new(extents.half_width, thickness * 0.5);
        // Probe box bottom flush with the body bottom, so travelled
        // distance equals the gap underneath the feet.
        let center = Vector::new(
            position.x,
            position.y - extents.half_height + thickness * 0.5,
        );
        let down = Vector::new(0.0, -1.0);

        let solid = world.cast_box(center, half_extents, down, reach, ProbeMask::SolidGround);
        let one_way = if pass_through {
            None
        } else {
            world.cast_box(center, half_extents, down, reach, ProbeMask::OneWayPlatform)
        };

        let (hit, from_one_way) = match (solid, one_way) {
            (Some(s), Some(o)) => {
                if o.distance < s.distance {
                    (o, true)
                } else {
                    (s, false)
                }
            }
            (Some(s), None) => (s, false),
            (None, Some(o)) => (o, true),
            (None, None) => return GroundContact::airborne(),
        };

        GroundContact {
            grounded: true,
            distance: hit.distance,
            surface: hit.surface,
            one_way: from_one_way,
        }
    }
}

pub struct CornerCorrector {
    profile: ProbeProfile,
}

impl CornerCorrector {
    pub fn new(profile: ProbeProfile) -> Self {
        Self { profile }
    }

    /// Positional nudge preventing the body from catching on an exact
    /// geometry corner along this step's motion. Returns the shift to
    /// apply before integrating, or `None` when the path is clean.
    pub fn correct<G: GeometryQuery>(
        &self,
        world: &G,
        position: Vector<Real>,
        extents: BodyExtents,
        velocity: Vector<Real>,
        dt: Real,
    ) -> Option<Vector<Real>> {
        if velocity.y > 0.0 {
            self.correct_rising(world, position, extents, velocity.y * dt)
        } else if velocity.x.abs() > 0.0 {
            self.correct_leading_edge(world, position, extents, velocity.x * dt)
        } else {
            None
        }
    }

    /// Rising case: exactly one top corner is about to clip a ceiling
    /// edge. Measure how much of the body the obstruction covers and, if
    /// small enough, slide out from under it.
    fn correct_rising<G: GeometryQuery>(
        &self,
        world: &G,
        position: Vector<Real>,
        extents: BodyExtents,
        travel: Real,
    ) -> Option<Vector<Real>> {
        let top = position.y + extents.half_height;
        let up = Vector::new(0.0, 1.0);
        let left_corner = Vector::new(position.x - extents.half_width, top);
        let right_corner = Vector::new(position.x + extents.half_width, top);

        let left = world.cast_ray(left_corner, up, travel, ProbeMask::CornerCorrection);
        let right = world.cast_ray(right_corner, up, travel, ProbeMask::CornerCorrection);

        let (hit, obstructed_left) = match (left, right) {
            (Some(hit), None) => (hit, true),
            (None, Some(hit)) => (hit, false),
            _ => return None,
        };

        // Horizontal probe from the clear side toward the obstruction,
        // just above the hit height.
        let probe_y = top + hit.distance + PROBE_SKIN;
        let width = 2.0 * extents.half_width;
        let (from, toward) = if obstructed_left {
            (Vector::new(position.x + extents.half_width, probe_y), Vector::new(-1.0, 0.0))
        } else {
            (Vector::new(position.x - extents.half_width, probe_y), Vector::new(1.0, 0.0))
        };
        let clearance = world.cast_ray(from, toward, width, ProbeMask::CornerCorrection)?;

        let overlap = width - clearance.distance;
        if overlap <= 0.0 || overlap > self.profile.corner_correction_width_ratio * extents.half_width {
            return None;
        }
        let shift = overlap + PROBE_SKIN;
        Some(if obstructed_left {
            Vector::new(shift, 0.0)
        } else {
            Vector::new(-shift, 0.0)
        })
    }

    /// Horizontal case: the leading bottom corner is about to hit a low
    /// ledge. If the exposed height is within the climbable fraction,
    /// lift the body over it.
    fn correct_leading_edge<G: GeometryQuery>(
        &self,
        world: &G,
        position: Vector<Real>,
        extents: BodyExtents,
        travel_x: Real,
    ) -> Option<Vector<Real>> {
        let dir_x = travel_x.signum();
        let travel = travel_x.abs();
        if travel <= 0.0 {
            return None;
        }

        let bottom = position.y - extents.half_height;
        let leading = Vector::new(position.x + dir_x * extents.half_width, bottom + PROBE_SKIN);
        let ahead = Vector::new(dir_x, 0.0);
        let hit = world.cast_ray(leading, ahead, travel, ProbeMask::CornerCorrection)?;

        // Downward probe just past the obstruction face measures the step
        // top; a probe that starts inside geometry reports zero distance
        // and rejects the move as a wall.
        let max_step = self.profile.corner_correction_height_ratio * 2.0 * extents.half_height;
        let over = Vector::new(
            leading.x + (hit.distance + PROBE_SKIN) * dir_x,
            bottom + max_step,
        );
        let down = world.cast_ray(over, Vector::new(0.0, -1.0), max_step, ProbeMask::CornerCorrection)?;
        if down.distance <= 0.0 {
            return None;
        }

        let exposed = max_step - down.distance;
        if exposed <= 0.0 {
            return None;
        }
        Some(Vector::new(0.0, exposed + PROBE_SKIN))
    }
}

pub struct GroundSnapper {
    profile: ProbeProfile,
}

impl GroundSnapper {
    pub fn new(profile: ProbeProfile) -> Self {
        Self { profile }
    }

    /// Vertical shift closing the measured sub-step gap to the ground.
    /// Suppressed during jump cooldown and while rising under a held
    /// jump, so a launch impulse is never cancelled on its own step.
    pub fn snap(
        &self,
        contact: &GroundContact,
        velocity_y: Real,
        jump_held: bool,
        jump_in_cooldown: bool,
    ) -> Option<Real> {
        if !contact.grounded || jump_in_cooldown {
            return None;
        }
        if jump_held && velocity_y > 0.0 {
            return None;
        }
        if !contact.distance.is_finite() {
            return None;
        }
        let shift = contact.distance - self.profile.snap_epsilon;
        (shift > 0.0).then_some(-shift)
    }
}

/// Edge-triggered crush detection: fires once when an overhead
/// obstruction coincides with platform-backed support.
pub struct CrushDetector {
    profile: ProbeProfile,
    was_crushed: bool,
}

impl CrushDetector {
    pub fn new(profile: ProbeProfile) -> Self {
        Self {
            profile,
            was_crushed: false,
        }
    }

    pub fn detect<G: GeometryQuery>(
        &mut self,
        world: &G,
        position: Vector<Real>,
        extents: BodyExtents,
        contact: &GroundContact,
        riding_platform: bool,
        is_platform: impl Fn(SurfaceId) -> bool,
    ) -> bool {
        let thickness = self.profile.ground_probe_thickness;
        let half_extents = Vector::new(extents.half_width, thickness * 0.5);
        let center = Vector::new(
            position.x,
            position.y + extents.half_height - thickness * 0.5,
        );
        let up = Vector::new(0.0, 1.0);
        let overhead = world.cast_box(center, half_extents, up, thickness, ProbeMask::SolidGround);

        let crushed = contact.grounded
            && match overhead {
                Some(hit) => {
                    riding_platform || hit.surface.map(&is_platform).unwrap_or(false)
                }
                None => false,
            };
        let fired = crushed && !self.was_crushed;
        self.was_crushed = crushed;
        fired
    }
}

const PROBE_SKIN: Real = 1.0e-3;

#[cfg(test)]
mod tests {
    use super::*;

    /// Axis-aligned boxes answering ray and box casts analytically.
    struct BoxWorld {
        solids: Vec<(Vector<Real>, Vector<Real>, SurfaceId)>,
        one_way: Vec<(Vector<Real>, Vector<Real>, SurfaceId)>,
    }

    impl BoxWorld {
        fn new() -> Self {
            Self {
                solids: Vec::new(),
                one_way: Vec::new(),
            }
        }

        fn with_solid(mut self, center: Vector<Real>, half: Vector<Real>, id: u64) -> Self {
            self.solids.push((center, half, SurfaceId(id)));
            self
        }

        fn with_one_way(mut self, center: Vector<Real>, half: Vector<Real>, id: u64) -> Self {
            self.one_way.push((center, half, SurfaceId(id)));
            self
        }

        fn boxes(&self, mask: ProbeMask) -> &[(Vector<Real>, Vector<Real>, SurfaceId)] {
            match mask {
                ProbeMask::SolidGround | ProbeMask::CornerCorrection => &self.solids,
                ProbeMask::OneWayPlatform => &self.one_way,
            }
        }

        fn sweep(
            &self,
            center: Vector<Real>,
            half: Vector<Real>,
            direction: Vector<Real>,
            max_distance: Real,
            mask: ProbeMask,
        ) -> Option<ProbeHit> {
            let mut best: Option<ProbeHit> = None;
            for (bc, bh, id) in self.boxes(mask) {
                let grown = Vector::new(bh.x + half.x, bh.y + half.y);
                if let Some(distance) = enter_distance(center - bc, grown, direction, max_distance)
                {
                    if best.map_or(true, |b| distance < b.distance) {
                        best = Some(ProbeHit {
                            distance,
                            surface: Some(*id),
                        });
                    }
                }
            }
            best
        }
    }

    /// Slab test of a point swept against an AABB centered at the origin.
    fn enter_distance(
        rel: Vector<Real>,
        half: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
    ) -> Option<Real> {
        if rel.x.abs() <= half.x && rel.y.abs() <= half.y {
            return Some(0.0);
        }
        let mut t_min: Real = 0.0;
        let mut t_max = max_distance;
        for axis in 0..2 {
            let (r, h, d) = if axis == 0 {
                (rel.x, half.x, direction.x)
            } else {
                (rel.y, half.y, direction.y)
            };
            if d.abs() < 1.0e-9 {
                if r.abs() > h {
                    return None;
                }
                continue;
            }
            let t1 = (-h - r) / d;
            let t2 = (h - r) / d;
            let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_min > t_max {
                return None;
            }
        }
        (t_min <= max_distance).then_some(t_min.max(0.0))
    }

    impl GeometryQuery for BoxWorld {
        fn cast_box(
            &self,
            center: Vector<Real>,
            half_extents: Vector<Real>,
            direction: Vector<Real>,
            max_distance: Real,
            mask: ProbeMask,
        ) -> Option<ProbeHit> {
            self.sweep(center, half_extents, direction, max_distance, mask)
        }

        fn cast_ray(
            &self,
            origin: Vector<Real>,
            direction: Vector<Real>,
            max_distance: Real,
            mask: ProbeMask,
        ) -> Option<ProbeHit> {
            self.sweep(origin, Vector::zeros(), direction, max_distance, mask)
        }
    }

    fn body() -> BodyExtents {
        BodyExtents {
            half_width: 0.5,
            half_height: 1.0,
        }
    }

    fn floor_world() -> BoxWorld {
        // Floor top at y = 0.
        BoxWorld::new().with_solid(Vector::new(0.0, -1.0), Vector::new(10.0, 1.0), 1)
    }

    #[test]
    fn resting_body_is_grounded() {
        let world = floor_world();
        let sensor = GroundSensor::new(ProbeProfile::default());
        let contact = sensor.probe(&world, Vector::new(0.0, 1.05), body(), 0.0, false, 1.0 / 60.0);
        assert!(contact.grounded);
        assert!(!contact.one_way);
        assert!((contact.distance - 0.05).abs() < 1.0e-4);
        assert_eq!(contact.surface, Some(SurfaceId(1)));
    }

    #[test]
    fn rising_body_is_never_grounded() {
        let world = floor_world();
        let sensor = GroundSensor::new(ProbeProfile::default());
        let contact = sensor.probe(&world, Vector::new(0.0, 1.0), body(), 5.0, false, 1.0 / 60.0);
        assert!(!contact.grounded);
        assert!(contact.distance.is_infinite());
    }

    #[test]
    fn fast_fall_extends_probe_reach() {
        let world = floor_world();
        let sensor = GroundSensor::new(ProbeProfile::default());
        // Gap of 0.5 exceeds the probe thickness but not this step's fall.
        let contact = sensor.probe(&world, Vector::new(0.0, 1.5), body(), -40.0, false, 1.0 / 60.0);
        assert!(contact.grounded);
    }

    #[test]
    fn one_way_support_requires_descent_and_open_gate() {
        let world = BoxWorld::new().with_one_way(Vector::new(0.0, -0.1), Vector::new(4.0, 0.1), 7);
        let sensor = GroundSensor::new(ProbeProfile::default());
        let position = Vector::new(0.0, 1.05);

        let resting = sensor.probe(&world, position, body(), 0.0, false, 1.0 / 60.0);
        assert!(resting.grounded);
        assert!(resting.one_way);

        let gated = sensor.probe(&world, position, body(), 0.0, true, 1.0 / 60.0);
        assert!(!gated.grounded);
    }

    #[test]
    fn rising_corner_clip_shifts_sideways() {
        // Ceiling slab overhanging the body's left top corner by 0.2.
        let world = BoxWorld::new().with_solid(Vector::new(-1.3, 2.5), Vector::new(1.0, 0.5), 3);
        let corrector = CornerCorrector::new(ProbeProfile::default());
        let nudge = corrector
            .correct(
                &world,
                Vector::new(0.0, 0.5),
                body(),
                Vector::new(0.0, 12.0),
                1.0 / 8.0,
            )
            .expect("corner should be correctable");
        assert!(nudge.x > 0.19 && nudge.x < 0.25);
        assert_eq!(nudge.y, 0.0);
    }

    #[test]
    fn wide_overhang_is_not_corrected() {
        // Obstruction covering most of the body width.
        let world = BoxWorld::new().with_solid(Vector::new(-0.6, 2.5), Vector::new(1.0, 0.5), 3);
        let corrector = CornerCorrector::new(ProbeProfile::default());
        let nudge = corrector.correct(
            &world,
            Vector::new(0.0, 0.5),
            body(),
            Vector::new(0.0, 12.0),
            1.0 / 8.0,
        );
        assert!(nudge.is_none());
    }

    #[test]
    fn low_step_lifts_the_body() {
        let world = floor_world()
            // Step of height 0.3 ahead of the body.
            .with_solid(Vector::new(1.5, 0.15), Vector::new(0.4, 0.15), 9);
        let corrector = CornerCorrector::new(ProbeProfile::default());
        let nudge = corrector
            .correct(
                &world,
                Vector::new(0.0, 1.0),
                body(),
                Vector::new(8.0, 0.0),
                1.0 / 10.0,
            )
            .expect("step should be climbable");
        assert!(nudge.y > 0.29 && nudge.y < 0.35);
    }

    #[test]
    fn tall_wall_is_not_climbed() {
        let world = floor_world().with_solid(Vector::new(1.5, 1.0), Vector::new(0.4, 1.0), 9);
        let corrector = CornerCorrector::new(ProbeProfile::default());
        let nudge = corrector.correct(
            &world,
            Vector::new(0.0, 1.0),
            body(),
            Vector::new(8.0, 0.0),
            1.0 / 10.0,
        );
        assert!(nudge.is_none());
    }

    #[test]
    fn snap_closes_measured_gap() {
        let snapper = GroundSnapper::new(ProbeProfile::default());
        let contact = GroundContact {
            grounded: true,
            distance: 0.05,
            surface: Some(SurfaceId(1)),
            one_way: false,
        };
        let shift = snapper.snap(&contact, 0.0, false, false).unwrap();
        assert!((shift + 0.049).abs() < 1.0e-3);
    }

    #[test]
    fn snap_suppressed_while_jumping() {
        let snapper = GroundSnapper::new(ProbeProfile::default());
        let contact = GroundContact {
            grounded: true,
            distance: 0.05,
            surface: Some(SurfaceId(1)),
            one_way: false,
        };
        assert!(snapper.snap(&contact, 0.0, false, true).is_none());
        assert!(snapper.snap(&contact, 4.0, true, false).is_none());
    }

    #[test]
    fn crush_fires_once_per_transition() {
        let world = floor_world()
            // Ceiling pressed against the body's head.
            .with_solid(Vector::new(0.0, 2.6), Vector::new(4.0, 0.5), 11);
        let mut detector = CrushDetector::new(ProbeProfile::default());
        let contact = GroundContact {
            grounded: true,
            distance: 0.0,
            surface: Some(SurfaceId(1)),
            one_way: false,
        };
        let position = Vector::new(0.0, 1.05);

        assert!(detector.detect(&world, position, body(), &contact, true, |_| false));
        assert!(!detector.detect(&world, position, body(), &contact, true, |_| false));

        // Clearing the condition re-arms the trigger.
        let clear = GroundContact::airborne();
        assert!(!detector.detect(&world, position, body(), &clear, false, |_| false));
        assert!(detector.detect(&world, position, body(), &contact, true, |_| false));
    }

    #[test]
    fn overhead_static_ceiling_alone_is_not_a_crush() {
        let world = floor_world().with_solid(Vector::new(0.0, 2.6), Vector::new(4.0, 0.5), 11);
        let mut detector = CrushDetector::new(ProbeProfile::default());
        let contact = GroundContact {
            grounded: true,
            distance: 0.0,
            surface: Some(SurfaceId(1)),
            one_way: false,
        };
        // Not riding a platform and the ceiling is static geometry.
        assert!(!detector.detect(&world, Vector::new(0.0, 1.05), body(), &contact, false, |_| false));
    }
}
