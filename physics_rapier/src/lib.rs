//! Rapier-backed geometry world: named probe masks, static level
//! geometry and kinematic moving platforms.
#![forbid(unsafe_code)]

use std::collections::HashMap;

use character_probes::{
    GeometryQuery, PlatformMotion, PlatformSource, ProbeHit, ProbeMask, SurfaceId,
};
use moving_kinematic::{KinematicMover, MotionTrack};
use rapier2d::prelude::*;

pub const SOLID_GROUP: Group = Group::GROUP_1;
pub const ONE_WAY_GROUP: Group = Group::GROUP_2;

struct Platform {
    body: RigidBodyHandle,
    mover: KinematicMover,
    track: Box<dyn MotionTrack>,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    platforms: Vec<Platform>,
    platform_surfaces: HashMap<SurfaceId, usize>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            platforms: Vec::new(),
            platform_surfaces: HashMap::new(),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    /// Advances platforms, then the physics pipeline. Platforms publish
    /// their velocity/delta here, before any rider consumes them.
    pub fn step(&mut self, dt: Real) {
        for platform in &mut self.platforms {
            let next = platform.mover.advance(platform.track.as_mut(), dt);
            if let Some(body) = self.bodies.get_mut(platform.body) {
                body.set_next_kinematic_translation(next);
            }
        }
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    pub fn insert_solid_collider(&mut self, mut collider: Collider) -> SurfaceId {
        collider.set_collision_groups(InteractionGroups::new(SOLID_GROUP, Group::ALL));
        surface_id(self.colliders.insert(collider))
    }

    pub fn insert_one_way_platform(&mut self, mut collider: Collider) -> SurfaceId {
        collider.set_collision_groups(InteractionGroups::new(ONE_WAY_GROUP, Group::ALL));
        surface_id(self.colliders.insert(collider))
    }

    /// Registers a kinematic platform driven by `track`. `one_way` picks
    /// the collision set its surface belongs to.
    pub fn insert_moving_platform(
        &mut self,
        half_extents: Vector<Real>,
        start: Vector<Real>,
        track: Box<dyn MotionTrack>,
        one_way: bool,
    ) -> SurfaceId {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(start)
            .build();
        let body_handle = self.bodies.insert(body);
        let group = if one_way { ONE_WAY_GROUP } else { SOLID_GROUP };
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .collision_groups(InteractionGroups::new(group, Group::ALL))
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);
        let id = surface_id(collider_handle);
        self.platforms.push(Platform {
            body: body_handle,
            mover: KinematicMover::new(start),
            track,
        });
        self.platform_surfaces.insert(id, self.platforms.len() - 1);
        id
    }

    pub fn platform_position(&self, surface: SurfaceId) -> Option<Vector<Real>> {
        let index = *self.platform_surfaces.get(&surface)?;
        Some(self.platforms[index].mover.position())
    }

    fn mask_filter(&self, mask: ProbeMask) -> QueryFilter<'_> {
        let group = match mask {
            ProbeMask::SolidGround => SOLID_GROUP,
            ProbeMask::OneWayPlatform => ONE_WAY_GROUP,
            // Corner probes only care about geometry that can block a
            // rising or running body; one-way surfaces never do.
            ProbeMask::CornerCorrection => SOLID_GROUP,
        };
        QueryFilter::default().groups(InteractionGroups::new(Group::ALL, group))
    }
}

fn surface_id(handle: ColliderHandle) -> SurfaceId {
    let (index, generation) = handle.into_raw_parts();
    SurfaceId(u64::from(index) | (u64::from(generation) << 32))
}

impl GeometryQuery for PhysicsWorld {
    fn cast_box(
        &self,
        center: Vector<Real>,
        half_extents: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: ProbeMask,
    ) -> Option<ProbeHit> {
        let shape = Cuboid::new(half_extents);
        let position = Isometry::translation(center.x, center.y);
        let options = ShapeCastOptions {
            max_time_of_impact: max_distance,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };
        self.query_pipeline
            .cast_shape(
                &self.bodies,
                &self.colliders,
                &position,
                &direction,
                &shape,
                options,
                self.mask_filter(mask),
            )
            .map(|(handle, hit)| ProbeHit {
                distance: hit.time_of_impact.max(0.0),
                surface: Some(surface_id(handle)),
            })
    }

    fn cast_ray(
        &self,
        origin: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: ProbeMask,
    ) -> Option<ProbeHit> {
        let ray = Ray::new(Point::from(origin), direction);
        self.query_pipeline
            .cast_ray(
                &self.bodies,
                &self.colliders,
                &ray,
                max_distance,
                true,
                self.mask_filter(mask),
            )
            .map(|(handle, toi)| ProbeHit {
                distance: toi,
                surface: Some(surface_id(handle)),
            })
    }
}

impl PlatformSource for PhysicsWorld {
    fn platform_motion(&self, surface: SurfaceId) -> Option<PlatformMotion> {
        let index = *self.platform_surfaces.get(&surface)?;
        let mover = &self.platforms[index].mover;
        Some(PlatformMotion {
            velocity: mover.velocity(),
            delta: mover.delta(),
        })
    }
}
