//! Physics world wrapper around `Rapier2D` with deterministic behavior.
//!
//! World coordinates are pixels with +y pointing down, so a positive angle
//! turns a body clockwise on screen.

use rapier2d::prelude::*;
use std::fmt;

/// Fixed timestep for one physics step at the nominal tick rate (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Default gravity vector (downward, in pixels/s²).
pub fn default_gravity() -> Vector {
    Vector::new(0.0, 981.0)
}

/// Collision group memberships.
///
/// Balls hit parts, walls and other balls. Parts hit balls and their own
/// rotation-stop pins. Pins only hit parts. Walls only hit balls.
pub mod groups {
    use rapier2d::prelude::{Group, InteractionGroups};

    pub const BALL: Group = Group::GROUP_1;
    pub const PART: Group = Group::GROUP_2;
    pub const PIN: Group = Group::GROUP_3;
    pub const WALL: Group = Group::GROUP_4;

    pub fn ball() -> InteractionGroups {
        InteractionGroups::all()
            .with_memberships(BALL)
            .with_filter(BALL.union(PART).union(WALL))
    }

    pub fn part() -> InteractionGroups {
        InteractionGroups::all()
            .with_memberships(PART)
            .with_filter(BALL.union(PIN))
    }

    pub fn pin() -> InteractionGroups {
        InteractionGroups::all().with_memberships(PIN).with_filter(PART)
    }

    pub fn wall() -> InteractionGroups {
        InteractionGroups::all().with_memberships(WALL).with_filter(BALL)
    }
}

/// Physics world containing all `Rapier2D` components.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector,
    pub frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("joint_count", &self.impulse_joint_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default settings.
    pub fn new() -> Self {
        Self::with_gravity(default_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: Vector) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            frame: 0,
        }
    }

    /// Advances the simulation by one timestep scaled by `correction`.
    ///
    /// `correction` is the ratio of real elapsed time to the nominal frame
    /// time; `1.0` advances exactly [`PHYSICS_DT`].
    pub fn step(&mut self, correction: f32) {
        self.integration_parameters.dt = PHYSICS_DT * correction;
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.frame += 1;
    }

    /// Adds a rigid body to the world and returns its handle.
    pub fn add_rigid_body(&mut self, rigid_body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(rigid_body)
    }

    /// Adds a collider attached to a rigid body.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Removes a single collider, leaving its parent body in place.
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );
    }

    /// Removes a rigid body and its attached colliders and joints.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Connects two bodies with an impulse joint.
    pub fn add_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joint_set.insert(body1, body2, joint, true)
    }

    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) {
        self.impulse_joint_set.remove(handle, true);
    }

    /// Enables or disables a body together with its colliders. Disabled
    /// bodies keep their handles but take no part in the simulation.
    pub fn set_body_enabled(&mut self, handle: RigidBodyHandle, enabled: bool) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            if body.is_enabled() != enabled {
                body.set_enabled(enabled);
            }
        }
    }

    /// Gets an immutable reference to a rigid body.
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Gets a mutable reference to a rigid body.
    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Position and angle of a body.
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<(Vector, f32)> {
        self.rigid_body_set
            .get(handle)
            .map(|body| {
                let position = body.translation();
                (Vector::new(position.x, position.y), body.rotation().angle())
            })
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling_ball(world: &mut PhysicsWorld) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(100.0, 100.0))
            .build();
        let handle = world.add_rigid_body(body);
        world.add_collider(ColliderBuilder::ball(10.0).restitution(0.2).build(), handle);
        handle
    }

    #[test]
    fn test_physics_world_creation() {
        let world = PhysicsWorld::new();
        assert_eq!(world.frame, 0);
        assert_eq!(world.integration_parameters.dt, PHYSICS_DT);
    }

    #[test]
    fn test_deterministic_simulation() {
        let mut world1 = PhysicsWorld::new();
        let mut world2 = PhysicsWorld::new();
        let handle1 = falling_ball(&mut world1);
        let handle2 = falling_ball(&mut world2);

        for _ in 0..100 {
            world1.step(1.0);
            world2.step(1.0);
        }

        let (pos1, _) = world1.body_pose(handle1).unwrap();
        let (pos2, _) = world2.body_pose(handle2).unwrap();
        assert_eq!(pos1.x, pos2.x);
        assert_eq!(pos1.y, pos2.y);
        assert!(pos1.y > 100.0, "gravity pulls toward +y");
    }

    #[test]
    fn test_correction_scales_timestep() {
        let mut world = PhysicsWorld::new();
        world.step(0.5);
        assert_eq!(world.integration_parameters.dt, PHYSICS_DT * 0.5);
        assert_eq!(world.current_frame(), 1);
    }

    #[test]
    fn test_disabled_body_does_not_move() {
        let mut world = PhysicsWorld::new();
        let handle = falling_ball(&mut world);
        world.set_body_enabled(handle, false);
        for _ in 0..30 {
            world.step(1.0);
        }
        let (pos, _) = world.body_pose(handle).unwrap();
        assert_eq!(pos.y, 100.0);

        world.set_body_enabled(handle, true);
        for _ in 0..30 {
            world.step(1.0);
        }
        let (pos, _) = world.body_pose(handle).unwrap();
        assert!(pos.y > 100.0);
    }

    #[test]
    fn test_add_and_remove_body() {
        let mut world = PhysicsWorld::new();
        let handle = falling_ball(&mut world);
        assert!(world.get_rigid_body(handle).is_some());
        assert_eq!(world.collider_set.len(), 1);

        world.remove_rigid_body(handle);
        assert!(world.get_rigid_body(handle).is_none());
        assert_eq!(world.collider_set.len(), 0);
    }
}
