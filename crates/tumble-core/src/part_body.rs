//! Physical bodies for parts and their two-way state sync.
//!
//! A [`PartBody`] couples one board part to a composite in the physics
//! world: the part's rigid body, and for rotating parts a fixed axle body
//! carrying the pivot joint, the counterweight or bias spring and the
//! rotation-stop pins.

use std::collections::HashMap;

use rapier2d::prelude::*;

use crate::board::Geometry;
use crate::config::SimConfig;
use crate::part::{Part, PartType};
use crate::physics::{PhysicsWorld, groups};
use crate::shapes::ShapeTable;

/// Rotations beyond either end that the bias spring aims for, so a settled
/// part presses into its stop instead of floating at it.
const BIAS_OVERSHOOT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpringKind {
    /// Constant pull down on the counterweight, toward rotation 0.
    Counterweight,
    /// Pull toward whichever end the part currently rests on.
    Bias,
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    handle: Option<ImpulseJointHandle>,
    kind: SpringKind,
    /// Attachment on the unmirrored body, relative to the pivot.
    offset: Vector,
    /// Resting rotation the spring was built for.
    target: f32,
}

/// Geometry captured at build time, unmirrored.
#[derive(Debug, Clone, Default)]
struct Fixtures {
    polygons: Vec<Vec<Vector>>,
    pins: Vec<(Vector, f32)>,
    restitution: f32,
    stiffness: f32,
    damping: f32,
    drop: f32,
}

/// Physics composite bound to one part.
#[derive(Debug)]
pub struct PartBody {
    part_type: PartType,
    body: Option<RigidBodyHandle>,
    axle: Option<RigidBodyHandle>,
    pivot: Option<ImpulseJointHandle>,
    spring: Option<Spring>,
    colliders: Vec<ColliderHandle>,
    fixtures: Fixtures,
    /// Pivot joint limits the fixtures were built with.
    limits: [f32; 2],
    in_world: bool,
    is_flipped: bool,
    part_change_counter: Option<u64>,
}

impl PartBody {
    pub fn new(part_type: PartType) -> Self {
        Self {
            part_type,
            body: None,
            axle: None,
            pivot: None,
            spring: None,
            colliders: Vec::new(),
            fixtures: Fixtures::default(),
            limits: [0.0, 0.0],
            in_world: false,
            is_flipped: false,
            part_change_counter: None,
        }
    }

    pub fn part_type(&self) -> PartType {
        self.part_type
    }

    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    pub fn is_built(&self) -> bool {
        self.body.is_some()
    }

    pub fn in_world(&self) -> bool {
        self.in_world
    }

    /// Binds this body to a part, forcing a full push on the next sync.
    ///
    /// # Panics
    ///
    /// Panics if the part's type differs from the type this body was
    /// created for.
    pub fn set_part(&mut self, part: &Part) {
        assert_eq!(
            part.part_type(),
            self.part_type,
            "part body for {:?} cannot bind a {:?} part",
            self.part_type,
            part.part_type()
        );
        self.part_change_counter = None;
    }

    /// Forgets the last synced counter so the next push is unconditional.
    pub fn invalidate(&mut self) {
        self.part_change_counter = None;
    }

    /// Builds the composite on first use. The new bodies start disabled.
    pub fn build(
        &mut self,
        world: &mut PhysicsWorld,
        part: &Part,
        geometry: Geometry,
        shapes: &ShapeTable,
        config: &SimConfig,
    ) {
        if self.body.is_some() {
            return;
        }
        let traits = self.part_type.traits();
        let position = Vector::new(
            geometry.x_for_column(part.column()),
            geometry.y_for_row(part.row()),
        );
        self.is_flipped = part.is_flipped();

        if self.part_type == PartType::Ball {
            let body = RigidBodyBuilder::dynamic()
                .translation(position)
                .ccd_enabled(true)
                .enabled(false)
                .build();
            let handle = world.add_rigid_body(body);
            let collider = ColliderBuilder::ball(config.ball_radius)
                .density(config.ball_density)
                .friction(config.ball_friction)
                .restitution(traits.body_restitution)
                .collision_groups(groups::ball())
                .build();
            self.colliders.push(world.add_collider(collider, handle));
            self.body = Some(handle);
            return;
        }

        let builder = if traits.body_can_move || traits.body_can_rotate {
            RigidBodyBuilder::dynamic()
                .gravity_scale(0.0)
                .angular_damping(2.0)
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = world.add_rigid_body(builder.translation(position).enabled(false).build());
        self.body = Some(body);

        let (stiffness, damping) = if traits.is_counter_weighted {
            (config.counterweight_stiffness, config.counterweight_damping)
        } else {
            (config.bias_stiffness, config.bias_damping)
        };
        self.fixtures = Fixtures {
            polygons: shapes.centered_polygons(self.part_type, config.part_size),
            pins: shapes.centered_pins(self.part_type, config.part_size),
            restitution: traits.body_restitution,
            stiffness,
            damping,
            drop: config.part_size * 0.5,
        };

        if traits.body_can_rotate {
            let axle = RigidBodyBuilder::fixed()
                .translation(position)
                .enabled(false)
                .build();
            self.axle = Some(world.add_rigid_body(axle));
            self.spring = shapes
                .centered_spring(self.part_type, config.part_size)
                .map(|offset| Spring {
                    handle: None,
                    kind: if traits.is_counter_weighted {
                        SpringKind::Counterweight
                    } else {
                        SpringKind::Bias
                    },
                    offset,
                    target: part.resting_rotation(),
                });
        }

        self.attach_fixtures(world, part);
        tracing::trace!(
            "[bodies] built {:?} with {} colliders",
            self.part_type,
            self.colliders.len()
        );
    }

    /// Adds colliders, pins and joints for the current mirror state.
    fn attach_fixtures(&mut self, world: &mut PhysicsWorld, part: &Part) {
        let Some(body) = self.body else {
            return;
        };
        let sign = if self.is_flipped { -1.0 } else { 1.0 };
        let mirror = |point: Vector| Vector::new(point.x * sign, point.y);

        for polygon in &self.fixtures.polygons {
            let points: Vec<Vector> = polygon.iter().copied().map(mirror).collect();
            let Some(builder) = ColliderBuilder::convex_hull(&points) else {
                tracing::warn!("[bodies] degenerate polygon on {:?}", self.part_type);
                continue;
            };
            let collider = builder
                .restitution(self.fixtures.restitution)
                .collision_groups(groups::part())
                .build();
            self.colliders.push(world.add_collider(collider, body));
        }

        let Some(axle) = self.axle else {
            return;
        };
        for &(center, radius) in &self.fixtures.pins {
            let collider = ColliderBuilder::ball(radius)
                .translation(mirror(center))
                .collision_groups(groups::pin())
                .build();
            self.colliders.push(world.add_collider(collider, axle));
        }

        self.limits = limits_for(part);
        let pivot = RevoluteJointBuilder::new()
            .local_anchor1(Vector::ZERO)
            .local_anchor2(Vector::ZERO)
            .limits(self.limits)
            .contacts_enabled(false)
            .build();
        self.pivot = Some(world.add_joint(axle, body, pivot));

        if self.spring.is_some() {
            self.attach_spring(world, part);
        }
    }

    fn attach_spring(&mut self, world: &mut PhysicsWorld, part: &Part) {
        let (Some(body), Some(axle), Some(spring)) = (self.body, self.axle, self.spring.as_mut())
        else {
            return;
        };
        let sign = if self.is_flipped { -1.0 } else { 1.0 };
        let offset = Vector::new(spring.offset.x * sign, spring.offset.y);
        spring.target = part.resting_rotation();

        let anchor = match spring.kind {
            SpringKind::Counterweight => {
                let rest = rotate(offset, part.angle_for_rotation(0.0));
                Vector::new(rest.x, rest.y + self.fixtures.drop)
            }
            SpringKind::Bias => {
                let aim = if spring.target >= 0.5 {
                    1.0 + BIAS_OVERSHOOT
                } else {
                    -BIAS_OVERSHOOT
                };
                rotate(offset, part.angle_for_rotation(aim))
            }
        };
        let joint = SpringJointBuilder::new(0.0, self.fixtures.stiffness, self.fixtures.damping)
            .local_anchor1(anchor)
            .local_anchor2(offset)
            .build();
        spring.handle = Some(world.add_joint(axle, body, joint));
    }

    fn detach_fixtures(&mut self, world: &mut PhysicsWorld) {
        for collider in self.colliders.drain(..) {
            world.remove_collider(collider);
        }
        if let Some(pivot) = self.pivot.take() {
            world.remove_joint(pivot);
        }
        if let Some(handle) = self.spring.as_mut().and_then(|spring| spring.handle.take()) {
            world.remove_joint(handle);
        }
    }

    /// Points the bias spring at the part's current resting side.
    fn retarget_bias(&mut self, world: &mut PhysicsWorld, part: &Part) {
        let Some(spring) = self.spring.as_mut() else {
            return;
        };
        if spring.kind != SpringKind::Bias || spring.target == part.resting_rotation() {
            return;
        }
        if let Some(handle) = spring.handle.take() {
            world.remove_joint(handle);
        }
        self.attach_spring(world, part);
    }

    /// Enables the composite. No-op when already in the world.
    pub fn add_to_world(&mut self, world: &mut PhysicsWorld) {
        if self.in_world {
            return;
        }
        self.set_enabled(world, true);
        self.in_world = true;
    }

    /// Disables the composite. No-op when not in the world.
    pub fn remove_from_world(&mut self, world: &mut PhysicsWorld) {
        if !self.in_world {
            return;
        }
        self.set_enabled(world, false);
        self.in_world = false;
    }

    fn set_enabled(&self, world: &mut PhysicsWorld, enabled: bool) {
        for handle in [self.body, self.axle].into_iter().flatten() {
            world.set_body_enabled(handle, enabled);
        }
    }

    /// Removes the composite from the world for good.
    pub fn destroy(&mut self, world: &mut PhysicsWorld) {
        for handle in [self.body.take(), self.axle.take()].into_iter().flatten() {
            world.remove_rigid_body(handle);
        }
        self.colliders.clear();
        self.pivot = None;
        self.spring = None;
        self.in_world = false;
        self.part_change_counter = None;
    }

    /// Clears residual motion so the body can serve another part.
    pub fn reset(&mut self, world: &mut PhysicsWorld) {
        self.remove_from_world(world);
        let Some(handle) = self.body else {
            return;
        };
        if let Some(body) = world.get_rigid_body_mut(handle) {
            body.set_linvel(Vector::ZERO, false);
            body.set_angvel(0.0, false);
            body.reset_forces(false);
            body.reset_torques(false);
        }
        self.part_change_counter = None;
    }

    /// Pushes the part's state into the composite if the part changed
    /// since the last sync.
    pub fn update_body_from_part(
        &mut self,
        world: &mut PhysicsWorld,
        part: &Part,
        geometry: Geometry,
    ) {
        if self.part_change_counter == Some(part.change_counter()) {
            return;
        }
        let Some(handle) = self.body else {
            return;
        };

        // Mirroring and gear parity both change the fixture layout.
        if part.is_flipped() != self.is_flipped
            || (self.axle.is_some() && limits_for(part) != self.limits)
        {
            self.detach_fixtures(world);
            self.is_flipped = part.is_flipped();
            self.attach_fixtures(world, part);
        }
        self.retarget_bias(world, part);

        let position = Vector::new(
            geometry.x_for_column(part.column()),
            geometry.y_for_row(part.row()),
        );
        if let Some(axle) = self.axle {
            if let Some(axle) = world.get_rigid_body_mut(axle) {
                axle.set_translation(position, true);
            }
        }
        if let Some(body) = world.get_rigid_body_mut(handle) {
            body.set_translation(position, true);
            body.set_linvel(Vector::ZERO, true);
            body.set_rotation(Rotation::from_angle(part.angle_for_rotation(part.rotation())), true);
            body.set_angvel(0.0, true);
        }
        self.part_change_counter = Some(part.change_counter());
    }

    /// Pulls the simulated state back into the part.
    ///
    /// Returns `true` if the part changed.
    pub fn update_part_from_body(
        &mut self,
        world: &mut PhysicsWorld,
        part: &mut Part,
        geometry: Geometry,
    ) -> bool {
        let Some(state) = self.read_state(world, part, geometry) else {
            return false;
        };
        let before = part.change_counter();
        let traits = part.traits();
        if traits.body_can_move {
            part.set_position(state.column, state.row);
        }
        if traits.body_can_rotate {
            part.set_rotation(state.rotation);
        }
        self.mark_synced(world, part);
        part.change_counter() != before
    }

    /// Simulated position and rotation in board terms, or `None` for fixed
    /// or unbuilt bodies.
    pub fn read_state(&self, world: &PhysicsWorld, part: &Part, geometry: Geometry) -> Option<BodyState> {
        let handle = self.body?;
        if world.get_rigid_body(handle)?.is_fixed() {
            return None;
        }
        let (position, angle) = world.body_pose(handle)?;
        Some(BodyState {
            column: geometry.column_for_x(position.x),
            row: geometry.row_for_y(position.y),
            rotation: part.rotation_for_angle(angle),
        })
    }

    /// Records the part's counter as synced, suppressing an immediate
    /// re-push of state that came from the body itself.
    pub fn mark_synced(&mut self, world: &mut PhysicsWorld, part: &Part) {
        self.retarget_bias(world, part);
        self.part_change_counter = Some(part.change_counter());
    }
}

/// Body state converted to grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub column: f32,
    pub row: f32,
    /// Unclamped logical rotation.
    pub rotation: f32,
}

/// Pivot limits covering the part's full rotation range.
fn limits_for(part: &Part) -> [f32; 2] {
    let rest = part.angle_for_rotation(0.0);
    let full = part.angle_for_rotation(1.0);
    [rest.min(full), rest.max(full)]
}

fn rotate(point: Vector, angle: f32) -> Vector {
    let (sin, cos) = angle.sin_cos();
    Vector::new(point.x * cos - point.y * sin, point.x * sin + point.y * cos)
}

/// Creates, builds and recycles part bodies.
#[derive(Debug)]
pub struct PartBodyFactory {
    pools: HashMap<PartType, Vec<PartBody>>,
    shapes: ShapeTable,
    config: SimConfig,
    created: usize,
}

impl PartBodyFactory {
    pub fn new(shapes: ShapeTable, config: SimConfig) -> Self {
        Self {
            pools: HashMap::new(),
            shapes,
            config,
            created: 0,
        }
    }

    pub fn shapes(&self) -> &ShapeTable {
        &self.shapes
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of bodies constructed so far.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn pooled(&self, part_type: PartType) -> usize {
        self.pools.get(&part_type).map_or(0, Vec::len)
    }

    /// Returns a built body bound to `part`, reusing a pooled one if any.
    pub fn acquire(&mut self, world: &mut PhysicsWorld, part: &Part, geometry: Geometry) -> PartBody {
        let pooled = self
            .pools
            .get_mut(&part.part_type())
            .and_then(Vec::pop);
        let mut body = pooled.unwrap_or_else(|| {
            self.created += 1;
            PartBody::new(part.part_type())
        });
        body.set_part(part);
        body.build(world, part, geometry, &self.shapes, &self.config);
        body
    }

    /// Takes a body out of the world, pooling it when reuse is enabled and
    /// destroying it otherwise.
    pub fn release(&mut self, world: &mut PhysicsWorld, mut body: PartBody) {
        if self.config.reuse_bodies {
            body.reset(world);
            self.pools.entry(body.part_type()).or_default().push(body);
        } else {
            body.destroy(world);
        }
    }

    /// Destroys every pooled body.
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for (_, pool) in self.pools.drain() {
            for mut body in pool {
                body.destroy(world);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry { spacing: 68.0 }
    }

    fn placed(part_type: PartType, column: f32, row: f32) -> Part {
        let mut part = Part::new(part_type);
        part.set_position(column, row);
        part
    }

    fn factory(reuse: bool) -> PartBodyFactory {
        PartBodyFactory::new(
            ShapeTable::default(),
            SimConfig {
                reuse_bodies: reuse,
                ..SimConfig::default()
            },
        )
    }

    #[test]
    fn test_rotation_round_trip_without_step() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(false);
        for part_type in [PartType::Ramp, PartType::Bit, PartType::Gearbit, PartType::Gear] {
            for flipped in [false, true] {
                let mut part = placed(part_type, 2.0, 3.0);
                part.set_flipped(flipped);
                part.set_rotation(0.3);
                let mut body = factory.acquire(&mut world, &part, geometry());
                body.add_to_world(&mut world);
                for _ in 0..5 {
                    body.update_body_from_part(&mut world, &part, geometry());
                    body.update_part_from_body(&mut world, &mut part, geometry());
                    assert!(
                        (part.rotation() - 0.3).abs() < 1e-4,
                        "{part_type:?} flipped={flipped} drifted to {}",
                        part.rotation()
                    );
                }
                factory.release(&mut world, body);
            }
        }
    }

    #[test]
    fn test_push_is_skipped_when_counter_unchanged() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(false);
        let part = placed(PartType::Bit, 1.0, 1.0);
        let mut body = factory.acquire(&mut world, &part, geometry());
        body.add_to_world(&mut world);
        body.update_body_from_part(&mut world, &part, geometry());

        let handle = body.body().unwrap();
        world
            .get_rigid_body_mut(handle)
            .unwrap()
            .set_translation(Vector::new(0.0, 0.0), false);
        body.update_body_from_part(&mut world, &part, geometry());
        let (position, _) = world.body_pose(handle).unwrap();
        assert_eq!(position.x, 0.0, "unchanged part must not be re-pushed");

        body.invalidate();
        body.update_body_from_part(&mut world, &part, geometry());
        let (position, _) = world.body_pose(handle).unwrap();
        assert_eq!(position.x, geometry().x_for_column(1.0));
    }

    #[test]
    fn test_fixed_parts_do_not_write_back() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(false);
        let mut part = placed(PartType::Crossover, 1.0, 1.0);
        let mut body = factory.acquire(&mut world, &part, geometry());
        body.add_to_world(&mut world);
        body.update_body_from_part(&mut world, &part, geometry());
        assert!(!body.update_part_from_body(&mut world, &mut part, geometry()));
        assert!(body.read_state(&world, &part, geometry()).is_none());
    }

    #[test]
    fn test_world_membership_is_idempotent() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(false);
        let part = placed(PartType::Ramp, 2.0, 2.0);
        let mut body = factory.acquire(&mut world, &part, geometry());
        let bodies = world.rigid_body_set.len();
        let colliders = world.collider_set.len();

        body.add_to_world(&mut world);
        body.add_to_world(&mut world);
        assert!(body.in_world());
        assert!(world.get_rigid_body(body.body().unwrap()).unwrap().is_enabled());

        body.remove_from_world(&mut world);
        body.remove_from_world(&mut world);
        assert!(!body.in_world());
        assert!(!world.get_rigid_body(body.body().unwrap()).unwrap().is_enabled());
        assert_eq!(world.rigid_body_set.len(), bodies);
        assert_eq!(world.collider_set.len(), colliders);
    }

    #[test]
    fn test_mirroring_rebuilds_colliders() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(false);
        let mut part = placed(PartType::Ramp, 2.0, 2.0);
        let mut body = factory.acquire(&mut world, &part, geometry());
        body.add_to_world(&mut world);
        body.update_body_from_part(&mut world, &part, geometry());
        let colliders = world.collider_set.len();
        let joints = world.impulse_joint_set.len();
        assert_eq!(joints, 2, "pivot and counterweight");

        part.set_flipped(true);
        body.update_body_from_part(&mut world, &part, geometry());
        assert_eq!(world.collider_set.len(), colliders);
        assert_eq!(world.impulse_joint_set.len(), joints);
        let spring = body.spring.unwrap();
        assert!(spring.handle.is_some());
    }

    #[test]
    fn test_release_destroys_without_reuse() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(false);
        let part = placed(PartType::Bit, 0.0, 0.0);
        let body = factory.acquire(&mut world, &part, geometry());
        assert!(world.rigid_body_set.len() > 0);
        factory.release(&mut world, body);
        assert_eq!(world.rigid_body_set.len(), 0);
        assert_eq!(world.collider_set.len(), 0);
        assert_eq!(factory.pooled(PartType::Bit), 0);
    }

    #[test]
    fn test_pooled_body_is_reset_before_reuse() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(true);
        let first = placed(PartType::Bit, 0.0, 0.0);
        let mut body = factory.acquire(&mut world, &first, geometry());
        body.add_to_world(&mut world);
        body.update_body_from_part(&mut world, &first, geometry());
        let handle = body.body().unwrap();
        world
            .get_rigid_body_mut(handle)
            .unwrap()
            .set_angvel(5.0, true);

        factory.release(&mut world, body);
        assert_eq!(factory.pooled(PartType::Bit), 1);
        assert!(!world.get_rigid_body(handle).unwrap().is_enabled());

        let second = placed(PartType::Bit, 3.0, 1.0);
        let mut body = factory.acquire(&mut world, &second, geometry());
        assert_eq!(factory.created(), 1);
        assert_eq!(body.body(), Some(handle));
        assert_eq!(world.get_rigid_body(handle).unwrap().angvel(), 0.0);

        body.add_to_world(&mut world);
        body.update_body_from_part(&mut world, &second, geometry());
        let (position, _) = world.body_pose(handle).unwrap();
        assert_eq!(position.x, geometry().x_for_column(3.0));
        assert_eq!(position.y, geometry().y_for_row(1.0));
    }

    #[test]
    #[should_panic(expected = "cannot bind")]
    fn test_type_mismatch_panics() {
        let mut body = PartBody::new(PartType::Ramp);
        body.set_part(&Part::new(PartType::Bit));
    }

    #[test]
    fn test_ball_falls_and_writes_back() {
        let mut world = PhysicsWorld::new();
        let mut factory = factory(false);
        let mut ball = placed(PartType::Ball, 1.0, 0.0);
        let mut body = factory.acquire(&mut world, &ball, geometry());
        body.add_to_world(&mut world);
        body.update_body_from_part(&mut world, &ball, geometry());
        for _ in 0..10 {
            world.step(1.0);
        }
        assert!(body.update_part_from_body(&mut world, &mut ball, geometry()));
        assert!(ball.row() > 0.0);
        assert!((ball.column() - 1.0).abs() < 1e-3);
    }
}
