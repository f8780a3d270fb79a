//! Debug outline of every live collider, in world pixels.

use rapier2d::prelude::*;

use crate::physics::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: [f32; 2],
    pub radius: f32,
}

/// Line segments and circles ready for an overlay renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wireframe {
    pub segments: Vec<[[f32; 2]; 2]>,
    pub circles: Vec<Circle>,
}

impl Wireframe {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.circles.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.circles.clear();
    }

    /// Replaces the outline with the enabled colliders of `world`.
    pub fn rebuild(&mut self, world: &PhysicsWorld) {
        self.clear();
        for (_, collider) in world.collider_set.iter() {
            let body_enabled = collider
                .parent()
                .and_then(|parent| world.get_rigid_body(parent))
                .is_none_or(RigidBody::is_enabled);
            if !collider.is_enabled() || !body_enabled {
                continue;
            }
            self.add_collider(collider);
        }
    }

    fn add_collider(&mut self, collider: &Collider) {
        let translation = collider.translation();
        let origin = [translation.x, translation.y];
        let (sin, cos) = collider.rotation().angle().sin_cos();
        let place = |x: f32, y: f32| [origin[0] + x * cos - y * sin, origin[1] + x * sin + y * cos];

        let shape = collider.shape();
        if let Some(ball) = shape.as_ball() {
            self.circles.push(Circle {
                center: origin,
                radius: ball.radius,
            });
        } else if let Some(polygon) = shape.as_convex_polygon() {
            let points: Vec<[f32; 2]> = polygon
                .points()
                .iter()
                .map(|point| place(point.x, point.y))
                .collect();
            self.push_loop(&points);
        } else if let Some(cuboid) = shape.as_cuboid() {
            let (hx, hy) = (cuboid.half_extents.x, cuboid.half_extents.y);
            let corners = [place(-hx, -hy), place(hx, -hy), place(hx, hy), place(-hx, hy)];
            self.push_loop(&corners);
        }
    }

    fn push_loop(&mut self, points: &[[f32; 2]]) {
        for (index, &start) in points.iter().enumerate() {
            let end = points[(index + 1) % points.len()];
            self.segments.push([start, end]);
        }
    }
}
