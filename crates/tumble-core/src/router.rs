//! Ball router: owns the physics world and keeps live bodies only for the
//! parts around each ball.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rapier2d::prelude::*;

use crate::animator::{AnimatedProperty, Animator};
use crate::board::Board;
use crate::config::SimConfig;
use crate::part::{GearSetId, PartId};
use crate::part_body::{PartBody, PartBodyFactory};
use crate::physics::{PhysicsWorld, groups};
use crate::shapes::ShapeTable;
use crate::wireframe::Wireframe;

/// Wall layout the current walls were built for.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WallLayout {
    column_count: usize,
    row_count: usize,
    spacing: f32,
}

/// Per-ball locality cache entry.
#[derive(Debug, Clone)]
struct Neighborhood {
    column: i32,
    row: i32,
    parts: Vec<PartId>,
}

impl Neighborhood {
    /// The ball may drift up to one row above the scanned cell before its
    /// neighborhood is scanned again. Columns get no slack.
    fn covers(&self, column: i32, row: i32) -> bool {
        self.column == column && (self.row == row || self.row == row + 1)
    }
}

#[derive(Debug)]
pub struct BallRouter {
    world: PhysicsWorld,
    factory: PartBodyFactory,
    active: BTreeMap<PartId, PartBody>,
    neighborhoods: HashMap<PartId, Neighborhood>,
    last_board_counter: Option<u64>,
    walls: Vec<RigidBodyHandle>,
    wall_layout: Option<WallLayout>,
    show_wireframe: bool,
    wireframe: Wireframe,
    neighbor_scans: u64,
    settle_duration: f32,
    wall_thickness: f32,
}

impl BallRouter {
    pub fn new(config: SimConfig, shapes: ShapeTable) -> Self {
        let world = PhysicsWorld::with_gravity(Vector::new(config.gravity[0], config.gravity[1]));
        Self {
            world,
            settle_duration: config.settle_duration,
            wall_thickness: config.wall_thickness,
            factory: PartBodyFactory::new(shapes, config),
            active: BTreeMap::new(),
            neighborhoods: HashMap::new(),
            last_board_counter: None,
            walls: Vec::new(),
            wall_layout: None,
            show_wireframe: false,
            wireframe: Wireframe::default(),
            neighbor_scans: 0,
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn factory(&self) -> &PartBodyFactory {
        &self.factory
    }

    /// Number of parts with a live body.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: PartId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active_body(&self, id: PartId) -> Option<&PartBody> {
        self.active.get(&id)
    }

    /// Number of neighborhood scans performed (locality cache misses).
    pub fn neighbor_scans(&self) -> u64 {
        self.neighbor_scans
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn show_wireframe(&self) -> bool {
        self.show_wireframe
    }

    pub fn set_show_wireframe(&mut self, show: bool) {
        self.show_wireframe = show;
        if !show {
            self.wireframe.clear();
        }
    }

    pub fn wireframe(&self) -> &Wireframe {
        &self.wireframe
    }

    /// Runs one tick: activation and push, physics step, pull.
    pub fn update(&mut self, board: &mut Board, animator: &mut Animator, correction: f32) {
        self.before_update(board, animator);
        self.world.step(correction);
        self.after_update(board);
    }

    /// Rebuilds the walls if the board's size or spacing changed.
    ///
    /// Returns `true` if the walls were rebuilt.
    pub fn on_board_size_changed(&mut self, board: &Board) -> bool {
        let layout = WallLayout {
            column_count: board.column_count(),
            row_count: board.row_count(),
            spacing: board.geometry().spacing,
        };
        if self.wall_layout == Some(layout) {
            return false;
        }
        for wall in self.walls.drain(..) {
            self.world.remove_rigid_body(wall);
        }

        let spacing = layout.spacing;
        let thickness = self.wall_thickness;
        let width = layout.column_count as f32 * spacing;
        // The floor sits two rows below the grid so resting balls read as
        // fallen off the board.
        let floor = (layout.row_count + 2) as f32 * spacing;
        let half = thickness / 2.0;
        let side_height = floor + 2.0 * thickness;
        let boxes = [
            (Vector::new(-half, floor / 2.0), Vector::new(half, side_height / 2.0)),
            (Vector::new(width + half, floor / 2.0), Vector::new(half, side_height / 2.0)),
            (Vector::new(width / 2.0, -half), Vector::new(width / 2.0 + thickness, half)),
            (Vector::new(width / 2.0, floor + half), Vector::new(width / 2.0 + thickness, half)),
        ];
        for (center, extents) in boxes {
            let body = self
                .world
                .add_rigid_body(RigidBodyBuilder::fixed().translation(center).build());
            let collider = ColliderBuilder::cuboid(extents.x, extents.y)
                .collision_groups(groups::wall())
                .build();
            self.world.add_collider(collider, body);
            self.walls.push(body);
        }

        if self
            .wall_layout
            .is_some_and(|previous| previous.spacing != layout.spacing)
        {
            for body in self.active.values_mut() {
                body.invalidate();
            }
        }
        self.wall_layout = Some(layout);
        tracing::info!(
            "[router] walls rebuilt for {}x{} at spacing {}",
            layout.column_count,
            layout.row_count,
            spacing
        );
        true
    }

    /// Removes fallen balls, updates the activation window and pushes part
    /// state into the active bodies.
    pub fn before_update(&mut self, board: &mut Board, animator: &mut Animator) {
        let structural = self.last_board_counter != Some(board.change_counter());
        if structural {
            self.on_board_size_changed(board);
        }

        let row_limit = i32::try_from(board.row_count()).unwrap_or(i32::MAX);
        let balls = board.balls().to_vec();
        for ball in &balls {
            let Some((column, row)) = board.part(*ball).map(|part| part.cell()) else {
                continue;
            };
            if row > row_limit {
                tracing::debug!("[router] ball #{} fell off the board", ball);
                board.remove_ball(*ball);
                self.neighborhoods.remove(ball);
                continue;
            }
            let cached = self
                .neighborhoods
                .get(ball)
                .is_some_and(|neighborhood| neighborhood.covers(column, row));
            if !structural && cached {
                continue;
            }
            let parts = self.scan_neighborhood(board, *ball, column, row);
            self.neighborhoods
                .insert(*ball, Neighborhood { column, row, parts });
            self.neighbor_scans += 1;
        }
        self.neighborhoods
            .retain(|ball, _| board.part(*ball).is_some());

        let wanted: BTreeSet<PartId> = self
            .neighborhoods
            .values()
            .flat_map(|neighborhood| neighborhood.parts.iter().copied())
            .filter(|id| board.part(*id).is_some())
            .collect();

        let stale: Vec<PartId> = self
            .active
            .keys()
            .filter(|id| !wanted.contains(id))
            .copied()
            .collect();
        for id in stale {
            self.deactivate(board, animator, id);
        }
        for &id in &wanted {
            if !self.active.contains_key(&id) {
                self.activate(board, animator, id);
            }
        }
        self.last_board_counter = Some(board.change_counter());

        let geometry = board.geometry();
        for (id, body) in &mut self.active {
            if let Some(part) = board.part(*id) {
                body.update_body_from_part(&mut self.world, part, geometry);
            }
        }
    }

    /// Pulls simulated state back into the board.
    pub fn after_update(&mut self, board: &mut Board) {
        let geometry = board.geometry();
        // Per gear set: (deviation, driver, rotation).
        let mut drivers: HashMap<GearSetId, (f32, PartId, f32)> = HashMap::new();

        for (&id, body) in &mut self.active {
            let Some(part) = board.part(id) else {
                continue;
            };
            let Some(state) = body.read_state(&self.world, part, geometry) else {
                continue;
            };
            let traits = part.traits();
            if traits.body_can_move {
                board.layout_part(id, state.column, state.row);
            } else if let Some(set) = part.connected() {
                let deviation = (state.rotation - part.rotation()).abs();
                let entry = drivers.entry(set).or_insert((-1.0, id, state.rotation));
                if deviation > entry.0 {
                    *entry = (deviation, id, state.rotation);
                }
                continue;
            } else if traits.body_can_rotate {
                if let Some(part) = board.part_mut(id) {
                    part.set_rotation(state.rotation);
                }
                board.request_redraw();
            }
            if let Some(part) = board.part(id) {
                body.mark_synced(&mut self.world, part);
            }
        }

        // One moving gear drives its whole set; the others follow through
        // the board and get pushed next tick.
        for (_, (_, id, rotation)) in drivers {
            board.set_rotation(id, rotation);
            if let (Some(body), Some(part)) = (self.active.get_mut(&id), board.part(id)) {
                body.mark_synced(&mut self.world, part);
            }
        }

        if self.show_wireframe {
            self.wireframe.rebuild(&self.world);
        }
        if !self.active.is_empty() {
            board.request_redraw();
        }
    }

    /// Parts with a body in the 3x3 cells around a ball, plus the ball.
    fn scan_neighborhood(&self, board: &Board, ball: PartId, column: i32, row: i32) -> Vec<PartId> {
        let mut parts = vec![ball];
        for r in row - 1..=row + 1 {
            for c in column - 1..=column + 1 {
                let (Ok(c), Ok(r)) = (usize::try_from(c), usize::try_from(r)) else {
                    continue;
                };
                let Some(part) = board.get_part(c, r) else {
                    continue;
                };
                if self.factory.shapes().has_body(part.part_type()) {
                    parts.push(part.id());
                }
            }
        }
        parts
    }

    /// Gives a part a live body. No-op when it already has one.
    fn activate(&mut self, board: &Board, animator: &mut Animator, id: PartId) {
        if self.active.contains_key(&id) {
            return;
        }
        let Some(part) = board.part(id) else {
            return;
        };
        let members = board.connected_set_of(id).map(<[PartId]>::to_vec);
        for member in members.unwrap_or_else(|| vec![id]) {
            animator.stop_animating(member, AnimatedProperty::Rotation);
        }
        let mut body = self.factory.acquire(&mut self.world, part, board.geometry());
        body.add_to_world(&mut self.world);
        tracing::debug!("[router] activated {:?} #{}", part.part_type(), id);
        self.active.insert(id, body);
    }

    /// Releases a body and lets the part settle, unless it is a gear whose
    /// set still has another active member.
    fn deactivate(&mut self, board: &mut Board, animator: &mut Animator, id: PartId) {
        let Some(body) = self.active.remove(&id) else {
            return;
        };
        self.factory.release(&mut self.world, body);

        let Some(part) = board.part(id) else {
            return;
        };
        tracing::debug!("[router] deactivated {:?} #{}", part.part_type(), id);
        if !part.traits().body_can_rotate {
            return;
        }
        let set_still_driven = board
            .connected_set_of(id)
            .is_some_and(|members| members.iter().any(|member| self.active.contains_key(member)));
        if set_still_driven {
            return;
        }
        let (start, end) = (part.rotation(), part.resting_rotation());
        animator.animate(
            board,
            id,
            AnimatedProperty::Rotation,
            start,
            end,
            self.settle_duration,
        );
    }
}
