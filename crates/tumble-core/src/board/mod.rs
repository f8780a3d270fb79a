//! Board grid model: the source of truth for part placement and state.
//!
//! The board owns every part in an id-keyed arena. The grid stores ids and
//! always holds exactly one part per cell; empty cells hold a synthesized
//! location part. Balls live outside the grid at continuous positions.

mod fences;
mod gears;

use std::collections::HashMap;
use std::fmt;

use crate::animator::{AnimatedProperty, Animatable, Animator};
use crate::config::DEFAULT_SPACING;
use crate::part::{GearSetId, Part, PartId, PartType};

/// Callbacks into the external renderer.
pub trait BoardHooks {
    /// Observable part state changed.
    fn request_redraw(&mut self) {}

    /// The grid was resized or rebuilt.
    fn board_resized(&mut self, _column_count: usize, _row_count: usize) {}
}

/// Hooks that ignore every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl BoardHooks for NoopHooks {}

/// Mapping between grid coordinates and world (pixel) coordinates.
///
/// Cell centres sit at `(index + 0.5) * spacing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub spacing: f32,
}

impl Geometry {
    pub fn x_for_column(&self, column: f32) -> f32 {
        (column + 0.5) * self.spacing
    }

    pub fn y_for_row(&self, row: f32) -> f32 {
        (row + 0.5) * self.spacing
    }

    pub fn column_for_x(&self, x: f32) -> f32 {
        x / self.spacing - 0.5
    }

    pub fn row_for_y(&self, y: f32) -> f32 {
        y / self.spacing - 0.5
    }
}

/// Rectangular grid of parts plus the free balls.
pub struct Board {
    parts: HashMap<PartId, Part>,
    /// `grid[row][column]`
    grid: Vec<Vec<PartId>>,
    balls: Vec<PartId>,
    gear_sets: Vec<Vec<PartId>>,
    column_count: usize,
    row_count: usize,
    spacing: f32,
    change_counter: u64,
    next_id: PartId,
    hooks: Box<dyn BoardHooks>,
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("column_count", &self.column_count)
            .field("row_count", &self.row_count)
            .field("part_count", &self.parts.len())
            .field("ball_count", &self.balls.len())
            .field("change_counter", &self.change_counter)
            .finish_non_exhaustive()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Board {
    /// Creates a board filled with location parts.
    pub fn new(column_count: usize, row_count: usize) -> Self {
        let mut board = Self {
            parts: HashMap::new(),
            grid: Vec::new(),
            balls: Vec::new(),
            gear_sets: Vec::new(),
            column_count: 0,
            row_count: 0,
            spacing: DEFAULT_SPACING,
            change_counter: 0,
            next_id: 1,
            hooks: Box::new(NoopHooks),
        };
        board.set_size(column_count, row_count);
        board
    }

    /// Sets the distance between cell centres.
    #[must_use]
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.set_spacing(spacing);
        self
    }

    pub fn set_spacing(&mut self, spacing: f32) {
        if self.spacing == spacing {
            return;
        }
        self.spacing = spacing;
        self.bump();
        self.hooks.board_resized(self.column_count, self.row_count);
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn BoardHooks>) {
        self.hooks = hooks;
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Structural change counter (placement, removal, flip, balls, resize).
    pub fn change_counter(&self) -> u64 {
        self.change_counter
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            spacing: self.spacing,
        }
    }

    pub fn balls(&self) -> &[PartId] {
        &self.balls
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(&id)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(&id)
    }

    /// Every part owned by the board, grid and balls alike.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn part_id_at(&self, column: usize, row: usize) -> Option<PartId> {
        self.grid.get(row).and_then(|cells| cells.get(column)).copied()
    }

    pub fn get_part(&self, column: usize, row: usize) -> Option<&Part> {
        self.part_id_at(column, row).and_then(|id| self.parts.get(&id))
    }

    /// Members of a connected gear set.
    pub fn gear_set(&self, set: GearSetId) -> &[PartId] {
        self.gear_sets.get(set).map_or(&[], Vec::as_slice)
    }

    /// Members of the set a gear-class part belongs to.
    pub fn connected_set_of(&self, id: PartId) -> Option<&[PartId]> {
        let set = self.parts.get(&id)?.connected()?;
        Some(self.gear_set(set))
    }

    pub fn is_in_bounds(&self, column: i32, row: i32) -> bool {
        usize::try_from(column).is_ok_and(|c| c < self.column_count)
            && usize::try_from(row).is_ok_and(|r| r < self.row_count)
    }

    /// Whether a part of `part_type` may be placed at the given cell.
    pub fn can_place_part(&self, part_type: PartType, column: i32, row: i32) -> bool {
        if part_type == PartType::Ball {
            return self.is_in_bounds(column, row);
        }
        if !self.is_in_bounds(column, row) {
            return false;
        }
        if self
            .get_part(column as usize, row as usize)
            .is_some_and(Part::is_locked)
        {
            return false;
        }
        match part_type {
            PartType::PartLocation | PartType::GearLocation | PartType::Gear | PartType::Fence => {
                true
            }
            _ => (row + column).rem_euclid(2) == 0,
        }
    }

    /// Places `part` at a cell, releasing whatever was there.
    ///
    /// Returns `None` for balls, out-of-bounds cells, or locked targets.
    pub fn set_part(&mut self, part: Part, column: usize, row: usize) -> Option<PartId> {
        if part.part_type() == PartType::Ball {
            tracing::warn!("[board] balls are added with add_ball, not set_part");
            return None;
        }
        let old = self.get_part(column, row)?;
        if old.is_locked() {
            return None;
        }
        let old_type = old.part_type();
        let new_type = part.part_type();
        let id = self.replace_cell(part, column, row);

        if old_type.is_gear_class() || new_type.is_gear_class() {
            self.connect_gears();
            if new_type.is_gear_class() {
                self.initialize_gear_rotation(id);
            }
        }
        if old_type == PartType::Fence || new_type == PartType::Fence {
            self.update_fences();
        }
        self.bump();
        self.hooks.request_redraw();
        Some(id)
    }

    /// Replaces the part at a cell with a background location part.
    pub fn clear_part(&mut self, column: usize, row: usize) -> bool {
        let Some(old) = self.get_part(column, row) else {
            return false;
        };
        if old.is_locked() || old.part_type().is_location() {
            return false;
        }
        let background = Part::new(PartType::background_for(column, row));
        self.set_part(background, column, row).is_some()
    }

    /// Mirrors or toggles the part at a cell. Fences flip their whole run.
    pub fn flip_part(&mut self, column: usize, row: usize) -> bool {
        let Some(id) = self.part_id_at(column, row) else {
            return false;
        };
        let changed = if self.parts[&id].part_type() == PartType::Fence {
            self.flip_fence(column, row) > 0
        } else {
            let flipped = self.parts.get_mut(&id).is_some_and(Part::flip);
            if flipped {
                self.transfer_rotation(id);
            }
            flipped
        };
        if changed {
            self.bump();
            self.hooks.request_redraw();
        }
        changed
    }

    /// Sets a part's rotation, turning the rest of its gear train with it.
    pub fn set_rotation(&mut self, id: PartId, rotation: f32) {
        let Some(part) = self.parts.get_mut(&id) else {
            return;
        };
        part.set_rotation(rotation);
        self.transfer_rotation(id);
        self.hooks.request_redraw();
    }

    /// Re-derives the connected gear sets from the grid.
    pub fn rebuild_gear_connections(&mut self) {
        self.connect_gears();
        self.hooks.request_redraw();
    }

    /// Copies a gear-class part's rotation to every member of its set.
    fn transfer_rotation(&mut self, id: PartId) {
        let Some(part) = self.parts.get(&id) else {
            return;
        };
        let (Some(set), rotation) = (part.connected(), part.rotation()) else {
            return;
        };
        let Some(members) = self.gear_sets.get(set) else {
            return;
        };
        for member in members {
            if *member == id {
                continue;
            }
            if let Some(other) = self.parts.get_mut(member) {
                other.set_rotation(rotation);
            }
        }
    }

    /// Adds a free ball at a continuous position.
    pub fn add_ball(&mut self, mut ball: Part, column: f32, row: f32) -> Option<PartId> {
        if ball.part_type() != PartType::Ball {
            tracing::warn!("[board] add_ball called with {:?}", ball.part_type());
            return None;
        }
        if !self.can_place_part(PartType::Ball, column.round() as i32, row.round() as i32) {
            return None;
        }
        ball.set_position(column, row);
        let id = self.insert(ball);
        self.balls.push(id);
        self.bump();
        self.hooks.request_redraw();
        Some(id)
    }

    pub fn remove_ball(&mut self, id: PartId) -> bool {
        let Some(index) = self.balls.iter().position(|&ball| ball == id) else {
            tracing::warn!("[board] remove_ball: #{} is not a ball on this board", id);
            return false;
        };
        self.balls.remove(index);
        self.parts.remove(&id);
        self.bump();
        self.hooks.request_redraw();
        true
    }

    /// Writes a continuous position into a part.
    pub fn layout_part(&mut self, id: PartId, column: f32, row: f32) {
        if let Some(part) = self.parts.get_mut(&id) {
            part.set_position(column, row);
            self.hooks.request_redraw();
        }
    }

    pub fn request_redraw(&mut self) {
        self.hooks.request_redraw();
    }

    /// Whether a bit-like part is settled pointing right, looking through
    /// any in-flight animation.
    pub fn bit_value(&self, animator: &Animator, id: PartId) -> Option<bool> {
        animator
            .get_end_value(self, id, AnimatedProperty::Rotation)
            .map(|rotation| rotation >= 0.5)
    }

    /// Grows or shrinks the grid, rows first, then columns.
    pub fn set_size(&mut self, column_count: usize, row_count: usize) {
        if column_count == self.column_count && row_count == self.row_count {
            return;
        }

        while self.grid.len() > row_count {
            if let Some(cells) = self.grid.pop() {
                for id in cells {
                    self.release(id);
                }
            }
        }
        while self.grid.len() < row_count {
            let row = self.grid.len();
            let cells = (0..self.column_count)
                .map(|column| self.make_background(column, row))
                .collect();
            self.grid.push(cells);
        }
        self.row_count = row_count;

        for row in 0..row_count {
            while self.grid[row].len() > column_count {
                if let Some(id) = self.grid[row].pop() {
                    self.release(id);
                }
            }
            while self.grid[row].len() < column_count {
                let column = self.grid[row].len();
                let id = self.make_background(column, row);
                self.grid[row].push(id);
            }
        }
        self.column_count = column_count;

        self.connect_gears();
        self.update_fences();
        self.bump();
        tracing::info!("[board] resized to {}x{}", column_count, row_count);
        self.hooks.board_resized(column_count, row_count);
        self.hooks.request_redraw();
    }

    fn bump(&mut self) {
        self.change_counter = self.change_counter.wrapping_add(1);
    }

    fn insert(&mut self, mut part: Part) -> PartId {
        let id = self.next_id;
        self.next_id += 1;
        part.set_id(id);
        self.parts.insert(id, part);
        id
    }

    fn make_background(&mut self, column: usize, row: usize) -> PartId {
        let mut part = Part::new(PartType::background_for(column, row));
        part.set_position(column as f32, row as f32);
        self.insert(part)
    }

    fn replace_cell(&mut self, mut part: Part, column: usize, row: usize) -> PartId {
        part.set_position(column as f32, row as f32);
        let id = self.insert(part);
        let old = std::mem::replace(&mut self.grid[row][column], id);
        self.release(old);
        id
    }

    /// Drops a part from the arena. Its physics body is detached by the
    /// router on the next activation pass.
    fn release(&mut self, id: PartId) {
        if let Some(part) = self.parts.remove(&id) {
            tracing::trace!("[board] released {:?} #{}", part.part_type(), id);
        }
    }
}

impl Animatable for Board {
    fn property(&self, subject: PartId, property: AnimatedProperty) -> Option<f32> {
        let part = self.parts.get(&subject)?;
        match property {
            AnimatedProperty::Rotation => Some(part.rotation()),
        }
    }

    fn set_property(&mut self, subject: PartId, property: AnimatedProperty, value: f32) {
        match property {
            AnimatedProperty::Rotation => self.set_rotation(subject, value),
        }
    }
}
