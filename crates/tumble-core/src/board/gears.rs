//! Gear connectivity: two-pass connected-component labeling over the grid.

use std::collections::HashMap;

use super::Board;
use crate::disjoint::DisjointSet;
use crate::part::{GearSetId, PartId};

impl Board {
    /// Rebuilds the connected gear sets from scratch.
    ///
    /// Gear-class parts that share an edge belong to the same set. Every
    /// gear-class part ends up with exactly one set; all other parts have
    /// none.
    pub(crate) fn connect_gears(&mut self) {
        let mut labels = DisjointSet::new(self.column_count * self.row_count);
        let mut next_label = 0;

        // First pass: provisional labels from the north and west neighbours.
        for row in 0..self.row_count {
            for column in 0..self.column_count {
                let id = self.grid[row][column];
                if !self.is_gear_at(id) {
                    continue;
                }
                let north = row
                    .checked_sub(1)
                    .and_then(|above| self.gear_label(column, above));
                let west = column
                    .checked_sub(1)
                    .and_then(|left| self.gear_label(left, row));
                let label = match (north, west) {
                    (None, None) => {
                        next_label += 1;
                        next_label - 1
                    }
                    (Some(label), None) | (None, Some(label)) => label,
                    (Some(north), Some(west)) => {
                        labels.union(north, west);
                        north.min(west)
                    }
                };
                if let Some(part) = self.parts.get_mut(&id) {
                    part.connection_label = label;
                }
            }
        }

        // Second pass: one set per label root.
        self.gear_sets.clear();
        let mut set_for_root: HashMap<usize, GearSetId> = HashMap::new();
        for row in 0..self.row_count {
            for column in 0..self.column_count {
                let id = self.grid[row][column];
                let Some(part) = self.parts.get_mut(&id) else {
                    continue;
                };
                if !part.is_gear_class() {
                    part.connected = None;
                    continue;
                }
                let root = labels.find(part.connection_label);
                let set = *set_for_root.entry(root).or_insert_with(|| {
                    self.gear_sets.push(Vec::new());
                    self.gear_sets.len() - 1
                });
                part.connected = Some(set);
                self.gear_sets[set].push(id);
            }
        }

        tracing::debug!(
            "[board] {} gear sets over {} labels",
            self.gear_sets.len(),
            next_label
        );
    }

    /// Gives a newly placed gear-class part the rounded mean rotation of the
    /// other members of its set, then turns the whole set to match.
    pub(super) fn initialize_gear_rotation(&mut self, id: PartId) {
        let Some(members) = self.connected_set_of(id) else {
            return;
        };
        let others: Vec<f32> = members
            .iter()
            .filter(|&&member| member != id)
            .filter_map(|member| self.parts.get(member).map(|part| part.rotation()))
            .collect();
        if others.is_empty() {
            return;
        }
        let mean = others.iter().sum::<f32>() / others.len() as f32;
        if let Some(part) = self.parts.get_mut(&id) {
            part.set_rotation(mean.round());
        }
        self.transfer_rotation(id);
    }

    fn is_gear_at(&self, id: PartId) -> bool {
        self.parts.get(&id).is_some_and(|part| part.is_gear_class())
    }

    fn gear_label(&self, column: usize, row: usize) -> Option<usize> {
        let part = self.parts.get(&self.grid[row][column])?;
        part.is_gear_class().then_some(part.connection_label)
    }
}
