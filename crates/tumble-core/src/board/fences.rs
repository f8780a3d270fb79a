//! Fence layout: horizontal runs of same-direction fences become slopes.

use super::Board;
use crate::part::{FenceVariant, PartId, PartType};

impl Board {
    /// Reclassifies every fence on the board as a side or a slope segment.
    pub(crate) fn update_fences(&mut self) {
        let mut run: Vec<PartId> = Vec::new();
        let mut run_flipped = false;
        for row in 0..self.row_count {
            for column in 0..self.column_count {
                let id = self.grid[row][column];
                let fence = self
                    .parts
                    .get(&id)
                    .filter(|part| part.part_type() == PartType::Fence)
                    .map(|part| part.is_flipped());
                match fence {
                    Some(flipped) => {
                        if !run.is_empty() && flipped != run_flipped {
                            self.make_slope(&run);
                            run.clear();
                        }
                        run_flipped = flipped;
                        run.push(id);
                    }
                    None if !run.is_empty() => {
                        self.make_slope(&run);
                        run.clear();
                    }
                    None => {}
                }
            }
            // Runs never wrap onto the next row.
            if !run.is_empty() {
                self.make_slope(&run);
                run.clear();
            }
        }
    }

    /// Lays out one run. An unflipped run descends to the right, so its
    /// high end is the first element; a flipped run's is the last.
    fn make_slope(&mut self, run: &[PartId]) {
        let Some(&first) = run.first() else {
            return;
        };
        let flipped = self.parts.get(&first).is_some_and(|part| part.is_flipped());

        let mut slope = run;
        if run.len() > 1 {
            let high = if flipped { run[run.len() - 1] } else { run[0] };
            if self.fence_above(high, flipped) {
                self.set_fence_layout(high, FenceVariant::Side, 1, 0);
                slope = if flipped {
                    &run[..run.len() - 1]
                } else {
                    &run[1..]
                };
            }
        }

        if slope.len() == 1 {
            self.set_fence_layout(slope[0], FenceVariant::Side, 1, 0);
            return;
        }
        let modulus = slope.len();
        for (index, &id) in slope.iter().enumerate() {
            let sequence = if flipped { modulus - 1 - index } else { index };
            self.set_fence_layout(id, FenceVariant::Slope, modulus, sequence);
        }
    }

    /// Whether the cell directly above holds a fence facing the same way.
    fn fence_above(&self, id: PartId, flipped: bool) -> bool {
        let Some(part) = self.parts.get(&id) else {
            return false;
        };
        let (column, row) = part.cell();
        if row <= 0 {
            return false;
        }
        #[allow(clippy::cast_sign_loss)]
        let above = self.get_part(column as usize, (row - 1) as usize);
        above.is_some_and(|part| part.part_type() == PartType::Fence && part.is_flipped() == flipped)
    }

    fn set_fence_layout(&mut self, id: PartId, variant: FenceVariant, modulus: usize, sequence: usize) {
        if let Some(part) = self.parts.get_mut(&id) {
            part.variant = variant;
            part.modulus = modulus;
            part.sequence = sequence;
        }
    }

    /// Flips the fence at a cell together with the structure it belongs to:
    /// a slope flips its horizontal run, a side flips its vertical column.
    ///
    /// Returns the number of fences flipped.
    pub(crate) fn flip_fence(&mut self, column: usize, row: usize) -> usize {
        let Some(origin) = self.get_part(column, row) else {
            return 0;
        };
        if origin.part_type() != PartType::Fence {
            return 0;
        }
        let flipped = origin.is_flipped();
        let variant = origin.variant();

        let same_structure = |board: &Board, c: usize, r: usize| {
            board.get_part(c, r).is_some_and(|part| {
                part.part_type() == PartType::Fence
                    && part.is_flipped() == flipped
                    && part.variant() == variant
            })
        };

        let mut cells = vec![(column, row)];
        if variant == FenceVariant::Slope {
            let mut left = column;
            while left > 0 && same_structure(self, left - 1, row) {
                left -= 1;
                cells.push((left, row));
            }
            let mut right = column + 1;
            while same_structure(self, right, row) {
                cells.push((right, row));
                right += 1;
            }
        } else {
            let mut up = row;
            while up > 0 && same_structure(self, column, up - 1) {
                up -= 1;
                cells.push((column, up));
            }
            let mut down = row + 1;
            while same_structure(self, column, down) {
                cells.push((column, down));
                down += 1;
            }
        }

        for &(c, r) in &cells {
            if let Some(id) = self.part_id_at(c, r) {
                if let Some(part) = self.parts.get_mut(&id) {
                    part.set_flipped(!flipped);
                }
            }
        }
        self.update_fences();
        cells.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::board::Board;
    use crate::part::{FenceVariant, Part, PartType};

    fn fence(flipped: bool) -> Part {
        let mut part = Part::new(PartType::Fence);
        part.set_flipped(flipped);
        part
    }

    fn layout(board: &Board, column: usize, row: usize) -> (FenceVariant, usize, usize) {
        let part = board.get_part(column, row).unwrap();
        (part.variant(), part.modulus(), part.sequence())
    }

    #[test]
    fn test_run_is_a_permutation() {
        for flipped in [false, true] {
            for len in 2..7 {
                let mut board = Board::new(8, 2);
                for column in 0..len {
                    board.set_part(fence(flipped), column, 1);
                }
                let mut sequences: Vec<usize> = (0..len)
                    .map(|column| {
                        let (variant, modulus, sequence) = layout(&board, column, 1);
                        assert_eq!(variant, FenceVariant::Slope);
                        assert_eq!(modulus, len);
                        sequence
                    })
                    .collect();
                if flipped {
                    assert_eq!(sequences[0], len - 1);
                } else {
                    assert_eq!(sequences[0], 0);
                }
                sequences.sort_unstable();
                assert_eq!(sequences, (0..len).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_single_fence_is_side() {
        let mut board = Board::new(4, 2);
        board.set_part(fence(false), 2, 0);
        assert_eq!(layout(&board, 2, 0), (FenceVariant::Side, 1, 0));
    }

    #[test]
    fn test_direction_change_splits_run() {
        let mut board = Board::new(6, 1);
        for column in 0..3 {
            board.set_part(fence(false), column, 0);
        }
        for column in 3..5 {
            board.set_part(fence(true), column, 0);
        }
        assert_eq!(layout(&board, 0, 0), (FenceVariant::Slope, 3, 0));
        assert_eq!(layout(&board, 2, 0), (FenceVariant::Slope, 3, 2));
        assert_eq!(layout(&board, 3, 0), (FenceVariant::Slope, 2, 1));
        assert_eq!(layout(&board, 4, 0), (FenceVariant::Slope, 2, 0));
    }

    #[test]
    fn test_runs_stop_at_row_end() {
        let mut board = Board::new(3, 2);
        board.set_part(fence(false), 2, 0);
        board.set_part(fence(false), 0, 1);
        assert_eq!(layout(&board, 2, 0), (FenceVariant::Side, 1, 0));
        assert_eq!(layout(&board, 0, 1), (FenceVariant::Side, 1, 0));
    }

    #[test]
    fn test_fence_above_high_end_becomes_side() {
        let mut board = Board::new(5, 2);
        board.set_part(fence(false), 0, 0);
        for column in 0..4 {
            board.set_part(fence(false), column, 1);
        }
        assert_eq!(layout(&board, 0, 1), (FenceVariant::Side, 1, 0));
        assert_eq!(layout(&board, 1, 1), (FenceVariant::Slope, 3, 0));
        assert_eq!(layout(&board, 3, 1), (FenceVariant::Slope, 3, 2));

        // A flipped run checks its last element instead.
        let mut board = Board::new(5, 2);
        board.set_part(fence(true), 3, 0);
        for column in 0..4 {
            board.set_part(fence(true), column, 1);
        }
        assert_eq!(layout(&board, 3, 1), (FenceVariant::Side, 1, 0));
        assert_eq!(layout(&board, 0, 1), (FenceVariant::Slope, 3, 2));
        assert_eq!(layout(&board, 2, 1), (FenceVariant::Slope, 3, 0));
    }

    #[test]
    fn test_flip_slope_flips_whole_run() {
        let mut board = Board::new(5, 1);
        for column in 0..4 {
            board.set_part(fence(false), column, 0);
        }
        assert!(board.flip_part(1, 0));
        for column in 0..4 {
            assert!(board.get_part(column, 0).unwrap().is_flipped());
        }
        assert_eq!(layout(&board, 0, 0), (FenceVariant::Slope, 4, 3));
    }

    #[test]
    fn test_flip_side_flips_column() {
        let mut board = Board::new(3, 3);
        for row in 0..3 {
            board.set_part(fence(false), 1, row);
        }
        assert!(board.flip_part(1, 1));
        for row in 0..3 {
            let part = board.get_part(1, row).unwrap();
            assert!(part.is_flipped());
            assert_eq!(part.variant(), FenceVariant::Side);
        }
    }

    #[test]
    fn test_flipping_side_leaves_slope_below_alone() {
        let mut board = Board::new(5, 3);
        board.set_part(fence(false), 2, 0);
        for column in 1..4 {
            board.set_part(fence(false), column, 1);
        }
        assert_eq!(layout(&board, 2, 0).0, FenceVariant::Side);
        for column in 1..4 {
            assert_eq!(layout(&board, column, 1), (FenceVariant::Slope, 3, column - 1));
        }

        assert!(board.flip_part(2, 0));
        assert!(board.get_part(2, 0).unwrap().is_flipped());
        assert_eq!(layout(&board, 2, 0).0, FenceVariant::Side);
        for column in 1..4 {
            assert!(!board.get_part(column, 1).unwrap().is_flipped());
            assert_eq!(layout(&board, column, 1), (FenceVariant::Slope, 3, column - 1));
        }
    }
}
