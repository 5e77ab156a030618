//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Grid iterators

use crate::grid::TileGrid;

/// Row-by-row iterator over the cells of a tile grid
pub struct GridIterator {
    col: u32,
    row: u32,
    grid: TileGrid,
    finished: bool,
}

impl GridIterator {
    pub fn new(grid: &TileGrid) -> GridIterator {
        GridIterator {
            col: grid.min_col,
            row: grid.min_row,
            grid: grid.clone(),
            finished: grid.min_col > grid.max_col || grid.min_row > grid.max_row,
        }
    }
}

impl Iterator for GridIterator {
    /// Current cell index `(column, row)`
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let current = (self.col, self.row);
        if self.col < self.grid.max_col {
            self.col += 1;
        } else if self.row < self.grid.max_row {
            self.row += 1;
            self.col = self.grid.min_col;
        } else {
            self.finished = true;
        }
        Some(current)
    }
}

#[test]
fn test_grid_iter() {
    let grid = TileGrid::new(0, 0, 1, 1);
    let cells = grid.iter().collect::<Vec<_>>();
    assert_eq!(cells, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);

    let grid = TileGrid::new(2, 5, 4, 5);
    let cells = GridIterator::new(&grid).collect::<Vec<_>>();
    assert_eq!(cells, vec![(2, 5), (3, 5), (4, 5)]);

    let grid = TileGrid::new(7, 3, 7, 3);
    let cells = grid.iter().collect::<Vec<_>>();
    assert_eq!(cells, vec![(7, 3)]);
}

#[test]
fn test_iter_count() {
    let grid = TileGrid::new(3, 1, 10, 4);
    assert_eq!(grid.iter().count() as u64, grid.count());
    assert_eq!(grid.count(), 32);
}

#[test]
fn test_bad_params() {
    // inverted bounds built without the constructor
    let grid = TileGrid {
        min_col: 3,
        min_row: 0,
        max_col: 2,
        max_row: 0,
    };
    let cells = GridIterator::new(&grid).collect::<Vec<_>>();
    assert_eq!(cells, vec![]);
}
