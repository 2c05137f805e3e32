use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::bingo_engine::{
    error::{BingoError, Result},
    models::{Board, Cell, CellState, OptionEntry, FREE_CATEGORY},
    pool::OptionPool,
};

pub const DEFAULT_ROWS: usize = 5;
pub const DEFAULT_COLS: usize = 5;

/// Parameters for one board. The same request against the same pool always
/// yields the same board, unless `rng_seed` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRequest {
    pub segment_index: u32,
    pub rng_seed: Option<u64>,
    pub rows: usize,
    pub cols: usize,
}

impl BoardRequest {
    /// Seeded 5×5 request for `segment_index`.
    pub fn new(segment_index: u32, seed: u64) -> Self {
        BoardRequest {
            segment_index,
            rng_seed: Some(seed),
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }

    pub fn with_size(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }
}

/// Column-major flat index of the free cell; only odd×odd boards have one.
pub fn free_index(rows: usize, cols: usize) -> Option<usize> {
    if rows % 2 == 1 && cols % 2 == 1 {
        rows.checked_mul(cols).map(|n| n / 2)
    } else {
        None
    }
}

/// Generate a seeded board: `generate(pool, segment, seed, rows, cols)`.
pub fn generate(pool: &OptionPool, segment_index: u32, seed: u64, rows: usize, cols: usize) -> Result<Board> {
    generate_board(pool, &BoardRequest::new(segment_index, seed).with_size(rows, cols))
}

/// Draw each category group without replacement, shuffle the union, then
/// lay it out column by column around the free cell.
pub fn generate_board(pool: &OptionPool, request: &BoardRequest) -> Result<Board> {
    // Fresh generator per call; nothing carries over between boards.
    let mut rng: StdRng = match request.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_entropy(),
    };

    let (rows, cols) = (request.rows, request.cols);
    let free = free_index(rows, cols);
    // None when the grid size overflows
    let cells = rows.checked_mul(cols).map(|n| n - usize::from(free.is_some()));

    let mut drawn: Vec<&OptionEntry> = Vec::new();
    for group in pool.group_for(request.segment_index) {
        if group.entries.len() < group.required_count {
            return Err(BingoError::InsufficientPool {
                segment_index: request.segment_index,
                category: group.category.to_string(),
                required: group.required_count,
                available: group.entries.len(),
            });
        }
        debug!(
            "segment {}: drawing {} of {} from '{}'",
            request.segment_index,
            group.required_count,
            group.entries.len(),
            group.category
        );
        drawn.extend(draw(&mut rng, &group.entries, group.required_count));
    }

    shuffle(&mut rng, &mut drawn);

    let cells = match cells {
        Some(cells) if cells == drawn.len() && rows > 0 && cols > 0 => cells,
        other => {
            return Err(BingoError::BoardSizeMismatch {
                rows,
                cols,
                cells: other.unwrap_or(usize::MAX),
                drawn: drawn.len(),
            })
        }
    };

    let free_label = pool.free_label(request.segment_index);
    let mut columns = Vec::with_capacity(cols);
    for col in 0..cols {
        let mut column = Vec::with_capacity(rows);
        for row in 0..rows {
            if Some(col * rows + row) == free {
                column.push(Cell {
                    label: free_label.to_string(),
                    category: FREE_CATEGORY.to_string(),
                    is_free: true,
                    state: CellState::Inactive,
                });
                continue;
            }
            // length was checked against the cell count above
            let Some(entry) = drawn.pop() else {
                return Err(BingoError::BoardSizeMismatch { rows, cols, cells, drawn: 0 });
            };
            column.push(Cell {
                label: entry.label.clone(),
                category: entry.category.clone(),
                is_free: false,
                state: CellState::Inactive,
            });
        }
        columns.push(column);
    }

    Ok(Board {
        segment_index: request.segment_index,
        seed: request.rng_seed,
        rows,
        cols,
        columns,
    })
}

/// Pick `k` distinct items via a partial Fisher-Yates pass over a copy.
fn draw<'a, R: Rng>(rng: &mut R, entries: &[&'a OptionEntry], k: usize) -> Vec<&'a OptionEntry> {
    let mut pool = entries.to_vec();
    for i in 0..k {
        let j = rng.gen_range(i..pool.len());
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}

// Fisher-Yates shuffle
fn shuffle<T, R: Rng>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(segment_index: u32, category: &str, required_count: usize, label: &str) -> OptionEntry {
        OptionEntry {
            segment_index,
            category: category.to_string(),
            required_count,
            label: label.to_string(),
        }
    }

    /// Segment 1: 24 drawable squares out of 30 across three categories.
    fn pool() -> OptionPool {
        let mut entries = vec![entry(1, "free", 1, "Kefka laughs")];
        entries.extend((0..12).map(|i| entry(1, "boss", 10, &format!("boss {i}"))));
        entries.extend((0..10).map(|i| entry(1, "event", 8, &format!("event {i}"))));
        entries.extend((0..8).map(|i| entry(1, "item", 6, &format!("item {i}"))));
        OptionPool::new(entries).unwrap()
    }

    #[test]
    fn free_index_only_for_odd_boards() {
        assert_eq!(free_index(5, 5), Some(12));
        assert_eq!(free_index(3, 5), Some(7));
        assert_eq!(free_index(4, 5), None);
    }

    #[test]
    fn board_has_free_center_and_unique_labels() {
        let board = generate(&pool(), 1, 42, 5, 5).unwrap();
        assert_eq!(board.free_cell(), Some((2, 2)));
        assert_eq!(board.cell(2, 2).unwrap().label, "Kefka laughs");

        let labels = board.drawn_labels();
        assert_eq!(labels.len(), 24);
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 24);
    }

    #[test]
    fn category_counts_match_required() {
        let board = generate(&pool(), 1, 7, 5, 5).unwrap();
        let count = |cat: &str| board.columns.iter().flatten().filter(|c| c.category == cat).count();
        assert_eq!(count("boss"), 10);
        assert_eq!(count("event"), 8);
        assert_eq!(count("item"), 6);
    }

    #[test]
    fn same_seed_same_board() {
        let p = pool();
        assert_eq!(generate(&p, 1, 99, 5, 5).unwrap(), generate(&p, 1, 99, 5, 5).unwrap());
        assert_ne!(
            generate(&p, 1, 99, 5, 5).unwrap().columns,
            generate(&p, 1, 100, 5, 5).unwrap().columns
        );
    }

    #[test]
    fn short_group_fails_instead_of_underfilling() {
        let p = OptionPool::new(vec![entry(2, "boss", 3, "Whelk"), entry(2, "boss", 3, "Vargas")]).unwrap();
        let err = generate(&p, 2, 1, 1, 3).unwrap_err();
        assert!(matches!(
            err,
            BingoError::InsufficientPool { required: 3, available: 2, .. }
        ));
        assert!(err.is_fatal_to_segment());
    }

    #[test]
    fn count_mismatch_is_reported() {
        let err = generate(&pool(), 1, 1, 3, 3).unwrap_err();
        assert!(matches!(err, BingoError::BoardSizeMismatch { cells: 8, drawn: 24, .. }));

        let err = generate(&pool(), 9, 1, 5, 5).unwrap_err();
        assert!(matches!(err, BingoError::BoardSizeMismatch { drawn: 0, .. }));
    }

    #[test]
    fn oversized_or_empty_grids_are_rejected() {
        let p = pool();
        assert_eq!(free_index(usize::MAX, 3), None);
        assert!(matches!(
            generate(&p, 1, 0, usize::MAX, 3),
            Err(BingoError::BoardSizeMismatch { cells: usize::MAX, drawn: 24, .. })
        ));
        assert!(matches!(
            generate(&p, 1, 0, 1 << 40, 1 << 20),
            Err(BingoError::BoardSizeMismatch { drawn: 24, .. })
        ));
        let empty = OptionPool::default();
        assert!(matches!(
            generate(&empty, 1, 0, 0, usize::MAX),
            Err(BingoError::BoardSizeMismatch { rows: 0, cells: 0, drawn: 0, .. })
        ));
    }

    #[test]
    fn even_boards_draw_every_cell() {
        let entries = (0..4).map(|i| entry(3, "boss", 4, &format!("b{i}"))).collect();
        let board = generate(&OptionPool::new(entries).unwrap(), 3, 5, 2, 2).unwrap();
        assert_eq!(board.free_cell(), None);
        assert_eq!(board.drawn_labels().len(), 4);
    }

    #[test]
    fn entropy_request_still_fills_board() {
        let request = BoardRequest { rng_seed: None, ..BoardRequest::new(1, 0) };
        let board = generate_board(&pool(), &request).unwrap();
        assert_eq!(board.seed, None);
        assert_eq!(board.drawn_labels().len(), 24);
    }
}
