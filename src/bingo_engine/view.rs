use serde_json::{json, Value};

use crate::bingo_engine::{
    models::{Board, Cell},
    session::BingoSession,
};

/// One square as the board page expects it.
fn cell_json(row: usize, cell: &Cell) -> Value {
    json!({
        "row": row,
        "label": cell.label,
        "category": cell.category,
        "free": cell.is_free,
        "state": cell.state.to_string(),
    })
}

/// Map a [`Board`] to the column-major JSON the board page renders.
pub fn board_view(board: &Board) -> Value {
    let columns: Vec<Value> = board
        .columns
        .iter()
        .enumerate()
        .map(|(col, cells)| {
            json!({
                "col": col,
                "cells": cells.iter().enumerate().map(|(row, c)| cell_json(row, c)).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "segment": board.segment_index,
        "seed": board.seed,
        "rows": board.rows,
        "cols": board.cols,
        "columns": columns,
    })
}

/// Everything an overlay or chat adapter shows about a session, read-only.
pub fn session_view(session: &BingoSession) -> Value {
    let counters = session.counters();
    json!({
        "segment": counters.segment,
        "phase": session.phase().to_string(),
        "counters": { "miab": counters.miab, "deaths": counters.deaths },
        "window_remaining": session.window_remaining(),
        "participants": session.ledger().participant_count(),
        "board": session.current_board().map(|b| board_view(&b)),
        "points": session.points_snapshot(),
        "rules": session.config().doc_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bingo_engine::{
        config::SessionConfig,
        models::OptionEntry,
        pool::OptionPool,
    };

    fn session() -> BingoSession {
        let entries = (0..8)
            .map(|i| OptionEntry {
                segment_index: 1,
                category: "boss".to_string(),
                required_count: 8,
                label: format!("boss {i}"),
            })
            .collect();
        let config = SessionConfig { rows: 3, cols: 3, ..SessionConfig::default() };
        BingoSession::new(config, OptionPool::new(entries).unwrap()).unwrap()
    }

    #[test]
    fn board_view_is_column_major_with_free_center() {
        let s = session();
        let board = s.start_segment(4).unwrap();
        let v = board_view(&board);
        assert_eq!(v["columns"].as_array().unwrap().len(), 3);
        let center = &v["columns"][1]["cells"][1];
        assert_eq!(center["free"], true);
        assert_eq!(center["label"], "FREE");
        assert_eq!(v["columns"][0]["cells"][0]["state"], "inactive");
    }

    #[test]
    fn session_view_reports_phase_and_counters() {
        let s = session();
        let v = session_view(&s);
        assert_eq!(v["phase"], "closed");
        assert!(v["board"].is_null());

        s.start_segment(1).unwrap();
        let v = session_view(&s);
        assert_eq!(v["phase"], "open");
        assert_eq!(v["counters"]["miab"], 0);
        assert_eq!(v["board"]["rows"], 3);
    }
}
