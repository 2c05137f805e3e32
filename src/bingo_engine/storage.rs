//! CSV persistence for guess ledgers and point totals.
//!
//! Ledger files have no header. Each row is `participant,bingo,miab,deaths`,
//! an empty cell meaning no guess. The reserved row `_,segment,miab,deaths`
//! carries the session counters and is written first. Points files are
//! `participant,total`.
//!
//! Readers parse the whole file before returning, so a bad row never leaves
//! a half-applied snapshot behind.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use log::info;

use crate::bingo_engine::{
    error::{BingoError, Result},
    models::{GuessCategory, GuessValue, LedgerRow, LedgerSnapshot, PointsRecord, SessionCounters, RESERVED_KEY},
};

fn malformed(row: usize, reason: impl Into<String>) -> BingoError {
    BingoError::MalformedSnapshot { row, reason: reason.into() }
}

pub fn write_ledger<W: Write>(writer: W, snapshot: &LedgerSnapshot) -> Result<()> {
    let mut out = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    if let Some(c) = snapshot.counters {
        out.write_record([
            RESERVED_KEY.to_string(),
            c.segment.to_string(),
            c.miab.to_string(),
            c.deaths.to_string(),
        ])?;
    }
    for row in &snapshot.rows {
        let mut record = vec![row.participant.clone()];
        record.extend(GuessCategory::ALL.iter().map(|c| {
            row.guesses.get(c).map(|v| v.to_string()).unwrap_or_default()
        }));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

pub fn read_ledger<R: Read>(reader: R) -> Result<LedgerSnapshot> {
    let mut input = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut snapshot = LedgerSnapshot::default();
    for (i, record) in input.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let participant = record.get(0).unwrap_or_default();
        if participant.is_empty() {
            return Err(malformed(row, "missing participant"));
        }
        let cell = |category: GuessCategory| record.get(category.column() + 1).unwrap_or_default();

        if participant == RESERVED_KEY {
            if snapshot.counters.is_some() {
                return Err(malformed(row, "session row appears twice"));
            }
            let defaults = SessionCounters::default();
            let number = |raw: &str, default: u32, name: &str| -> Result<u32> {
                if raw.is_empty() {
                    return Ok(default);
                }
                raw.parse()
                    .map_err(|_| malformed(row, format!("session {name} '{raw}' is not a number")))
            };
            snapshot.counters = Some(SessionCounters {
                segment: number(cell(GuessCategory::Bingo), defaults.segment, "segment")?,
                miab: number(cell(GuessCategory::Miab), defaults.miab, "miab count")?,
                deaths: number(cell(GuessCategory::Deaths), defaults.deaths, "death count")?,
            });
            continue;
        }

        let mut guesses = std::collections::BTreeMap::new();
        for category in GuessCategory::ALL {
            let raw = cell(category);
            if raw.is_empty() {
                continue;
            }
            let value = GuessValue::parse(category, raw).map_err(|e| malformed(row, e.to_string()))?;
            guesses.insert(category, value);
        }
        snapshot.rows.push(LedgerRow { participant: participant.to_string(), guesses });
    }
    Ok(snapshot)
}

pub fn write_points<W: Write>(writer: W, records: &[PointsRecord]) -> Result<()> {
    let mut out = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for record in records {
        let total = record.total_points.to_string();
        out.write_record([record.participant.as_str(), total.as_str()])?;
    }
    out.flush()?;
    Ok(())
}

pub fn read_points<R: Read>(reader: R) -> Result<Vec<PointsRecord>> {
    let mut input = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, record) in input.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let participant = record.get(0).unwrap_or_default();
        if participant.is_empty() {
            return Err(malformed(row, "missing participant"));
        }
        let raw = record.get(1).unwrap_or_default();
        let total_points = raw
            .parse()
            .map_err(|_| malformed(row, format!("points '{raw}' is not a number")))?;
        records.push(PointsRecord { participant: participant.to_string(), total_points });
    }
    Ok(records)
}

/// Write via a sibling temp file and rename, so readers never see a partial file.
fn replace_file(path: &Path, write: impl FnOnce(&mut File) -> Result<()>) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    write(&mut file)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn save_ledger(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    replace_file(path, |f| write_ledger(f, snapshot))?;
    info!("saved {} ledger rows to {}", snapshot.rows.len(), path.display());
    Ok(())
}

pub fn load_ledger(path: &Path) -> Result<LedgerSnapshot> {
    read_ledger(File::open(path)?)
}

pub fn save_points(path: &Path, records: &[PointsRecord]) -> Result<()> {
    replace_file(path, |f| write_points(f, records))?;
    info!("saved {} point totals to {}", records.len(), path.display());
    Ok(())
}

pub fn load_points(path: &Path) -> Result<Vec<PointsRecord>> {
    read_points(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_file_layout() {
        let snapshot = LedgerSnapshot {
            counters: Some(SessionCounters { segment: 2, miab: 5, deaths: 1 }),
            rows: vec![
                LedgerRow {
                    participant: "terra".into(),
                    guesses: [(GuessCategory::Bingo, GuessValue::Line("r3".into()))].into_iter().collect(),
                },
                LedgerRow {
                    participant: "locke".into(),
                    guesses: [(GuessCategory::Deaths, GuessValue::Count(4))].into_iter().collect(),
                },
            ],
        };
        let mut buf = Vec::new();
        write_ledger(&mut buf, &snapshot).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "_,2,5,1\nterra,r3,,\nlocke,,,4\n");
        assert_eq!(read_ledger(text.as_bytes()).unwrap(), snapshot);
    }

    #[test]
    fn short_rows_mean_no_guess() {
        let snap = read_ledger("mog,c2\n".as_bytes()).unwrap();
        assert_eq!(snap.counters, None);
        assert_eq!(snap.rows[0].guesses.len(), 1);
    }

    #[test]
    fn non_numeric_session_row_is_rejected() {
        let err = read_ledger("_,two,0,0\nterra,r1,,\n".as_bytes()).unwrap_err();
        assert!(matches!(err, BingoError::MalformedSnapshot { row: 1, .. }));
    }

    #[test]
    fn bad_guess_cell_is_rejected() {
        let err = read_ledger("terra,r1,many,\n".as_bytes()).unwrap_err();
        assert!(matches!(err, BingoError::MalformedSnapshot { row: 1, .. }), "{err}");
    }

    #[test]
    fn points_round_trip_and_reject_text() {
        let records = vec![
            PointsRecord { participant: "terra".into(), total_points: 3 },
            PointsRecord { participant: "gau, the wild".into(), total_points: 1 },
        ];
        let mut buf = Vec::new();
        write_points(&mut buf, &records).unwrap();
        assert_eq!(read_points(buf.as_slice()).unwrap(), records);
        assert!(read_points("terra,lots\n".as_bytes()).is_err());
    }

    #[test]
    fn files_are_replaced_whole() {
        let dir = std::env::temp_dir().join(format!("bc_bingo_storage_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("points.csv");
        save_points(&path, &[PointsRecord { participant: "a".into(), total_points: 1 }]).unwrap();
        save_points(&path, &[PointsRecord { participant: "b".into(), total_points: 2 }]).unwrap();
        let loaded = load_points(&path).unwrap();
        assert_eq!(loaded, vec![PointsRecord { participant: "b".into(), total_points: 2 }]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
