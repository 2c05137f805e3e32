//! Option pool: the catalog of candidate squares, indexed by segment and category.
//!
//! A pool is validated once when it is built and is read-only afterwards, so
//! [`OptionPool::group_for`] cannot fail. Validation rejects:
//!
//! - rows without a segment index, category or square label
//! - a `choices` value that is non-numeric or zero
//! - two rows of the same `(segment, category)` disagreeing on `choices`
//! - the same label appearing twice in one segment (draws must stay unique)

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::bingo_engine::{
    error::{BingoError, Result},
    models::{OptionEntry, DEFAULT_FREE_LABEL, FREE_CATEGORY},
};

/// Raw pool row as it appears in a segment CSV. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct PoolRow {
    #[serde(default)]
    segment_index: Option<String>,
    #[serde(default, rename = "type")]
    category: Option<String>,
    #[serde(default)]
    choices: Option<String>,
    #[serde(default)]
    square: Option<String>,
}

/// All entries of one category in one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGroup<'a> {
    pub category: &'a str,
    pub required_count: usize,
    pub entries: Vec<&'a OptionEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct OptionPool {
    entries: Vec<OptionEntry>,
}

impl OptionPool {
    /// Build a pool from already-typed entries.
    pub fn new(entries: Vec<OptionEntry>) -> Result<Self> {
        validate(&entries)?;
        Ok(OptionPool { entries })
    }

    /// Load a pool from CSV with a header row (`segment_index,type,choices,square`).
    pub fn load<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut entries = Vec::new();
        for (i, row) in reader.deserialize::<PoolRow>().enumerate() {
            // header is line 1
            let line = i + 2;
            entries.push(entry_from_row(row?, line)?);
        }
        debug!("loaded {} pool entries", entries.len());
        Self::new(entries)
    }

    pub fn load_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(File::open(path)?)
    }

    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct segment indices present in the pool, ascending.
    pub fn segments(&self) -> Vec<u32> {
        self.entries
            .iter()
            .map(|e| e.segment_index)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Drawable groups for a segment, ordered by category name.
    /// Free entries are never part of a group.
    pub fn group_for(&self, segment_index: u32) -> Vec<OptionGroup<'_>> {
        let mut groups: BTreeMap<&str, OptionGroup<'_>> = BTreeMap::new();
        for entry in self.segment_entries(segment_index).filter(|e| !e.is_free()) {
            groups
                .entry(entry.category.as_str())
                .or_insert_with(|| OptionGroup {
                    category: entry.category.as_str(),
                    required_count: entry.required_count,
                    entries: Vec::new(),
                })
                .entries
                .push(entry);
        }
        groups.into_values().collect()
    }

    /// Label for the segment's free cell: the first `free` entry, else `FREE`.
    pub fn free_label(&self, segment_index: u32) -> &str {
        self.segment_entries(segment_index)
            .find(|e| e.is_free())
            .map(|e| e.label.as_str())
            .unwrap_or(DEFAULT_FREE_LABEL)
    }

    fn segment_entries(&self, segment_index: u32) -> impl Iterator<Item = &OptionEntry> {
        self.entries.iter().filter(move |e| e.segment_index == segment_index)
    }
}

fn malformed(row: usize, reason: impl Into<String>) -> BingoError {
    BingoError::MalformedPool { row, reason: reason.into() }
}

fn required(field: Option<String>, name: &str, row: usize) -> Result<String> {
    match field {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(malformed(row, format!("missing {name}"))),
    }
}

fn entry_from_row(row: PoolRow, line: usize) -> Result<OptionEntry> {
    let segment = required(row.segment_index, "segment_index", line)?;
    let segment_index = segment
        .parse::<u32>()
        .map_err(|_| malformed(line, format!("segment_index '{segment}' is not a number")))?;
    let category = required(row.category, "type", line)?;
    let required_count = match row.choices.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| malformed(line, format!("choices '{raw}' is not a number")))?,
    };
    let label = required(row.square, "square", line)?;
    Ok(OptionEntry { segment_index, category, required_count, label })
}

fn validate(entries: &[OptionEntry]) -> Result<()> {
    let mut counts: HashMap<(u32, &str), usize> = HashMap::new();
    let mut labels: HashSet<(u32, &str)> = HashSet::new();

    for (i, entry) in entries.iter().enumerate() {
        let row = i + 1;
        if entry.category.trim().is_empty() {
            return Err(malformed(row, "missing type"));
        }
        if entry.label.trim().is_empty() {
            return Err(malformed(row, "missing square"));
        }
        if entry.required_count == 0 {
            return Err(malformed(row, "choices must be at least 1"));
        }
        if entry.is_free() {
            continue;
        }
        let key = (entry.segment_index, entry.category.as_str());
        if let Some(&count) = counts.get(&key) {
            if count != entry.required_count {
                return Err(malformed(
                    row,
                    format!(
                        "category '{}' in segment {} declares choices {} after {}",
                        entry.category, entry.segment_index, entry.required_count, count
                    ),
                ));
            }
        } else {
            counts.insert(key, entry.required_count);
        }
        if !labels.insert((entry.segment_index, entry.label.as_str())) {
            return Err(malformed(
                row,
                format!("square '{}' repeated in segment {}", entry.label, entry.segment_index),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Plain-text segment sheets
// ---------------------------------------------------------------------------

/// Convert a plain-text segment sheet into pool entries.
///
/// ```text
/// Segment 2
///
/// Free:
/// -----
/// Kefka laughs
///
/// Bosses: (choose 3)
/// -----
/// Whelk
/// Vargas
/// ```
///
/// Every header (`Free:` or `Type: (choose N)`) is followed by one separator
/// line, blank or not, that is skipped. Squares run until the next blank line.
/// A header without a `(... N)` suffix selects one square.
pub fn parse_listing(text: &str) -> Result<Vec<OptionEntry>> {
    let mut segment: Option<u32> = None;
    let mut block: Option<(String, usize)> = None;
    let mut skip_separator = false;
    let mut entries = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        if std::mem::take(&mut skip_separator) {
            continue;
        }
        let line = raw.trim();
        if line.is_empty() {
            block = None;
            continue;
        }

        if let Some(index) = segment_header(line) {
            segment = Some(index);
            block = None;
            continue;
        }

        let Some(segment_index) = segment else {
            return Err(malformed(line_no, "square listed before any 'Segment N' line"));
        };

        if let Some((category, required_count)) = &block {
            entries.push(OptionEntry {
                segment_index,
                category: category.clone(),
                required_count: *required_count,
                label: line.to_string(),
            });
            continue;
        }

        let Some((name, rest)) = line.split_once(':') else {
            return Err(malformed(line_no, format!("expected a 'type: (choose N)' header, got '{line}'")));
        };
        let category = name.trim();
        block = if category.eq_ignore_ascii_case(FREE_CATEGORY) {
            Some((FREE_CATEGORY.to_string(), 1))
        } else {
            Some((category.to_string(), choices_from_header(rest.trim(), line_no)?))
        };
        skip_separator = true;
    }
    Ok(entries)
}

fn segment_header(line: &str) -> Option<u32> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    if !first.eq_ignore_ascii_case("segment") {
        return None;
    }
    words.next()?.trim_end_matches(':').parse().ok()
}

fn choices_from_header(rest: &str, line_no: usize) -> Result<usize> {
    let inner = rest.trim_start_matches('(').trim_end_matches(')').trim();
    match inner.split_whitespace().last() {
        None => Ok(1),
        Some(word) => word
            .parse()
            .map_err(|_| malformed(line_no, format!("cannot read choice count from '{rest}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
index,square,segment,segment_index,choices,type
0,Kefka laughs,Segment 1,1,,free
1,Whelk,Segment 1,1,2,boss
2,Vargas,Segment 1,1,2,boss
3,Ultros,Segment 1,1,2,boss
4,Sabin suplex,Segment 1,1,1,event
5,Phantom Train,Segment 2,2,1,boss
";

    #[test]
    fn loads_csv_and_groups_by_category() {
        let pool = OptionPool::load(CSV.as_bytes()).unwrap();
        assert_eq!(pool.entries().len(), 6);
        assert_eq!(pool.segments(), vec![1, 2]);

        let groups = pool.group_for(1);
        let names: Vec<_> = groups.iter().map(|g| (g.category, g.required_count, g.entries.len())).collect();
        assert_eq!(names, vec![("boss", 2, 3), ("event", 1, 1)]);
        assert_eq!(pool.free_label(1), "Kefka laughs");
        assert_eq!(pool.free_label(2), DEFAULT_FREE_LABEL);
    }

    #[test]
    fn missing_choices_defaults_to_one() {
        let csv = "segment_index,type,choices,square\n3,loot,,Atma Weapon\n";
        let pool = OptionPool::load(csv.as_bytes()).unwrap();
        assert_eq!(pool.group_for(3)[0].required_count, 1);
    }

    #[test]
    fn rejects_rows_missing_fields() {
        let csv = "segment_index,type,choices,square\n,boss,1,Whelk\n";
        assert!(matches!(
            OptionPool::load(csv.as_bytes()),
            Err(BingoError::MalformedPool { row: 2, .. })
        ));

        let csv = "segment_index,type,choices,square\n1,,1,Whelk\n";
        assert!(matches!(OptionPool::load(csv.as_bytes()), Err(BingoError::MalformedPool { .. })));
    }

    #[test]
    fn rejects_non_numeric_choices() {
        let csv = "segment_index,type,choices,square\n1,boss,two,Whelk\n";
        let err = OptionPool::load(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("two"), "{err}");
    }

    #[test]
    fn rejects_inconsistent_choices_within_group() {
        let csv = "segment_index,type,choices,square\n1,boss,2,Whelk\n1,boss,3,Vargas\n";
        assert!(matches!(
            OptionPool::load(csv.as_bytes()),
            Err(BingoError::MalformedPool { row: 2, .. })
        ));
    }

    #[test]
    fn rejects_repeated_label_in_segment() {
        let csv = "segment_index,type,choices,square\n1,boss,1,Whelk\n1,event,1,Whelk\n2,boss,1,Whelk\n";
        assert!(matches!(OptionPool::load(csv.as_bytes()), Err(BingoError::MalformedPool { .. })));
    }

    #[test]
    fn listing_converts_to_entries() {
        let sheet = "\
Segment 4

Free:
-----
Kefka laughs

Bosses: (choose 2)
-----
Whelk
Vargas
Ultros

Events:

Sabin suplex
";
        let entries = parse_listing(sheet).unwrap();
        assert_eq!(entries.len(), 5);
        assert!(entries[0].is_free());
        assert_eq!(entries[0].label, "Kefka laughs");
        assert_eq!(entries[1].category, "Bosses");
        assert_eq!(entries[1].required_count, 2);
        assert_eq!(entries[4].label, "Sabin suplex");
        assert_eq!(entries[4].required_count, 1);
        assert!(entries.iter().all(|e| e.segment_index == 4));
        assert!(entries.iter().all(|e| e.label != "-----"));

        let pool = OptionPool::new(entries).unwrap();
        assert_eq!(pool.free_label(4), "Kefka laughs");
    }

    #[test]
    fn listing_skips_blank_separators() {
        let sheet = "Segment 1\n\nFree:\n\nKefka laughs\n\nBosses: (choose 1)\n\nWhelk\nVargas\n\n";
        let entries = parse_listing(sheet).unwrap();
        let labels: Vec<_> = entries.iter().map(|e| (e.category.as_str(), e.label.as_str())).collect();
        assert_eq!(labels, vec![("free", "Kefka laughs"), ("Bosses", "Whelk"), ("Bosses", "Vargas")]);
    }

    #[test]
    fn listing_requires_segment_header() {
        assert!(parse_listing("Bosses: (choose 1)\nWhelk\n").is_err());
    }
}
