//! Parser for the tab separated text export.
//!
//! Column order: title, url, username, password, notes, category, browser,
//! username type, password type, an unused column, then two timestamp
//! slots that this export never fills.

use crate::error::{ConvertError, Result, Source};
use crate::record::{PrimaryRecord, RecordSet};
use log::{debug, trace};

/// Stands in for line breaks inside the notes column.
pub const NOTES_NEWLINE: char = '\u{00ac}';
/// Glyph the exporter writes into masked username cells.
pub const MASK_GLYPH: char = '\u{221e}';

const MAX_FIELDS: usize = 12;

pub fn parse(text: &str) -> Result<RecordSet<PrimaryRecord>> {
    let mut records = RecordSet::new(Source::Text);

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            trace!("Skipping blank line {}", line_no);
            continue;
        }
        records.insert(parse_line(line_no, line)?)?;
    }

    debug!("Parsed {} records from text export", records.len());
    Ok(records)
}

fn parse_line(line_no: usize, line: &str) -> Result<PrimaryRecord> {
    let mut columns: Vec<Option<&str>> = line.split('\t').map(non_empty).collect();
    if columns.len() > MAX_FIELDS {
        return Err(ConvertError::TooManyFields {
            line: line_no,
            found: columns.len(),
        });
    }
    columns.resize(MAX_FIELDS, None);

    let title = match columns[0] {
        Some(title) => title.to_owned(),
        None => return Err(ConvertError::EmptyTitle { line: line_no }),
    };
    let owned = |idx: usize| columns[idx].map(str::to_owned);

    Ok(PrimaryRecord {
        title,
        url: owned(1),
        username: columns[2]
            .map(|u| u.replace(MASK_GLYPH, ""))
            .and_then(|u| non_empty(&u).map(str::to_owned)),
        password: owned(3),
        notes: columns[4].map(|n| n.replace(NOTES_NEWLINE, "\n")),
        category: owned(5),
        browser: owned(6),
        username_type: columns[7].unwrap_or("username").to_lowercase(),
        password_type: columns[8].unwrap_or("password").to_lowercase(),
    })
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
