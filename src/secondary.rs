//! Parser for the "stand-alone encrypted web page" export.
//!
//! Each entry is an inline script assignment `gRecord = [<hex words>];`
//! whose deciphered text is an html fragment: an `<h3>` title followed by a
//! table of labelled rows and one `Accessed: M/D/YY, Modified: M/D/YY` row.

use crate::cipher::Cipher;
use crate::error::{ConvertError, Result, Source};
use crate::primary::MASK_GLYPH;
use crate::record::{Fields, RecordSet, SecondaryRecord};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use log::{debug, trace};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

lazy_static! {
    static ref RECORD_RE: Regex = Regex::new(r"gRecord = \[([^\]]+)\];").unwrap();
    static ref DATES_RE: Regex =
        Regex::new(r"Accessed: ([0-9/]+), Modified: ([0-9/]+)").unwrap();
    static ref HEADING: Selector = Selector::parse("h3").unwrap();
    static ref SPAN: Selector = Selector::parse("span").unwrap();
    static ref TABLE: Selector = Selector::parse("table").unwrap();
    static ref ROW: Selector = Selector::parse("tr").unwrap();
    static ref CELL: Selector = Selector::parse("td").unwrap();
}

const FIELD_TITLE_CLASS: &str = "fieldtitle";

/// Zone in which the export's calendar dates are read.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DateZone {
    #[default]
    Local,
    Utc,
}

pub struct Parser<'a> {
    cipher: &'a Cipher,
    zone: DateZone,
}

impl<'a> Parser<'a> {
    pub fn new(cipher: &'a Cipher, zone: DateZone) -> Parser<'a> {
        Parser { cipher, zone }
    }

    pub fn parse(&self, html: &str) -> Result<RecordSet<SecondaryRecord>> {
        let mut records = RecordSet::new(Source::Html);
        for words in record_blocks(html)? {
            let fragment = self.cipher.decode(&words)?;
            let record = parse_record(&fragment, self.zone)?;
            trace!("Deciphered record {:?} with {} fields", record.title, record.fields.len());
            records.insert(record)?;
        }

        debug!("Parsed {} records from html export", records.len());
        Ok(records)
    }
}

/// Word arrays of every `gRecord` assignment, at most one per line.
pub fn record_blocks(html: &str) -> Result<Vec<Vec<u32>>> {
    html.lines()
        .filter_map(|line| RECORD_RE.captures(line))
        .map(|caps| parse_words(&caps[1]))
        .collect()
}

fn parse_words(list: &str) -> Result<Vec<u32>> {
    list.split(',')
        .map(|token| {
            let digits = token.trim();
            let digits = digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
                .unwrap_or(digits);
            u32::from_str_radix(digits, 16).map_err(|_| ConvertError::InvalidWord {
                token: token.to_owned(),
            })
        })
        .collect()
}

/// Recover title, fields and timestamps from one deciphered fragment.
pub fn parse_record(fragment: &str, zone: DateZone) -> Result<SecondaryRecord> {
    let doc = Html::parse_fragment(fragment);

    let heading = doc
        .select(&HEADING)
        .next()
        .ok_or_else(|| ConvertError::MalformedRecord {
            reason: "no <h3> title".to_owned(),
        })?;
    let title = heading_text(heading);
    if title.is_empty() {
        return Err(ConvertError::MalformedRecord {
            reason: "empty <h3> title".to_owned(),
        });
    }

    let table = doc
        .select(&TABLE)
        .next()
        .ok_or_else(|| ConvertError::MalformedRecord {
            reason: format!("record {:?} has no field table", title),
        })?;

    let mut fields = Fields::new();
    let mut dates = None;
    for (row_num, row) in table.select(&ROW).enumerate() {
        let cells: Vec<ElementRef> = row.select(&CELL).collect();
        if cells.len() < 2 {
            return Err(ConvertError::MalformedRow {
                title,
                row: row_num,
            });
        }

        let label = field_label(cells[0]);
        let sep = if label.as_deref() == Some("notes") { "\n" } else { "" };
        let value = cell_text(cells[1], sep);

        match label {
            Some(label) if label == "username" => {
                fields.insert(label, value.replace(MASK_GLYPH, ""));
            }
            Some(label) => fields.insert(label, value),
            None => match DATES_RE.captures(&value) {
                Some(caps) => {
                    dates = Some((parse_date(&caps[1], zone)?, parse_date(&caps[2], zone)?));
                }
                None => {
                    debug!("Record {:?}: storing unlabelled row {} by index", title, row_num);
                    fields.insert(row_num.to_string(), value);
                }
            },
        }
    }

    let (last_accessed, last_modified) =
        dates.ok_or_else(|| ConvertError::MissingTimestamps {
            title: title.clone(),
        })?;

    Ok(SecondaryRecord {
        title,
        fields,
        last_accessed,
        last_modified,
    })
}

// The heading carries an icon span that is not part of the title.
fn heading_text(heading: ElementRef) -> String {
    let icon = heading.select(&SPAN).next().map(|span| span.id());
    heading
        .descendants()
        .filter(|node| match icon {
            Some(icon) => !node.ancestors().any(|a| a.id() == icon),
            None => true,
        })
        .filter_map(|node| node.value().as_text().map(|t| t.trim()))
        .collect()
}

fn field_label(cell: ElementRef) -> Option<String> {
    if !cell.value().classes().any(|c| c == FIELD_TITLE_CLASS) {
        return None;
    }
    let text: String = cell.text().collect();
    Some(text.trim().trim_end_matches(':').to_lowercase())
}

fn cell_text(cell: ElementRef, sep: &str) -> String {
    cell.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Seconds since the epoch at midnight of an `M/D/YY` date.
pub fn parse_date(value: &str, zone: DateZone) -> Result<i64> {
    let invalid = || ConvertError::InvalidDate {
        value: value.to_owned(),
    };
    let mut date = NaiveDate::parse_from_str(value, "%m/%d/%y").map_err(|_| invalid())?;
    // Two digit years pivot at 69 (POSIX): 69..=99 are 19xx, chrono puts 69 in 2069.
    if date.year() == 2069 {
        date = date.with_year(1969).ok_or_else(invalid)?;
    }
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;

    match zone {
        DateZone::Utc => Ok(midnight.and_utc().timestamp()),
        DateZone::Local => local_timestamp(midnight).ok_or_else(invalid),
    }
}

// Zones that switch to DST at midnight skip it; use the first hour instead.
fn local_timestamp(midnight: NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.timestamp())
}
