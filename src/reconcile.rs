//! Joins the two exports into one set of canonical records.
//!
//! Both exports must describe exactly the same titles, and for every title
//! the credentials and url must agree. The text export supplies the values,
//! the html export supplies the timestamps.

use crate::error::{ConvertError, Result, Source};
use crate::record::{CanonicalRecord, PrimaryRecord, RecordSet, SecondaryRecord};
use log::debug;

pub fn reconcile(
    primary: RecordSet<PrimaryRecord>,
    secondary: &RecordSet<SecondaryRecord>,
) -> Result<RecordSet<CanonicalRecord>> {
    check_titles(&primary, secondary)?;

    let mut merged = RecordSet::new(Source::Merged);
    for text_rec in primary {
        let html_rec = secondary.get(&text_rec.title).ok_or_else(|| {
            ConvertError::TitleSetMismatch {
                only_primary: vec![text_rec.title.clone()],
                only_secondary: vec![],
            }
        })?;
        check_fields(&text_rec, html_rec)?;
        merged.insert(merge(text_rec, html_rec))?;
    }

    debug!("Reconciled {} records", merged.len());
    Ok(merged)
}

fn check_titles(
    primary: &RecordSet<PrimaryRecord>,
    secondary: &RecordSet<SecondaryRecord>,
) -> Result<()> {
    let only_primary: Vec<String> = primary
        .titles()
        .filter(|t| !secondary.contains(t))
        .map(str::to_owned)
        .collect();
    let only_secondary: Vec<String> = secondary
        .titles()
        .filter(|t| !primary.contains(t))
        .map(str::to_owned)
        .collect();

    if only_primary.is_empty() && only_secondary.is_empty() {
        Ok(())
    } else {
        Err(ConvertError::TitleSetMismatch {
            only_primary,
            only_secondary,
        })
    }
}

fn check_fields(text_rec: &PrimaryRecord, html_rec: &SecondaryRecord) -> Result<()> {
    let checks = [
        ("title", text_rec.title.as_str(), html_rec.title.as_str()),
        (
            text_rec.username_type.as_str(),
            text_rec.username.as_deref().unwrap_or(""),
            html_rec.fields.get(&text_rec.username_type),
        ),
        (
            text_rec.password_type.as_str(),
            text_rec.password.as_deref().unwrap_or(""),
            html_rec.fields.get(&text_rec.password_type),
        ),
        (
            "url",
            text_rec.url.as_deref().unwrap_or(""),
            html_rec.fields.get("url"),
        ),
    ];

    match checks.iter().find(|(_, text, html)| text != html) {
        None => Ok(()),
        Some((field, _, _)) => Err(ConvertError::FieldMismatch {
            title: text_rec.title.clone(),
            field: (*field).to_owned(),
            primary: serde_json::to_string_pretty(text_rec)?,
            secondary: serde_json::to_string_pretty(html_rec)?,
        }),
    }
}

fn merge(text_rec: PrimaryRecord, html_rec: &SecondaryRecord) -> CanonicalRecord {
    CanonicalRecord {
        title: text_rec.title,
        url: text_rec.url,
        username: text_rec.username,
        password: text_rec.password,
        notes: text_rec.notes,
        category: text_rec.category,
        username_type: text_rec.username_type,
        password_type: text_rec.password_type,
        last_accessed: html_rec.last_accessed,
        last_modified: html_rec.last_modified,
    }
}
