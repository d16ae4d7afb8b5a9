//! Writer for the `.1pif` import format.
//!
//! A `.1pif` file is a stream of single-line JSON objects, each followed by
//! a separator line.

use crate::error::Result;
use crate::record::{CanonicalRecord, RecordSet};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io::{self, Write};
use uuid::Uuid;

pub const SEPARATOR: &str = "***5642bee8-a5ff-11dc-8314-0800200c9a66***";
const WEB_FORM: &str = "webforms.WebForm";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Item<'a> {
    uuid: &'a str,
    updated_at: i64,
    title: &'a str,
    #[serde(skip_serializing_if = "SecureContents::is_empty")]
    secure_contents: SecureContents<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    open_contents: Option<OpenContents<'a>>,
    created_at: i64,
    type_name: &'static str,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct SecureContents<'a> {
    #[serde(rename = "URLs", skip_serializing_if = "Vec::is_empty")]
    urls: Vec<Url<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes_plain: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<Field<'a>>,
}

impl SecureContents<'_> {
    fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.notes_plain.is_none() && self.fields.is_empty()
    }
}

#[derive(Serialize, Debug)]
struct Url<'a> {
    label: &'a str,
    url: &'a str,
}

#[derive(Serialize, Debug)]
struct Field<'a> {
    name: &'a str,
    value: &'a str,
    #[serde(rename = "type")]
    kind: FieldKind,
    designation: Designation,
}

#[derive(Serialize, Debug, Clone, Copy)]
enum FieldKind {
    #[serde(rename = "T")]
    Text,
    #[serde(rename = "P")]
    Password,
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum Designation {
    Username,
    Password,
}

#[derive(Serialize, Debug)]
struct OpenContents<'a> {
    tags: Vec<&'a str>,
}

/// Serialize every record in title order, each block followed by `separator`.
pub fn to_1pif(records: &RecordSet<CanonicalRecord>, separator: &str) -> Result<String> {
    let mut out = String::new();
    for record in records.iter() {
        let uuid = format!("{:X}", Uuid::new_v4().simple());
        out.push_str(&item_json(record, &uuid)?);
        out.push('\n');
        out.push_str(separator);
        out.push('\n');
    }
    if records.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

/// One record as a single-line JSON object.
pub fn item_json(record: &CanonicalRecord, uuid: &str) -> Result<String> {
    let mut secure = SecureContents::default();
    if let Some(url) = present(&record.url) {
        secure.urls.push(Url { label: "", url });
    }
    secure.notes_plain = present(&record.notes);
    if let Some(username) = present(&record.username) {
        secure.fields.push(Field {
            name: &record.username_type,
            value: username,
            kind: FieldKind::Text,
            designation: Designation::Username,
        });
    }
    if let Some(password) = present(&record.password) {
        secure.fields.push(Field {
            name: &record.password_type,
            value: password,
            kind: FieldKind::Password,
            designation: Designation::Password,
        });
    }

    let item = Item {
        uuid,
        updated_at: record.last_modified,
        title: &record.title,
        secure_contents: secure,
        open_contents: present(&record.category).map(|category| OpenContents {
            tags: vec![category],
        }),
        created_at: record.last_modified,
        type_name: WEB_FORM,
    };

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    item.serialize(&mut ser)?;
    // The formatter only ever writes ASCII.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// `", "` and `": "` separators with non-ASCII escaped as `\uXXXX`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Source;

    fn bank() -> CanonicalRecord {
        CanonicalRecord {
            title: "Bank".to_owned(),
            url: Some("https://bank.example".to_owned()),
            username: Some("jdoe".to_owned()),
            password: Some("secr3t".to_owned()),
            notes: Some("line1\nline2".to_owned()),
            category: Some("Finance".to_owned()),
            username_type: "username".to_owned(),
            password_type: "password".to_owned(),
            last_accessed: 1_369_958_400,
            last_modified: 1_369_958_400,
        }
    }

    fn bare(title: &str) -> CanonicalRecord {
        CanonicalRecord {
            title: title.to_owned(),
            url: None,
            username: None,
            password: None,
            notes: None,
            category: None,
            username_type: "username".to_owned(),
            password_type: "password".to_owned(),
            last_accessed: 5,
            last_modified: 7,
        }
    }

    #[test]
    fn full_record_layout() {
        let json = item_json(&bank(), "ABC").unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"uuid": "ABC", "updatedAt": 1369958400, "title": "Bank", "#,
                r#""secureContents": {"URLs": [{"label": "", "url": "https://bank.example"}], "#,
                r#""notesPlain": "line1\nline2", "fields": ["#,
                r#"{"name": "username", "value": "jdoe", "type": "T", "designation": "username"}, "#,
                r#"{"name": "password", "value": "secr3t", "type": "P", "designation": "password"}]}, "#,
                r#""openContents": {"tags": ["Finance"]}, "createdAt": 1369958400, "#,
                r#""typeName": "webforms.WebForm"}"#
            )
        );
    }

    #[test]
    fn empty_values_are_omitted() {
        let mut rec = bare("Empty");
        rec.url = Some(String::new());
        let json = item_json(&rec, "ID").unwrap();
        assert_eq!(
            json,
            r#"{"uuid": "ID", "updatedAt": 7, "title": "Empty", "createdAt": 7, "typeName": "webforms.WebForm"}"#
        );
    }

    #[test]
    fn password_only_record() {
        let mut rec = bare("Pin");
        rec.password = Some("1234".to_owned());
        rec.password_type = "pin".to_owned();
        let value: serde_json::Value = serde_json::from_str(&item_json(&rec, "ID").unwrap()).unwrap();
        let fields = value["secureContents"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0]["name"], "pin");
        assert_eq!(fields[0]["designation"], "password");
        assert!(value["secureContents"].get("URLs").is_none());
    }

    #[test]
    fn non_ascii_is_escaped() {
        let mut rec = bare("Café 🔑");
        rec.notes = Some("\"quoted\"".to_owned());
        let json = item_json(&rec, "ID").unwrap();
        assert!(json.is_ascii());
        assert!(json.contains(r#""title": "Caf\u00e9 \ud83d\udd11""#));
        assert!(json.contains(r#""notesPlain": "\"quoted\"""#));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "Café 🔑");
    }

    #[test]
    fn blocks_are_sorted_and_separated() {
        let mut set = RecordSet::new(Source::Text);
        set.insert(bare("Zeta")).unwrap();
        set.insert(bank()).unwrap();
        let out = to_1pif(&set, SEPARATOR).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], SEPARATOR);
        assert_eq!(lines[3], SEPARATOR);
        assert!(out.ends_with(&format!("{}\n", SEPARATOR)));

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        let second: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(first["title"], "Bank");
        assert_eq!(second["title"], "Zeta");
        let uuid = first["uuid"].as_str().unwrap();
        assert_eq!(uuid.len(), 32);
        assert!(uuid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn output_is_stable_apart_from_identifiers() {
        let mut set = RecordSet::new(Source::Text);
        set.insert(bank()).unwrap();
        set.insert(bare("Mail")).unwrap();
        let strip = |out: String| -> Vec<serde_json::Value> {
            out.lines()
                .filter(|l| *l != SEPARATOR)
                .map(|l| {
                    let mut v: serde_json::Value = serde_json::from_str(l).unwrap();
                    v["uuid"] = serde_json::Value::Null;
                    v
                })
                .collect()
        };
        let first = to_1pif(&set, SEPARATOR).unwrap();
        let second = to_1pif(&set, SEPARATOR).unwrap();
        assert_ne!(first, second);
        assert_eq!(strip(first), strip(second));
    }

    #[test]
    fn empty_set_is_a_single_newline() {
        let set: RecordSet<CanonicalRecord> = RecordSet::new(Source::Text);
        assert_eq!(to_1pif(&set, SEPARATOR).unwrap(), "\n");
    }
}
