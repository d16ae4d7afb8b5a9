use crate::cipher::Cipher;
use crate::error::Result;
use crate::onepif::{self, SEPARATOR};
use crate::reconcile::reconcile;
use crate::secondary::{DateZone, Parser};
use crate::primary;
use log::info;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub output: PathBuf,
    pub time_zone: DateZone,
    pub separator: String,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            output: PathBuf::from("data.1pif"),
            time_zone: DateZone::Local,
            separator: SEPARATOR.to_owned(),
        }
    }
}

/// Serialized output of a successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub contents: String,
    pub records: usize,
}

/// Parse, reconcile and serialize both exports. Nothing is produced
/// unless every record agrees.
pub fn convert(text: &str, html: &str, cipher: &Cipher, options: &Options) -> Result<Conversion> {
    let text_recs = primary::parse(text)?;
    let html_recs = Parser::new(cipher, options.time_zone).parse(html)?;
    let records = reconcile(text_recs, &html_recs)?;
    Ok(Conversion {
        contents: onepif::to_1pif(&records, &options.separator)?,
        records: records.len(),
    })
}

/// Convert the exports at the given paths and write `options.output`.
/// Returns the number of records written.
pub fn run(text_path: &Path, html_path: &Path, cipher: &Cipher, options: &Options) -> Result<usize> {
    let text = fs::read_to_string(text_path)?;
    let html = fs::read_to_string(html_path)?;

    let conversion = convert(&text, &html, cipher, options)?;

    write_atomic(&options.output, &conversion.contents)?;
    info!("Wrote {} records to {:?}", conversion.records, options.output);
    Ok(conversion.records)
}

/// Write to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents)?;
    if let Err(initial_err) = fs::rename(&temp_path, path) {
        // Some platforms refuse to rename over an existing file.
        let _ = fs::remove_file(path);
        fs::rename(&temp_path, path).map_err(|retry_err| {
            let _ = fs::remove_file(&temp_path);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "rename failed (initial: {}, retry: {})",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}
