//! CSV input plumbing: delimiter and encoding resolution, reader construction.
//!
//! Input is decoded to UTF-8 through `encoding_rs_io`, which also strips a
//! leading byte-order mark. Records are read flexibly: a short line yields
//! empty trailing fields instead of aborting the run.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;

use crate::error::LoadError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        "semicolon" => Ok(b';'),
        "pipe" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(format!(
            "Delimiter must be a single ASCII character or one of tab, comma, semicolon, pipe (got '{other}')"
        )),
    }
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

/// UTF-8 input is passed through undecoded so invalid bytes surface as CSV
/// errors instead of being replaced with U+FFFD.
pub fn open_csv_reader<R>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> csv::Reader<Box<dyn Read>>
where
    R: Read + 'static,
{
    let decoded: Box<dyn Read> = Box::new(
        DecodeReaderBytesBuilder::new()
            .encoding(Some(encoding))
            .bom_override(true)
            .strip_bom(true)
            .utf8_passthru(true)
            .build(reader),
    );
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(decoded)
}

/// Opens `path` (or stdin for `-`). A missing or unreadable file is a configuration error.
pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<csv::Reader<Box<dyn Read>>> {
    if is_dash(path) {
        return Ok(open_csv_reader(std::io::stdin(), delimiter, encoding));
    }
    let file = File::open(path)
        .map_err(|err| LoadError::config(format!("Opening input file {path:?}: {err}")))?;
    Ok(open_csv_reader(BufReader::new(file), delimiter, encoding))
}

/// Header row of `reader`; empty when the input has none.
pub fn reader_headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>> {
    let headers = reader
        .headers()
        .map_err(|err| LoadError::config(format!("Reading CSV header row: {err}")))?;
    Ok(headers.iter().map(str::to_string).collect())
}
