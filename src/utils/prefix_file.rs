// s3-undelete/src/utils/prefix_file.rs
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::debug;

use crate::errors::{AppError, Result};

/// Reads the prefix list from a text or CSV file.
///
/// Only the first comma-separated column of each line is used. Double quotes
/// are stripped, blank values and the header sentinel are skipped, and
/// duplicates are kept as-is. Other whitespace is part of the prefix.
pub fn load_prefixes(path: &Path, header_sentinel: Option<&str>) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::Config(format!(
            "prefixes file {} does not exist",
            path.display()
        )),
        _ => AppError::Io(e),
    })?;

    let prefixes = parse_prefixes(BufReader::new(file), header_sentinel)?;
    debug!(path = %path.display(), count = prefixes.len(), "loaded prefixes");
    Ok(prefixes)
}

pub fn parse_prefixes<R: BufRead>(reader: R, header_sentinel: Option<&str>) -> Result<Vec<String>> {
    let mut prefixes = Vec::new();
    for line in reader.lines() {
        if let Some(prefix) = clean_line(&line?, header_sentinel) {
            prefixes.push(prefix);
        }
    }
    Ok(prefixes)
}

fn clean_line(line: &str, header_sentinel: Option<&str>) -> Option<String> {
    let line = line.trim_end_matches('\r');
    let first_column = line.split(',').next().unwrap_or_default();
    let prefix = first_column.replace('"', "");

    if prefix.trim().is_empty() || header_sentinel == Some(prefix.as_str()) {
        return None;
    }
    Some(prefix)
}
