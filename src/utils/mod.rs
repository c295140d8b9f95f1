pub mod prefix_file;

use crate::errors::{AppError, Result};

/// Accepts either a bare bucket name or an `s3://bucket` URI and returns the bucket name.
pub fn parse_bucket_name(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::Config("bucket_name cannot be empty".to_string()));
    }

    if !input.contains("://") {
        if input.contains('/') {
            return Err(AppError::Config(format!(
                "bucket_name '{}' must not contain '/'; pass key prefixes through the prefixes file",
                input
            )));
        }
        return Ok(input.to_string());
    }

    let uri = url::Url::parse(input)?;
    if uri.scheme() != "s3" {
        return Err(AppError::Config(format!("bucket URI must start with s3://, got '{}'", input)));
    }
    let bucket = uri
        .host_str()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Config(format!("bucket URI '{}' has no bucket name", input)))?;
    if !uri.path().trim_start_matches('/').is_empty() {
        return Err(AppError::Config(format!(
            "bucket URI '{}' must name only a bucket, not an object path",
            input
        )));
    }
    Ok(bucket.to_string())
}
