use crate::errors::{AppError, AppResult};
use chrono::{DateTime, SecondsFormat, Utc};

pub const ROOT_DIR: &str = "/";
pub const BACKUP_DIR: &str = "/backup/";

/// Final path segment; empty for paths ending in `/`.
pub fn get_file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Parent directory including the trailing `/`. Paths that already end in `/`
/// are returned unchanged.
pub fn get_directory(path: &str) -> &str {
    match path.rfind('/') {
        None | Some(0) => ROOT_DIR,
        Some(idx) if idx == path.len() - 1 => path,
        Some(idx) => &path[..=idx],
    }
}

pub fn normalize_directory(directory: &str) -> String {
    let mut normalized = directory.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    if normalized == "//" {
        normalized = ROOT_DIR.to_string();
    }
    normalized
}

pub fn is_backup_directory(directory: &str) -> bool {
    directory == BACKUP_DIR
}

pub fn validate_file_path(path: &str) -> AppResult<()> {
    if path.is_empty() {
        return Err(AppError::InvalidPath("path is empty".to_string()));
    }
    if !path.starts_with('/') {
        return Err(AppError::InvalidPath(format!("{} is not absolute", path)));
    }
    if path.ends_with('/') {
        return Err(AppError::InvalidPath(format!("{} names a directory, not a file", path)));
    }
    Ok(())
}

/// ISO-8601 instant with `:` and `.` replaced so it can live inside a file name.
pub fn sanitized_timestamp(timestamp_ms: i64) -> String {
    let instant = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    instant
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

pub fn backup_path(name: &str, timestamp_ms: i64) -> String {
    let (base, extension) = split_extension(name);
    format!("{}{}_{}{}", BACKUP_DIR, base, sanitized_timestamp(timestamp_ms), extension)
}

/// Variant of a backup path used when the plain name is already taken.
pub fn backup_path_with_suffix(name: &str, timestamp_ms: i64, suffix: u32) -> String {
    let (base, extension) = split_extension(name);
    format!(
        "{}{}_{}-{}{}",
        BACKUP_DIR,
        base,
        sanitized_timestamp(timestamp_ms),
        suffix,
        extension
    )
}
