use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds.
pub fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Check a group, node or device id can be used as a single topic level.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("id must not be empty".into());
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '+' | '/' | '#')) {
        return Err(format!("id {name} contains reserved topic character '{c}'"));
    }
    Ok(())
}
