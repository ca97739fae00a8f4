use chrono::Utc;

/// Resolves a reserved (`$`-prefixed) key to its live value, or `None` if
/// `key` isn't one of the keys this store recognizes.
pub fn resolve(key: &str) -> Option<String> {
    match key {
        "$date" => Some(Utc::now().format("%Y-%m-%d").to_string()),
        "$time" => Some(Utc::now().format("%H:%M:%S").to_string()),
        "$now" => Some(Utc::now().to_rfc3339()),
        _ => None,
    }
}
