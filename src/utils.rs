//! Utility functions shared across modules.

/// Split a comma-separated CLI or config value into its items.
///
/// Items are trimmed, empty items dropped, and duplicates removed keeping the
/// first occurrence.
///
/// # Example
/// ```
/// use qwatch::utils::split_csv;
/// assert_eq!(split_csv(" gpu, cpu,,gpu "), vec!["gpu", "cpu"]);
/// ```
pub fn split_csv(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// Merge repeated `-u a,b -u c` style flags into one list.
pub fn split_csv_all<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let joined: Vec<&str> = values.into_iter().map(String::as_str).collect();
    split_csv(&joined.join(","))
}
