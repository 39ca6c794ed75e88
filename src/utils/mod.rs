//! Small helpers shared by the application modules.

/// Trimmed copy of `value`, or `None` when nothing is left.
pub fn trimmed_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
