//! Shared validation helpers.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if `value` (case-insensitive) is not one of `allowed`.
pub(crate) fn validate_one_of(errors: &mut Vec<String>, name: &str, value: &str, allowed: &[&str]) {
    let lower = value.to_ascii_lowercase();
    if !allowed.contains(&lower.as_str()) {
        errors.push(format!(
            "{name} = \"{value}\" must be one of: {}",
            allowed.join(", ")
        ));
    }
}
