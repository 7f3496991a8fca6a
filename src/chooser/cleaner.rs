//! Turns the chooser's answer back into a payload.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cleaned {
    pub text: String,
    /// Whether a separator was found and the description dropped
    pub truncated: bool,
}

/// Strip one trailing newline, then cut at the first `separator`.
///
/// The first occurrence wins, so a payload that itself contains the
/// separator is cut short. A line without the separator (free-typed text,
/// auxiliary lines without description) is returned as is.
pub fn clean(raw: &str, separator: &str) -> Cleaned {
    let line = raw.strip_suffix('\n').unwrap_or(raw);

    if separator.is_empty() {
        return Cleaned {
            text: line.to_string(),
            truncated: false,
        };
    }

    match line.find(separator) {
        Some(cut) => Cleaned {
            text: line[..cut].to_string(),
            truncated: true,
        },
        None => Cleaned {
            text: line.to_string(),
            truncated: false,
        },
    }
}
