//! Output file naming

use std::collections::HashSet;

/// Reduce a guest name to something safe to use in a file name
///
/// ASCII letters, digits, space, underscore and hyphen are kept; other
/// ASCII characters (path separators, punctuation) are dropped. Non-ASCII
/// characters are kept unless they are whitespace or control characters,
/// so names in any script, including their combining vowel signs, survive
/// intact. Surrounding spaces are trimmed.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|&c| {
            if c.is_ascii() {
                c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-')
            } else {
                !c.is_whitespace() && !c.is_control()
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Plans unique output file names for one batch
///
/// A sanitized name already used in the batch (compared ignoring case)
/// gets a `_row<N>` suffix; an empty one becomes `guest_row<N>`.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    prefix: String,
    used: HashSet<String>,
}

impl OutputNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            used: HashSet::new(),
        }
    }

    /// File name (not path) for the guest on `row`
    pub fn file_name(&mut self, row: usize, name: &str) -> String {
        let safe = sanitize_name(name);
        let stem = if safe.is_empty() {
            format!("guest_row{row}")
        } else {
            safe
        };

        let mut candidate = stem.clone();
        let mut attempt = 1;
        while self.used.contains(&candidate.to_lowercase()) {
            candidate = if attempt == 1 {
                format!("{stem}_row{row}")
            } else {
                format!("{stem}_row{row}_{attempt}")
            };
            attempt += 1;
        }

        self.used.insert(candidate.to_lowercase());
        format!("{}{}.pdf", self.prefix, candidate)
    }
}
