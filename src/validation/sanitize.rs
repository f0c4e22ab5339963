//! String sanitization for free-text fields (debt names and ids)

/// Script-capable URL schemes removed wherever they appear
const DANGEROUS_PROTOCOLS: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Characters that can open markup or break out of an attribute
const DANGEROUS_CHARS: [char; 5] = ['<', '>', '"', '\'', '`'];

/// Outcome of sanitizing one string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub value: String,
    /// A dangerous character or protocol was stripped
    pub had_dangerous_content: bool,
    pub truncated: bool,
}

/// Strip markup characters and script protocols, trim, then truncate to
/// `max_chars` characters.
pub fn sanitize_string(input: &str, max_chars: usize) -> Sanitized {
    let mut had_dangerous_content = false;

    let mut value: String = input
        .chars()
        .filter(|c| {
            let dangerous = DANGEROUS_CHARS.contains(c);
            had_dangerous_content |= dangerous;
            !dangerous && !c.is_control()
        })
        .collect();

    // Repeat until stable so that nested payloads like "javajavascript:script:" are removed
    loop {
        let mut changed = false;
        for protocol in DANGEROUS_PROTOCOLS {
            if let Some(pos) = find_ascii_case_insensitive(&value, protocol) {
                value.replace_range(pos..pos + protocol.len(), "");
                changed = true;
            }
        }
        if !changed {
            break;
        }
        had_dangerous_content = true;
    }

    let trimmed = value.trim();
    let truncated = trimmed.chars().count() > max_chars;
    let value = trimmed.chars().take(max_chars).collect();

    Sanitized {
        value,
        had_dangerous_content,
        truncated,
    }
}

/// Byte offset of the first ASCII-case-insensitive match of `needle`
fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
