//! Action type → handler method name.

/// Derive the handler method name for an action type.
///
/// Lower-cases the type, treats underscores as word breaks, capitalizes every
/// word but the first and drops the breaks: `FETCH_RESOURCES` → `fetchResources`.
pub fn method_name(action_type: &str) -> String {
    let spaced = action_type.to_ascii_lowercase().replace('_', " ");

    let mut titled = String::with_capacity(spaced.len());
    let mut word_start = true;
    for ch in spaced.chars() {
        titled.push(if word_start { ch.to_ascii_uppercase() } else { ch });
        word_start = matches!(ch, ' ' | '\t' | '\r' | '\n' | '\x0B' | '\x0C');
    }

    let mut chars = titled.chars();
    let lowered: String = match chars.next() {
        Some(first) => std::iter::once(first.to_ascii_lowercase())
            .chain(chars)
            .collect(),
        None => String::new(),
    };

    lowered.replace(' ', "")
}
