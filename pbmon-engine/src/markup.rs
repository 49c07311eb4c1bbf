//! Collector color markers → Telegram Markdown.
//!
//! The collector decorates values with `:color[text]` markers meant for its
//! own UI. Blue and red become bold, green and orange are stripped.

use regex::Regex;
use std::sync::OnceLock;

/// Marker rewrites, applied in this order.
const MARKER_RULES: [(&str, &str); 4] = [
    (r":blue\[(.*?)\]", "*${1}*"),
    (r":red\[(.*?)\]", "*${1}*"),
    (r":green\[(.*?)\]", "${1}"),
    (r":orange\[(.*?)\]", "${1}"),
];

fn compiled_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        MARKER_RULES
            .iter()
            .map(|(pattern, replacement)| {
                (
                    Regex::new(pattern).expect("marker patterns are valid"),
                    *replacement,
                )
            })
            .collect()
    })
}

/// Rewrite every color marker in `text`.
pub fn rewrite_markers(text: &str) -> String {
    let mut out = text.to_string();
    for (regex, replacement) in compiled_rules() {
        out = regex.replace_all(&out, *replacement).into_owned();
    }
    out
}
