//! AdBlock Plus / AutoProxy pattern formatting.

use crate::aggregate::AggregateSet;
use crate::mode::Mode;

/// Format a value into its pattern line(s).
///
/// - `Include`: `||example.com^`, the domain and every subdomain
/// - `IncludeExact`: `|http://example.com/` and `|https://example.com/`,
///   anchored at the scheme so subdomains never match
/// - `Keyword`: the bare keyword, an AutoProxy substring rule
/// - `Regexp`: `/pattern/`, converted to JavaScript syntax
/// - `Exclude`: nothing
pub fn format(value: &str, mode: Mode) -> Vec<String> {
    match mode {
        Mode::Include => vec![format!("||{}^", value)],
        Mode::IncludeExact => vec![
            format!("|http://{}/", value),
            format!("|https://{}/", value),
        ],
        Mode::Keyword => vec![value.to_string()],
        Mode::Regexp => vec![format!("/{}/", convert_go_regex(value))],
        Mode::Exclude => Vec::new(),
    }
}

/// Format every surviving entry of an aggregate, in order.
pub fn format_all(set: &AggregateSet) -> Vec<String> {
    set.iter().flat_map(|(value, mode)| format(value, mode)).collect()
}

/// Convert a Go/RE2 pattern to one usable inside a JavaScript `/.../` literal.
///
/// `\A` becomes `^`, `\z` and `\Z` become `$`, and unescaped `/` is
/// escaped. Escape pairs are consumed whole, so `\\A` stays literal.
pub fn convert_go_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('A') => out.push('^'),
                Some('z') | Some('Z') => out.push('$'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '/' => out.push_str("\\/"),
            _ => out.push(c),
        }
    }

    out
}
