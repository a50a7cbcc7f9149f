//! X-resource text handling: `*color<N>` entry extraction, serialization,
//! `#include` statements, and the auto-generated marker block used to splice
//! theme includes into a user's resource file without disturbing their own
//! content.

use crate::color::{Color, ColorIdentifier};
use std::collections::BTreeMap;

/// First line of the auto-generated block.
pub const GENERATED_HEADER: &str = "! auto generated colors from xthematic";
/// Last line of the auto-generated block.
pub const GENERATED_FOOTER: &str = "! xthematic end";

/// A `color<N>` resource entry found in resource text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorEntry {
    /// Raw index as written; may exceed the 4-bit range.
    pub index: u32,
    /// Raw value text, untrimmed of meaning (usually a hex code).
    pub value: String,
}

/// Extract a `color<N>` entry from one resource line, if present.
///
/// Matches any resource name whose last component ends in `color<digits>`
/// (`*color4`, `XTerm*color4`), the way `xrdb -query` reports them. The
/// separator after `:` may be a tab or spaces.
pub fn color_entry(line: &str) -> Option<ColorEntry> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    // Comments and anything that is not a single resource name cannot match.
    if name.starts_with('!') || name.contains(char::is_whitespace) {
        return None;
    }
    let digits_at = name.rfind(|c: char| !c.is_ascii_digit())? + 1;
    if digits_at >= name.len() {
        return None;
    }
    if !name[..digits_at].ends_with("color") {
        return None;
    }
    let index = name[digits_at..].parse::<u32>().ok()?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(ColorEntry {
        index,
        value: value.to_string(),
    })
}

/// All `color<N>` entries in `text`, in line order.
pub fn color_entries(text: &str) -> Vec<ColorEntry> {
    text.lines().filter_map(color_entry).collect()
}

/// Serialize a color map as resource lines, one `*color<N>: #hex` per entry.
pub fn serialize_colors(colors: &BTreeMap<ColorIdentifier, Color>) -> String {
    let mut out = String::new();
    for (id, color) in colors {
        out.push_str(&format!("*{}: {}\n", id.resource_name(), color.hex()));
    }
    out
}

/// An `#include` statement referencing a theme file by name.
///
/// The name is resolved at reload time through `xrdb`'s `-I` include search
/// path, so only the bare file name is embedded.
pub fn include_statement(file_name: &str) -> String {
    format!("#include \"{file_name}\"")
}

/// Wrap `body` in the auto-generated marker block.
pub fn wrap_generated(body: &str) -> String {
    let body = body.strip_suffix('\n').unwrap_or(body);
    format!("{GENERATED_HEADER}\n!\n!\n{body}\n{GENERATED_FOOTER}\n")
}

/// Remove the auto-generated block from resource text, if present.
///
/// Lines outside the marker block are kept in order and unmodified, with one
/// normalization: the output is rebuilt line by line, so text whose last line
/// lacks a trailing newline gains one. A header without a matching footer
/// consumes to end of text, mirroring a truncated earlier write.
pub fn strip_generated(text: &str) -> String {
    let mut out = String::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if line == GENERATED_HEADER {
            for skipped in lines.by_ref() {
                if skipped == GENERATED_FOOTER {
                    break;
                }
            }
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Replace any existing auto-generated block with a fresh one containing
/// `body`, appending the new block at the end of the text.
pub fn replace_generated(text: &str, body: &str) -> String {
    let mut out = strip_generated(text);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&wrap_generated(body));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, ColorIdentifier};

    fn id(index: u8) -> ColorIdentifier {
        ColorIdentifier::from_index(index).unwrap()
    }

    fn color(hex: &str) -> Color {
        Color::parse(hex).unwrap()
    }

    #[test]
    fn color_entry_matches_query_output_lines() {
        let entry = color_entry("*color4:\t#0000ff").expect("should match");
        assert_eq!(entry.index, 4);
        assert_eq!(entry.value, "#0000ff");

        let scoped = color_entry("XTerm*color10:   #00ff00").expect("should match");
        assert_eq!(scoped.index, 10);
        assert_eq!(scoped.value, "#00ff00");
    }

    #[test]
    fn color_entry_ignores_unrelated_resources() {
        assert_eq!(color_entry("*background:\t#000000"), None);
        assert_eq!(color_entry("*colorful:\t#000000"), None);
        assert_eq!(color_entry("*color4"), None);
        assert_eq!(color_entry("*color4:"), None);
        assert_eq!(color_entry("! *color4: #ffffff comment? still a name match"), None);
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let mut colors = BTreeMap::new();
        colors.insert(id(0), color("#000000"));
        colors.insert(id(7), color("#c0c0c0"));
        colors.insert(id(15), color("#ffffff"));

        let text = serialize_colors(&colors);
        let mut reparsed = BTreeMap::new();
        for entry in color_entries(&text) {
            let rid = ColorIdentifier::from_index(entry.index as u8).unwrap();
            reparsed.insert(rid, Color::parse(&entry.value).unwrap());
        }
        assert_eq!(reparsed, colors);
    }

    #[test]
    fn include_statement_quotes_file_name() {
        assert_eq!(include_statement("solarized"), "#include \"solarized\"");
    }

    #[test]
    fn wrap_generated_bounds_body_with_markers() {
        let wrapped = wrap_generated("*color0: #000000\n");
        let lines: Vec<_> = wrapped.lines().collect();
        assert_eq!(lines.first(), Some(&GENERATED_HEADER));
        assert_eq!(lines.last(), Some(&GENERATED_FOOTER));
        assert!(lines.contains(&"*color0: #000000"));
    }

    #[test]
    fn strip_generated_preserves_user_content() {
        let text = format!(
            "XTerm*font: fixed\n{}*color0: #000000\n",
            wrap_generated("#include \"old\"")
        );
        assert_eq!(strip_generated(&text), "XTerm*font: fixed\n*color0: #000000\n");
    }

    #[test]
    fn strip_generated_without_block_is_identity() {
        let text = "XTerm*font: fixed\n*background: #101010\n";
        assert_eq!(strip_generated(text), text);
    }

    #[test]
    fn strip_generated_terminates_an_unterminated_last_line() {
        let text = "XTerm*font: fixed\n*background: #101010";
        assert_eq!(
            strip_generated(text),
            "XTerm*font: fixed\n*background: #101010\n"
        );
    }

    #[test]
    fn replace_generated_swaps_old_block_for_new() {
        let original = format!("*background: #101010\n{}", wrap_generated("#include \"old\""));
        let replaced = replace_generated(&original, &include_statement("new"));
        assert!(!replaced.contains("old"));
        assert!(replaced.contains("#include \"new\""));
        assert!(replaced.starts_with("*background: #101010\n"));
        // Replacing again is stable: one block, same contents.
        let again = replace_generated(&replaced, &include_statement("new"));
        assert_eq!(again, replaced);
    }
}
