//! Directory-listing extraction.
//!
//! The repository's list endpoint answers with an HTML index page; the only
//! structure we rely on is that every entry appears as an anchor tag whose
//! text node is the entry name, with a trailing `/` marking directories.
//! That transport detail stays contained in this module.

use std::sync::OnceLock;

use regex::Regex;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b[^>]*>([^<]*)</a>").expect("static regex"))
}

/// Extract listing entries from an index page.
///
/// Anchor text nodes are trimmed; empty ones and parent-directory links are
/// skipped. Order follows document order.
pub fn parse_entries(html: &str) -> Vec<Entry> {
    let mut out = Vec::new();
    for cap in anchor_re().captures_iter(html) {
        let text = cap[1].trim();
        if text.is_empty() || text == ".." || text == "../" {
            continue;
        }
        let is_dir = text.ends_with('/');
        let name = text.trim_end_matches('/').to_string();
        if name.is_empty() {
            continue;
        }
        out.push(Entry { name, is_dir });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_files_and_directories_in_document_order() {
        let html = r#"
            <html><body><h1>Index of /pkgs</h1>
            <a href="../">../</a>
            <a href="docs/">docs/</a>
            <a href="tool-1.0.tar.gz">tool-1.0.tar.gz</a>
            <A HREF="tool-1.1.tar.gz" class="x">tool-1.1.tar.gz</A>
            </body></html>
        "#;
        let entries = parse_entries(html);
        assert_eq!(
            entries,
            vec![
                Entry { name: "docs".into(), is_dir: true },
                Entry { name: "tool-1.0.tar.gz".into(), is_dir: false },
                Entry { name: "tool-1.1.tar.gz".into(), is_dir: false },
            ]
        );
    }

    #[test]
    fn ignores_empty_anchors_and_non_anchor_markup() {
        let html = "<a href='x'>  </a><b>bold</b><p>tool</p>";
        assert!(parse_entries(html).is_empty());
    }

    #[test]
    fn whitespace_around_names_is_trimmed() {
        let entries = parse_entries("<a href='f'>\n  file.txt \n</a>");
        assert_eq!(entries[0].name, "file.txt");
        assert!(!entries[0].is_dir);
    }
}
