//! Parses an HTTP directory-listing page (Apache/nginx `autoindex`-style) into the hrefs it
//! advertises. This is the "directory-listing parser" collaborator named by the design;
//! it's implemented here with a real HTML parser rather than regexing tag soup.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// One entry in a directory listing: its href, relative to the page's own URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub href: String,
    pub is_dir: bool,
}

/// Extract every `<a href="...">` from `body`, skipping parent-directory links (`../`),
/// absolute links leaving the listing (anything with a scheme or a leading `/`), and
/// same-page fragment links.
pub fn entries(body: &[u8]) -> Vec<Entry> {
    let text = String::from_utf8_lossy(body);
    let document = Html::parse_document(&text);

    document
        .select(&ANCHOR)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| !href.is_empty())
        .filter(|href| !href.starts_with('?') && !href.starts_with('#'))
        .filter(|href| !href.starts_with('/') && !href.contains("://"))
        .filter(|href| *href != "../" && *href != "..")
        .map(|href| Entry {
            is_dir: href.ends_with('/'),
            href: href.to_owned(),
        })
        .collect()
}

/// Does `body` look like an HTML directory listing that contains an entry named `name`
/// (exactly, ignoring a trailing slash)? Used by phase 2 to decide whether the recursive
/// download path should be taken.
pub fn contains_entry(body: &[u8], name: &str) -> bool {
    entries(body)
        .iter()
        .any(|e| e.href.trim_end_matches('/') == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <a href="../">../</a>
        <a href="HEAD">HEAD</a>
        <a href="branches/">branches/</a>
        <a href="?C=N;O=D">Name</a>
        <a href="/elsewhere">elsewhere</a>
        </body></html>
    "#;

    #[test]
    fn extracts_file_and_dir_entries_only() {
        let found = entries(LISTING.as_bytes());
        assert_eq!(
            found,
            vec![
                Entry {
                    href: "HEAD".into(),
                    is_dir: false
                },
                Entry {
                    href: "branches/".into(),
                    is_dir: true
                },
            ]
        );
    }

    #[test]
    fn detects_head_entry() {
        assert!(contains_entry(LISTING.as_bytes(), "HEAD"));
        assert!(!contains_entry(LISTING.as_bytes(), "objects"));
    }
}
