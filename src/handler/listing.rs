//! Directory listing page
//!
//! Rendered for directories that have no index file.

use crate::http::escape_html;
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use tokio::fs;

/// One row of the listing
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    is_dir: bool,
    is_symlink: bool,
}

impl Entry {
    /// Text shown to the user: directories end in `/`, symlinks in `@`
    fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Relative, percent-encoded link target
    fn href(&self) -> String {
        let encoded = urlencoding::encode(&self.name);
        if self.is_dir {
            format!("{encoded}/")
        } else {
            encoded.into_owned()
        }
    }
}

/// Render the HTML listing of `dir`, titled with the decoded request path
pub async fn render_listing(display_path: &str, dir: &Path) -> io::Result<String> {
    let mut entries = read_entries(dir).await?;
    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(render_page(display_path, &entries))
}

async fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let is_symlink = entry.file_type().await.is_ok_and(|t| t.is_symlink());
        // follow symlinks so a link to a directory still gets a trailing slash
        let is_dir = fs::metadata(entry.path()).await.is_ok_and(|m| m.is_dir());
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }
    Ok(entries)
}

fn render_page(display_path: &str, entries: &[Entry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");
    html.push_str("<hr>\n<ul>\n");
    for entry in entries {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(&entry.href()),
            escape_html(&entry.display_name())
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_dir: bool, is_symlink: bool) -> Entry {
        Entry {
            name: name.to_string(),
            is_dir,
            is_symlink,
        }
    }

    #[test]
    fn test_entry_names() {
        assert_eq!(entry("src", true, false).display_name(), "src/");
        assert_eq!(entry("src", true, false).href(), "src/");
        assert_eq!(entry("latest", true, true).display_name(), "latest@");
        assert_eq!(entry("latest", true, true).href(), "latest/");
        assert_eq!(entry("a b&c.txt", false, false).href(), "a%20b%26c.txt");
    }

    #[test]
    fn test_render_page_escapes() {
        let html = render_page("/<x>/", &[entry("<script>.js", false, false)]);
        assert!(html.contains("<title>Directory listing for /&lt;x&gt;/</title>"));
        assert!(html.contains("&lt;script&gt;.js</a>"));
        assert!(html.contains("href=\"%3Cscript%3E.js\""));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_render_listing_sorted_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beta.txt"), "").unwrap();
        std::fs::write(dir.path().join("Alpha.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("gamma")).unwrap();

        let html = render_listing("/", dir.path()).await.unwrap();
        let alpha = html.find("Alpha.txt").unwrap();
        let beta = html.find("beta.txt").unwrap();
        let gamma = html.find("gamma/").unwrap();
        assert!(alpha < beta && beta < gamma);
    }

    #[tokio::test]
    async fn test_render_listing_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(render_listing("/x/", &dir.path().join("x")).await.is_err());
    }
}
