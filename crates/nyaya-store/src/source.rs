//! Loading extracted page text from disk.
//!
//! Two layouts are accepted:
//! - `.txt`: plain text with pages separated by form feed (`\x0c`), as
//!   written by `pdftotext`;
//! - `.json`: an array of `{"page": n, "text": "..."}` objects.

use std::path::Path;

use nyaya_core::Page;
use tracing::info;

use crate::StoreError;

const PAGE_BREAK: char = '\x0c';

/// Read the pages of a source document.
pub fn load_pages(path: &Path) -> Result<Vec<Page>, StoreError> {
    if !path.is_file() {
        return Err(StoreError::SourceNotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let pages = match ext.as_deref() {
        Some("txt") => split_pages(&std::fs::read_to_string(path)?),
        Some("json") => {
            let mut pages: Vec<Page> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            pages.sort_by_key(|p| p.page);
            pages
        }
        _ => return Err(StoreError::UnsupportedFormat(path.to_path_buf())),
    };

    if pages.is_empty() {
        return Err(StoreError::NoPages(path.to_path_buf()));
    }
    info!(path = %path.display(), pages = pages.len(), "loaded source document");
    Ok(pages)
}

/// Split form-feed separated text into 1-based pages. The empty piece after
/// a final form feed is not a page.
pub fn split_pages(text: &str) -> Vec<Page> {
    let text = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }
    text.split(PAGE_BREAK)
        .enumerate()
        .map(|(i, t)| Page::new(i as u32 + 1, t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_form_feed() {
        let pages = split_pages("first\x0csecond\x0c\x0cfourth\x0c");
        let numbers: Vec<u32> = pages.iter().map(|p| p.page).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(pages[1].text, "second");
        assert_eq!(pages[2].text, "");
    }

    #[test]
    fn text_without_breaks_is_one_page() {
        let pages = split_pages("1. Only clause.");
        assert_eq!(pages, vec![Page::new(1, "1. Only clause.")]);
        assert!(split_pages("").is_empty());
    }

    #[test]
    fn loads_txt_and_json() {
        let dir = tempfile::TempDir::new().unwrap();

        let txt = dir.path().join("contract.txt");
        std::fs::write(&txt, "1. Term.\x0c2. Fees.").unwrap();
        assert_eq!(load_pages(&txt).unwrap().len(), 2);

        let json = dir.path().join("contract.JSON");
        std::fs::write(
            &json,
            r#"[{"page": 2, "text": "2. Fees."}, {"page": 1, "text": "1. Term."}]"#,
        )
        .unwrap();
        let pages = load_pages(&json).unwrap();
        assert_eq!(pages[0], Page::new(1, "1. Term."));
    }

    #[test]
    fn rejects_missing_and_unsupported() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            load_pages(&dir.path().join("absent.txt")),
            Err(StoreError::SourceNotFound(_))
        ));

        let pdf = dir.path().join("contract.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();
        assert!(matches!(
            load_pages(&pdf),
            Err(StoreError::UnsupportedFormat(_))
        ));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "[]").unwrap();
        assert!(matches!(load_pages(&empty), Err(StoreError::NoPages(_))));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(load_pages(&bad), Err(StoreError::Json(_))));
    }
}
