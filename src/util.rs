//! Path and file helpers shared across the crate

use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::SitemillResult;

/// Normalize an addressable path: forward slashes, no leading slash.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    strip_leading_slash(&path).to_string()
}

/// Strip a single leading slash, if present.
pub fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Escape spaces in an addressable path so it stays URL-safe.
pub fn escape_spaces(path: &str) -> String {
    path.replace(' ', "%20")
}

/// Extension of an addressable path, with the leading dot (".css").
///
/// Returns an empty string for dotless file names and dotfiles.
pub fn path_ext(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx..],
        _ => "",
    }
}

/// Addressable path with its final extension removed.
pub fn strip_ext(path: &str) -> &str {
    let ext = path_ext(path);
    if ext.is_empty() {
        path
    } else {
        &path[..path.len() - ext.len()]
    }
}

/// Join a URL prefix and a path with exactly one slash between them.
pub fn join_url(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{}/{}", prefix, path)
    }
}

/// Recursive list of all files under a path, sorted for deterministic
/// traversal. A missing or non-directory root yields an empty list.
pub fn all_files_under(path: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    collect_files(path, &mut out);
    out.sort();
    out
}

fn collect_files(path: &Path, out: &mut Vec<PathBuf>) {
    if path.is_dir() {
        let Ok(entries) = std::fs::read_dir(path) else {
            return;
        };
        for entry in entries.flatten() {
            collect_files(&entry.path(), out);
        }
    } else if path.is_file() {
        out.push(path.to_path_buf());
    }
}

/// Write content to a file atomically via tempfile + rename, creating
/// parent directories first.
pub fn atomic_write(path: &Path, content: &[u8]) -> SitemillResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut file, content)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Compute the SHA-256 hash of content, "sha256:" prefixed.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{:x}", hasher.finalize())
}

/// Resolve a path against the current directory and squash `.`/`..`
/// components without touching the filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// MIME type for a dotted extension, from a small built-in table.
pub fn mime_type(ext: &str) -> Option<&'static str> {
    static TABLE: &[(&str, &str)] = &[
        (".html", "text/html"),
        (".htm", "text/html"),
        (".css", "text/css"),
        (".js", "application/javascript"),
        (".json", "application/json"),
        (".xml", "application/xml"),
        (".svg", "image/svg+xml"),
        (".svgz", "image/svg+xml"),
        (".txt", "text/plain"),
        (".md", "text/markdown"),
        (".csv", "text/csv"),
        (".yaml", "text/yaml"),
        (".yml", "text/yaml"),
        (".png", "image/png"),
        (".jpg", "image/jpeg"),
        (".jpeg", "image/jpeg"),
        (".gif", "image/gif"),
        (".bmp", "image/bmp"),
        (".ico", "image/x-icon"),
        (".webp", "image/webp"),
        (".pdf", "application/pdf"),
        (".zip", "application/zip"),
        (".gz", "application/gzip"),
        (".woff", "font/woff"),
        (".woff2", "font/woff2"),
        (".ttf", "font/ttf"),
        (".otf", "font/otf"),
        (".eot", "application/vnd.ms-fontobject"),
    ];
    // Linear scan; the table is small and lookups are not hot.
    TABLE.iter().find(|(e, _)| *e == ext).map(|(_, m)| *m)
}

/// Is the MIME type known to hold text?
pub fn nonbinary_mime(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime.contains("xml")
        || mime.contains("json")
        || mime.contains("javascript")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn normalize_strips_leading_slash() {
        assert_eq!(normalize_path("/about.html"), "about.html");
        assert_eq!(normalize_path("about.html"), "about.html");
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize_path("dir\\file.html"), "dir/file.html");
    }

    #[test]
    fn escape_spaces_percent_encodes() {
        assert_eq!(escape_spaces("my page.html"), "my%20page.html");
    }

    #[test]
    fn path_ext_basic() {
        assert_eq!(path_ext("style.css"), ".css");
        assert_eq!(path_ext("dir/app.min.js"), ".js");
        assert_eq!(path_ext("README"), "");
        assert_eq!(path_ext("dir/.htaccess"), "");
    }

    #[test]
    fn strip_ext_removes_final_extension() {
        assert_eq!(strip_ext("about.html.md"), "about.html");
        assert_eq!(strip_ext("about.html"), "about");
        assert_eq!(strip_ext("README"), "README");
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("/", "foo/"), "/foo/");
        assert_eq!(join_url("/", ""), "/");
        assert_eq!(join_url("/prefix", "foo"), "/prefix/foo");
        assert_eq!(join_url("/prefix/", "/foo"), "/prefix/foo");
    }

    #[test]
    fn all_files_under_missing_root_is_empty() {
        assert!(all_files_under(Path::new("/no/such/dir/anywhere")).is_empty());
    }

    #[test]
    fn all_files_under_is_sorted_and_recursive() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("b/two.txt"), "2").unwrap();
        std::fs::write(dir.path().join("a.txt"), "1").unwrap();

        let files = all_files_under(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.txt"));
        assert!(files[1].ends_with("b/two.txt"));
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deep/file.txt");

        atomic_write(&path, b"hello").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.txt");

        std::fs::write(&path, "old").unwrap();
        atomic_write(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn content_hash_is_prefixed() {
        let hash = content_hash(b"hello");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), 7 + 64);
    }

    #[test]
    fn mime_type_lookup() {
        assert_eq!(mime_type(".css"), Some("text/css"));
        assert_eq!(mime_type(".png"), Some("image/png"));
        assert_eq!(mime_type(".weird"), None);
    }

    #[test]
    fn nonbinary_mime_classification() {
        assert!(nonbinary_mime("text/html"));
        assert!(nonbinary_mime("application/json"));
        assert!(nonbinary_mime("application/javascript"));
        assert!(!nonbinary_mime("image/png"));
    }

    #[test]
    fn absolutize_squashes_dots() {
        let p = absolutize(Path::new("/a/b/../c/./d"));
        assert_eq!(p, PathBuf::from("/a/c/d"));
    }

    proptest! {
        #[test]
        fn normalize_path_is_idempotent(s in "[a-z/ .]{0,40}") {
            let once = normalize_path(&s);
            prop_assert_eq!(normalize_path(&once), once);
        }
    }
}
