//! Read-only retrieval of markdown files by path.
//!
//! Serves the `get-markdown-file` tool: hand back a markdown file that a
//! previous conversion produced (or any markdown file already on disk),
//! optionally confined to a share root.
//!
//! Containment is judged per path component, so a share root of `/srv/md`
//! admits `/srv/md/notes/a.md` but not `/srv/mdx/a.md`. Both paths are made
//! absolute first. When both exist they are canonicalized as well, which
//! keeps a symlink inside the root from pointing the read outside it.

use crate::error::MarkdownifyError;
use crate::output::ConversionResult;
use crate::pipeline::input::normalize_path;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted by retrieval.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = [".md", ".markdown"];

/// Read the markdown file at `raw_path`.
///
/// Checks, in order: markdown extension (`InvalidInput`), existence as a
/// regular file (`NotFound`), share-root containment (`PermissionDenied`), UTF-8
/// content (`DecodeError`).
pub async fn get_markdown_file(
    raw_path: &str,
    share_root: Option<&Path>,
) -> Result<ConversionResult, MarkdownifyError> {
    let path = normalize_path(raw_path);

    if !has_markdown_extension(&path) {
        return Err(MarkdownifyError::invalid_input(
            "Required file is not a Markdown file.",
        ));
    }

    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(MarkdownifyError::NotFound { path });
    }

    if let Some(root) = share_root {
        if !is_within(&path, root).await {
            return Err(MarkdownifyError::PermissionDenied {
                path,
                root: root.to_path_buf(),
            });
        }
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MarkdownifyError::NotFound { path: path.clone() },
        _ => MarkdownifyError::from(e),
    })?;
    let text = String::from_utf8(bytes)
        .map_err(|_| MarkdownifyError::DecodeError { path: path.clone() })?;

    debug!("Read {} bytes from {}", text.len(), path.display());
    Ok(ConversionResult { path, text })
}

/// Whether the path string ends in `.md` or `.markdown`.
pub fn has_markdown_extension(path: &Path) -> bool {
    let s = path.to_string_lossy();
    MARKDOWN_EXTENSIONS.iter().any(|ext| s.ends_with(ext))
}

/// Whether `path` is `root` or lies beneath it.
async fn is_within(path: &Path, root: &Path) -> bool {
    let (Ok(abs_path), Ok(abs_root)) = (std::path::absolute(path), std::path::absolute(root))
    else {
        return false;
    };
    let abs_path = normalize_path(&abs_path.to_string_lossy());
    let abs_root = normalize_path(&abs_root.to_string_lossy());

    match (
        tokio::fs::canonicalize(&abs_path).await,
        tokio::fs::canonicalize(&abs_root).await,
    ) {
        (Ok(real_path), Ok(real_root)) => real_path.starts_with(&real_root),
        _ => lexically_within(&abs_path, &abs_root),
    }
}

/// Component-wise containment: the longest common path of the two must be
/// `root` itself.
pub fn lexically_within(path: &Path, root: &Path) -> bool {
    common_path(path, root).as_path() == root
}

fn common_path(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn containment_is_per_component() {
        let root = Path::new("/srv/md");
        assert!(lexically_within(Path::new("/srv/md/sub/file.md"), root));
        assert!(lexically_within(Path::new("/srv/md"), root));
        assert!(!lexically_within(Path::new("/srv/mdx/file.md"), root));
        assert!(!lexically_within(Path::new("/a/bcd"), Path::new("/a/bc")));
        assert!(!lexically_within(Path::new("/srv"), root));
    }

    #[test]
    fn markdown_extensions() {
        assert!(has_markdown_extension(Path::new("/x/a.md")));
        assert!(has_markdown_extension(Path::new("notes.markdown")));
        assert!(!has_markdown_extension(Path::new("/x/a.txt")));
        assert!(!has_markdown_extension(Path::new("/x/a.md.bak")));
        assert!(!has_markdown_extension(Path::new("/x/a.MD")));
    }

    #[tokio::test]
    async fn non_markdown_rejected_even_if_missing() {
        for p in ["/definitely/missing.txt", "/etc/hostname", "relative.pdf"] {
            let err = get_markdown_file(p, None).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{p}");
        }
    }

    #[tokio::test]
    async fn missing_markdown_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.md");
        let err = get_markdown_file(&path.to_string_lossy(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn directory_with_markdown_name_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::create_dir_all(&path).unwrap();
        let err = get_markdown_file(&path.to_string_lossy(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn reads_file_inside_share_root() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("md/sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("file.md"), "# inside\n").unwrap();

        let root = dir.path().join("md");
        let raw = format!("{}/sub/../sub/./file.md", root.display());
        let got = get_markdown_file(&raw, Some(&root)).await.unwrap();
        assert_eq!(got.text, "# inside\n");
        assert_eq!(got.path, sub.join("file.md"));
    }

    #[tokio::test]
    async fn sibling_with_shared_prefix_is_denied() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("md");
        let sibling = dir.path().join("mdx");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&sibling).unwrap();
        std::fs::write(sibling.join("file.md"), "secret").unwrap();

        let err = get_markdown_file(&sibling.join("file.md").to_string_lossy(), Some(&root))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn dotdot_escape_is_denied() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("md");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(dir.path().join("outside.md"), "x").unwrap();

        let raw = format!("{}/../outside.md", root.display());
        let err = get_markdown_file(&raw, Some(&root)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_out_of_root_is_denied() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("md");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(dir.path().join("secret.md"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("secret.md"), root.join("link.md")).unwrap();

        let err = get_markdown_file(&root.join("link.md").to_string_lossy(), Some(&root))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn invalid_utf8_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.md");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let err = get_markdown_file(&path.to_string_lossy(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }
}
