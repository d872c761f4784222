//! Pre-built static bundle served when the dev server is down.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;

/// One file read out of the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleAsset {
    pub body: Bytes,
    pub content_type: String,
}

/// Read-only view of a build output directory.
#[derive(Debug, Clone)]
pub struct StaticBundle {
    root: PathBuf,
    index_document: String,
}

impl StaticBundle {
    pub fn new(root: impl Into<PathBuf>, index_document: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_document: index_document.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Exact lookup of `relative` below the bundle root.
    pub async fn get(&self, relative: &str) -> Option<BundleAsset> {
        let path = safe_join(&self.root, relative)?;
        read_file(&path).await
    }

    /// The bundle's root document.
    pub async fn index(&self) -> Option<BundleAsset> {
        self.get(&self.index_document).await
    }

    /// Exact lookup, then, when `spa_fallback` is set and the last segment
    /// has no extension, the root document.
    /// Paths that try to leave the root resolve to nothing at all.
    pub async fn resolve(&self, relative: &str, spa_fallback: bool) -> Option<BundleAsset> {
        let path = safe_join(&self.root, relative)?;
        if let Some(asset) = read_file(&path).await {
            return Some(asset);
        }
        if spa_fallback && is_client_route(relative) {
            tracing::debug!(path = %relative, "Serving root document for client-side route");
            return self.index().await;
        }
        None
    }
}

/// True when `relative` looks like a client-side route rather than a file.
pub fn is_client_route(relative: &str) -> bool {
    Path::new(relative).extension().is_none()
}

/// Join `relative` onto `root`, refusing anything that could escape it.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(path)
}

async fn read_file(path: &Path) -> Option<BundleAsset> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return None,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to stat bundle file");
            return None;
        }
    }

    match tokio::fs::read(path).await {
        Ok(body) => Some(BundleAsset {
            body: Bytes::from(body),
            content_type: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_owned(),
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read bundle file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scratch_dir;

    fn bundle() -> StaticBundle {
        let root = scratch_dir();
        std::fs::write(root.join("index.html"), "<div id=\"root\"></div>").unwrap();
        std::fs::create_dir_all(root.join("assets")).unwrap();
        std::fs::write(root.join("assets/app.js"), "console.log(1)").unwrap();
        StaticBundle::new(root, "index.html")
    }

    #[tokio::test]
    async fn test_exact_file_with_mime() {
        let bundle = bundle();
        let asset = bundle.get("assets/app.js").await.unwrap();
        assert_eq!(&asset.body[..], b"console.log(1)");
        assert!(asset.content_type.contains("javascript"));

        let index = bundle.index().await.unwrap();
        assert_eq!(index.content_type, "text/html");
    }

    #[tokio::test]
    async fn test_spa_fallback_only_for_extensionless_paths() {
        let bundle = bundle();

        let asset = bundle.resolve("dashboard", true).await.unwrap();
        assert_eq!(&asset.body[..], b"<div id=\"root\"></div>");

        assert!(bundle.resolve("missing.js", true).await.is_none());
        assert!(bundle.resolve("dashboard", false).await.is_none());
    }

    #[tokio::test]
    async fn test_directories_and_escapes_are_not_served() {
        let bundle = bundle();
        assert!(bundle.get("assets").await.is_none());
        assert!(bundle.get("../index.html").await.is_none());
        assert!(bundle.resolve("../../etc/passwd", true).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_bundle_root() {
        let bundle = StaticBundle::new(scratch_dir().join("dist"), "index.html");
        assert!(bundle.index().await.is_none());
        assert!(bundle.resolve("dashboard", true).await.is_none());
    }

    #[test]
    fn test_client_route_heuristic() {
        assert!(is_client_route("dashboard"));
        assert!(is_client_route("orders/42"));
        assert!(is_client_route("v1.2/orders"));
        assert!(!is_client_route("assets/app.css"));
        assert!(!is_client_route("favicon.ico"));
    }
}
