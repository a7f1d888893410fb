use percent_encoding::percent_decode_str;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::config::SiteConfig;
use crate::http::response::StatusCode;

/// The file chosen to answer a request, and the status to answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    /// Absolute path inside the root
    pub path: PathBuf,
    /// `Ok` for the requested file, `NotFound` for the fallback
    pub status: StatusCode,
}

impl ResolvedResource {
    /// True when the requested file itself was found.
    pub fn exists(&self) -> bool {
        self.status == StatusCode::Ok
    }
}

#[derive(Debug)]
pub enum ResolveError {
    /// The fallback resource is gone from the root.
    FallbackMissing(PathBuf),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::FallbackMissing(path) => {
                write!(f, "fallback resource {} is missing", path.display())
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Root directory of the served tree.
#[derive(Debug, Clone)]
pub struct SiteRoot {
    root: PathBuf,
    index_file: String,
    not_found_file: String,
}

impl SiteRoot {
    /// `root` must already be canonical (see [`Config::validate`](crate::config::Config::validate)).
    pub fn new(root: PathBuf, site: &SiteConfig) -> Self {
        Self {
            root,
            index_file: site.index_file.clone(),
            not_found_file: site.not_found_file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a URL path to a file under the root.
    ///
    /// Only filesystem metadata is consulted; the file is not opened. Paths
    /// that do not name a regular file inside the root, including any attempt
    /// to climb out of it, resolve to the fallback resource with 404.
    pub async fn resolve(&self, url_path: &str) -> Result<ResolvedResource, ResolveError> {
        if let Some(path) = self.lookup(url_path).await {
            return Ok(ResolvedResource {
                path,
                status: StatusCode::Ok,
            });
        }

        let fallback = self.root.join(&self.not_found_file);
        match tokio::fs::metadata(&fallback).await {
            Ok(meta) if meta.is_file() => Ok(ResolvedResource {
                path: fallback,
                status: StatusCode::NotFound,
            }),
            _ => Err(ResolveError::FallbackMissing(fallback)),
        }
    }

    async fn lookup(&self, url_path: &str) -> Option<PathBuf> {
        let stripped = url_path.strip_prefix('/').unwrap_or(url_path);
        let decoded = percent_decode_str(stripped).decode_utf8().ok()?;

        let relative = if decoded.is_empty() {
            PathBuf::from(&self.index_file)
        } else {
            confined_relative_path(&decoded)?
        };

        let candidate = self.root.join(relative);
        let meta = tokio::fs::metadata(&candidate).await.ok()?;
        if !meta.is_file() {
            return None;
        }

        // Symlinks may still point outside the root
        let canonical = tokio::fs::canonicalize(&candidate).await.ok()?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(path = %url_path, "resolved outside the root, serving fallback");
            return None;
        }

        Some(canonical)
    }
}

/// Accepts only plain relative segments; `..`, absolute paths and NUL bytes
/// are rejected.
fn confined_relative_path(decoded: &str) -> Option<PathBuf> {
    if decoded.contains('\0') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(decoded).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative)
}
