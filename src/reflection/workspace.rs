//! In-memory workspace: reflected files keyed by workspace-relative name.
//!
//! Files enter through [`Workspace::sync`] (an editor buffer) or through
//! [`MemoryWorkspace::scan`] (the initial walk of the workspace root).
//! Class search scans every known file; there is no index and no on-disk cache.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::{ReflectionError, ReflectionResult};
use super::{outline, Class, DeclKind, File, Workspace};
use crate::config::Settings;

/// Summary of a workspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Files read and reflected.
    pub files: usize,
    /// Class-like declarations found in them.
    pub declarations: usize,
    /// Files filtered out by extension or exclude pattern.
    pub skipped: usize,
    /// Files that could not be read.
    pub failed: usize,
}

pub struct MemoryWorkspace {
    root: PathBuf,
    settings: Settings,
    files: RwLock<HashMap<String, Arc<File>>>,
}

impl MemoryWorkspace {
    pub fn new(root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            root: root.into(),
            settings,
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Turn a `file://` URI or absolute path into a workspace-relative name.
    ///
    /// Paths outside the root are returned unchanged (minus the scheme).
    pub fn resolve_uri(&self, uri: &str) -> String {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        match Path::new(path).strip_prefix(&self.root) {
            Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
            Err(_) => path.to_string(),
        }
    }

    /// Store a reflected file, replacing any previous version.
    pub fn insert(&self, file: File) -> Arc<File> {
        let file = Arc::new(file);
        self.files
            .write()
            .insert(file.name.clone(), Arc::clone(&file));
        file
    }

    /// Forget a file (e.g. deleted on disk).
    pub fn remove(&self, filename: &str) -> Option<Arc<File>> {
        self.files.write().remove(filename)
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Walk the root with the configured include/exclude globs and reflect
    /// every accepted file.
    ///
    /// Unreadable files are logged and counted, not fatal; a malformed glob
    /// pattern is.
    pub async fn scan(&self) -> ReflectionResult<ScanStats> {
        let excludes = self
            .settings
            .exclude
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let root = glob::Pattern::escape(&self.root.to_string_lossy());

        let mut stats = ScanStats::default();
        let mut seen = HashSet::new();
        for include in &self.settings.include {
            for entry in glob::glob(&format!("{root}/{include}"))? {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(error = %e, "unreadable path during scan");
                        stats.failed += 1;
                        continue;
                    }
                };
                if !path.is_file() {
                    continue;
                }
                let relative = self.resolve_uri(&path.to_string_lossy());
                if !seen.insert(relative.clone()) {
                    continue;
                }
                if !self.settings.accepts(&relative)
                    || excludes.iter().any(|p| p.matches(&relative))
                {
                    stats.skipped += 1;
                    continue;
                }

                debug!(file = %relative, "read");
                let text = match tokio::fs::read_to_string(&path).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(file = %relative, error = %e, "failed to read");
                        stats.failed += 1;
                        continue;
                    }
                };
                let file = self.sync(&relative, &text).await?;
                stats.files += 1;
                stats.declarations += file.classes.len();
            }
        }

        info!(
            files = stats.files,
            declarations = stats.declarations,
            skipped = stats.skipped,
            failed = stats.failed,
            "workspace scan complete"
        );
        Ok(stats)
    }
}

#[async_trait]
impl Workspace for MemoryWorkspace {
    fn get_file(&self, filename: &str) -> Option<Arc<File>> {
        self.files.read().get(filename).cloned()
    }

    async fn sync(&self, filename: &str, text: &str) -> ReflectionResult<Arc<File>> {
        if !self.settings.accepts(filename) {
            return Err(ReflectionError::UnsupportedFile(filename.to_string()));
        }
        let file = outline::reflect(filename, text);
        debug!(
            file = filename,
            namespaces = file.namespaces.len(),
            classes = file.classes.len(),
            "parse"
        );
        Ok(self.insert(file))
    }

    fn search_by_name(&self, kind: DeclKind, pattern: &str, limit: usize) -> Vec<Arc<Class>> {
        let needle = pattern.trim_start_matches('\\').to_ascii_lowercase();
        let mut found: Vec<(bool, String, Arc<Class>)> = self
            .files
            .read()
            .values()
            .flat_map(|file| file.classes.iter())
            .filter(|class| class.kind == kind)
            .filter_map(|class| {
                let key = class.full_name.to_ascii_lowercase();
                key.starts_with(&needle)
                    .then(|| (key != needle, key, Arc::clone(class)))
            })
            .collect();

        // Exact match first, then shorter names, then alphabetical.
        found.sort_by(|a, b| (a.0, a.1.len(), &a.1).cmp(&(b.0, b.1.len(), &b.1)));
        found.dedup_by(|a, b| a.1 == b.1);
        found.truncate(limit);
        found.into_iter().map(|(_, _, class)| class).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> MemoryWorkspace {
        MemoryWorkspace::new("/srv/app", Settings::default())
    }

    #[test]
    fn resolve_uri_strips_scheme_and_root() {
        let ws = workspace();
        assert_eq!(ws.resolve_uri("file:///srv/app/src/A.php"), "src/A.php");
        assert_eq!(ws.resolve_uri("/srv/app/B.php"), "B.php");
        assert_eq!(ws.resolve_uri("/elsewhere/C.php"), "/elsewhere/C.php");
        assert_eq!(ws.resolve_uri("src/D.php"), "src/D.php");
    }

    #[tokio::test]
    async fn sync_then_get_file() {
        let ws = workspace();
        assert!(ws.get_file("a.php").is_none());
        let file = ws.sync("a.php", "<?php class A {}").await.unwrap();
        assert_eq!(file.classes.len(), 1);
        let again = ws.get_file("a.php").expect("stored");
        assert!(Arc::ptr_eq(&file, &again));
        assert_eq!(ws.len(), 1);

        // Re-sync replaces the previous reflection.
        ws.sync("a.php", "<?php class A {} class B {}").await.unwrap();
        assert_eq!(ws.get_file("a.php").unwrap().classes.len(), 2);
        assert!(ws.remove("a.php").is_some());
        assert!(ws.is_empty());
    }

    #[tokio::test]
    async fn sync_rejects_unknown_extensions() {
        let ws = workspace();
        let err = ws.sync("notes.txt", "class A {}").await.unwrap_err();
        assert!(matches!(err, ReflectionError::UnsupportedFile(name) if name == "notes.txt"));
        assert!(ws.is_empty());
    }

    #[tokio::test]
    async fn search_ranks_and_limits() {
        let ws = workspace();
        ws.sync(
            "a.php",
            "<?php namespace App; class User {} class UserRepository {} class Users {} interface UserContract {}",
        )
        .await
        .unwrap();
        ws.sync("b.php", "<?php namespace Other; class User {}").await.unwrap();

        let names = |found: Vec<Arc<Class>>| -> Vec<String> {
            found.iter().map(|c| c.full_name.clone()).collect()
        };

        assert_eq!(
            names(ws.search_by_name(DeclKind::Class, "app\\user", 10)),
            vec!["App\\User", "App\\Users", "App\\UserRepository"]
        );
        assert_eq!(
            names(ws.search_by_name(DeclKind::Class, "\\App\\Users", 10)),
            vec!["App\\Users"]
        );
        assert_eq!(ws.search_by_name(DeclKind::Class, "App\\U", 2).len(), 2);
        assert_eq!(
            names(ws.search_by_name(DeclKind::Interface, "App", 10)),
            vec!["App\\UserContract"]
        );
    }

    #[tokio::test]
    async fn search_deduplicates_same_class_in_two_files() {
        let ws = workspace();
        ws.sync("a.php", "<?php class Dup {}").await.unwrap();
        ws.sync("b.php", "<?php class Dup {}").await.unwrap();
        assert_eq!(ws.search_by_name(DeclKind::Class, "Dup", 10).len(), 1);
    }

    #[tokio::test]
    async fn scan_reads_accepted_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/A.php"), "<?php namespace App; class A {} class B {}").unwrap();
        std::fs::write(root.join("src/README.md"), "# docs").unwrap();
        std::fs::write(root.join("node_modules/pkg/x.php"), "<?php class X {}").unwrap();

        let ws = MemoryWorkspace::new(root, Settings::default());
        let stats = ws.scan().await.unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.declarations, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.failed, 0);
        assert!(ws.get_file("src/A.php").is_some());
        assert!(ws.get_file("node_modules/pkg/x.php").is_none());
    }

    #[tokio::test]
    async fn scan_rejects_bad_patterns() {
        let settings = Settings {
            exclude: vec!["[".into()],
            ..Settings::default()
        };
        let ws = MemoryWorkspace::new("/tmp", settings);
        assert!(matches!(ws.scan().await, Err(ReflectionError::Pattern(_))));
    }
}
