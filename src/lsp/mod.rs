//! In-process completion: no JSON-RPC, no transport.
//!
//! Uses `lsp-types` for the data it hands back (`CompletionItem`, `Position`)
//! so any host can forward results unchanged. One request runs as:
//! build a [`Context`] at the cursor, resolve it against the workspace (the
//! only suspension point), then poll the registered [`Finder`]s.

pub mod context;
pub mod finder;

use std::sync::Arc;

use lsp_types::{CompletionItem, Position};
use tracing::debug;

use crate::config::{FinderMode, Settings};
use crate::reflection::error::ReflectionResult;
use crate::reflection::Workspace;

pub use context::{Context, ResolvedContext};
pub use finder::{default_finders, Classes, Finder};

/// Completion entry point shared by every request against one workspace.
pub struct CompletionService {
    workspace: Arc<dyn Workspace>,
    settings: Settings,
    finders: Vec<Box<dyn Finder>>,
}

impl CompletionService {
    pub fn new(workspace: Arc<dyn Workspace>, settings: Settings) -> Self {
        let finders = default_finders(&workspace, &settings);
        Self::with_finders(workspace, settings, finders)
    }

    pub fn with_finders(
        workspace: Arc<dyn Workspace>,
        settings: Settings,
        finders: Vec<Box<dyn Finder>>,
    ) -> Self {
        Self {
            workspace,
            settings,
            finders,
        }
    }

    /// Completion items for the cursor at byte `offset` of `text`.
    ///
    /// `Ok(None)` when no finder applies. Workspace errors are returned
    /// unchanged and never retried.
    pub async fn complete(
        &self,
        filename: &str,
        text: &str,
        offset: usize,
    ) -> ReflectionResult<Option<Vec<CompletionItem>>> {
        let ctx = Context::new(text, offset)
            .resolve(self.workspace.as_ref(), filename, offset)
            .await?;
        Ok(self.poll(&ctx))
    }

    /// Run the matching finders against a resolved context.
    pub fn poll(&self, ctx: &ResolvedContext) -> Option<Vec<CompletionItem>> {
        let mut result: Option<Vec<CompletionItem>> = None;
        for finder in self.finders.iter().filter(|f| f.matches(ctx)) {
            let Some(items) = finder.find(ctx) else {
                debug!(finder = finder.name(), "no data source");
                continue;
            };
            debug!(finder = finder.name(), items = items.len(), "matched");

            let merged = result.get_or_insert_with(Vec::new);
            merged.extend(items);
            if self.settings.finder_mode == FinderMode::First && !merged.is_empty() {
                break;
            }
        }

        if let Some(items) = result.as_mut() {
            items.truncate(self.settings.max_suggestion_size);
        }
        result
    }
}

/// Byte offset of an LSP position (UTF-16 columns).
///
/// Columns past the end of a line clamp to the line end; lines past the end
/// of the text clamp to the text end.
pub fn offset_at(text: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }

    let mut line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |i| line_start + i);
    if text[line_start..line_end].ends_with('\r') {
        line_end -= 1;
    }

    let mut units = 0;
    for (i, ch) in text[line_start..line_end].char_indices() {
        if units >= position.character {
            return line_start + i;
        }
        units += ch.len_utf16() as u32;
    }
    line_end
}
