//! Completion finders.
//!
//! A finder recognises one completion trigger at the cursor and produces the
//! candidates for it. The service polls a fixed list of them, in order.

pub mod classes;

use std::sync::Arc;

use lsp_types::CompletionItem;

use super::context::ResolvedContext;
use crate::config::Settings;
use crate::reflection::Workspace;

pub use classes::Classes;

pub trait Finder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this finder's trigger holds at the cursor. Must be cheap.
    fn matches(&self, ctx: &ResolvedContext) -> bool;

    /// Candidates for a context accepted by [`Finder::matches`].
    ///
    /// `None` means there was nothing to search; `Some(vec![])` means the
    /// search ran and found nothing.
    fn find(&self, ctx: &ResolvedContext) -> Option<Vec<CompletionItem>>;
}

/// The finders every service starts with, in polling order.
pub fn default_finders(workspace: &Arc<dyn Workspace>, settings: &Settings) -> Vec<Box<dyn Finder>> {
    vec![Box::new(Classes::new(
        Arc::clone(workspace),
        settings.max_suggestion_size,
    ))]
}
