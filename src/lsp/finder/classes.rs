//! Class name completion after `new` and `extends`.

use std::borrow::Cow;
use std::sync::Arc;

use lsp_types::{CompletionItem, CompletionItemKind, Documentation};
use tracing::debug;

use super::Finder;
use crate::lexer::TokenKind;
use crate::lsp::context::ResolvedContext;
use crate::reflection::{Class, DeclKind, Namespace, Workspace};

pub struct Classes {
    workspace: Arc<dyn Workspace>,
    max_suggestion_size: usize,
}

impl Classes {
    pub fn new(workspace: Arc<dyn Workspace>, max_suggestion_size: usize) -> Self {
        Self {
            workspace,
            max_suggestion_size,
        }
    }

    fn item(class: &Class, namespace: Option<&Namespace>) -> CompletionItem {
        CompletionItem {
            label: class.name.clone(),
            kind: Some(CompletionItemKind::CLASS),
            detail: Some(class.full_name.clone()),
            documentation: class
                .doc
                .as_ref()
                .map(|doc| Documentation::String(doc.summary.clone())),
            insert_text: Some(insert_text(class, namespace)),
            ..Default::default()
        }
    }
}

/// How `class` is spelled from inside `namespace`: short name when both live
/// in the same namespace, the `use` alias when imported, otherwise the FQN.
fn insert_text(class: &Class, namespace: Option<&Namespace>) -> String {
    match namespace {
        Some(ns) if ns.name.eq_ignore_ascii_case(&class.namespace) => class.name.clone(),
        Some(ns) => ns
            .find_alias(&class.full_name)
            .unwrap_or(&class.full_name)
            .to_string(),
        None => class.full_name.clone(),
    }
}

impl Finder for Classes {
    fn name(&self) -> &'static str {
        "classes"
    }

    fn matches(&self, ctx: &ResolvedContext) -> bool {
        let current = ctx.current();
        match current.kind() {
            TokenKind::Keyword => matches!(current.text(), "new" | "extends"),
            TokenKind::Identifier => current.previous().text() == "new",
            _ => false,
        }
    }

    fn find(&self, ctx: &ResolvedContext) -> Option<Vec<CompletionItem>> {
        debug_assert!(self.matches(ctx), "Classes::find without a class trigger");
        let current = ctx.current();
        let namespace = ctx.namespace();

        let candidates: Cow<'_, [Arc<Class>]> = if current.kind() == TokenKind::Identifier {
            let pattern = match namespace {
                Some(ns) => ns.fqn(current.text()),
                None => current.text().to_string(),
            };
            Cow::Owned(self.workspace.search_by_name(
                DeclKind::Class,
                &pattern,
                self.max_suggestion_size,
            ))
        } else {
            Cow::Borrowed(namespace?.classes())
        };

        // The workspace is asked for at most `max_suggestion_size` results,
        // but is not trusted to honour it.
        let items: Vec<CompletionItem> = candidates
            .iter()
            .take(self.max_suggestion_size)
            .map(|class| Self::item(class, namespace))
            .collect();
        debug!(
            finder = self.name(),
            candidates = candidates.len(),
            items = items.len(),
            "find"
        );
        Some(items)
    }
}
