//! Completion context: the token under the cursor and, once resolved, the
//! lexical scope around it.
//!
//! A [`Context`] is cheap and synchronous to build. Scope lookups are only
//! reachable through the [`ResolvedContext`] returned by [`Context::resolve`],
//! so nothing can read a scope that has not been resolved yet.

use std::sync::Arc;

use tracing::trace;

use crate::lexer::scan::{char_at, floor_boundary};
use crate::lexer::{TokenChain, TokenId, TokenRef};
use crate::reflection::error::ReflectionResult;
use crate::reflection::{File, Namespace, Scope, Workspace};

/// Per-request view of a buffer at a cursor offset.
#[derive(Debug)]
pub struct Context {
    offset: usize,
    ch: Option<char>,
    chain: TokenChain,
    current: TokenId,
}

impl Context {
    /// Scan the token that ends at (or contains) `offset`.
    pub fn new(text: impl Into<Arc<str>>, offset: usize) -> Self {
        let chain = TokenChain::new(text);
        let offset = floor_boundary(chain.text(), offset);
        let ch = char_at(chain.text(), offset);
        let current = chain.at(offset).id();
        Self {
            offset,
            ch,
            chain,
            current,
        }
    }

    pub fn text(&self) -> &str {
        self.chain.text()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Character at the cursor; `None` at end of text.
    pub fn char(&self) -> Option<char> {
        self.ch
    }

    pub fn current(&self) -> TokenRef<'_> {
        self.chain.get(self.current)
    }

    /// Look up the scope enclosing `offset` in `filename`.
    ///
    /// A file the workspace has never seen is synced from this context's text,
    /// not from disk. Workspace errors are returned as-is.
    pub async fn resolve(
        self,
        workspace: &dyn Workspace,
        filename: &str,
        offset: usize,
    ) -> ReflectionResult<ResolvedContext> {
        self.trace(filename);

        let file = match workspace.get_file(filename) {
            Some(file) => file,
            None => {
                let text = self.chain.shared_text();
                workspace.sync(filename, &text).await?
            }
        };
        let scope = file.scope_at(offset);

        Ok(ResolvedContext {
            context: self,
            scope,
            file,
        })
    }

    fn trace(&self, filename: &str) {
        let current = self.current();
        trace!(
            file = filename,
            offset = self.offset,
            char = ?self.ch,
            kind = ?current.kind(),
            token = current.text(),
            "resolve"
        );
    }
}

/// A [`Context`] whose scope has been looked up.
#[derive(Debug)]
pub struct ResolvedContext {
    context: Context,
    scope: Scope,
    file: Arc<File>,
}

impl ResolvedContext {
    pub fn current(&self) -> TokenRef<'_> {
        self.context.current()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn file(&self) -> &Arc<File> {
        &self.file
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.scope.namespace.as_deref()
    }

    pub fn in_namespace(&self) -> bool {
        self.scope.namespace.is_some()
    }

    pub fn in_class_or_trait(&self) -> bool {
        self.scope.class.is_some() || self.scope.trait_.is_some()
    }

    pub fn in_method(&self) -> bool {
        self.in_class_or_trait() && self.scope.method.is_some()
    }
}
