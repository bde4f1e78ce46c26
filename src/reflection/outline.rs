//! Shallow declaration outline built on the token chain.
//!
//! Walks the tokens once, tracking brace depth, and records namespaces, `use`
//! imports, class/interface/trait declarations (with their doc summary) and
//! methods. Everything else is skipped. Unbalanced braces or a truncated file
//! leave the open blocks running to the end of the text.

use std::ops::Range;
use std::sync::Arc;

use super::{Class, DeclKind, Doc, File, Method, Namespace, UseAlias};
use crate::lexer::{TokenChain, TokenKind, TokenRef};

/// Reflect `text` into a [`File`] named `filename`.
pub fn reflect(filename: &str, text: &str) -> File {
    let chain = TokenChain::new(text);
    let mut outline = Outline::new(text.len());
    let mut token = chain.at(0);
    while token.kind() != TokenKind::EndOfInput {
        token = outline.visit(token).next();
    }
    outline.finish(filename)
}

/// A block waiting for, or inside, its `{ ... }` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Namespace(usize),
    Class(usize),
    Method(usize),
    Other,
}

struct NamespaceDraft {
    name: String,
    start: usize,
    end: Option<usize>,
    /// Brace depth of the body; 0 for `namespace Foo;` style.
    body_depth: usize,
    uses: Vec<UseAlias>,
}

struct ClassDraft {
    name: String,
    kind: DeclKind,
    namespace: usize,
    doc: Option<Doc>,
    start: usize,
    end: Option<usize>,
}

struct MethodDraft {
    name: String,
    class: usize,
    start: usize,
    end: Option<usize>,
}

struct Outline {
    len: usize,
    depth: usize,
    /// Open blocks with the depth their `{` opened.
    open: Vec<(Block, usize)>,
    awaiting_body: Option<Block>,
    pending_doc: Option<Doc>,
    after_scope_operator: bool,
    current_namespace: usize,
    namespaces: Vec<NamespaceDraft>,
    classes: Vec<ClassDraft>,
    methods: Vec<MethodDraft>,
}

impl Outline {
    fn new(len: usize) -> Self {
        Self {
            len,
            depth: 0,
            open: Vec::new(),
            awaiting_body: None,
            pending_doc: None,
            after_scope_operator: false,
            current_namespace: 0,
            // Code before any namespace declaration lives in the global one.
            namespaces: vec![NamespaceDraft {
                name: String::new(),
                start: 0,
                end: None,
                body_depth: 0,
                uses: Vec::new(),
            }],
            classes: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Handle one token, returning the last token consumed.
    fn visit<'a>(&mut self, token: TokenRef<'a>) -> TokenRef<'a> {
        let after_scope_operator = std::mem::replace(
            &mut self.after_scope_operator,
            token.kind() == TokenKind::ScopeOperator,
        );

        match token.kind() {
            TokenKind::Comment => {
                if let Some(doc) = Doc::from_comment(token.text()) {
                    self.pending_doc = Some(doc);
                }
                token
            }
            TokenKind::Keyword if !after_scope_operator => self.keyword(token),
            TokenKind::Symbol => {
                match token.text() {
                    "{" => self.open_brace(),
                    "}" => self.close_brace(token.end()),
                    ";" => self.end_statement(token.end()),
                    _ => {}
                }
                token
            }
            _ => token,
        }
    }

    fn keyword<'a>(&mut self, token: TokenRef<'a>) -> TokenRef<'a> {
        let word = token.text().to_ascii_lowercase();
        match word.as_str() {
            "namespace" if self.depth == 0 => self.namespace(token),
            "use" if self.in_namespace_body() => self.use_statement(token),
            "class" | "interface" | "trait" => {
                let kind = match word.as_str() {
                    "interface" => DeclKind::Interface,
                    "trait" => DeclKind::Trait,
                    _ => DeclKind::Class,
                };
                self.class_like(token, kind)
            }
            "function" => self.method(token),
            _ => token,
        }
    }

    fn namespace<'a>(&mut self, keyword: TokenRef<'a>) -> TokenRef<'a> {
        // `namespace\foo()` is a relative name, not a declaration.
        let first = keyword.next();
        if first.text() == "\\" {
            return keyword;
        }
        // `namespace {` opens the global namespace.
        let (name, last) = qualified_name(first).unwrap_or_else(|| (String::new(), keyword));

        self.close_namespace(keyword.start());
        self.namespaces.push(NamespaceDraft {
            name: name.trim_start_matches('\\').to_string(),
            start: keyword.start(),
            end: None,
            body_depth: 0,
            uses: Vec::new(),
        });
        self.current_namespace = self.namespaces.len() - 1;

        let terminator = last.next();
        if terminator.text() == "{" {
            self.awaiting_body = Some(Block::Namespace(self.current_namespace));
        }
        last
    }

    /// End an unbraced namespace where the next declaration starts.
    fn close_namespace(&mut self, at: usize) {
        let current = &mut self.namespaces[self.current_namespace];
        if current.end.is_none() && current.body_depth == 0 {
            current.end = Some(at);
        }
    }

    fn in_namespace_body(&self) -> bool {
        let ns = &self.namespaces[self.current_namespace];
        ns.end.is_none() && self.depth == ns.body_depth
    }

    fn use_statement<'a>(&mut self, keyword: TokenRef<'a>) -> TokenRef<'a> {
        let mut cursor = keyword;
        // `use function ...` / `use const ...` import non-class symbols.
        if matches!(keyword.next().kind(), TokenKind::Keyword) {
            return keyword;
        }
        loop {
            let Some((name, last)) = qualified_name(cursor.next()) else {
                return cursor;
            };
            if name.ends_with('\\') {
                // Group use (`use A\{B, C}`) is not tracked.
                return cursor;
            }
            let full_name = name.trim_start_matches('\\').to_string();
            let mut end = last;
            let alias = if end.next().text().eq_ignore_ascii_case("as") {
                let alias = end.next().next();
                end = alias;
                alias.text().to_string()
            } else {
                full_name
                    .rsplit('\\')
                    .next()
                    .unwrap_or(full_name.as_str())
                    .to_string()
            };
            if !alias.is_empty() {
                self.namespaces[self.current_namespace]
                    .uses
                    .push(UseAlias { alias, full_name });
            }
            let separator = end.next();
            if separator.text() != "," {
                return end;
            }
            cursor = separator;
        }
    }

    fn class_like<'a>(&mut self, keyword: TokenRef<'a>, kind: DeclKind) -> TokenRef<'a> {
        let name = keyword.next();
        // Anonymous classes (`new class {`) have no name.
        if name.kind() != TokenKind::Identifier {
            return keyword;
        }
        self.classes.push(ClassDraft {
            name: name.text().to_string(),
            kind,
            namespace: self.current_namespace,
            doc: self.pending_doc.take(),
            start: keyword.start(),
            end: None,
        });
        self.awaiting_body = Some(Block::Class(self.classes.len() - 1));
        name
    }

    fn method<'a>(&mut self, keyword: TokenRef<'a>) -> TokenRef<'a> {
        let Some(&(Block::Class(class), class_depth)) = self.open.last() else {
            return keyword;
        };
        if self.depth != class_depth {
            return keyword;
        }
        let mut name = keyword.next();
        if name.text() == "&" {
            name = name.next();
        }
        if !matches!(name.kind(), TokenKind::Identifier | TokenKind::Keyword) {
            return keyword;
        }
        self.pending_doc = None;
        self.methods.push(MethodDraft {
            name: name.text().to_string(),
            class,
            start: keyword.start(),
            end: None,
        });
        self.awaiting_body = Some(Block::Method(self.methods.len() - 1));
        name
    }

    fn open_brace(&mut self) {
        self.depth += 1;
        let block = self.awaiting_body.take().unwrap_or(Block::Other);
        if let Block::Namespace(index) = block {
            self.namespaces[index].body_depth = self.depth;
        }
        self.open.push((block, self.depth));
        self.pending_doc = None;
    }

    fn close_brace(&mut self, end: usize) {
        if let Some(&(block, depth)) = self.open.last() {
            if depth == self.depth {
                self.open.pop();
                match block {
                    Block::Namespace(index) => self.namespaces[index].end = Some(end),
                    Block::Class(index) => self.classes[index].end = Some(end),
                    Block::Method(index) => self.methods[index].end = Some(end),
                    Block::Other => {}
                }
            }
        }
        self.depth = self.depth.saturating_sub(1);
        self.pending_doc = None;
    }

    fn end_statement(&mut self, end: usize) {
        // Abstract and interface methods end at their `;`.
        if let Some(Block::Method(index)) = self.awaiting_body {
            self.methods[index].end = Some(end);
        }
        if !matches!(self.awaiting_body, Some(Block::Namespace(_))) {
            self.awaiting_body = None;
        }
        self.pending_doc = None;
    }

    fn finish(self, filename: &str) -> File {
        let len = self.len;
        let span = |start: usize, end: Option<usize>| -> Range<usize> { start..end.unwrap_or(len) };

        let classes: Vec<Arc<Class>> = self
            .classes
            .iter()
            .map(|draft| {
                let namespace = self.namespaces[draft.namespace].name.clone();
                let full_name = if namespace.is_empty() {
                    draft.name.clone()
                } else {
                    format!("{namespace}\\{}", draft.name)
                };
                Arc::new(Class {
                    name: draft.name.clone(),
                    full_name,
                    kind: draft.kind,
                    namespace,
                    doc: draft.doc.clone(),
                    span: span(draft.start, draft.end),
                })
            })
            .collect();

        let methods = self
            .methods
            .into_iter()
            .map(|draft| {
                Arc::new(Method {
                    name: draft.name,
                    class: classes[draft.class].full_name.clone(),
                    span: span(draft.start, draft.end),
                })
            })
            .collect();

        let namespaces = self
            .namespaces
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                Arc::new(Namespace {
                    name: draft.name,
                    span: span(draft.start, draft.end),
                    uses: draft.uses,
                    classes: self
                        .classes
                        .iter()
                        .zip(&classes)
                        .filter(|(d, _)| d.namespace == index)
                        .map(|(_, c)| Arc::clone(c))
                        .collect(),
                })
            })
            .collect();

        File {
            name: filename.to_string(),
            len,
            namespaces,
            classes,
            methods,
        }
    }
}

/// Read `Foo\Bar\Baz` (optionally with a leading `\`) starting at `first`.
///
/// Returns the name and the last token it covers, or `None` when `first`
/// does not start a name.
fn qualified_name(first: TokenRef<'_>) -> Option<(String, TokenRef<'_>)> {
    let mut name = String::new();
    let mut last: Option<TokenRef<'_>> = None;
    let mut token = first;
    loop {
        let accept = if token.text() == "\\" {
            !name.ends_with('\\')
        } else if name.is_empty() {
            token.kind() == TokenKind::Identifier
        } else {
            // Keywords are fine as inner segments, e.g. `App\Trait`.
            name.ends_with('\\')
                && matches!(token.kind(), TokenKind::Identifier | TokenKind::Keyword)
        };
        if !accept {
            break;
        }
        // Names must be contiguous.
        if let Some(prev) = last {
            if prev.end() != token.start() {
                break;
            }
        }
        name.push_str(token.text());
        last = Some(token);
        token = token.next();
    }
    last.filter(|_| name != "\\").map(|last| (name, last))
}
