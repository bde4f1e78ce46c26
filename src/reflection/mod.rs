//! Reflection: what the completion core knows about declared code.
//!
//! The core only reads through this module: a [`Workspace`] hands out
//! reflected [`File`]s, a file answers "which scope encloses this offset",
//! and a [`Namespace`] resolves names against its `use` imports.
//!
//! [`outline`] builds files from source text and [`workspace::MemoryWorkspace`]
//! keeps them in memory. Both are deliberately shallow; a richer reflection
//! engine plugs in by implementing [`Workspace`].

pub mod error;
pub mod outline;
pub mod workspace;

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use error::ReflectionResult;

/// Flavour of a class-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Class,
    Interface,
    Trait,
}

/// Documentation attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doc {
    pub summary: String,
}

impl Doc {
    /// Extract the summary line of a `/** ... */` doc block.
    ///
    /// The summary is the first non-empty line that is not an `@tag`.
    pub fn from_comment(comment: &str) -> Option<Self> {
        let body = comment.strip_prefix("/**")?;
        let body = body.strip_suffix("*/").unwrap_or(body);
        body.lines()
            .map(|line| line.trim().trim_start_matches('*').trim())
            .find(|line| !line.is_empty() && !line.starts_with('@'))
            .map(|line| Doc {
                summary: line.to_string(),
            })
    }
}

/// A class, interface or trait declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// Short name, e.g. `Bar`.
    pub name: String,
    /// Fully-qualified name without leading backslash, e.g. `Foo\Bar`.
    pub full_name: String,
    pub kind: DeclKind,
    /// Name of the declaring namespace (empty for the global namespace).
    pub namespace: String,
    pub doc: Option<Doc>,
    pub span: Range<usize>,
}

/// A method declared inside a class-like body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    /// Fully-qualified name of the declaring class-like.
    pub class: String,
    pub span: Range<usize>,
}

/// One `use Foo\Bar as Alias;` import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseAlias {
    pub alias: String,
    pub full_name: String,
}

/// A namespace block with its imports and declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Empty for the global namespace.
    pub name: String,
    pub span: Range<usize>,
    pub uses: Vec<UseAlias>,
    pub classes: Vec<Arc<Class>>,
}

impl Namespace {
    pub fn is_global(&self) -> bool {
        self.name.is_empty()
    }

    /// Resolve a (possibly partial, possibly qualified) name to a
    /// fully-qualified one.
    ///
    /// `\A\B` is already qualified; otherwise a first segment matching an
    /// import alias is replaced by the imported name, and anything else is
    /// prefixed with this namespace.
    pub fn fqn(&self, name: &str) -> String {
        if let Some(absolute) = name.strip_prefix('\\') {
            return absolute.to_string();
        }
        let (head, tail) = match name.split_once('\\') {
            Some((head, tail)) => (head, Some(tail)),
            None => (name, None),
        };
        if let Some(import) = self
            .uses
            .iter()
            .find(|u| u.alias.eq_ignore_ascii_case(head))
        {
            return match tail {
                Some(tail) => format!("{}\\{tail}", import.full_name),
                None => import.full_name.clone(),
            };
        }
        if self.is_global() {
            name.to_string()
        } else {
            format!("{}\\{name}", self.name)
        }
    }

    /// Classes declared directly in this namespace.
    pub fn classes(&self) -> &[Arc<Class>] {
        &self.classes
    }

    /// The alias under which `full_name` is imported, if any.
    pub fn find_alias(&self, full_name: &str) -> Option<&str> {
        let full_name = full_name.trim_start_matches('\\');
        self.uses
            .iter()
            .find(|u| u.full_name.eq_ignore_ascii_case(full_name))
            .map(|u| u.alias.as_str())
    }
}

/// Lexical scope around an offset. Every handle is optional.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub namespace: Option<Arc<Namespace>>,
    pub class: Option<Arc<Class>>,
    pub trait_: Option<Arc<Class>>,
    pub method: Option<Arc<Method>>,
}

/// A reflected source file.
#[derive(Debug, Clone, Default)]
pub struct File {
    /// Workspace-relative name.
    pub name: String,
    /// Length of the reflected text; unterminated blocks end here.
    pub len: usize,
    pub namespaces: Vec<Arc<Namespace>>,
    pub classes: Vec<Arc<Class>>,
    pub methods: Vec<Arc<Method>>,
}

impl File {
    /// The innermost namespace, class-like and method enclosing `offset`.
    pub fn scope_at(&self, offset: usize) -> Scope {
        let namespace = self
            .namespaces
            .iter()
            .filter(|ns| self.covers(&ns.span, offset))
            .max_by_key(|ns| ns.span.start)
            .cloned();

        let container = self
            .classes
            .iter()
            .filter(|c| self.covers(&c.span, offset))
            .max_by_key(|c| c.span.start);

        let method = container.and_then(|class| {
            self.methods
                .iter()
                .filter(|m| m.class == class.full_name && self.covers(&m.span, offset))
                .max_by_key(|m| m.span.start)
                .cloned()
        });

        let (class, trait_) = match container {
            Some(c) if c.kind == DeclKind::Trait => (None, Some(Arc::clone(c))),
            Some(c) => (Some(Arc::clone(c)), None),
            None => (None, None),
        };

        Scope {
            namespace,
            class,
            trait_,
            method,
        }
    }

    /// Half-open containment, except that a span running to the end of the
    /// file also covers the end-of-file offset.
    fn covers(&self, span: &Range<usize>, offset: usize) -> bool {
        span.contains(&offset) || (offset == span.end && span.end == self.len)
    }
}

/// The reflection engine as seen by the completion core.
///
/// Implementations own their storage and synchronization; the core never
/// mutates what it reads.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// An already reflected file, if the workspace knows it.
    fn get_file(&self, filename: &str) -> Option<Arc<File>>;

    /// (Re)reflect `text` under `filename` and return the result.
    async fn sync(&self, filename: &str, text: &str) -> ReflectionResult<Arc<File>>;

    /// Declarations of `kind` whose fully-qualified name starts with
    /// `pattern`, best matches first, at most `limit` of them.
    fn search_by_name(&self, kind: DeclKind, pattern: &str, limit: usize) -> Vec<Arc<Class>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace(name: &str, uses: &[(&str, &str)]) -> Namespace {
        Namespace {
            name: name.into(),
            span: 0..100,
            uses: uses
                .iter()
                .map(|(alias, full)| UseAlias {
                    alias: (*alias).into(),
                    full_name: (*full).into(),
                })
                .collect(),
            classes: Vec::new(),
        }
    }

    #[test]
    fn fqn_prefixes_current_namespace() {
        let ns = namespace("App\\Http", &[]);
        assert_eq!(ns.fqn("Request"), "App\\Http\\Request");
        assert_eq!(ns.fqn("Sub\\Thing"), "App\\Http\\Sub\\Thing");
    }

    #[test]
    fn fqn_keeps_absolute_names() {
        let ns = namespace("App", &[]);
        assert_eq!(ns.fqn("\\DateTime"), "DateTime");
    }

    #[test]
    fn fqn_expands_imports() {
        let ns = namespace("App", &[("B", "Foo\\Bar"), ("Model", "Db\\Model")]);
        assert_eq!(ns.fqn("B"), "Foo\\Bar");
        assert_eq!(ns.fqn("model\\User"), "Db\\Model\\User");
        assert_eq!(ns.fqn("Ba"), "App\\Ba");
    }

    #[test]
    fn fqn_in_global_namespace() {
        let ns = namespace("", &[]);
        assert_eq!(ns.fqn("Foo"), "Foo");
    }

    #[test]
    fn find_alias_matches_full_name() {
        let ns = namespace("App", &[("B", "Foo\\Bar")]);
        assert_eq!(ns.find_alias("Foo\\Bar"), Some("B"));
        assert_eq!(ns.find_alias("\\foo\\bar"), Some("B"));
        assert_eq!(ns.find_alias("Foo\\Baz"), None);
    }

    #[test]
    fn doc_summary_skips_tags_and_stars() {
        let doc = Doc::from_comment("/**\n * @internal\n *\n * Handles requests.\n * More.\n */");
        assert_eq!(doc.map(|d| d.summary), Some("Handles requests.".to_string()));
        assert_eq!(Doc::from_comment("/* plain */"), None);
        assert_eq!(
            Doc::from_comment("/** One liner */").map(|d| d.summary),
            Some("One liner".to_string())
        );
    }

    #[test]
    fn scope_prefers_innermost_declarations() {
        let class = Arc::new(Class {
            name: "A".into(),
            full_name: "App\\A".into(),
            kind: DeclKind::Class,
            namespace: "App".into(),
            doc: None,
            span: 10..50,
        });
        let trait_decl = Arc::new(Class {
            name: "T".into(),
            full_name: "App\\T".into(),
            kind: DeclKind::Trait,
            namespace: "App".into(),
            doc: None,
            span: 60..80,
        });
        let method = Arc::new(Method {
            name: "run".into(),
            class: "App\\A".into(),
            span: 20..40,
        });
        let file = File {
            name: "a.php".into(),
            len: 100,
            namespaces: vec![Arc::new(namespace("App", &[]))],
            classes: vec![class, trait_decl],
            methods: vec![method],
        };

        let inside = file.scope_at(25);
        assert_eq!(inside.class.map(|c| c.name.clone()), Some("A".into()));
        assert_eq!(inside.method.map(|m| m.name.clone()), Some("run".into()));
        assert!(inside.trait_.is_none());

        let body = file.scope_at(45);
        assert!(body.class.is_some());
        assert!(body.method.is_none());

        let in_trait = file.scope_at(70);
        assert!(in_trait.class.is_none());
        assert_eq!(in_trait.trait_.map(|t| t.name.clone()), Some("T".into()));

        let end = file.scope_at(100);
        assert_eq!(end.namespace.map(|n| n.name.clone()), Some("App".into()));
        assert!(end.class.is_none());
    }
}
