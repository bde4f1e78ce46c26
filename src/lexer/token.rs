//! Lazily materialized token chain.
//!
//! Completion requests land at arbitrary offsets, so tokens are only scanned
//! as far as a request needs them. A [`TokenChain`] starts from one token and
//! grows in either direction on demand. Tokens live by value in an arena;
//! neighbour links are indices into it, filled in the first time they are
//! followed and reused afterwards. A token is materialized once, whichever
//! direction reached it first.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use super::scan;

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    StringLiteral,
    Keyword,
    Symbol,
    Variable,
    Comment,
    /// `->` or `::`.
    ScopeOperator,
    /// `=` or `=>`.
    Assign,
    EndOfInput,
}

/// A classified `[start, end)` byte range of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }

    /// The covered slice of `source`; empty for `EndOfInput`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Index of a token inside its [`TokenChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(usize);

#[derive(Debug)]
struct Slot {
    token: Token,
    prev: Option<TokenId>,
    next: Option<TokenId>,
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    /// Tokens never overlap, so the start offset identifies a slot.
    by_start: BTreeMap<usize, TokenId>,
}

/// Arena of tokens scanned from one text, linked as they are discovered.
#[derive(Debug)]
pub struct TokenChain {
    text: Arc<str>,
    arena: RefCell<Arena>,
}

impl TokenChain {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            arena: RefCell::new(Arena::default()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle on the source text.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// The token under `offset`, as a forward walk from the start of the
    /// text would cut it.
    ///
    /// A cursor on whitespace, or past the end of the text, lands on the token
    /// before it. A cursor in leading whitespace lands on the first token.
    pub fn at(&self, offset: usize) -> TokenRef<'_> {
        let offset = scan::floor_boundary(&self.text, offset);
        let token = self.walk_to(offset);

        let guess = scan::parse_from(&self.text, scan::find_start(&self.text, offset));
        if guess != token {
            trace!(offset, ?guess, ?token, "boundary realigned");
        }
        self.get(self.intern(token))
    }

    pub fn get(&self, id: TokenId) -> TokenRef<'_> {
        TokenRef { chain: self, id }
    }

    /// Number of tokens materialized so far.
    pub fn materialized(&self) -> usize {
        self.arena.borrow().slots.len()
    }

    fn token(&self, id: TokenId) -> Token {
        self.arena.borrow().slots[id.0].token
    }

    /// Slot holding `token`, pushed if it was never materialized.
    fn intern(&self, token: Token) -> TokenId {
        let mut arena = self.arena.borrow_mut();
        if let Some(&id) = arena.by_start.get(&token.start) {
            return id;
        }
        let id = TokenId(arena.slots.len());
        arena.slots.push(Slot {
            token,
            prev: None,
            next: None,
        });
        arena.by_start.insert(token.start, id);
        id
    }

    /// Closest materialized token ending at or before `offset`.
    ///
    /// Every slot was cut by a forward walk, so scanning can resume from the
    /// end of any of them.
    fn anchor(&self, offset: usize) -> Option<Token> {
        let arena = self.arena.borrow();
        let anchor = arena
            .by_start
            .range(..offset)
            .rev()
            .map(|(_, id)| arena.slots[id.0].token)
            .find(|t| t.kind != TokenKind::EndOfInput && t.end <= offset);
        anchor
    }

    fn walk_to(&self, offset: usize) -> Token {
        let mut last = self.anchor(offset);
        let mut token = scan::parse_from(&self.text, last.map_or(0, |t| t.end));
        loop {
            if token.kind == TokenKind::EndOfInput || token.start > offset {
                return last.unwrap_or(token);
            }
            if offset < token.end {
                return token;
            }
            last = Some(token);
            token = scan::parse_from(&self.text, token.end);
        }
    }

    fn link(&self, prev: TokenId, next: TokenId) {
        let mut arena = self.arena.borrow_mut();
        arena.slots[prev.0].next = Some(next);
        arena.slots[next.0].prev = Some(prev);
    }

    fn next_of(&self, id: TokenId) -> TokenId {
        if let Some(next) = self.arena.borrow().slots[id.0].next {
            return next;
        }
        let token = self.token(id);
        if token.kind == TokenKind::EndOfInput {
            return id;
        }
        let next = self.intern(scan::parse_from(&self.text, token.end));
        self.link(id, next);
        next
    }

    fn previous_of(&self, id: TokenId) -> TokenId {
        if let Some(prev) = self.arena.borrow().slots[id.0].prev {
            return prev;
        }
        let Some(token) = self.locate_previous(self.token(id)) else {
            // First token of the text is its own predecessor.
            self.arena.borrow_mut().slots[id.0].prev = Some(id);
            return id;
        };
        let prev = self.intern(token);
        self.link(prev, id);
        prev
    }

    /// Last token of the forward walk that ends at or before `token` starts.
    ///
    /// Scanning backwards from `token` cannot tell code from the inside of a
    /// string or comment, so the walk resumes forward from the closest known
    /// boundary instead. Tokens straddling `token.start` are never returned.
    fn locate_previous(&self, token: Token) -> Option<Token> {
        let mut found = self.anchor(token.start);
        let mut candidate = scan::parse_from(&self.text, found.map_or(0, |t| t.end));
        while candidate.kind != TokenKind::EndOfInput && candidate.end <= token.start {
            found = Some(candidate);
            candidate = scan::parse_from(&self.text, candidate.end);
        }
        found
    }
}

/// Borrowed cursor on one token of a chain.
#[derive(Debug, Clone, Copy)]
pub struct TokenRef<'a> {
    chain: &'a TokenChain,
    id: TokenId,
}

impl<'a> TokenRef<'a> {
    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn token(&self) -> Token {
        self.chain.token(self.id)
    }

    pub fn kind(&self) -> TokenKind {
        self.token().kind
    }

    pub fn start(&self) -> usize {
        self.token().start
    }

    pub fn end(&self) -> usize {
        self.token().end
    }

    pub fn text(&self) -> &'a str {
        self.token().text(&self.chain.text)
    }

    /// The following token. `EndOfInput` is its own successor.
    pub fn next(&self) -> TokenRef<'a> {
        self.chain.get(self.chain.next_of(self.id))
    }

    /// The preceding token. The first token of the text is its own predecessor.
    pub fn previous(&self) -> TokenRef<'a> {
        self.chain.get(self.chain.previous_of(self.id))
    }
}

impl PartialEq for TokenRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.chain, other.chain) && self.id == other.id
    }
}

impl Eq for TokenRef<'_> {}
