//! Embedding providers for the markup grammar.
//!
//! Both providers track tags through the token stream only. They never look
//! behind the current token, so a cold provider restarted at any offset where
//! it held no state behaves exactly like one that scanned from the top.

use std::sync::Arc;

use super::scan::find_close_tag;
use super::{
    ATTR_NAME, ATTR_QUOTE, ATTR_VALUE, EMBEDDED_CONTENT, EMPTY_TAG_END, EQ, MarkupDialect,
    MarkupState, TAG_END, TAG_NAME, TAG_START, WHITESPACE,
};
use crate::embedding::{
    Embedment, EmbeddingProvider, ProviderState, SecondaryLexerFactory, TokenContext,
};
use crate::token::{Span, TokenKind};

/// What an embedded region becomes: the coarse token kind and, for
/// highlighting, the lexer that tokenizes it.
#[derive(Clone)]
pub struct EmbeddedLanguage {
    kind: TokenKind,
    factory: Option<Arc<dyn SecondaryLexerFactory>>,
}

impl Default for EmbeddedLanguage {
    fn default() -> Self {
        Self::new(EMBEDDED_CONTENT)
    }
}

impl EmbeddedLanguage {
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            factory: None,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn SecondaryLexerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    fn embedment(&self, range: Span, resume_base_state: u32) -> Embedment {
        let embedment = Embedment::new(range, self.kind, resume_base_state);
        match &self.factory {
            Some(factory) => embedment.with_factory(Arc::clone(factory)),
            None => embedment,
        }
    }
}

impl std::fmt::Debug for EmbeddedLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedLanguage")
            .field("kind", &self.kind)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ElementPhase {
    Idle,
    /// Saw `<`; the next token is the tag name.
    TagOpened,
    /// Inside the start tag of element `n`.
    InTag(usize),
    /// The start tag of element `n` just closed; its body starts at the next
    /// token.
    Armed(usize),
}

/// Claims the body of configured elements (`<script>`, `<style>`) up to the
/// matching close tag, or to the scan end when the close tag is missing.
#[derive(Debug)]
pub struct ElementContentProvider {
    dialect: MarkupDialect,
    elements: Vec<(String, EmbeddedLanguage)>,
    phase: ElementPhase,
}

impl ElementContentProvider {
    pub fn new(dialect: MarkupDialect) -> Self {
        Self {
            dialect,
            elements: Vec::new(),
            phase: ElementPhase::Idle,
        }
    }

    pub fn with_element(mut self, name: impl Into<String>, language: EmbeddedLanguage) -> Self {
        self.elements.push((name.into(), language));
        self
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|(element, _)| self.dialect.names_match(element, name))
    }

    fn claim_body(&self, element: usize, token: &TokenContext<'_>) -> Option<Embedment> {
        let (name, language) = &self.elements[element];
        let rest = token.rest();
        let len = find_close_tag(rest, name, self.dialect).unwrap_or(rest.len());
        if len == 0 {
            // Empty body: the close tag follows the start tag directly.
            return None;
        }
        let start = token.span.start;
        Some(language.embedment(Span::new(start, start + len), MarkupState::Data.raw()))
    }
}

impl EmbeddingProvider for ElementContentProvider {
    fn name(&self) -> &str {
        "element-content"
    }

    fn try_claim(&mut self, token: &TokenContext<'_>) -> Option<Embedment> {
        match (self.phase, token.kind) {
            (ElementPhase::Armed(element), _) => {
                self.phase = ElementPhase::Idle;
                return self.claim_body(element, token);
            }
            (_, kind) if kind == TAG_START => self.phase = ElementPhase::TagOpened,
            (ElementPhase::TagOpened, kind) if kind == TAG_NAME => {
                self.phase = self
                    .lookup(token.text())
                    .map_or(ElementPhase::Idle, ElementPhase::InTag);
            }
            (ElementPhase::InTag(element), kind) if kind == TAG_END => {
                self.phase = ElementPhase::Armed(element);
            }
            (ElementPhase::InTag(_), kind) if kind == EMPTY_TAG_END => {
                self.phase = ElementPhase::Idle;
            }
            // Attributes and whitespace inside the start tag.
            (ElementPhase::InTag(_), _) => {}
            _ => self.phase = ElementPhase::Idle,
        }
        None
    }

    fn clear_embedment(&mut self) {
        if let ElementPhase::Armed(_) = self.phase {
            self.phase = ElementPhase::Idle;
        }
    }

    fn state(&self) -> Option<ProviderState> {
        self.holds_state()
            .then(|| ProviderState::restorable(self.phase))
    }

    fn holds_state(&self) -> bool {
        self.phase != ElementPhase::Idle
    }

    fn restore_state(&mut self, state: Option<&ProviderState>) {
        self.phase = match state {
            None => ElementPhase::Idle,
            Some(state) => match state.downcast_ref::<ElementPhase>() {
                Some(phase) => *phase,
                None => {
                    log::warn!(
                        target: "lexer.embedding",
                        "element-content: ignoring foreign provider state {state:?}"
                    );
                    ElementPhase::Idle
                }
            },
        };
    }

    /// The close tag search peeks at `</name` plus one boundary byte.
    fn lookahead(&self) -> usize {
        self.elements
            .iter()
            .map(|(name, _)| name.len() + 3)
            .max()
            .unwrap_or(0)
    }
}

/// Which attribute names an [`AttributeValueProvider`] rule selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeRule {
    Exact(String),
    /// Names that start with the prefix and are strictly longer than it
    /// (`on` selects `onclick`, not `on`).
    Prefix(String),
}

impl AttributeRule {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    fn matches(&self, dialect: MarkupDialect, name: &str) -> bool {
        match self {
            Self::Exact(exact) => dialect.names_match(exact, name),
            Self::Prefix(prefix) => {
                name.len() > prefix.len()
                    && dialect.bytes_match(&name.as_bytes()[..prefix.len()], prefix.as_bytes())
            }
        }
    }
}

/// Claims attribute values of selected attributes, e.g. inline `style` and
/// `on*` event handlers. The claim covers exactly the value token.
#[derive(Debug)]
pub struct AttributeValueProvider {
    dialect: MarkupDialect,
    rules: Vec<(AttributeRule, EmbeddedLanguage)>,
    /// Rule index of the last attribute name, while its value may follow.
    pending: Option<usize>,
}

impl AttributeValueProvider {
    pub fn new(dialect: MarkupDialect) -> Self {
        Self {
            dialect,
            rules: Vec::new(),
            pending: None,
        }
    }

    pub fn with_rule(mut self, rule: AttributeRule, language: EmbeddedLanguage) -> Self {
        self.rules.push((rule, language));
        self
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.rules
            .iter()
            .position(|(rule, _)| rule.matches(self.dialect, name))
    }
}

impl EmbeddingProvider for AttributeValueProvider {
    fn name(&self) -> &str {
        "attribute-value"
    }

    fn try_claim(&mut self, token: &TokenContext<'_>) -> Option<Embedment> {
        let kind = token.kind;
        if kind == ATTR_NAME && token.within_tag {
            self.pending = self.lookup(token.text());
        } else if kind == ATTR_VALUE {
            let rule = self.pending.take()?;
            let resume = match MarkupState::from_raw(token.base_state) {
                Some(quoted @ (MarkupState::DoubleQuoted | MarkupState::SingleQuoted)) => {
                    quoted.raw()
                }
                _ => MarkupState::InTag.raw(),
            };
            return Some(self.rules[rule].1.embedment(token.span, resume));
        } else if kind != EQ && kind != WHITESPACE && kind != ATTR_QUOTE {
            self.pending = None;
        }
        None
    }

    fn clear_embedment(&mut self) {
        self.pending = None;
    }

    fn state(&self) -> Option<ProviderState> {
        self.pending.map(ProviderState::restorable)
    }

    fn holds_state(&self) -> bool {
        self.pending.is_some()
    }

    fn restore_state(&mut self, state: Option<&ProviderState>) {
        self.pending = state.and_then(|state| state.downcast_ref::<usize>()).copied();
    }
}
