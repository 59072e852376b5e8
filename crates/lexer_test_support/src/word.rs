//! Tiny secondary grammar: runs of whitespace and runs of everything else.

use std::sync::Arc;

use lexer::markup::{
    AttributeRule, AttributeValueProvider, ElementContentProvider, EmbeddedLanguage,
    MarkupDialect,
};
use lexer::{
    BoxedLexer, EmbeddingConfig, Lexer, LexerError, ProviderRegistry, SecondaryLexerFactory,
    Span, Token, TokenKind, check_range,
};

pub const GRAMMAR: &str = "words";
pub const WORD: TokenKind = TokenKind::new(GRAMMAR, "WORD");
pub const SPACE: TokenKind = TokenKind::new(GRAMMAR, "SPACE");

/// Stateless lexer: every offset restarts in state 0.
#[derive(Default)]
pub struct WordLexer {
    buffer: Arc<str>,
    end: usize,
    token: Option<Token>,
}

impl WordLexer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lex_at(&mut self, pos: usize) {
        if pos >= self.end {
            self.token = None;
            return;
        }
        let text = &self.buffer[pos..self.end];
        let space = text.starts_with(char::is_whitespace);
        let len = text
            .find(|c: char| c.is_whitespace() != space)
            .unwrap_or(text.len());
        let kind = if space { SPACE } else { WORD };
        self.token = Some(Token::new(kind, Span::new(pos, pos + len)));
    }
}

impl Lexer for WordLexer {
    fn start(
        &mut self,
        buffer: Arc<str>,
        start: usize,
        end: usize,
        state: u32,
    ) -> Result<(), LexerError> {
        check_range(&buffer, start, end)?;
        if state != 0 {
            return Err(LexerError::UnknownBaseState { state });
        }
        self.buffer = buffer;
        self.end = end;
        self.lex_at(start);
        Ok(())
    }

    fn advance(&mut self) -> Result<(), LexerError> {
        if let Some(token) = self.token {
            self.lex_at(token.span.end);
        }
        Ok(())
    }

    fn token(&self) -> Option<Token> {
        self.token
    }

    fn state(&self) -> u32 {
        0
    }

    fn buffer(&self) -> &Arc<str> {
        &self.buffer
    }

    fn buffer_end(&self) -> usize {
        self.end
    }

    /// A run ends where the next character changes class.
    fn lookahead(&self) -> usize {
        4
    }
}

/// Factory handing out [`WordLexer`]s, for highlighting tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordLexerFactory;

impl SecondaryLexerFactory for WordLexerFactory {
    fn create(&self, _config: EmbeddingConfig) -> BoxedLexer {
        Box::new(WordLexer::new())
    }
}

/// The default markup providers with a [`WordLexerFactory`] behind every
/// embedded region, so highlighting shows the region's inner tokens.
pub fn word_highlight_registry(
    dialect: MarkupDialect,
    config: EmbeddingConfig,
) -> ProviderRegistry {
    let words = EmbeddedLanguage::default().with_factory(Arc::new(WordLexerFactory));
    ProviderRegistry::builder(config)
        .provider(
            ElementContentProvider::new(dialect)
                .with_element("script", words.clone())
                .with_element("style", words.clone()),
        )
        .provider(
            AttributeValueProvider::new(dialect)
                .with_rule(AttributeRule::exact("style"), words.clone())
                .with_rule(AttributeRule::prefix("on"), words),
        )
        .build()
}
