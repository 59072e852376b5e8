use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::embedding::{
    EmbeddingConfig, EmbeddingProvider, Embedment, ProviderRegistry, ProviderState,
    SecondaryLexerFactory, TokenContext,
};
use crate::error::LexerError;
use crate::lexer::{BoxedLexer, Lexer, LexerPosition, check_range, collect_tokens};
use crate::markup::{
    EmbeddedLanguage, ElementContentProvider, MarkupDialect, MarkupLexer, html_registry,
};
use crate::state::{PACKED_STATE_BITS, PackedState};
use crate::token::{Span, Token, TokenKind};

const WORD: TokenKind = TokenKind::new("words", "WORD");
const SPACE: TokenKind = TokenKind::new("words", "SPACE");

/// Splits its range into runs of whitespace and non-whitespace.
#[derive(Default)]
struct WordLexer {
    buffer: Arc<str>,
    end: usize,
    token: Option<Token>,
}

impl WordLexer {
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
}

struct Words;

impl SecondaryLexerFactory for Words {
    fn create(&self, _config: EmbeddingConfig) -> BoxedLexer {
        Box::new(WordLexer::default())
    }
}

fn script_registry(config: EmbeddingConfig) -> ProviderRegistry {
    ProviderRegistry::builder(config)
        .provider(ElementContentProvider::new(MarkupDialect::Html).with_element(
            "script",
            EmbeddedLanguage::default().with_factory(Arc::new(Words)),
        ))
        .build()
}

fn highlighter() -> HighlightingLexer<MarkupLexer> {
    HighlightingLexer::new(
        MarkupLexer::new(),
        script_registry(EmbeddingConfig::default()),
        HighlightingConfig::default(),
    )
    .expect("default config is valid")
}

fn tokenizer() -> TokenizingLexer<MarkupLexer> {
    TokenizingLexer::new(MarkupLexer::new(), html_registry(EmbeddingConfig::default()))
}

fn start_all<L: Lexer>(lexer: &mut L, input: &str) -> Arc<str> {
    let buffer: Arc<str> = Arc::from(input);
    lexer
        .start(Arc::clone(&buffer), 0, buffer.len(), 0)
        .expect("start");
    buffer
}

fn texts(buffer: &str, tokens: &[(Token, u32)]) -> Vec<(String, String)> {
    tokens
        .iter()
        .map(|(token, _)| (token.kind.name().to_string(), token.text(buffer).to_string()))
        .collect()
}

const DOCUMENT: &str =
    "<p a=\"1\" onclick='x()'>t<script>if(a<b){}</script><style>s</style><!-- c -->";

#[test]
fn tokenizing_reports_script_body_as_one_token() {
    let mut lexer = tokenizer();
    start_all(&mut lexer, "<script>var x=1;</script>");
    let tokens = collect_tokens(&mut lexer).expect("lex");
    let (body, _) = tokens[3];
    assert_eq!(body.kind, crate::markup::EMBEDDED_CONTENT);
    assert_eq!(body.span, Span::new(8, 16));
}

#[test]
fn highlighting_reports_secondary_tokens_inside_the_body() {
    let mut lexer = highlighter();
    let buffer = start_all(&mut lexer, "<script>var x=1;</script>");
    let mut seen = Vec::new();
    while let Some(token) = lexer.token() {
        if lexer.in_embedded_lexer() {
            let outer = lexer.outer_token().expect("outer token");
            assert_eq!(outer.span, Span::new(8, 16));
            let state = lexer.state();
            assert_ne!(state & (1 << PACKED_STATE_BITS), 0);
            assert!(!lexer.is_restartable_state(state));
        }
        seen.push((token.kind.name(), token.text(&buffer).to_string()));
        lexer.advance().expect("advance");
    }
    let seen: Vec<(&str, &str)> = seen.iter().map(|(k, t)| (*k, t.as_str())).collect();
    assert_eq!(
        seen,
        vec![
            ("TAG_START", "<"),
            ("TAG_NAME", "script"),
            ("TAG_END", ">"),
            ("WORD", "var"),
            ("SPACE", " "),
            ("WORD", "x=1;"),
            ("END_TAG_START", "</"),
            ("TAG_NAME", "script"),
            ("TAG_END", ">"),
        ]
    );
}

#[test]
fn highlighting_matches_tokenizing_outside_embedments() {
    let mut coarse =
        TokenizingLexer::new(MarkupLexer::new(), script_registry(EmbeddingConfig::default()));
    start_all(&mut coarse, DOCUMENT);
    let coarse = collect_tokens(&mut coarse).expect("lex");

    let mut fine = highlighter();
    start_all(&mut fine, DOCUMENT);
    let fine = collect_tokens(&mut fine).expect("lex");

    let outside = |tokens: &[(Token, u32)]| -> Vec<(Token, u32)> {
        tokens
            .iter()
            .filter(|(token, _)| {
                token.kind.grammar() == "markup" && token.kind != crate::markup::EMBEDDED_CONTENT
            })
            .copied()
            .collect()
    };
    assert_eq!(outside(&coarse), outside(&fine));
    assert!(fine.iter().any(|(token, _)| token.kind == WORD));
}

/// Secondary lexer that never produces a token.
#[derive(Default)]
struct Silent {
    buffer: Arc<str>,
    end: usize,
}

impl Lexer for Silent {
    fn start(
        &mut self,
        buffer: Arc<str>,
        start: usize,
        end: usize,
        _state: u32,
    ) -> Result<(), LexerError> {
        check_range(&buffer, start, end)?;
        self.buffer = buffer;
        self.end = end;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), LexerError> {
        Ok(())
    }

    fn token(&self) -> Option<Token> {
        None
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
}

struct SilentFactory;

impl SecondaryLexerFactory for SilentFactory {
    fn create(&self, _config: EmbeddingConfig) -> BoxedLexer {
        Box::new(Silent::default())
    }
}

#[test]
fn empty_secondary_stream_falls_back_to_the_coarse_token() {
    let registry = ProviderRegistry::builder(EmbeddingConfig::default())
        .provider(ElementContentProvider::new(MarkupDialect::Html).with_element(
            "script",
            EmbeddedLanguage::default().with_factory(Arc::new(SilentFactory)),
        ))
        .build();
    let mut lexer =
        HighlightingLexer::new(MarkupLexer::new(), registry, HighlightingConfig::default())
            .expect("config");
    let buffer = start_all(&mut lexer, "<script> </script>");
    let tokens = collect_tokens(&mut lexer).expect("lex");
    assert_eq!(
        texts(&buffer, &tokens)[3],
        ("EMBEDDED_CONTENT".to_string(), " ".to_string())
    );
    assert_eq!(tokens.len(), 7);
}

#[test]
fn highlighting_rejects_the_embedded_bit_on_start() {
    let mut lexer = highlighter();
    let state = 1 << PACKED_STATE_BITS;
    assert_eq!(
        lexer.start(Arc::from("x"), 0, 1, state),
        Err(LexerError::NonRestartableState { state })
    );
}

#[test]
fn embedded_bit_must_sit_above_the_packed_fields() {
    for bit in [0, PACKED_STATE_BITS - 1, 32] {
        let result = HighlightingLexer::new(
            MarkupLexer::new(),
            ProviderRegistry::empty(EmbeddingConfig::default()),
            HighlightingConfig {
                embedded_state_bit: bit,
            },
        );
        assert!(matches!(result, Err(LexerError::InvalidStateBit { bit: b }) if b == bit));
    }
    let custom = HighlightingLexer::new(
        MarkupLexer::new(),
        ProviderRegistry::empty(EmbeddingConfig::default()),
        HighlightingConfig {
            embedded_state_bit: 31,
        },
    )
    .expect("bit 31 is free");
    assert_eq!(custom.config().embedded_state_bit, 31);
}

#[test]
fn start_rejects_bad_states_and_ranges() {
    let mut lexer = tokenizer();
    let warm = PackedState::new(0, false, true).unwrap().pack();
    assert_eq!(
        lexer.start(Arc::from("abc"), 0, 3, warm),
        Err(LexerError::NonRestartableState { state: warm })
    );
    let reserved = 1 << 20;
    assert_eq!(
        lexer.start(Arc::from("abc"), 0, 3, reserved),
        Err(LexerError::StateOutOfRange { state: reserved })
    );
    assert_eq!(
        lexer.start(Arc::from("abc"), 2, 1, 0),
        Err(LexerError::InvalidRange {
            start: 2,
            end: 1,
            len: 3
        })
    );
}

#[test]
fn restart_at_any_restartable_state_reproduces_the_tail() {
    let mut lexer = tokenizer();
    let buffer = start_all(&mut lexer, DOCUMENT);
    let full = collect_tokens(&mut lexer).expect("lex");
    let mut restarts = 0;
    for (index, (token, state)) in full.iter().enumerate() {
        if !lexer.is_restartable_state(*state) {
            continue;
        }
        let mut fresh = tokenizer();
        fresh
            .start(Arc::clone(&buffer), token.span.start, buffer.len(), *state)
            .expect("restartable state");
        assert_eq!(
            collect_tokens(&mut fresh).expect("lex"),
            full[index..],
            "restart at {}",
            token.span.start
        );
        restarts += 1;
    }
    assert!(restarts > 5);
    assert!(restarts < full.len(), "some states must be non-restartable");
}

#[test]
fn snapshots_restore_identically_and_repeatedly() {
    let mut lexer = tokenizer();
    start_all(&mut lexer, DOCUMENT);
    let full = collect_tokens(&mut lexer).expect("lex");
    for index in 0..=full.len() {
        start_all(&mut lexer, DOCUMENT);
        for _ in 0..index {
            lexer.advance().expect("advance");
        }
        let snapshot = lexer.snapshot();
        assert!(snapshot.is_restorable());
        assert_eq!(snapshot.token(), full.get(index).map(|(token, _)| *token));
        let first = collect_tokens(&mut lexer).expect("lex");
        lexer.restore(&snapshot).expect("restore");
        let second = collect_tokens(&mut lexer).expect("lex");
        lexer.restore(&snapshot).expect("restore again");
        let third = collect_tokens(&mut lexer).expect("lex");
        assert_eq!(first, full[index..]);
        assert_eq!(second, first);
        assert_eq!(third, first);
    }
    assert!(lexer.stats().restores > 0);
}

#[test]
fn snapshot_inside_secondary_lexer_resumes_inside_it() {
    let mut lexer = highlighter();
    let buffer = start_all(&mut lexer, "<script>var x=1;</script>");
    while lexer.token().is_some_and(|token| token.kind != SPACE) {
        lexer.advance().expect("advance");
    }
    let snapshot = lexer.snapshot();
    assert!(snapshot.in_embedded_lexer());
    assert_eq!(snapshot.engine().offset(), 8);
    let first = collect_tokens(&mut lexer).expect("lex");
    assert_eq!(texts(&buffer, &first)[1], ("WORD".to_string(), "x=1;".to_string()));

    // Restore into a different instance built the same way.
    let mut other = highlighter();
    start_all(&mut other, "<p>");
    other.restore(&snapshot).expect("restore");
    assert!(other.in_embedded_lexer());
    assert_eq!(collect_tokens(&mut other).expect("lex"), first);
}

/// Claims `len` bytes at offset `at` and counts clears.
struct ClaimAt {
    name: &'static str,
    at: usize,
    len: usize,
    kind: TokenKind,
    clears: Arc<AtomicUsize>,
}

impl EmbeddingProvider for ClaimAt {
    fn name(&self) -> &str {
        self.name
    }

    fn try_claim(&mut self, token: &TokenContext<'_>) -> Option<Embedment> {
        (token.span.start == self.at)
            .then(|| Embedment::new(Span::new(self.at, self.at + self.len), self.kind, 0))
    }

    fn clear_embedment(&mut self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    fn state(&self) -> Option<ProviderState> {
        None
    }

    fn restore_state(&mut self, _state: Option<&ProviderState>) {}
}

#[test]
fn first_registered_provider_wins_ties() {
    const A: TokenKind = TokenKind::new("test", "A");
    const B: TokenKind = TokenKind::new("test", "B");
    let run = |a_first: bool| {
        let a_clears = Arc::new(AtomicUsize::new(0));
        let b_clears = Arc::new(AtomicUsize::new(0));
        let a = ClaimAt {
            name: "a",
            at: 0,
            len: 3,
            kind: A,
            clears: Arc::clone(&a_clears),
        };
        let b = ClaimAt {
            name: "b",
            at: 0,
            len: 7,
            kind: B,
            clears: Arc::clone(&b_clears),
        };
        let builder = ProviderRegistry::builder(EmbeddingConfig::default());
        let registry = if a_first {
            builder.provider(a).provider(b).build()
        } else {
            builder.provider(b).provider(a).build()
        };
        let mut lexer = TokenizingLexer::new(MarkupLexer::new(), registry);
        let buffer = start_all(&mut lexer, "abc def");
        let tokens = collect_tokens(&mut lexer).expect("lex");
        (
            texts(&buffer, &tokens),
            a_clears.load(Ordering::Relaxed),
            b_clears.load(Ordering::Relaxed),
        )
    };

    let (tokens, a_clears, b_clears) = run(true);
    assert_eq!(
        tokens,
        vec![
            ("A".to_string(), "abc".to_string()),
            ("TEXT".to_string(), " def".to_string())
        ]
    );
    assert_eq!((a_clears, b_clears), (0, 1));

    let (tokens, a_clears, b_clears) = run(false);
    assert_eq!(tokens, vec![("B".to_string(), "abc def".to_string())]);
    assert_eq!((a_clears, b_clears), (1, 0));
}

/// Holds state after the first token that no snapshot can carry.
struct Opaque {
    seen: bool,
}

impl EmbeddingProvider for Opaque {
    fn name(&self) -> &str {
        "opaque"
    }

    fn try_claim(&mut self, _token: &TokenContext<'_>) -> Option<Embedment> {
        self.seen = true;
        None
    }

    fn clear_embedment(&mut self) {}

    fn state(&self) -> Option<ProviderState> {
        self.seen.then_some(ProviderState::NotRestorable)
    }

    fn restore_state(&mut self, state: Option<&ProviderState>) {
        self.seen = state.is_some();
    }
}

#[test]
fn unrestorable_snapshot_is_rejected_without_side_effects() {
    let registry = ProviderRegistry::builder(EmbeddingConfig::default())
        .provider(Opaque { seen: false })
        .build();
    let mut lexer = TokenizingLexer::new(MarkupLexer::new(), registry);
    start_all(&mut lexer, "<a>b");
    lexer.advance().expect("advance");
    let snapshot = lexer.snapshot();
    assert!(!snapshot.is_restorable());
    lexer.advance().expect("advance");
    let before = lexer.token();
    assert_eq!(
        lexer.restore(&snapshot),
        Err(LexerError::UnrestorableProvider {
            provider: "opaque".to_string()
        })
    );
    assert_eq!(lexer.token(), before);
}

/// Builds a highlighting markup lexer for `<script>` bodies, recursively.
struct NestedMarkup {
    depths: Arc<Mutex<Vec<usize>>>,
}

impl SecondaryLexerFactory for NestedMarkup {
    fn create(&self, config: EmbeddingConfig) -> BoxedLexer {
        self.depths.lock().unwrap().push(config.depth());
        let registry = ProviderRegistry::builder(config)
            .provider(ElementContentProvider::new(MarkupDialect::Html).with_element(
                "script",
                EmbeddedLanguage::default().with_factory(Arc::new(NestedMarkup {
                    depths: Arc::clone(&self.depths),
                })),
            ))
            .build();
        Box::new(
            HighlightingLexer::new(MarkupLexer::new(), registry, HighlightingConfig::default())
                .expect("default config is valid"),
        )
    }
}

#[test]
fn nesting_stops_at_the_configured_depth() {
    let run = |max_depth: usize| {
        let depths = Arc::new(Mutex::new(Vec::new()));
        let factory = NestedMarkup {
            depths: Arc::clone(&depths),
        };
        let registry = ProviderRegistry::builder(EmbeddingConfig::new(max_depth))
            .provider(ElementContentProvider::new(MarkupDialect::Html).with_element(
                "script",
                EmbeddedLanguage::default().with_factory(Arc::new(factory)),
            ))
            .build();
        let mut lexer =
            HighlightingLexer::new(MarkupLexer::new(), registry, HighlightingConfig::default())
                .expect("config");
        let buffer = start_all(&mut lexer, "<script><script>x</script>");
        let tokens = collect_tokens(&mut lexer).expect("lex");
        let names: Vec<String> = texts(&buffer, &tokens)
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        let depths = depths.lock().unwrap().clone();
        (names, depths)
    };

    let (names, depths) = run(2);
    assert_eq!(
        names,
        ["<", "script", ">", "<", "script", ">", "x", "</", "script", ">"]
    );
    assert_eq!(depths, vec![1, 2]);

    let (names, depths) = run(1);
    assert_eq!(names.len(), 10);
    assert_eq!(depths, vec![1]);

    let (_, depths) = run(0);
    assert!(depths.is_empty());
}

fn nested_highlighter(depths: &Arc<Mutex<Vec<usize>>>) -> HighlightingLexer<MarkupLexer> {
    let factory = NestedMarkup {
        depths: Arc::clone(depths),
    };
    let registry = ProviderRegistry::builder(EmbeddingConfig::default())
        .provider(ElementContentProvider::new(MarkupDialect::Html).with_element(
            "script",
            EmbeddedLanguage::default().with_factory(Arc::new(factory)),
        ))
        .build();
    HighlightingLexer::new(MarkupLexer::new(), registry, HighlightingConfig::default())
        .expect("config")
}

#[test]
fn snapshots_inside_a_layered_secondary_restore_at_every_token() {
    let depths = Arc::new(Mutex::new(Vec::new()));
    let mut lexer = nested_highlighter(&depths);
    let buffer = start_all(&mut lexer, "<script><script>x y</script>");
    let mut full = Vec::new();
    let mut snapshots = Vec::new();
    while let Some(token) = lexer.token() {
        full.push((token, lexer.state()));
        snapshots.push(lexer.snapshot());
        lexer.advance().expect("advance");
    }
    let names: Vec<String> = texts(&buffer, &full)
        .into_iter()
        .map(|(_, text)| text)
        .collect();
    assert_eq!(
        names,
        ["<", "script", ">", "<", "script", ">", "x y", "</", "script", ">"]
    );

    for (index, snapshot) in snapshots.iter().enumerate() {
        let mut fresh = nested_highlighter(&depths);
        fresh
            .restore(snapshot)
            .unwrap_or_else(|err| panic!("restore at token {index}: {err}"));
        assert_eq!(
            collect_tokens(&mut fresh).expect("lex"),
            full[index..],
            "tail after token {index}"
        );
        fresh.restore(snapshot).expect("restore again");
        assert_eq!(collect_tokens(&mut fresh).expect("lex"), full[index..]);
    }
}

#[test]
fn layered_position_restores_where_the_packed_state_cannot() {
    let mut lexer = tokenizer();
    let buffer = start_all(&mut lexer, "<script>a</script>");
    // At `script` the element provider is tracking the open tag.
    lexer.advance().expect("advance");
    let position = Lexer::position(&lexer);
    assert!(!lexer.is_restartable_state(position.state()));
    let tail = collect_tokens(&mut lexer).expect("lex");

    let mut fresh = tokenizer();
    assert_eq!(
        fresh.start(Arc::clone(&buffer), position.offset(), buffer.len(), position.state()),
        Err(LexerError::NonRestartableState {
            state: position.state()
        })
    );
    fresh.restore_position(&position).expect("deep restore");
    assert_eq!(collect_tokens(&mut fresh).expect("lex"), tail);
}

#[test]
fn failed_base_restore_keeps_provider_tracking() {
    let mut lexer = tokenizer();
    let buffer = start_all(&mut lexer, "<script>a</script>");
    let full = collect_tokens(&mut lexer).expect("lex");

    start_all(&mut lexer, "<script>a</script>");
    lexer.advance().expect("advance");
    // Taken at `script`, while the element provider has only seen `<`.
    let mut forged = lexer.snapshot();
    forged.base = LexerPosition::new(Arc::clone(&buffer), buffer.len(), 1, 99);
    lexer.advance().expect("advance");

    assert_eq!(
        lexer.restore(&forged),
        Err(LexerError::UnknownBaseState { state: 99 })
    );
    // Still at `>` with the provider armed for the script body.
    assert_eq!(collect_tokens(&mut lexer).expect("lex"), full[2..]);
    assert_eq!(lexer.stats().restores, 0);
}
