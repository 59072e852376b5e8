use std::sync::Arc;
use std::sync::atomic::Ordering;

use lexer::markup::{MarkupLexer, TEXT};
use lexer::{
    EmbeddingConfig, Lexer, LexerError, ProviderRegistry, TokenKind, TokenizingLexer,
    collect_tokens,
};
use lexer_test_support::lex_lines;
use lexer_test_support::providers::{OpaqueProvider, ScriptedProvider};

const FIRST: TokenKind = TokenKind::new("test", "FIRST");
const SECOND: TokenKind = TokenKind::new("test", "SECOND");
const THIRD: TokenKind = TokenKind::new("test", "THIRD");

#[test]
fn earliest_registration_wins_and_the_rest_are_cleared() {
    let first = ScriptedProvider::new("first", FIRST).claim(2, 2);
    let second = ScriptedProvider::new("second", SECOND).claim(0, 2).claim(2, 5);
    let third = ScriptedProvider::new("third", THIRD).claim(0, 9);
    let counters = [
        first.clear_counter(),
        second.clear_counter(),
        third.clear_counter(),
    ];
    let registry = ProviderRegistry::builder(EmbeddingConfig::default())
        .provider(first)
        .provider(second)
        .provider(third)
        .build();
    let mut lexer = TokenizingLexer::new(MarkupLexer::new(), registry);
    let lines = lex_lines(&mut lexer, "abcdefghij").expect("lex");
    assert_eq!(
        lines,
        vec![
            "test:SECOND \"ab\"",
            "test:FIRST \"cd\"",
            "markup:TEXT \"efghij\"",
        ]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
    );
    // At 0 `second` beats `third`; at 2 `first` beats both.
    let clears: Vec<usize> = counters
        .iter()
        .map(|counter| counter.load(Ordering::Relaxed))
        .collect();
    assert_eq!(clears, vec![1, 1, 2]);
    assert_eq!(lexer.stats().embedments, 2);
}

#[test]
fn claims_swallow_the_base_tokens_they_cover() {
    let registry = ProviderRegistry::builder(EmbeddingConfig::default())
        .provider(ScriptedProvider::new("wide", FIRST).claim(0, 5))
        .build();
    let mut lexer = TokenizingLexer::new(MarkupLexer::new(), registry);
    let lines = lex_lines(&mut lexer, "<a>b<c>").expect("lex");
    assert_eq!(lines[0], "test:FIRST \"<a>b<\"");
    assert_eq!(lines[1], "markup:TEXT \"c>\"");
}

#[test]
fn unrestorable_provider_state_blocks_checkpoints_and_snapshots() {
    let registry = ProviderRegistry::builder(EmbeddingConfig::default())
        .provider(OpaqueProvider::default())
        .build();
    let mut lexer = TokenizingLexer::new(MarkupLexer::new(), registry);
    let buffer: Arc<str> = Arc::from("x<p>y");
    lexer
        .start(Arc::clone(&buffer), 0, buffer.len(), 0)
        .expect("start");
    lexer.advance().expect("advance");
    let state = lexer.state();
    assert!(!lexer.is_restartable_state(state));
    assert_eq!(
        lexer.start(Arc::clone(&buffer), 1, buffer.len(), state),
        Err(LexerError::NonRestartableState { state })
    );

    let snapshot = lexer.snapshot();
    assert!(!snapshot.is_restorable());
    assert!(matches!(
        lexer.restore(&snapshot),
        Err(LexerError::UnrestorableProvider { .. })
    ));
    // The lexer is still usable after the rejected restore.
    let rest = collect_tokens(&mut lexer).expect("lex");
    assert_eq!(
        rest.first().map(|(token, _)| token.kind),
        Some(lexer::markup::TAG_START)
    );
    assert_eq!(rest.last().map(|(token, _)| token.kind), Some(TEXT));
}
