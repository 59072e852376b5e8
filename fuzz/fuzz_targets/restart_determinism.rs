#![no_main]

use std::sync::Arc;

use lexer::markup::{MarkupLexer, html_registry};
use lexer::{EmbeddingConfig, Lexer, TokenizingLexer, collect_tokens};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let buffer: Arc<str> = Arc::from(String::from_utf8_lossy(data).as_ref());
    let mut lexer = TokenizingLexer::new(MarkupLexer::new(), html_registry(EmbeddingConfig::default()));
    lexer
        .start(Arc::clone(&buffer), 0, buffer.len(), 0)
        .expect("initial start");
    let full = collect_tokens(&mut lexer).expect("lex");

    let mut expected_start = 0;
    for (token, _) in &full {
        assert_eq!(token.span.start, expected_start, "tokens must tile the buffer");
        assert!(token.span.end > token.span.start, "empty token {token:?}");
        expected_start = token.span.end;
    }
    assert_eq!(expected_start, buffer.len());

    for (index, (token, state)) in full.iter().enumerate() {
        if !lexer.is_restartable_state(*state) {
            continue;
        }
        lexer
            .start(Arc::clone(&buffer), token.span.start, buffer.len(), *state)
            .expect("restart");
        let tail = collect_tokens(&mut lexer).expect("relex");
        assert_eq!(tail.as_slice(), &full[index..], "restart at token {index}");
    }
});
