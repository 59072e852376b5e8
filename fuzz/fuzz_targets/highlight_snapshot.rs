#![no_main]

use std::sync::Arc;

use lexer::markup::MarkupDialect;
use lexer::markup::MarkupLexer;
use lexer::{EmbeddingConfig, HighlightingConfig, HighlightingLexer, Lexer, collect_tokens};
use lexer_test_support::word::word_highlight_registry;
use libfuzzer_sys::fuzz_target;

fn highlighter() -> HighlightingLexer<MarkupLexer> {
    HighlightingLexer::new(
        MarkupLexer::new(),
        word_highlight_registry(MarkupDialect::Html, EmbeddingConfig::default()),
        HighlightingConfig::default(),
    )
    .expect("default config")
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 8 * 1024 {
        return;
    }
    let buffer: Arc<str> = Arc::from(String::from_utf8_lossy(data).as_ref());
    let mut lexer = highlighter();
    lexer
        .start(Arc::clone(&buffer), 0, buffer.len(), 0)
        .expect("start");
    let mut full = Vec::new();
    let mut snapshots = Vec::new();
    while let Some(token) = lexer.token() {
        full.push((token, lexer.state()));
        snapshots.push(lexer.snapshot());
        lexer.advance().expect("advance");
    }

    let mut resumed = highlighter();
    for (index, snapshot) in snapshots.iter().enumerate().step_by(7) {
        resumed.restore(snapshot).expect("restore");
        let tail = collect_tokens(&mut resumed).expect("resume");
        assert_eq!(tail.as_slice(), &full[index..], "snapshot at token {index}");
    }
});
