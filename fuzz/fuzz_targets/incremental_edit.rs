#![no_main]

use std::sync::Arc;

use lexer::markup::{MarkupLexer, html_registry};
use lexer::{EmbeddingConfig, TextEdit, TokenCache, TokenizingLexer};
use libfuzzer_sys::fuzz_target;

fn cache(text: &str) -> TokenCache<TokenizingLexer<MarkupLexer>> {
    let lexer = TokenizingLexer::new(MarkupLexer::new(), html_registry(EmbeddingConfig::default()));
    TokenCache::build(lexer, Arc::from(text)).expect("build")
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// Layout: two offset bytes, one removal length byte, then the inserted text
// and the document separated by the first 0xff byte.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 || data.len() > 8 * 1024 {
        return;
    }
    let (header, rest) = data.split_at(3);
    let split = rest.iter().position(|&b| b == 0xff).unwrap_or(0);
    let inserted = String::from_utf8_lossy(&rest[..split]).into_owned();
    let before = String::from_utf8_lossy(rest.get(split + 1..).unwrap_or_default()).into_owned();

    let offset = floor_boundary(&before, u16::from_le_bytes([header[0], header[1]]) as usize);
    let removal_end = floor_boundary(&before, offset + header[2] as usize).max(offset);
    let mut after = before.clone();
    after.replace_range(offset..removal_end, &inserted);

    let mut incremental = cache(&before);
    incremental
        .apply_edit(
            Arc::from(after.as_str()),
            TextEdit::new(offset, removal_end - offset, inserted.len()),
        )
        .expect("edit");
    assert_eq!(incremental.tokens(), cache(&after).tokens());
});
