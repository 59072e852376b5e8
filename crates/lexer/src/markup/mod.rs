//! Reference markup grammar: a small HTML-like base lexer plus the providers
//! that carve script/style element bodies and selected attribute values out
//! of it.
//!
//! States (the integer a [`MarkupLexer`] reports):
//!
//! | value | state               | entered after                  |
//! |-------|---------------------|--------------------------------|
//! | 0     | `Data`              | `>` / `/>`, text, comments     |
//! | 1     | `TagName`           | `<` or `</` followed by a letter |
//! | 2     | `InTag`             | tag name, attribute value      |
//! | 3     | `AfterAttrName`     | attribute name                 |
//! | 4     | `BeforeAttrValue`   | `=`                            |
//! | 5     | `DoubleQuoted`      | opening `"`                    |
//! | 6     | `SingleQuoted`      | opening `'`                    |

mod base;
mod providers;
mod scan;

pub use base::MarkupLexer;
pub use providers::{
    AttributeRule, AttributeValueProvider, ElementContentProvider, EmbeddedLanguage,
};

use crate::embedding::{EmbeddingConfig, ProviderRegistry};
use crate::token::TokenKind;

/// Grammar name shared by every markup token kind.
pub const GRAMMAR: &str = "markup";

pub const TEXT: TokenKind = TokenKind::new(GRAMMAR, "TEXT");
pub const COMMENT: TokenKind = TokenKind::new(GRAMMAR, "COMMENT");
pub const TAG_START: TokenKind = TokenKind::new(GRAMMAR, "TAG_START");
pub const END_TAG_START: TokenKind = TokenKind::new(GRAMMAR, "END_TAG_START");
pub const TAG_NAME: TokenKind = TokenKind::new(GRAMMAR, "TAG_NAME");
pub const WHITESPACE: TokenKind = TokenKind::new(GRAMMAR, "WHITESPACE");
pub const ATTR_NAME: TokenKind = TokenKind::new(GRAMMAR, "ATTR_NAME");
pub const EQ: TokenKind = TokenKind::new(GRAMMAR, "EQ");
pub const ATTR_QUOTE: TokenKind = TokenKind::new(GRAMMAR, "ATTR_QUOTE");
pub const ATTR_VALUE: TokenKind = TokenKind::new(GRAMMAR, "ATTR_VALUE");
pub const TAG_END: TokenKind = TokenKind::new(GRAMMAR, "TAG_END");
pub const EMPTY_TAG_END: TokenKind = TokenKind::new(GRAMMAR, "EMPTY_TAG_END");
pub const BAD_CHARACTER: TokenKind = TokenKind::new(GRAMMAR, "BAD_CHARACTER");
/// Default kind for embedded regions without a dedicated kind.
pub const EMBEDDED_CONTENT: TokenKind = TokenKind::new(GRAMMAR, "EMBEDDED_CONTENT");

/// Base states of [`MarkupLexer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MarkupState {
    Data = 0,
    TagName = 1,
    InTag = 2,
    AfterAttrName = 3,
    BeforeAttrValue = 4,
    DoubleQuoted = 5,
    SingleQuoted = 6,
}

impl MarkupState {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Data,
            1 => Self::TagName,
            2 => Self::InTag,
            3 => Self::AfterAttrName,
            4 => Self::BeforeAttrValue,
            5 => Self::DoubleQuoted,
            6 => Self::SingleQuoted,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// Name matching rules of the two supported dialects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarkupDialect {
    /// Tag and attribute names are ASCII case-insensitive.
    #[default]
    Html,
    /// Names match exactly.
    Xhtml,
}

impl MarkupDialect {
    pub fn names_match(self, a: &str, b: &str) -> bool {
        self.bytes_match(a.as_bytes(), b.as_bytes())
    }

    pub(crate) fn bytes_match(self, a: &[u8], b: &[u8]) -> bool {
        match self {
            Self::Html => a.eq_ignore_ascii_case(b),
            Self::Xhtml => a == b,
        }
    }
}

/// Providers for `dialect` with coarse embedded content: `<script>` and
/// `<style>` bodies, `style` attributes and `on*` event handler attributes.
pub fn default_registry(dialect: MarkupDialect, config: EmbeddingConfig) -> ProviderRegistry {
    ProviderRegistry::builder(config)
        .provider(
            ElementContentProvider::new(dialect)
                .with_element("script", EmbeddedLanguage::default())
                .with_element("style", EmbeddedLanguage::default()),
        )
        .provider(
            AttributeValueProvider::new(dialect)
                .with_rule(AttributeRule::exact("style"), EmbeddedLanguage::default())
                .with_rule(AttributeRule::prefix("on"), EmbeddedLanguage::default()),
        )
        .build()
}

pub fn html_registry(config: EmbeddingConfig) -> ProviderRegistry {
    default_registry(MarkupDialect::Html, config)
}

pub fn xhtml_registry(config: EmbeddingConfig) -> ProviderRegistry {
    default_registry(MarkupDialect::Xhtml, config)
}
