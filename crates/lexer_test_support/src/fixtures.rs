//! Golden token fixtures stored as TOML.
//!
//! ```toml
//! format = "lexer-tokens-v1"
//!
//! [[cases]]
//! name = "script-body"
//! mode = "tokenize"      # base | tokenize | highlight
//! dialect = "html"       # html | xhtml
//! input = "<script>a</script>"
//! tokens = ['markup:TAG_START "<"', ...]
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use lexer::markup::MarkupDialect;
use serde::Deserialize;

pub const TOKEN_FIXTURES_FORMAT_V1: &str = "lexer-tokens-v1";

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureMode {
    /// Base markup lexer without providers.
    Base,
    Tokenize,
    /// Highlighting with [`WordLexerFactory`](crate::word::WordLexerFactory)
    /// behind every embedment.
    Highlight,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureDialect {
    #[default]
    Html,
    Xhtml,
}

impl FixtureDialect {
    pub fn dialect(self) -> MarkupDialect {
        match self {
            Self::Html => MarkupDialect::Html,
            Self::Xhtml => MarkupDialect::Xhtml,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TokenCase {
    pub name: String,
    pub mode: FixtureMode,
    #[serde(default)]
    pub dialect: FixtureDialect,
    pub input: String,
    pub tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenManifest {
    format: String,
    cases: Vec<TokenCase>,
}

/// Load and validate a fixture file. Panics with the offending path on any
/// problem, since a broken fixture is a broken test.
pub fn load_token_cases(path: &Path) -> Vec<TokenCase> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read token fixtures {path:?}: {err}"));
    let manifest: TokenManifest = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse token fixtures {path:?}: {err}"));
    assert_eq!(
        manifest.format, TOKEN_FIXTURES_FORMAT_V1,
        "unsupported token fixture format in {path:?}"
    );
    let mut names = BTreeSet::new();
    for case in &manifest.cases {
        if !names.insert(case.name.as_str()) {
            panic!("duplicate fixture name '{}' in {path:?}", case.name);
        }
        if case.name != case.name.trim() || case.name.is_empty() {
            panic!("fixture name '{}' in {path:?} must be trimmed and non-empty", case.name);
        }
    }
    log::debug!(
        target: "lexer.fixtures",
        "loaded {} token cases from {path:?}",
        manifest.cases.len()
    );
    manifest.cases
}
