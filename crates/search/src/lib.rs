//! Suggestion and search engines for the catalog browser.
//!
//! [`SuggestionEngine`] turns keystrokes into ranked section, work and
//! resource suggestions; [`LiteralSearch`] runs a plain substring search over
//! every configured database.

mod error;
mod fuzzy;
mod index_cache;
mod literal;
mod suggest;
mod text;

pub use error::{Result, SearchError};
pub use fuzzy::{
    entry_score, levenshtein, matches_all_tokens, token_score, ScoringFields, PATH_SEPARATOR,
};
pub use index_cache::{IndexedSection, SectionIndex, SectionIndexCache};
pub use literal::{DatabaseHits, LiteralSearch, SearchState};
pub use suggest::{
    Suggestion, SuggestionEngine, SuggestionGroup, SuggestionOutcome, SuggestionState,
};
pub use text::{normalize, replace_last_token, QueryTokens};
