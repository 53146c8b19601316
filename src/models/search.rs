// src/models/search.rs

//! Cross-reference search types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Result types offered by the code-search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Repositories,
    Code,
    Commits,
    Issues,
    Discussions,
    Registrypackages,
    Marketplace,
    Topics,
    Wikis,
    Users,
}

impl SearchType {
    pub const ALL: [SearchType; 10] = [
        SearchType::Repositories,
        SearchType::Code,
        SearchType::Commits,
        SearchType::Issues,
        SearchType::Discussions,
        SearchType::Registrypackages,
        SearchType::Marketplace,
        SearchType::Topics,
        SearchType::Wikis,
        SearchType::Users,
    ];

    /// Value of the provider's `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Repositories => "repositories",
            SearchType::Code => "code",
            SearchType::Commits => "commits",
            SearchType::Issues => "issues",
            SearchType::Discussions => "discussions",
            SearchType::Registrypackages => "registrypackages",
            SearchType::Marketplace => "marketplace",
            SearchType::Topics => "topics",
            SearchType::Wikis => "wikis",
            SearchType::Users => "users",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| {
                let choices: Vec<_> = Self::ALL.iter().map(|t| t.as_str()).collect();
                format!("invalid search type '{s}', choose from {choices:?}")
            })
    }
}

/// One cross-reference lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub language: String,
    pub result_type: SearchType,
    pub max_comments: u32,
    pub max_results: u64,
}

/// Why a lookup produced no confident match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum NoMatchReason {
    /// The provider reported no results
    NoResults,
    /// More results than the admission threshold allows
    TooMany { count: u64 },
    /// The result-count indicator could not be read
    Unparseable,
}

/// Outcome of a cross-reference lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchResult {
    /// Exactly one results page that passed the admission threshold
    Match { url: String, count: u64 },
    NoMatch(NoMatchReason),
}

impl SearchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, SearchResult::Match { .. })
    }

    /// Locator of the matching results page, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            SearchResult::Match { url, .. } => Some(url),
            SearchResult::NoMatch(_) => None,
        }
    }
}
