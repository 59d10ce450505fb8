//! Query safety validator.
//!
//! Every candidate query passes through [`QueryGuard::check`] before it can
//! reach the listing store. The check is pure text classification: strip
//! wrapping fences and one trailing terminator, then require a single
//! read-only statement with a source clause, no denylisted keyword, balanced
//! parentheses and a bounded row count. A missing LIMIT is repaired rather
//! than rejected.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::config::GuardConfig;

static SELECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^select\b").expect("Invalid select regex"));

static FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfrom\b").expect("Invalid from regex"));

static LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\b").expect("Invalid limit regex"));

/// Data-mutation, schema-mutation, execution and file-write keywords.
static DENIED_KEYWORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|merge|upsert|alter|drop|create|replace|truncate|rename|grant|revoke|attach|detach|pragma|vacuum|exec|execute|load_file|into\s+outfile|into\s+dumpfile)\b",
    )
    .expect("Invalid denied keywords regex")
});

/// Comment markers are matched as plain substrings.
const DENIED_MARKERS: [&str; 3] = ["--", "/*", "*/"];

/// Why a candidate query was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("query is empty")]
    Empty,

    #[error("query must start with SELECT")]
    NotSelect,

    #[error("multiple statements are not allowed")]
    MultipleStatements,

    #[error("forbidden keyword: {0}")]
    ForbiddenKeyword(String),

    #[error("query has no FROM clause")]
    MissingFrom,

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
}

/// Outcome of [`QueryGuard::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryVerdict {
    /// Safe to execute. `query` is the cleaned, possibly limit-repaired text.
    Accept { query: String, limit_added: bool },
    /// Must not be executed.
    Reject { reason: Rejection },
}

impl QueryVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, QueryVerdict::Accept { .. })
    }

    pub fn cleaned_query(&self) -> Option<&str> {
        match self {
            QueryVerdict::Accept { query, .. } => Some(query),
            QueryVerdict::Reject { .. } => None,
        }
    }

    pub fn error_reason(&self) -> Option<String> {
        match self {
            QueryVerdict::Accept { .. } => None,
            QueryVerdict::Reject { reason } => Some(reason.to_string()),
        }
    }
}

/// Gate that classifies candidate query text as executable or not.
pub struct QueryGuard {
    default_limit: u32,
    extra_denied: Vec<(String, Regex)>,
}

impl QueryGuard {
    pub fn new(config: GuardConfig) -> Self {
        let extra_denied = config
            .extra_denied_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .filter_map(|k| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(k));
                match Regex::new(&pattern) {
                    Ok(re) => Some((k.to_uppercase(), re)),
                    Err(e) => {
                        tracing::warn!(keyword = k, error = %e, "Ignoring unusable denied keyword");
                        None
                    }
                }
            })
            .collect();

        Self {
            default_limit: config.default_limit,
            extra_denied,
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Classify `text`. Deterministic and free of side effects.
    pub fn check(&self, text: &str) -> QueryVerdict {
        match self.clean(text) {
            Ok((query, limit_added)) => QueryVerdict::Accept { query, limit_added },
            Err(reason) => QueryVerdict::Reject { reason },
        }
    }

    fn clean(&self, text: &str) -> Result<(String, bool), Rejection> {
        let stripped = strip_wrapping(text);
        if stripped.is_empty() {
            return Err(Rejection::Empty);
        }

        if !SELECT_RE.is_match(&stripped) {
            return Err(Rejection::NotSelect);
        }

        if stripped.contains(';') {
            return Err(Rejection::MultipleStatements);
        }

        if let Some(m) = DENIED_KEYWORDS_RE.find(&stripped) {
            return Err(Rejection::ForbiddenKeyword(normalize_keyword(m.as_str())));
        }
        if let Some(marker) = DENIED_MARKERS.iter().find(|m| stripped.contains(*m)) {
            return Err(Rejection::ForbiddenKeyword((*marker).to_string()));
        }
        if let Some((keyword, _)) = self.extra_denied.iter().find(|(_, re)| re.is_match(&stripped)) {
            return Err(Rejection::ForbiddenKeyword(keyword.clone()));
        }

        if !FROM_RE.is_match(&stripped) {
            return Err(Rejection::MissingFrom);
        }

        if !parentheses_balanced(&stripped) {
            return Err(Rejection::UnbalancedParentheses);
        }

        if LIMIT_RE.is_match(&stripped) {
            Ok((stripped, false))
        } else {
            Ok((format!("{}\nLIMIT {}", stripped, self.default_limit), true))
        }
    }
}

impl Default for QueryGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

/// Remove wrapping code-fence markers and a single trailing terminator.
fn strip_wrapping(text: &str) -> String {
    let mut s = text.trim();

    if let Some(rest) = s.strip_prefix("```") {
        // Optional language tag directly after the opening fence.
        let tag_len = rest
            .find(|c: char| c.is_whitespace())
            .filter(|&end| {
                let tag = &rest[..end];
                !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphabetic())
                    && !tag.eq_ignore_ascii_case("select")
            })
            .unwrap_or(0);
        s = rest[tag_len..].trim_start();
    }
    // A closing fence may sit on either side of the terminator.
    let mut terminator_seen = false;
    loop {
        if let Some(rest) = s.strip_suffix("```") {
            s = rest.trim_end();
        } else if let Some(rest) = s.strip_suffix(';').filter(|_| !terminator_seen) {
            terminator_seen = true;
            s = rest.trim_end();
        } else {
            break;
        }
    }
    s.trim().to_string()
}

fn normalize_keyword(matched: &str) -> String {
    matched
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn parentheses_balanced(s: &str) -> bool {
    let mut depth: i64 = 0;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
