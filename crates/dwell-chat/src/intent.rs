//! Detection of "go ahead and search" replies.
//!
//! While optional criteria are being offered, the user either names more
//! criteria or signals that the current set is enough. Phrases are matched
//! anywhere in the utterance on word boundaries, case-insensitively, so "know"
//! or "now" never count as "no". A reply that opens with a decline ("no",
//! "nope", "nah") counts when the decline is followed by punctuation or a
//! closing word such as "thanks" or "extras". Short replies such as "ok" only
//! count when they make up the whole reply.

use std::sync::LazyLock;

use regex::Regex;

/// Phrases that signal the user wants to search now.
const PROCEED_PHRASES: &[&str] = &[
    "that's all",
    "thats all",
    "that is all",
    "that's it",
    "thats it",
    "nothing else",
    "nothing more",
    "no more",
    "no thanks",
    "no thank you",
    "no extras",
    "no extra",
    "no need",
    "all good",
    "that's fine",
    "thats fine",
    "fine",
    "go ahead",
    "search now",
    "search it",
    "just search",
    "start the search",
    "looks good",
    "sounds good",
    "good as is",
    "enough",
    "proceed",
    "perfect",
    "ready",
    "done",
];

static PROCEED_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = PROCEED_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("Invalid proceed regex")
});

/// Whole-utterance replies, punctuation aside.
static BARE_PROCEED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:no|nope|nah|ok|okay|no thanks|no thank you|search|go)\s*[.!]*\s*$")
        .expect("Invalid bare proceed regex")
});

/// A reply opening with a decline, followed by punctuation or a closing word.
static LEADING_DECLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:no|nope|nah)\b\s*(?:[,.!;:-]|$|(?:thanks|thank|thx|extras?|more|need|other|further|additional|i'?m|that'?s|it'?s|just|search|all)\b)",
    )
    .expect("Invalid leading decline regex")
});

/// Whether `utterance` asks to stop adding criteria and search.
pub fn wants_to_proceed(utterance: &str) -> bool {
    BARE_PROCEED_RE.is_match(utterance)
        || LEADING_DECLINE_RE.is_match(utterance)
        || PROCEED_RE.is_match(utterance)
}
