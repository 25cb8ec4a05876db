//! Closed lexicons and compiled patterns behind the style features.
//!
//! Everything here is a fixed rule set: the informality/hedging/question
//! patterns, the function-word inventory, the closed-class word lists that
//! drive the LSM categories, and the signed emoji sets for the sentiment
//! correction. None of it is learned or configurable at runtime.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Informal-register cues: netspeak, stacked terminal punctuation,
/// laughter runs, kaomoji. The repeated-character cue (e.g. "sooooo")
/// needs a backreference and lives in [`char_run_count`] instead.
pub static INFORMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(lol|lmao|rofl|bruh|bro|dude|yo|chill|fam|lit|dope|yolo|savage|no cap|omg|idk|btw|tbh|smh|omfg|wtf|idc|fyi|rn|lmk|hbu|wyd|tf|ngl|ikr|fr|af|imo|imho|gotcha|gimme|gonna|wanna|gotta|kinda|sorta|sup|wassup|hella|nah|yea|yep|vibing|vibe)\b|([!?]{2,})|(\b(ha|he|hi){2,}\b)|(<3|¯\\_\(ツ\)_/¯)",
    )
    .unwrap()
});

/// Hedging phrases.
pub static HEDGING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(maybe|probably|possibly|perhaps|might|could|seems|appears|suggests|i think|i guess|idk|not sure|kind of|sort of|somewhat|a bit|i suppose)\b",
    )
    .unwrap()
});

/// Interrogative opener, anchored at the start of the span.
pub static QUESTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(who|what|when|where|why|how|is|are|am|was|were|do|does|did|can|could|should|would|will|shall|may|might|have|has|had)\b",
    )
    .unwrap()
});

/// A token that participates in LSM counting: plain alphanumerics or the
/// clitic "n't".
pub static VALID_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9]+$|^n't$").unwrap());

/// Word tokens, contractions kept intact for later splitting.
pub static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w]+(?:'[\w]+)?").unwrap());

static META_SHORTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(short|shorter|concise|brief|less text|too long)\b").unwrap());
static META_LONGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(more detail|long|longer|lengthy|elaborate)\b").unwrap());
static META_SIMPLER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(simple|simpler|easy|easier)\b").unwrap());

static PRONOUN_I_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bi\b").unwrap());
static PRONOUN_YOU_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\byou\b").unwrap());
static PRONOUN_WE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bwe\b").unwrap());

/// Auxiliary verbs (closed class).
pub static AUX_VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "am", "is", "are", "was", "were", "be", "being", "been", "have", "has", "had", "having",
        "do", "does", "did", "will", "would", "shall", "should", "may", "might", "must", "can",
        "could",
    ]
    .into_iter()
    .collect()
});

/// Conjunctions, coordinating and subordinating together.
pub static CONJUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "and", "but", "or", "so", "yet", "for", "nor", "while", "whereas", "although", "though",
        "because", "since", "if", "unless", "until", "when", "as", "that", "whether", "after",
        "before",
    ]
    .into_iter()
    .collect()
});

/// Coordinating subset of [`CONJUNCTIONS`]; the rest tag as subordinating.
pub static COORDINATING_CONJUNCTIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["and", "but", "or", "so", "yet", "for", "nor"].into_iter().collect());

/// Negation function words, contracted forms included.
pub static NEGATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "no", "not", "never", "none", "nobody", "n't", "nothing", "nowhere", "neither", "nor",
        "ain't", "don't", "isn't", "wasn't", "weren't", "haven't", "hasn't", "hadn't", "didn't",
        "won't", "wouldn't", "shan't", "shouldn't", "mightn't", "mustn't", "can't", "couldn't",
    ]
    .into_iter()
    .collect()
});

/// Personal pronouns (closed class).
pub static PRONOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "you", "we", "he", "she", "they", "it", "me", "him", "her", "us", "them", "my",
        "your", "our", "his", "their", "its", "mine", "yours", "ours", "theirs", "myself",
        "yourself", "ourselves", "themselves", "himself", "herself", "itself",
    ]
    .into_iter()
    .collect()
});

/// Articles and other determiners (closed class).
pub static DETERMINERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "this", "that", "these", "those", "some", "any", "each", "every",
        "either", "another", "such",
    ]
    .into_iter()
    .collect()
});

/// Prepositions (closed class).
pub static PREPOSITIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
        "during", "before", "after", "above", "below", "to", "from", "up", "down", "over",
        "under", "of", "off", "near", "around",
    ]
    .into_iter()
    .collect()
});

/// The full function-word inventory for the function-word ratio feature:
/// personal pronouns, articles, prepositions, auxiliaries, conjunctions
/// and negations.
pub static FUNCTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set: HashSet<&'static str> = [
        "i", "you", "we", "he", "she", "they", "me", "him", "her", "us", "them", "a", "an",
        "the", "in", "on", "at", "by", "for", "with", "about", "against", "between", "into",
        "through", "during", "before", "after", "above", "below", "to", "from", "up", "down",
        "over", "under",
    ]
    .into_iter()
    .collect();
    set.extend(AUX_VERBS.iter());
    set.extend(CONJUNCTIONS.iter());
    set.extend(NEGATIONS.iter());
    set
});

/// Emojis carrying positive valence for the sentiment correction.
pub const POSITIVE_EMOJIS: [&str; 9] = ["😊", "😄", "😁", "😚", "☺️", "😍", "😇", "🎉", "💖"];

/// Emojis carrying negative valence for the sentiment correction.
pub const NEGATIVE_EMOJIS: [&str; 8] = ["😢", "😭", "😠", "😡", "💔", "👿", "😞", "🤬"];

/// Count tokens that contain a run of three or more identical characters
/// ("sooooo", "yessss"). Stands in for the backreference-based informality
/// cue the regex engine cannot express.
pub fn char_run_count(text: &str) -> usize {
    WORD_RE
        .find_iter(text)
        .filter(|m| {
            let mut run = 1usize;
            let mut prev: Option<char> = None;
            for c in m.as_str().chars() {
                if Some(c) == prev {
                    run += 1;
                    if run >= 3 {
                        return true;
                    }
                } else {
                    run = 1;
                    prev = Some(c);
                }
            }
            false
        })
        .count()
}

/// Informality cue count for a span: lexicon/punctuation matches plus
/// repeated-character runs.
pub fn informal_match_count(text: &str) -> usize {
    INFORMAL_RE.find_iter(text).count() + char_run_count(text)
}

/// Hedging cue count for a span.
pub fn hedging_match_count(text: &str) -> usize {
    HEDGING_RE.find_iter(text).count()
}

/// Detect an explicit verbosity request. First matching family wins, in the
/// order shorter → longer → simpler.
pub fn detect_meta_request(text: &str) -> Option<crate::style::profile::MetaRequest> {
    use crate::style::profile::MetaRequest;
    if META_SHORTER_RE.is_match(text) {
        Some(MetaRequest::Shorter)
    } else if META_LONGER_RE.is_match(text) {
        Some(MetaRequest::Longer)
    } else if META_SIMPLER_RE.is_match(text) {
        Some(MetaRequest::Simpler)
    } else {
        None
    }
}

/// Whole-word pronoun presence for the pronoun profile.
pub fn pronoun_profile(text: &str) -> crate::style::profile::PronounProfile {
    crate::style::profile::PronounProfile {
        i: PRONOUN_I_RE.is_match(text),
        you: PRONOUN_YOU_RE.is_match(text),
        we: PRONOUN_WE_RE.is_match(text),
    }
}

/// True when the character falls in one of the common emoji blocks.
pub fn is_emoji_char(c: char) -> bool {
    matches!(u32::from(c),
        0x1F300..=0x1F5FF   // symbols & pictographs
        | 0x1F600..=0x1F64F // emoticons
        | 0x1F680..=0x1F6FF // transport
        | 0x1F900..=0x1F9FF // supplemental symbols
        | 0x1FA70..=0x1FAFF // extended-A
        | 0x2600..=0x26FF   // miscellaneous symbols
        | 0x2700..=0x27BF   // dingbats
        | 0x2764            // heavy black heart
    )
}

/// Span contains at least one emoji character.
pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(is_emoji_char)
}

/// Net signed emoji occurrences: positive-set counts minus negative-set
/// counts, substring occurrences included (a doubled emoji counts twice).
pub fn net_emoji_valence(text: &str) -> i32 {
    let count = |needles: &[&str]| -> i32 {
        needles
            .iter()
            .map(|e| text.matches(e).count() as i32)
            .sum()
    };
    count(&POSITIVE_EMOJIS) - count(&NEGATIVE_EMOJIS)
}
