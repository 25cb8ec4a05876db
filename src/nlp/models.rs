//! Feature-model collaborators consumed by the NLP service.
//!
//! Each model is a black box behind a small trait: a tagger, a sentiment
//! scorer, a category lexicon, a formality classifier, and a style-embedding
//! encoder. The first three ship with built-in rule/lexicon implementations;
//! the learned models are optional HTTP sidecars and report "unavailable"
//! (`None`) rather than failing, so the extraction pipeline can degrade
//! instead of erroring.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::config::CLASSIFIER_MAX_TOKENS;
use crate::style::lexicons::{
    AUX_VERBS, CONJUNCTIONS, COORDINATING_CONJUNCTIONS, DETERMINERS, PREPOSITIONS, PRONOUNS,
    WORD_RE,
};

// ============================================================================
// Tagger
// ============================================================================

/// Closed-class part-of-speech tag. Only the classes the LSM categories
/// need are distinguished; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    /// Personal pronoun.
    Pron,
    /// Article or other determiner.
    Det,
    /// Preposition.
    Adp,
    /// Subordinating conjunction.
    Sconj,
    /// Coordinating conjunction.
    Cconj,
    /// Auxiliary verb.
    Aux,
    /// Open-class or unknown.
    Other,
}

/// One tagged token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Lowercased surface form.
    pub text: String,
    /// Lemma; only "not" matters downstream (the negation category).
    pub lemma: String,
    /// Closed-class tag.
    pub pos: PosTag,
    /// Token functions as a negation marker.
    pub negation_dep: bool,
}

/// Output of tagging one span.
#[derive(Debug, Clone)]
pub struct TaggedText {
    /// Tokens in order, contractions split ("don't" → "do" + "n't").
    pub tokens: Vec<Token>,
    /// Sentence count, zero for an empty span.
    pub sentence_count: usize,
}

/// Tokenizer + part-of-speech tagger collaborator.
pub trait Tagger: Send + Sync {
    fn tag(&self, text: &str) -> TaggedText;
}

static NEGATION_MARKERS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["not", "n't", "never"].into_iter().collect());

/// Rule-based tagger over the closed function-word classes.
///
/// Tokenizes with a word regex, splits "n't" and apostrophe clitics the way
/// a statistical tokenizer would, and tags by word-list membership. Open
/// class words all tag `Other`, which is exactly enough signal for the LSM
/// categories and the function-word ratio.
#[derive(Debug, Default)]
pub struct RuleTagger;

impl RuleTagger {
    pub fn new() -> Self {
        Self
    }

    fn classify(word: &str) -> PosTag {
        if PRONOUNS.contains(word) {
            PosTag::Pron
        } else if DETERMINERS.contains(word) {
            PosTag::Det
        } else if PREPOSITIONS.contains(word) {
            PosTag::Adp
        } else if COORDINATING_CONJUNCTIONS.contains(word) {
            PosTag::Cconj
        } else if CONJUNCTIONS.contains(word) {
            PosTag::Sconj
        } else if AUX_VERBS.contains(word) {
            PosTag::Aux
        } else {
            PosTag::Other
        }
    }

    fn make_token(word: &str) -> Token {
        let lemma = if word == "n't" || word == "not" {
            "not".to_string()
        } else {
            word.to_string()
        };
        Token {
            negation_dep: NEGATION_MARKERS.contains(word),
            pos: Self::classify(word),
            lemma,
            text: word.to_string(),
        }
    }

    /// Split one raw word match into clitic pieces.
    fn split_word(word: &str) -> Vec<String> {
        if let Some(stem) = word.strip_suffix("n't") {
            if !stem.is_empty() {
                return vec![stem.to_string(), "n't".to_string()];
            }
        }
        if let Some(idx) = word.find('\'') {
            if idx > 0 {
                return vec![word[..idx].to_string(), word[idx..].to_string()];
            }
        }
        vec![word.to_string()]
    }
}

impl Tagger for RuleTagger {
    fn tag(&self, text: &str) -> TaggedText {
        let tokens = WORD_RE
            .find_iter(text)
            .flat_map(|m| Self::split_word(&m.as_str().to_lowercase()))
            .map(|w| Self::make_token(&w))
            .collect();

        let sentence_count = text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();

        TaggedText {
            tokens,
            sentence_count,
        }
    }
}

// ============================================================================
// Sentiment
// ============================================================================

/// Four-component polarity result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SentimentScores {
    /// Negative proportion in [0, 1].
    pub neg: f64,
    /// Neutral proportion in [0, 1].
    pub neu: f64,
    /// Positive proportion in [0, 1].
    pub pos: f64,
    /// Normalized compound score in [-1, 1].
    pub compound: f64,
}

/// Lexicon-based sentiment scorer collaborator.
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> SentimentScores;
}

/// Valence assignments for the built-in sentiment lexicon, on the usual
/// -4..=4 scale.
static VALENCE_LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        // positive
        ("good", 1.9), ("great", 3.1), ("awesome", 3.1), ("amazing", 2.8),
        ("love", 3.2), ("loved", 2.9), ("like", 1.5), ("liked", 1.8),
        ("happy", 2.7), ("glad", 2.0), ("fun", 2.3), ("nice", 1.8),
        ("cool", 1.3), ("best", 3.2), ("better", 1.9), ("wonderful", 2.7),
        ("excited", 2.2), ("exciting", 2.2), ("beautiful", 2.9), ("enjoy", 2.2),
        ("enjoyed", 2.3), ("thanks", 1.9), ("thank", 1.7), ("sweet", 2.0),
        ("perfect", 2.7), ("fantastic", 2.6), ("lol", 1.6), ("haha", 2.0),
        ("yay", 2.4), ("win", 2.8), ("winning", 2.4), ("cheerful", 2.5),
        ("friendly", 2.2), ("comfort", 1.5), ("hope", 1.9), ("hopeful", 2.3),
        ("relaxed", 1.8), ("calm", 1.3), ("interesting", 1.7), ("favorite", 2.0),
        // negative
        ("bad", -2.5), ("terrible", -3.1), ("awful", -2.7), ("horrible", -2.5),
        ("hate", -2.7), ("hated", -3.2), ("sad", -2.1), ("unhappy", -1.8),
        ("angry", -2.3), ("mad", -2.2), ("annoying", -1.7), ("annoyed", -1.8),
        ("worst", -3.1), ("worse", -2.1), ("boring", -1.3), ("bored", -1.4),
        ("tired", -1.2), ("stress", -1.9), ("stressed", -1.8), ("upset", -1.9),
        ("cry", -2.0), ("crying", -2.2), ("lonely", -2.0), ("hurt", -2.4),
        ("pain", -2.3), ("afraid", -2.2), ("scared", -2.2), ("worried", -1.6),
        ("worry", -1.6), ("lost", -1.3), ("fail", -2.3), ("failed", -2.3),
        ("sucks", -1.5), ("ugh", -1.5), ("miserable", -2.8), ("disappointed", -2.1),
    ]
    .into_iter()
    .collect()
});

static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("very", 0.293), ("really", 0.293), ("so", 0.293), ("extremely", 0.293),
        ("totally", 0.293), ("absolutely", 0.293), ("super", 0.293),
        ("slightly", -0.293), ("somewhat", -0.293), ("barely", -0.293),
        ("kinda", -0.293), ("marginally", -0.293),
    ]
    .into_iter()
    .collect()
});

static SENTIMENT_NEGATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "not", "n't", "no", "never", "neither", "nobody", "none", "without",
    ]
    .into_iter()
    .collect()
});

const NEGATION_DAMPENING: f64 = -0.74;
const NEGATION_WINDOW: usize = 3;
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Compact valence-lexicon scorer with negation flipping, booster scaling
/// and the standard `s / sqrt(s² + α)` compound normalization.
#[derive(Debug, Default)]
pub struct LexiconSentiment;

impl LexiconSentiment {
    pub fn new() -> Self {
        Self
    }
}

impl SentimentScorer for LexiconSentiment {
    fn polarity(&self, text: &str) -> SentimentScores {
        let words: Vec<String> = WORD_RE
            .find_iter(text)
            .flat_map(|m| RuleTagger::split_word(&m.as_str().to_lowercase()))
            .collect();

        let mut valences = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            let mut v = match VALENCE_LEXICON.get(word.as_str()) {
                Some(&v) => v,
                None => {
                    valences.push(0.0);
                    continue;
                }
            };

            let window_start = i.saturating_sub(NEGATION_WINDOW);
            for prior in &words[window_start..i] {
                if SENTIMENT_NEGATORS.contains(prior.as_str()) {
                    v *= NEGATION_DAMPENING;
                } else if let Some(&boost) = BOOSTERS.get(prior.as_str()) {
                    v += boost * v.signum();
                }
            }
            valences.push(v);
        }

        let sum: f64 = valences.iter().sum();
        let compound = (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0);

        // Proportions: positive and negative mass (offset by one unit each,
        // so a single hit registers), neutral as the zero-valence count.
        let pos_mass: f64 = valences.iter().filter(|v| **v > 0.0).map(|v| v + 1.0).sum();
        let neg_mass: f64 = valences.iter().filter(|v| **v < 0.0).map(|v| v.abs() + 1.0).sum();
        let neu_mass = valences.iter().filter(|v| **v == 0.0).count() as f64;
        let total = pos_mass + neg_mass + neu_mass;

        if total == 0.0 {
            return SentimentScores {
                neg: 0.0,
                neu: 0.0,
                pos: 0.0,
                compound: 0.0,
            };
        }

        SentimentScores {
            neg: neg_mass / total,
            neu: neu_mass / total,
            pos: pos_mass / total,
            compound,
        }
    }
}

// ============================================================================
// Category lexicon
// ============================================================================

/// Normalized topical/affect category scores.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryScores {
    pub social: f64,
    pub cognitive: f64,
    pub affect: f64,
}

/// Lexicon categorizer collaborator.
pub trait CategoryLexicon: Send + Sync {
    fn analyze(&self, text: &str) -> CategoryScores;
}

static SOCIAL_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "friend", "friends", "family", "mom", "dad", "brother", "sister", "people", "person",
        "talk", "talking", "chat", "meet", "meeting", "party", "together", "us", "we", "they",
        "everyone", "someone", "anybody", "social", "community", "team", "group", "partner",
        "neighbor", "date", "hang",
    ]
    .into_iter()
    .collect()
});

static COGNITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "think", "thinking", "thought", "know", "knowing", "understand", "understanding",
        "realize", "believe", "reason", "because", "cause", "consider", "remember", "idea",
        "ideas", "wonder", "decide", "decision", "figure", "guess", "learn", "learning",
        "question", "answer", "maybe", "perhaps", "plan", "planning",
    ]
    .into_iter()
    .collect()
});

static AFFECT_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "happy", "sad", "love", "hate", "angry", "mad", "glad", "fun", "enjoy", "cry", "laugh",
        "smile", "fear", "afraid", "scared", "excited", "bored", "tired", "stressed", "upset",
        "hurt", "lonely", "hope", "worry", "worried", "calm", "proud", "shame", "joy", "miss",
    ]
    .into_iter()
    .collect()
});

/// Word-set category lexicon normalized by word count.
#[derive(Debug, Default)]
pub struct WordSetCategories;

impl WordSetCategories {
    pub fn new() -> Self {
        Self
    }
}

impl CategoryLexicon for WordSetCategories {
    fn analyze(&self, text: &str) -> CategoryScores {
        let words: Vec<String> = WORD_RE
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        let denom = words.len().max(1) as f64;

        let count = |set: &HashSet<&'static str>| {
            words.iter().filter(|w| set.contains(w.as_str())).count() as f64
        };

        CategoryScores {
            social: count(&SOCIAL_WORDS) / denom,
            cognitive: count(&COGNITIVE_WORDS) / denom,
            affect: count(&AFFECT_WORDS) / denom,
        }
    }
}

// ============================================================================
// Formality classifier
// ============================================================================

/// Learned formality model collaborator. Returns the probability that the
/// span is informal, or `None` when the model is unavailable — a distinct
/// state the caller must never coerce to 0.
#[async_trait]
pub trait FormalityClassifier: Send + Sync {
    async fn informality(&self, text: &str) -> Option<f64>;
}

/// Placeholder used when no classifier sidecar is configured.
#[derive(Debug, Default)]
pub struct DisabledFormality;

#[async_trait]
impl FormalityClassifier for DisabledFormality {
    async fn informality(&self, _text: &str) -> Option<f64> {
        None
    }
}

/// Formality model served over HTTP.
///
/// `POST {url}` with `{"text": ...}` → `{"informal": p}`. Input is
/// truncated to the classifier's token limit instead of failing on long
/// spans; any transport or shape error degrades to `None` with a warning.
pub struct HttpFormalityClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpFormalityClassifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    fn truncate(text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() > CLASSIFIER_MAX_TOKENS {
            words[..CLASSIFIER_MAX_TOKENS].join(" ")
        } else {
            text.to_string()
        }
    }
}

#[async_trait]
impl FormalityClassifier for HttpFormalityClassifier {
    async fn informality(&self, text: &str) -> Option<f64> {
        if text.trim().is_empty() {
            return None;
        }
        let body = serde_json::json!({ "text": Self::truncate(text) });
        let result = self.client.post(&self.url).json(&body).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(json) => json["informal"].as_f64(),
                Err(e) => {
                    tracing::warn!("formality classifier returned unparseable body: {e}");
                    None
                }
            },
            Ok(resp) => {
                tracing::warn!("formality classifier returned {}", resp.status());
                None
            }
            Err(e) => {
                tracing::warn!("formality classifier unreachable: {e}");
                None
            }
        }
    }
}

// ============================================================================
// Style-embedding encoder
// ============================================================================

/// Style-embedding collaborator: cosine similarity of two spans in a style
/// embedding space, or `None` when the encoder is unavailable.
#[async_trait]
pub trait StyleEncoder: Send + Sync {
    async fn similarity(&self, a: &str, b: &str) -> Option<f64>;
}

/// Placeholder used when no encoder sidecar is configured.
#[derive(Debug, Default)]
pub struct DisabledStyleEncoder;

#[async_trait]
impl StyleEncoder for DisabledStyleEncoder {
    async fn similarity(&self, _a: &str, _b: &str) -> Option<f64> {
        None
    }
}

/// Style encoder served over HTTP.
///
/// `POST {url}` with `{"texts": [a, b]}` → `{"similarity": s}`.
pub struct HttpStyleEncoder {
    client: reqwest::Client,
    url: String,
}

impl HttpStyleEncoder {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl StyleEncoder for HttpStyleEncoder {
    async fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        if a.is_empty() || b.is_empty() {
            return None;
        }
        let body = serde_json::json!({ "texts": [a, b] });
        let result = self.client.post(&self.url).json(&body).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(json) => json["similarity"].as_f64(),
                Err(e) => {
                    tracing::warn!("style encoder returned unparseable body: {e}");
                    None
                }
            },
            Ok(resp) => {
                tracing::warn!("style encoder returned {}", resp.status());
                None
            }
            Err(e) => {
                tracing::warn!("style encoder unreachable: {e}");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
