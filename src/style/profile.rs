//! The Style Profile — the typed feature vector derived from one span of text.
//!
//! Every field is computed independently; optional fields are `None` when
//! the producing model is unavailable, which is a distinct state from 0 and
//! must survive serialization round-trips unchanged.

use serde::{Deserialize, Serialize};

/// Whole-word pronoun presence flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PronounProfile {
    /// First-person singular ("i") present.
    pub i: bool,
    /// Second-person ("you") present.
    pub you: bool,
    /// First-person plural ("we") present.
    pub we: bool,
}

/// Explicit verbosity request detected from fixed keyword families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaRequest {
    /// "short", "concise", "too long", ...
    Shorter,
    /// "more detail", "elaborate", ...
    Longer,
    /// "simpler", "easier", ...
    Simpler,
}

/// Quantitative linguistic snapshot of one text span.
///
/// Ratios are `count / max(1, word_count)` so they are defined for every
/// input including the empty string. Normalized scores keep their model's
/// documented range (sentiment components in [-1,1] or [0,1]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Word tokens in the span.
    pub word_count: usize,
    /// Informality ratio from the rule-based lexicon match.
    pub informal_score_regex: f64,
    /// Informality probability from the learned classifier, when available.
    pub informality_score_model: Option<f64>,
    /// Hedging-phrase ratio.
    pub hedging_score: f64,
    /// Span contains at least one emoji.
    pub emoji: bool,
    /// Span ends in "?" or opens interrogatively.
    pub questioning: bool,
    /// Span contains at least one "!".
    pub exclamatory: bool,
    /// Span is at most ten words.
    pub short: bool,
    /// Literal "?" occurrences.
    pub question_count: usize,
    /// Literal "!" occurrences.
    pub exclamation_count: usize,
    /// Detected verbosity request, absent when none matched.
    pub meta_request: Option<MetaRequest>,
    /// Negative sentiment proportion.
    pub sentiment_neg: f64,
    /// Neutral sentiment proportion.
    pub sentiment_neu: f64,
    /// Positive sentiment proportion.
    pub sentiment_pos: f64,
    /// Normalized compound sentiment in [-1, 1], after emoji correction.
    pub sentiment_compound: f64,
    /// Words per sentence (sentence count floored at 1).
    pub avg_sentence_length: f64,
    /// Mean characters per word.
    pub avg_word_length: f64,
    /// Flesch reading-ease, absent when the span has no words.
    pub flesch_reading_ease: Option<f64>,
    /// Flesch-Kincaid grade level, absent when the span has no words.
    pub fk_grade: Option<f64>,
    /// Share of words drawn from the closed function-word set.
    pub function_word_ratio: f64,
    /// Normalized "social" category score from the category lexicon.
    pub empath_social: f64,
    /// Normalized "cognitive" category score.
    pub empath_cognitive: f64,
    /// Normalized "affect" category score.
    pub empath_affect: f64,
    /// Pronoun presence flags.
    pub pronouns: PronounProfile,
    /// Smoothed LSM carried over from before this turn. Attached by the
    /// orchestrator, never computed by the extractor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsm_score_prev: Option<f64>,
}

impl StyleProfile {
    /// A profile with every counter zeroed and every model signal absent.
    pub fn empty() -> Self {
        Self {
            word_count: 0,
            informal_score_regex: 0.0,
            informality_score_model: None,
            hedging_score: 0.0,
            emoji: false,
            questioning: false,
            exclamatory: false,
            short: true,
            question_count: 0,
            exclamation_count: 0,
            meta_request: None,
            sentiment_neg: 0.0,
            sentiment_neu: 0.0,
            sentiment_pos: 0.0,
            sentiment_compound: 0.0,
            avg_sentence_length: 0.0,
            avg_word_length: 0.0,
            flesch_reading_ease: None,
            fk_grade: None,
            function_word_ratio: 0.0,
            empath_social: 0.0,
            empath_cognitive: 0.0,
            empath_affect: 0.0,
            pronouns: PronounProfile::default(),
            lsm_score_prev: None,
        }
    }
}
