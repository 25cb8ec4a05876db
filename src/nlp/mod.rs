//! The NLP service: one explicit service object owning every feature-model
//! collaborator, constructed at process start and injected where needed.
//!
//! Exposes the three engine entry points: [`NlpService::analyze_text`]
//! (feature extraction), [`NlpService::compute_lsm`] (style-match scoring)
//! and [`NlpService::style_similarity`] (embedding similarity). Extraction
//! never fails — missing models null their fields, empty input substitutes
//! a whitespace token so every ratio stays defined.

pub mod models;
pub mod readability;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::config::{
    NEUTRAL_LSM, PROFILE_CACHE_CAPACITY, SHORT_SPAN_TOKENS, Settings,
};
use crate::style::lexicons::{
    self, contains_emoji, detect_meta_request, hedging_match_count, informal_match_count,
    net_emoji_valence, pronoun_profile, FUNCTION_WORDS, VALID_TOKEN_RE,
};
use crate::style::lsm;
use crate::style::profile::StyleProfile;
use models::{
    CategoryLexicon, DisabledFormality, DisabledStyleEncoder, FormalityClassifier,
    HttpFormalityClassifier, HttpStyleEncoder, LexiconSentiment, RuleTagger, SentimentScorer,
    StyleEncoder, Tagger, Token, WordSetCategories,
};

/// Sentiment compound shift per net signed emoji occurrence.
const EMOJI_SENTIMENT_STEP: f64 = 0.1;

/// Bounded FIFO memoization of profiles keyed on exact text. Repeated
/// exact-text lookups are rare, so insertion-order eviction is enough.
struct ProfileCache {
    map: HashMap<String, StyleProfile>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ProfileCache {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, text: &str) -> Option<StyleProfile> {
        self.map.get(text).cloned()
    }

    fn insert(&mut self, text: String, profile: StyleProfile) {
        if self.map.contains_key(&text) {
            self.map.insert(text, profile);
            return;
        }
        if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.order.push_back(text.clone());
        self.map.insert(text, profile);
    }
}

/// Owns the feature-model collaborators and the derived engine operations.
pub struct NlpService {
    tagger: Arc<dyn Tagger>,
    sentiment: Arc<dyn SentimentScorer>,
    categories: Arc<dyn CategoryLexicon>,
    classifier: Arc<dyn FormalityClassifier>,
    encoder: Arc<dyn StyleEncoder>,
    warmed: AtomicBool,
    warmup_lock: tokio::sync::Mutex<()>,
    cache: Mutex<ProfileCache>,
}

impl NlpService {
    /// Build the service from settings. Learned models become HTTP sidecars
    /// when configured; otherwise they stay permanently unavailable and
    /// their profile fields read `None`.
    pub fn new(settings: &Settings) -> Self {
        let classifier: Arc<dyn FormalityClassifier> = match &settings.formality_url {
            Some(url) => Arc::new(HttpFormalityClassifier::new(url.clone())),
            None => Arc::new(DisabledFormality),
        };
        let encoder: Arc<dyn StyleEncoder> = match &settings.style_embed_url {
            Some(url) => Arc::new(HttpStyleEncoder::new(url.clone())),
            None => Arc::new(DisabledStyleEncoder),
        };
        Self {
            tagger: Arc::new(RuleTagger::new()),
            sentiment: Arc::new(LexiconSentiment::new()),
            categories: Arc::new(WordSetCategories::new()),
            classifier,
            encoder,
            warmed: AtomicBool::new(false),
            warmup_lock: tokio::sync::Mutex::new(()),
            cache: Mutex::new(ProfileCache::new(PROFILE_CACHE_CAPACITY)),
        }
    }

    /// Readiness flag for the scoring paths.
    pub fn is_warmed(&self) -> bool {
        self.warmed.load(Ordering::Acquire)
    }

    /// One-time idempotent warm-up. Concurrent callers serialize on the
    /// async mutex; the winner forces every lazy lexicon/pattern so later
    /// turns never pay compilation cost mid-request.
    pub async fn warm_up(&self) {
        let _guard = self.warmup_lock.lock().await;
        if self.is_warmed() {
            return;
        }
        tracing::info!("nlp warm-up: compiling lexicons and patterns");
        Lazy::force(&lexicons::INFORMAL_RE);
        Lazy::force(&lexicons::HEDGING_RE);
        Lazy::force(&lexicons::QUESTION_RE);
        Lazy::force(&lexicons::VALID_TOKEN_RE);
        Lazy::force(&FUNCTION_WORDS);
        self.warmed.store(true, Ordering::Release);
        tracing::info!("nlp warm-up complete");
    }

    /// Derive a [`StyleProfile`] from one text span. Never fails: empty
    /// input is analyzed as a single whitespace token, unavailable models
    /// null their fields.
    pub async fn analyze_text(&self, text: &str) -> StyleProfile {
        if let Some(hit) = self.cache.lock().get(text) {
            return hit;
        }
        if !self.is_warmed() {
            self.warm_up().await;
        }

        let original = text;
        let text = if text.is_empty() { " " } else { text };

        let tagged = self.tagger.tag(text);
        let word_count = tagged.tokens.len();
        let denom = word_count.max(1) as f64;
        let sentence_count = tagged.sentence_count.max(1);

        let informality_score_model = self.classifier.informality(text).await;
        if informality_score_model.is_none() {
            tracing::warn!("formality signal unavailable; profile field degrades to null");
        }

        let mut sentiment = self.sentiment.polarity(text);
        let shift = net_emoji_valence(text) as f64 * EMOJI_SENTIMENT_STEP;
        sentiment.compound = (sentiment.compound + shift).clamp(-1.0, 1.0);

        let category_scores = self.categories.analyze(text);
        let char_total: usize = tagged.tokens.iter().map(|t| t.text.chars().count()).sum();
        let function_count = tagged
            .tokens
            .iter()
            .filter(|t| FUNCTION_WORDS.contains(t.text.as_str()))
            .count();

        let profile = StyleProfile {
            word_count,
            informal_score_regex: informal_match_count(text) as f64 / denom,
            informality_score_model,
            hedging_score: hedging_match_count(text) as f64 / denom,
            emoji: contains_emoji(text),
            questioning: ends_interrogatively(text) || lexicons::QUESTION_RE.is_match(text),
            exclamatory: text.contains('!'),
            short: word_count <= SHORT_SPAN_TOKENS,
            question_count: text.matches('?').count(),
            exclamation_count: text.matches('!').count(),
            meta_request: detect_meta_request(text),
            sentiment_neg: sentiment.neg,
            sentiment_neu: sentiment.neu,
            sentiment_pos: sentiment.pos,
            sentiment_compound: sentiment.compound,
            avg_sentence_length: word_count as f64 / sentence_count as f64,
            avg_word_length: char_total as f64 / denom,
            flesch_reading_ease: readability::flesch_reading_ease(text),
            fk_grade: readability::flesch_kincaid_grade(text),
            function_word_ratio: function_count as f64 / denom,
            empath_social: category_scores.social,
            empath_cognitive: category_scores.cognitive,
            empath_affect: category_scores.affect,
            pronouns: pronoun_profile(text),
            lsm_score_prev: None,
        };

        self.cache.lock().insert(original.to_string(), profile.clone());
        profile
    }

    /// Raw LSM between two spans. Returns the neutral sentinel before
    /// warm-up, for empty input, or when either side has too few valid
    /// tokens.
    pub fn compute_lsm(&self, source: &str, target: &str) -> f64 {
        if !self.is_warmed() || source.is_empty() || target.is_empty() {
            return NEUTRAL_LSM;
        }
        let a = self.valid_tokens(source);
        let b = self.valid_tokens(target);
        lsm::score(&a, &b)
    }

    /// Embedding-space style similarity, when the encoder is available.
    pub async fn style_similarity(&self, source: &str, target: &str) -> Option<f64> {
        if !self.is_warmed() || source.is_empty() || target.is_empty() {
            return None;
        }
        self.encoder.similarity(source, target).await
    }

    /// Valid word-token count of a span, as used by the smoothing gate.
    pub fn valid_token_count(&self, text: &str) -> usize {
        self.valid_tokens(text).len()
    }

    fn valid_tokens(&self, text: &str) -> Vec<Token> {
        self.tagger
            .tag(text)
            .tokens
            .into_iter()
            .filter(|t| VALID_TOKEN_RE.is_match(&t.text))
            .collect()
    }
}

/// Last meaningful character is a question mark, looking through trailing
/// whitespace and emoji ("maybe?? 😂" still counts as a question).
fn ends_interrogatively(text: &str) -> bool {
    text.chars()
        .rev()
        .find(|c| !c.is_whitespace() && !lexicons::is_emoji_char(*c))
        == Some('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> NlpService {
        NlpService::new(&Settings::default())
    }

    #[tokio::test]
    async fn test_informal_short_question_span() {
        let svc = service();
        let profile = svc.analyze_text("lol idk maybe?? 😂").await;
        assert!(profile.emoji);
        assert!(profile.questioning);
        assert!(profile.short);
        assert!(profile.hedging_score > 0.0);
        assert!(profile.informal_score_regex > 0.0);
        assert_eq!(profile.question_count, 2);
        // No classifier sidecar configured: the model signal must be null.
        assert_eq!(profile.informality_score_model, None);
    }

    #[tokio::test]
    async fn test_empty_input_yields_defined_profile() {
        let svc = service();
        let profile = svc.analyze_text("").await;
        assert_eq!(profile.word_count, 0);
        assert_eq!(profile.informal_score_regex, 0.0);
        assert_eq!(profile.hedging_score, 0.0);
        assert!(profile.short);
        assert_eq!(profile.flesch_reading_ease, None);
        assert_eq!(profile.fk_grade, None);
        assert!(profile.avg_sentence_length.is_finite());
    }

    #[tokio::test]
    async fn test_extraction_is_deterministic() {
        let svc = service();
        let a = svc.analyze_text("We went to the park, and it was great!").await;
        let b = svc.analyze_text("We went to the park, and it was great!").await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_emoji_correction_shifts_compound() {
        let svc = service();
        let plain = svc.analyze_text("we met at the station").await;
        let cheered = svc.analyze_text("we met at the station 😊😊").await;
        assert!((cheered.sentiment_compound - plain.sentiment_compound - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_function_word_ratio_bounds() {
        let svc = service();
        let profile = svc.analyze_text("I was on the fence about it").await;
        assert!(profile.function_word_ratio > 0.0);
        assert!(profile.function_word_ratio <= 1.0);
    }

    #[tokio::test]
    async fn test_cache_fifo_eviction() {
        let svc = service();
        // Fill past capacity; the first entry must be evicted, later ones kept.
        for i in 0..(PROFILE_CACHE_CAPACITY + 1) {
            svc.analyze_text(&format!("span number {i}")).await;
        }
        let cache = svc.cache.lock();
        assert_eq!(cache.map.len(), PROFILE_CACHE_CAPACITY);
        assert!(!cache.map.contains_key("span number 0"));
        assert!(cache.map.contains_key("span number 1"));
    }

    #[test]
    fn test_lsm_neutral_before_warm_up() {
        let svc = service();
        assert_eq!(
            svc.compute_lsm("plenty of words over here to score", "and plenty over here as well"),
            0.5
        );
    }

    #[tokio::test]
    async fn test_lsm_after_warm_up() {
        let svc = service();
        svc.warm_up().await;
        let s = svc.compute_lsm(
            "i think we should go to the park because it is sunny",
            "you could walk over the bridge and see the river today",
        );
        assert!(s != 0.5);
        assert!((0.0..=1.0).contains(&s));
    }

    #[tokio::test]
    async fn test_warm_up_is_idempotent() {
        let svc = Arc::new(service());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move { svc.warm_up().await }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(svc.is_warmed());
    }

    #[tokio::test]
    async fn test_similarity_unavailable_without_encoder() {
        let svc = service();
        svc.warm_up().await;
        assert_eq!(svc.style_similarity("one span", "another span").await, None);
    }

    #[tokio::test]
    async fn test_profile_drives_adaptive_prompt() {
        let svc = service();
        let profile = svc.analyze_text("lol idk maybe?? 😂").await;
        let condition = crate::session::condition_for_name("none_adaptive").unwrap();
        let compiled = crate::prompt::compile(&condition, &profile);
        assert!(compiled.contains("The user seems casual"));
        assert!(compiled.contains("emojis"));
        assert!(!compiled.contains("speaking formally"));
        // Three informal cues over three words trips the guardrail too.
        assert!(compiled.contains(crate::config::GUARDRAIL_MARKER));
    }

    #[tokio::test]
    async fn test_feature_ranges_hold_across_inputs() {
        let svc = service();
        let inputs = vec![
            String::new(),
            "?".to_string(),
            "lol!!! sooooo good 😂😂😂".to_string(),
            "Would you perhaps consider, I think, a somewhat longer reply?".to_string(),
            "我们今天去公园了".to_string(),
            "word ".repeat(600),
        ];
        for text in inputs {
            let p = svc.analyze_text(&text).await;
            for ratio in [p.informal_score_regex, p.hedging_score, p.function_word_ratio] {
                assert!(ratio >= 0.0, "{text:.20}: ratio {ratio}");
            }
            assert!((-1.0..=1.0).contains(&p.sentiment_compound));
            for v in [p.sentiment_neg, p.sentiment_neu, p.sentiment_pos] {
                assert!((0.0..=1.0).contains(&v));
            }
            assert!(p.avg_sentence_length >= 0.0);
            assert!(p.avg_word_length >= 0.0);
            if let Some(model) = p.informality_score_model {
                assert!((0.0..=1.0).contains(&model));
            }
        }
    }

    #[test]
    fn test_valid_token_count_drops_punctuation_and_clitics() {
        let svc = service();
        // "it's" splits into "it" + "'s"; the "'s" fails the valid pattern.
        assert_eq!(svc.valid_token_count("it's fine, really!"), 3);
    }
}
