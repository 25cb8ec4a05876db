//! Linguistic Style Matching: category-frequency similarity between two
//! speakers' function-word usage, plus the exponential smoother that turns
//! per-turn scores into a stable trend.

use crate::config::{
    LSM_EPSILON, LSM_SMOOTHING_ALPHA, MIN_TOKENS_FOR_LSM, MIN_TOKENS_FOR_SMOOTHING, NEUTRAL_LSM,
};
use crate::nlp::models::{PosTag, Token};

/// The five closed linguistic categories compared by the LSM metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsmCategory {
    Pronouns,
    Articles,
    PrepositionsConjunctions,
    AuxVerbs,
    Negations,
}

/// Fixed category order; the final score is the arithmetic mean over these.
pub const LSM_CATEGORIES: [LsmCategory; 5] = [
    LsmCategory::Pronouns,
    LsmCategory::Articles,
    LsmCategory::PrepositionsConjunctions,
    LsmCategory::AuxVerbs,
    LsmCategory::Negations,
];

impl LsmCategory {
    /// Whether a token belongs to this category. Pronouns through
    /// auxiliaries are tag-driven; negations match on lemma or the
    /// negation dependency flag.
    fn contains(&self, token: &Token) -> bool {
        match self {
            LsmCategory::Pronouns => token.pos == PosTag::Pron,
            LsmCategory::Articles => token.pos == PosTag::Det,
            LsmCategory::PrepositionsConjunctions => {
                matches!(token.pos, PosTag::Adp | PosTag::Sconj | PosTag::Cconj)
            }
            LsmCategory::AuxVerbs => token.pos == PosTag::Aux,
            LsmCategory::Negations => token.lemma == "not" || token.negation_dep,
        }
    }

    fn count(&self, tokens: &[Token]) -> usize {
        tokens.iter().filter(|t| self.contains(t)).count()
    }
}

/// Raw LSM score over two spans of already-validated tokens.
///
/// Either side below the minimum token count returns the neutral 0.5
/// sentinel: a deliberate "insufficient signal" value, not a computed
/// similarity. Per category the match is
/// `1 - |f_a - f_b| / (f_a + f_b + ε)`; two spans that both use zero of a
/// category score 1.0 on it.
pub fn score(a: &[Token], b: &[Token]) -> f64 {
    if a.len() < MIN_TOKENS_FOR_LSM || b.len() < MIN_TOKENS_FOR_LSM {
        return NEUTRAL_LSM;
    }

    let mut total = 0.0;
    for category in LSM_CATEGORIES {
        let fa = category.count(a) as f64 / a.len() as f64;
        let fb = category.count(b) as f64 / b.len() as f64;
        total += 1.0 - (fa - fb).abs() / (fa + fb + LSM_EPSILON);
    }
    total / LSM_CATEGORIES.len() as f64
}

/// One smoothing step of the per-conversation LSM trend.
///
/// Applies `α·raw + (1-α)·prev` only when both spans meet the smoothing
/// threshold; otherwise the previous value passes through unchanged. The
/// threshold is intentionally higher than the scoring minimum so short
/// turns get per-turn feedback without moving the long-run estimate.
pub fn smooth(previous: f64, raw: f64, source_tokens: usize, target_tokens: usize) -> f64 {
    if source_tokens >= MIN_TOKENS_FOR_SMOOTHING && target_tokens >= MIN_TOKENS_FOR_SMOOTHING {
        LSM_SMOOTHING_ALPHA * raw + (1.0 - LSM_SMOOTHING_ALPHA) * previous
    } else {
        previous
    }
}
