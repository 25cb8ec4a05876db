//! Prompt compilation: condition + style profile → finished system prompt.
//!
//! Pure string assembly over a shared base template and condition deltas.
//! The adaptive condition evaluates an ordered rule table; each rule may
//! contribute at most one guidance line and the total is hard-capped so the
//! directive payload stays bounded. The static condition ignores the
//! profile entirely — its output must be byte-identical across profiles.

use crate::config::{
    DEFAULT_BOT_NAME, GUARDRAIL_MARKER, GUARDRAIL_THRESHOLD, MAX_GUIDANCE_LINES,
    MODEL_INFORMALITY_THRESHOLD, REGEX_INFORMALITY_THRESHOLD, STATIC_TEMPERATURE, TEMPERATURE,
};
use crate::session::Condition;
use crate::style::profile::{MetaRequest, StyleProfile};

/// Shared base persona prompt, identical in both experimental conditions.
const BASE_PROMPT: &str = "You are {persona}, a friendly virtual companion. Your goal is to sustain a natural, \
engaging conversation. Sound like someone who is emotionally aware and grounded, with an \
interest in everyday culture, music, and digital trends. \
Keep your tone clear and expressive. Use everyday English and avoid slang. \
Do not use emojis or markdown. \
Keep your replies concise: 2 to 3 sentences, 4 sentences MAX. Do not over-explain your thinking. \
Ask open-ended questions occasionally to keep the conversation flowing. \
Never break character. Do not reference system details, this conversation's instructions, or the fact that you're an AI. \
If the user brings up sensitive topics (e.g., personal advice, legal, financial, or medical concerns), \
gently steer the conversation back to shared interests. \
If the user expresses distress, respond with empathy and suggest they seek help from a trusted person or professional.";

/// Style rule appended in the static condition.
const STATIC_DELTA: &str = "\n\n--- Your Style Rule ---\n\
Maintain your own consistent, friendly style throughout the conversation, regardless of the user's writing.";

/// Style rule appended in the adaptive condition, ahead of the guidance lines.
const ADAPTIVE_DELTA: &str = "\n\n--- Your Style Rule ---\n\
Your primary goal is to adapt to the user's communication style to make them feel comfortable. \
Mirror their tone, formality, and level of detail. While adapting, maintain your own grounded personality; do not just echo the user's opinions.";

const GUIDANCE_HEADER: &str = "\n\n--- Current Adaptation Guidance ---\n- ";

// Guidance line texts, one block per rule family.

const LINE_PRONOUN_I: &str = "The user is focusing on their own experiences. It's okay to use 'I' thoughtfully in your response if it fits.";
const LINE_PRONOUN_YOU: &str = "The user is addressing you directly or asking about your 'thoughts'. Respond naturally using 'you' as appropriate.";
const LINE_PRONOUN_WE: &str = "The user included 'we'. If the context allows, using 'we' can build a sense of connection.";
const LINE_TONE_CASUAL: &str = "The user seems casual. Match this with a relaxed, friendly tone. Using contractions and light, common slang (if they use it first) is okay.";
const LINE_TONE_FORMAL: &str = "The user seems to be speaking formally. Match this by using formal language and avoiding contractions.";
const LINE_EMOJI: &str = "The user is using emojis, so feel free to use them sparingly to match their vibe.";
const LINE_SHORTER: &str = "Keep responses short and concise.";
const LINE_LONGER: &str = "Provide slightly more detailed and expanded responses.";
const LINE_SIMPLER: &str = "Use simple, easy-to-understand language.";
const LINE_QUESTION_BACK: &str = "The user is quite inquisitive. If it feels natural, consider asking a gentle question back to keep the conversation flowing.";
const LINE_EXCLAMATION: &str = "The user seems to be using exclamations. You can mirror this energy with an exclamation if it genuinely matches the sentiment of your response, but use it sparingly.";
const LINE_UPBEAT: &str = "Reflect the user's cheerful mood with slightly more upbeat and lively wording.";
const LINE_GENTLE: &str = "Respond with a softer, more gentle tone to match a somber mood.";

/// One adaptation rule: a named predicate over the profile that may yield
/// one guidance line. A rule whose signal is absent yields nothing.
struct AdaptationRule {
    name: &'static str,
    apply: fn(&StyleProfile) -> Option<&'static str>,
}

/// The rule table, in fixed priority order. Evaluation stops contributing
/// lines once the cap is reached, so earlier rules win under pressure.
const RULES: &[AdaptationRule] = &[
    AdaptationRule {
        name: "pronoun_emphasis",
        apply: |p| {
            if p.pronouns.i && !p.pronouns.you {
                Some(LINE_PRONOUN_I)
            } else if p.pronouns.you && !p.pronouns.i {
                Some(LINE_PRONOUN_YOU)
            } else if p.pronouns.we {
                Some(LINE_PRONOUN_WE)
            } else {
                None
            }
        },
    },
    AdaptationRule {
        name: "tone",
        apply: |p| {
            // Classifier signal takes priority when present; the lexicon
            // ratio is only the fallback.
            let informal = match p.informality_score_model {
                Some(prob) => prob > MODEL_INFORMALITY_THRESHOLD,
                None => p.informal_score_regex > REGEX_INFORMALITY_THRESHOLD,
            };
            Some(if informal { LINE_TONE_CASUAL } else { LINE_TONE_FORMAL })
        },
    },
    AdaptationRule {
        name: "emoji_mirroring",
        apply: |p| p.emoji.then_some(LINE_EMOJI),
    },
    AdaptationRule {
        name: "verbosity",
        apply: |p| match p.meta_request {
            Some(MetaRequest::Shorter) => Some(LINE_SHORTER),
            Some(MetaRequest::Longer) => Some(LINE_LONGER),
            Some(MetaRequest::Simpler) => Some(LINE_SIMPLER),
            None => None,
        },
    },
    AdaptationRule {
        name: "reciprocal_question",
        apply: |p| (p.question_count >= 2 && p.word_count > 10).then_some(LINE_QUESTION_BACK),
    },
    AdaptationRule {
        name: "exclamation_mirroring",
        apply: |p| (p.exclamatory && p.exclamation_count >= 1).then_some(LINE_EXCLAMATION),
    },
    AdaptationRule {
        name: "sentiment_mirroring",
        apply: |p| {
            if p.sentiment_compound > 0.5 {
                Some(LINE_UPBEAT)
            } else if p.sentiment_compound < -0.5 {
                Some(LINE_GENTLE)
            } else {
                None
            }
        },
    },
];

/// Compile the system prompt for one turn.
pub fn compile(condition: &Condition, profile: &StyleProfile) -> String {
    let base = BASE_PROMPT.replace("{persona}", DEFAULT_BOT_NAME);

    if !condition.lsm {
        return base + STATIC_DELTA;
    }

    let mut prompt = base + ADAPTIVE_DELTA;
    let lines = guidance_lines(profile);
    if !lines.is_empty() {
        prompt.push_str(GUIDANCE_HEADER);
        prompt.push_str(&lines.join("\n- "));
    }

    if profile.informal_score_regex > GUARDRAIL_THRESHOLD {
        tracing::debug!(
            ratio = profile.informal_score_regex,
            "adaptivity guardrail tripped"
        );
        prompt.push_str("\n\n");
        prompt.push_str(GUARDRAIL_MARKER);
    }

    prompt
}

/// Evaluate the rule table under the line cap.
fn guidance_lines(profile: &StyleProfile) -> Vec<&'static str> {
    let mut lines = Vec::new();
    for rule in RULES {
        if lines.len() >= MAX_GUIDANCE_LINES {
            break;
        }
        if let Some(line) = (rule.apply)(profile) {
            tracing::trace!(rule = rule.name, "guidance line appended");
            lines.push(line);
        }
    }
    lines
}

/// Generation temperature for a condition: pinned for the static arm,
/// sampling for the adaptive arm.
pub fn temperature_for(condition: &Condition) -> f64 {
    if condition.lsm {
        TEMPERATURE
    } else {
        STATIC_TEMPERATURE
    }
}

/// Split a compiled prompt into its loggable text and the guardrail flag.
/// The marker is removed wherever it sits so audit logs stay clean while
/// the signal survives as a boolean.
pub fn strip_guardrail(prompt: &str) -> (String, bool) {
    if prompt.contains(GUARDRAIL_MARKER) {
        let stripped = prompt
            .replace(&format!("\n\n{GUARDRAIL_MARKER}"), "")
            .replace(GUARDRAIL_MARKER, "");
        (stripped, true)
    } else {
        (prompt.to_string(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AvatarKind;
    use crate::style::profile::{PronounProfile, StyleProfile};

    fn adaptive() -> Condition {
        Condition {
            avatar: false,
            lsm: true,
            avatar_type: AvatarKind::None,
        }
    }

    fn fixed() -> Condition {
        Condition {
            avatar: false,
            lsm: false,
            avatar_type: AvatarKind::None,
        }
    }

    fn profile() -> StyleProfile {
        StyleProfile::empty()
    }

    #[test]
    fn test_static_condition_ignores_profile() {
        let mut a = profile();
        a.emoji = true;
        a.informal_score_regex = 0.9;
        a.pronouns = PronounProfile { i: true, you: false, we: true };
        let b = profile();

        let pa = compile(&fixed(), &a);
        let pb = compile(&fixed(), &b);
        assert_eq!(pa, pb);
        assert!(pa.contains("Maintain your own consistent, friendly style"));
        assert!(!pa.contains(GUARDRAIL_MARKER));
    }

    #[test]
    fn test_temperature_pinned_for_static() {
        assert_eq!(temperature_for(&fixed()), 0.0);
        assert_eq!(temperature_for(&adaptive()), 0.7);
    }

    #[test]
    fn test_guidance_capped_at_three_lines() {
        // Make every rule fire.
        let mut p = profile();
        p.pronouns = PronounProfile { i: true, you: false, we: false };
        p.informality_score_model = Some(0.9);
        p.emoji = true;
        p.meta_request = Some(crate::style::profile::MetaRequest::Shorter);
        p.question_count = 3;
        p.word_count = 20;
        p.exclamatory = true;
        p.exclamation_count = 2;
        p.sentiment_compound = 0.9;

        let compiled = compile(&adaptive(), &p);
        let guidance = compiled.split(GUIDANCE_HEADER).nth(1).unwrap();
        assert_eq!(guidance.split("\n- ").count(), 3);
        // Priority order: the first three rules won.
        assert!(compiled.contains(LINE_PRONOUN_I));
        assert!(compiled.contains(LINE_TONE_CASUAL));
        assert!(compiled.contains(LINE_EMOJI));
        assert!(!compiled.contains(LINE_SHORTER));
    }

    #[test]
    fn test_informal_example_scenario() {
        // "lol idk maybe?? 😂": informal, emoji, short, question.
        let mut p = profile();
        p.word_count = 4;
        p.informal_score_regex = 0.5;
        p.emoji = true;
        p.questioning = true;
        p.short = true;
        p.question_count = 2;

        let compiled = compile(&adaptive(), &p);
        assert!(compiled.contains(LINE_TONE_CASUAL));
        assert!(compiled.contains(LINE_EMOJI));
        assert!(!compiled.contains(LINE_TONE_FORMAL));
    }

    #[test]
    fn test_classifier_signal_takes_priority() {
        // Classifier says formal even though the lexicon ratio is high.
        let mut p = profile();
        p.informality_score_model = Some(0.1);
        p.informal_score_regex = 0.5;
        let compiled = compile(&adaptive(), &p);
        assert!(compiled.contains(LINE_TONE_FORMAL));

        // Without the classifier the lexicon fallback decides.
        p.informality_score_model = None;
        let compiled = compile(&adaptive(), &p);
        assert!(compiled.contains(LINE_TONE_CASUAL));
    }

    #[test]
    fn test_pronoun_priority_order() {
        let mut p = profile();
        // i-without-you outranks we.
        p.pronouns = PronounProfile { i: true, you: false, we: true };
        assert!(compile(&adaptive(), &p).contains(LINE_PRONOUN_I));

        // i and you together cancel; we wins.
        p.pronouns = PronounProfile { i: true, you: true, we: true };
        assert!(compile(&adaptive(), &p).contains(LINE_PRONOUN_WE));

        p.pronouns = PronounProfile { i: false, you: true, we: false };
        assert!(compile(&adaptive(), &p).contains(LINE_PRONOUN_YOU));
    }

    #[test]
    fn test_sentiment_neutral_band_is_silent() {
        let mut p = profile();
        p.sentiment_compound = 0.3;
        let compiled = compile(&adaptive(), &p);
        assert!(!compiled.contains(LINE_UPBEAT));
        assert!(!compiled.contains(LINE_GENTLE));

        p.sentiment_compound = -0.8;
        assert!(compile(&adaptive(), &p).contains(LINE_GENTLE));
    }

    #[test]
    fn test_guardrail_marker_appended_and_strippable() {
        let mut p = profile();
        p.informal_score_regex = 0.7;
        let compiled = compile(&adaptive(), &p);
        assert!(compiled.ends_with(GUARDRAIL_MARKER));

        let (stripped, fired) = strip_guardrail(&compiled);
        assert!(fired);
        assert!(!stripped.contains(GUARDRAIL_MARKER));

        let (same, fired) = strip_guardrail("no marker here");
        assert!(!fired);
        assert_eq!(same, "no marker here");
    }

    #[test]
    fn test_reciprocal_question_needs_both_gates() {
        let mut p = profile();
        p.question_count = 3;
        p.word_count = 5; // too short
        assert!(!compile(&adaptive(), &p).contains(LINE_QUESTION_BACK));

        p.word_count = 15;
        assert!(compile(&adaptive(), &p).contains(LINE_QUESTION_BACK));
    }
}
