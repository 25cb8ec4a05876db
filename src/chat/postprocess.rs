//! Reply post-processing.
//!
//! Static-condition turns must not leak mirrored style: emoji and
//! informal-lexicon tokens are stripped before the reply reaches the user.
//! Both conditions get whitespace and bullet-list normalization so the
//! frontend renders cleanly.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::style::lexicons::{is_emoji_char, INFORMAL_RE, WORD_RE};

static MULTI_WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static BULLET_MIDLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\n])(\n?)(\s*[*\-]\s+)").unwrap());
static BULLET_LEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*[*\-]\s+)").unwrap());
static EXCESS_NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Remove word tokens containing a run of three or more identical
/// characters ("soooo") — the informality cue the lexicon pattern cannot
/// express without backreferences.
fn strip_char_runs(text: &str) -> String {
    WORD_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let word = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            let mut run = 1usize;
            let mut prev: Option<char> = None;
            for c in word.chars() {
                if Some(c) == prev {
                    run += 1;
                    if run >= 3 {
                        return String::new();
                    }
                } else {
                    run = 1;
                    prev = Some(c);
                }
            }
            word.to_string()
        })
        .into_owned()
}

/// Normalize one generated reply for delivery.
pub fn post_process_response(resp: &str, adaptive: bool) -> String {
    let mut out = resp.to_string();

    if !adaptive {
        out = out.chars().filter(|c| !is_emoji_char(*c)).collect();
        out = INFORMAL_RE.replace_all(&out, "").into_owned();
        out = strip_char_runs(&out);
    }

    out = MULTI_WHITESPACE_RE.replace_all(&out, " ").trim().to_string();
    out = BULLET_MIDLINE_RE.replace_all(&out, "$1\n$3").into_owned();
    out = BULLET_LEADING_RE.replace_all(&out, "\n$1").into_owned();
    out = MULTI_WHITESPACE_RE.replace_all(&out, " ").trim().to_string();
    out = EXCESS_NEWLINES_RE.replace_all(&out, "\n\n").into_owned();

    out
}
