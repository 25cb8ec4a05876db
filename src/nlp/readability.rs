//! Flesch readability scores from a heuristic syllable counter.

use crate::style::lexicons::WORD_RE;

/// Heuristic syllable count: vowel groups, minus a silent trailing "e",
/// floored at one.
pub fn count_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let chars: Vec<char> = lower.chars().filter(|c| c.is_alphabetic()).collect();
    if chars.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0usize;
    let mut in_group = false;
    for &c in &chars {
        if is_vowel(c) {
            if !in_group {
                groups += 1;
            }
            in_group = true;
        } else {
            in_group = false;
        }
    }

    // Silent trailing "e" ("make", "side") unless it is the only vowel
    // group or follows an "l" cluster ("table", "little").
    if groups > 1 && chars.len() >= 2 {
        let last = chars[chars.len() - 1];
        let prev = chars[chars.len() - 2];
        if last == 'e' && !is_vowel(prev) && prev != 'l' {
            groups -= 1;
        }
    }

    groups.max(1)
}

/// Word/sentence/syllable tallies for one span.
fn tallies(text: &str) -> Option<(f64, f64, f64)> {
    let words: Vec<&str> = WORD_RE.find_iter(text).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return None;
    }
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    Some((words.len() as f64, sentences as f64, syllables as f64))
}

/// Flesch reading-ease. `None` for a span with no words.
pub fn flesch_reading_ease(text: &str) -> Option<f64> {
    let (words, sentences, syllables) = tallies(text)?;
    Some(206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words))
}

/// Flesch-Kincaid grade level. `None` for a span with no words.
pub fn flesch_kincaid_grade(text: &str) -> Option<f64> {
    let (words, sentences, syllables) = tallies(text)?;
    Some(0.39 * (words / sentences) + 11.8 * (syllables / words) - 15.59)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syllable_counts() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("a"), 1);
    }

    #[test]
    fn test_empty_text_yields_none() {
        assert_eq!(flesch_reading_ease(""), None);
        assert_eq!(flesch_kincaid_grade("   "), None);
        assert_eq!(flesch_reading_ease("?!."), None);
    }

    #[test]
    fn test_simple_text_reads_easier_than_dense_text() {
        let simple = flesch_reading_ease("The cat sat. The dog ran.").unwrap();
        let dense = flesch_reading_ease(
            "Considerable institutional complexities characteristically necessitate comprehensive organizational restructuring.",
        )
        .unwrap();
        assert!(simple > dense);
    }

    #[test]
    fn test_grade_tracks_difficulty() {
        let simple = flesch_kincaid_grade("The cat sat. The dog ran.").unwrap();
        let dense = flesch_kincaid_grade(
            "Considerable institutional complexities characteristically necessitate comprehensive organizational restructuring.",
        )
        .unwrap();
        assert!(dense > simple);
    }
}
