use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Number words that may appear anywhere in an utterance.
const WORDS: &[(&str, i64)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

/// Whole-utterance matches only. Homophones live here so that "to" or "for"
/// inside a longer sentence never count as numbers.
const PHRASES: &[(&str, i64)] = &[
    ("won", 1),
    ("to", 2),
    ("too", 2),
    ("tree", 3),
    ("free", 3),
    ("for", 4),
    ("fore", 4),
    ("ate", 8),
    ("tin", 10),
    ("dozen", 12),
    ("a dozen", 12),
    ("hundred", 100),
    ("a hundred", 100),
    ("one hundred", 100),
];

/// Words that scale everything said before them.
const MULTIPLIERS: &[(&str, i64)] = &[("hundred", 100)];

const TENS: &[&str] = &[
    "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

static STANDARD: Lazy<NumberWordLexicon> = Lazy::new(NumberWordLexicon::build);

/// Static mapping from spoken number words to values.
#[derive(Debug)]
pub struct NumberWordLexicon {
    words: HashMap<&'static str, i64>,
    phrases: HashMap<&'static str, i64>,
    multipliers: HashMap<&'static str, i64>,
}

impl NumberWordLexicon {
    /// The shared English lexicon.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    fn build() -> Self {
        Self {
            words: WORDS.iter().copied().collect(),
            phrases: PHRASES.iter().copied().collect(),
            multipliers: MULTIPLIERS.iter().copied().collect(),
        }
    }

    /// Value of a single number word, e.g. `seventeen`.
    #[must_use]
    pub fn word(&self, token: &str) -> Option<i64> {
        self.words.get(token).copied()
    }

    #[must_use]
    pub fn multiplier(&self, token: &str) -> Option<i64> {
        self.multipliers.get(token).copied()
    }

    /// Exact lookup of a whole cleaned utterance.
    #[must_use]
    pub fn exact(&self, text: &str) -> Option<i64> {
        self.word(text).or_else(|| self.phrases.get(text).copied())
    }

    /// Splits an unspaced compound such as `twentyone` into 21.
    #[must_use]
    pub fn compound(&self, token: &str) -> Option<i64> {
        TENS.iter().find_map(|tens| {
            let rest = token.strip_prefix(tens)?;
            let ones = self.word(rest).filter(|v| (1..=9).contains(v))?;
            Some(self.word(tens)? + ones)
        })
    }

    /// True for 20, 30, ... 90.
    #[must_use]
    pub fn is_tens(value: i64) -> bool {
        (20..=90).contains(&value) && value % 10 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_and_phrases_resolve() {
        let lexicon = NumberWordLexicon::standard();
        assert_eq!(lexicon.word("nineteen"), Some(19));
        assert_eq!(lexicon.word("to"), None);
        assert_eq!(lexicon.exact("to"), Some(2));
        assert_eq!(lexicon.exact("a dozen"), Some(12));
        assert_eq!(lexicon.exact("ninety"), Some(90));
        assert_eq!(lexicon.multiplier("hundred"), Some(100));
        assert_eq!(lexicon.word("hundred"), None);
    }

    #[test]
    fn compounds_need_tens_and_ones() {
        let lexicon = NumberWordLexicon::standard();
        assert_eq!(lexicon.compound("twentyone"), Some(21));
        assert_eq!(lexicon.compound("ninetynine"), Some(99));
        assert_eq!(lexicon.compound("twentyten"), None);
        assert_eq!(lexicon.compound("twenty"), None);
        assert_eq!(lexicon.compound("onetwenty"), None);
    }

    #[test]
    fn tens_detection() {
        assert!(NumberWordLexicon::is_tens(40));
        assert!(!NumberWordLexicon::is_tens(10));
        assert!(!NumberWordLexicon::is_tens(45));
    }
}
