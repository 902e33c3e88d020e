use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::lexicon::NumberWordLexicon;

/// Words dropped before any matching happens.
pub const FILLER_WORDS: &[&str] = &[
    "please", "the", "answer", "is", "what", "uh", "um", "er", "ah", "like", "okay", "well",
];

const ZERO_CUES: &[&str] = &["zero", "oh"];
const SIGN_WORDS: &[&str] = &["minus", "negative"];

static NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:minus|negative)\s+([0-9]+)(?:(?:\.|\s+point\s+)([0-9]+))?")
        .expect("negative pattern compiles")
});
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)(?:\.|\s+point\s+)([0-9]+)").expect("decimal pattern compiles"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digits pattern compiles"));

/// A number extracted from speech.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpokenNumber {
    Integer(i64),
    Decimal(f64),
}

impl SpokenNumber {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            SpokenNumber::Integer(n) => n as f64,
            SpokenNumber::Decimal(x) => x,
        }
    }

    fn negated(self) -> Self {
        match self {
            SpokenNumber::Integer(n) => SpokenNumber::Integer(-n),
            SpokenNumber::Decimal(x) => SpokenNumber::Decimal(-x),
        }
    }
}

impl fmt::Display for SpokenNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpokenNumber::Integer(n) => write!(f, "{n}"),
            SpokenNumber::Decimal(x) => write!(f, "{x}"),
        }
    }
}

/// Extracts a numeric answer from a free-form recognized phrase.
///
/// Strategies run in a fixed order and the first hit wins: zero cue, digit
/// patterns, exact lexicon match, word sum, then unspaced compounds.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptParser {
    lexicon: &'static NumberWordLexicon,
}

impl Default for TranscriptParser {
    fn default() -> Self {
        Self::new(NumberWordLexicon::standard())
    }
}

impl TranscriptParser {
    #[must_use]
    pub fn new(lexicon: &'static NumberWordLexicon) -> Self {
        Self { lexicon }
    }

    /// Parses `transcript`, returning `None` when nothing numeric was said.
    #[must_use]
    pub fn parse(&self, transcript: &str) -> Option<SpokenNumber> {
        let cleaned = normalize(transcript);
        if cleaned.is_empty() {
            return None;
        }
        let tokens: Vec<&str> = cleaned.split(' ').collect();

        if tokens.iter().any(|t| ZERO_CUES.contains(t)) {
            return Some(SpokenNumber::Integer(0));
        }

        scan_digits(&cleaned)
            .or_else(|| self.lexicon.exact(&cleaned).map(SpokenNumber::Integer))
            .or_else(|| self.word_sum(&tokens))
            .or_else(|| self.compound(&tokens))
    }

    fn word_sum(&self, tokens: &[&str]) -> Option<SpokenNumber> {
        let mut total: i64 = 0;
        let mut last: Option<i64> = None;
        let mut negative = false;

        for token in tokens {
            if last.is_none() && SIGN_WORDS.contains(token) {
                negative = true;
                continue;
            }
            if let Some(scale) = self.lexicon.multiplier(token) {
                total = total.max(1).saturating_mul(scale);
                last = Some(total);
                continue;
            }
            let Some(value) = self.lexicon.word(token) else {
                continue;
            };
            match last {
                Some(prev) if NumberWordLexicon::is_tens(prev) && (1..=9).contains(&value) => {
                    total += value;
                    last = Some(prev + value);
                }
                // A second tens or teen word right after a tens word is a
                // restatement, not an addition.
                Some(prev) if NumberWordLexicon::is_tens(prev) && value >= 10 => {
                    total = total - prev + value;
                    last = Some(value);
                }
                _ => {
                    total += value;
                    last = Some(value);
                }
            }
        }

        (total > 0).then(|| signed(SpokenNumber::Integer(total), negative))
    }

    fn compound(&self, tokens: &[&str]) -> Option<SpokenNumber> {
        let negative = tokens.first().is_some_and(|t| SIGN_WORDS.contains(t));
        tokens
            .iter()
            .find_map(|token| self.lexicon.compound(token))
            .map(|value| signed(SpokenNumber::Integer(value), negative))
    }
}

fn signed(value: SpokenNumber, negative: bool) -> SpokenNumber {
    if negative { value.negated() } else { value }
}

fn scan_digits(cleaned: &str) -> Option<SpokenNumber> {
    if let Some(caps) = NEGATIVE.captures(cleaned) {
        let value = match caps.get(2) {
            Some(frac) => decimal(&caps[1], frac.as_str()),
            None => integer(&caps[1]),
        };
        if let Some(value) = value {
            return Some(value.negated());
        }
    }
    if let Some(caps) = DECIMAL.captures(cleaned) {
        if let Some(value) = decimal(&caps[1], &caps[2]) {
            return Some(value);
        }
    }
    DIGITS
        .find(cleaned)
        .and_then(|m| integer(m.as_str()))
}

fn integer(digits: &str) -> Option<SpokenNumber> {
    digits.parse::<i64>().ok().map(SpokenNumber::Integer)
}

fn decimal(whole: &str, frac: &str) -> Option<SpokenNumber> {
    format!("{whole}.{frac}")
        .parse::<f64>()
        .ok()
        .map(SpokenNumber::Decimal)
}

/// Lowercases, strips punctuation and drops filler words.
///
/// A `.` survives only between two digits. A `,` separating a group of three
/// digits is dropped, so `1,200` stays one number. A `-` directly in front of
/// a digit (and not glued to a preceding word) becomes the word `minus`.
#[must_use]
pub fn normalize(transcript: &str) -> String {
    let lower = transcript.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let mut spaced = String::with_capacity(lower.len());

    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_alphanumeric() => spaced.push(c),
            '\'' => {}
            '.' if prev.is_some_and(|p| p.is_ascii_digit())
                && next.is_some_and(|n| n.is_ascii_digit()) =>
            {
                spaced.push('.');
            }
            ',' if prev.is_some_and(|p| p.is_ascii_digit())
                && is_digit_group(&chars[i + 1..]) => {}
            '-' if next.is_some_and(|n| n.is_ascii_digit())
                && !prev.is_some_and(char::is_alphanumeric) =>
            {
                spaced.push_str(" minus ");
            }
            _ => spaced.push(' '),
        }
    }

    spaced
        .split_whitespace()
        .filter(|token| !FILLER_WORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_digit_group(rest: &[char]) -> bool {
    rest.len() >= 3
        && rest[..3].iter().all(char::is_ascii_digit)
        && !rest.get(3).is_some_and(char::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<SpokenNumber> {
        TranscriptParser::default().parse(text)
    }

    #[test]
    fn filler_only_is_none() {
        assert_eq!(parse("um uh the answer is"), None);
        assert_eq!(parse("okay well like please"), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("banana"), None);
    }

    #[test]
    fn twenty_one_every_way() {
        let expected = Some(SpokenNumber::Integer(21));
        assert_eq!(parse("twenty one"), expected);
        assert_eq!(parse("twentyone"), expected);
        assert_eq!(parse("21"), expected);
        assert_eq!(parse("Twenty-one."), expected);
    }

    #[test]
    fn negatives() {
        assert_eq!(parse("minus five"), Some(SpokenNumber::Integer(-5)));
        assert_eq!(parse("negative 5"), Some(SpokenNumber::Integer(-5)));
        assert_eq!(parse("-5"), Some(SpokenNumber::Integer(-5)));
        assert_eq!(parse("minus 2 point 5"), Some(SpokenNumber::Decimal(-2.5)));
        assert_eq!(parse("negative twentythree"), Some(SpokenNumber::Integer(-23)));
    }

    #[test]
    fn zero_cues() {
        assert_eq!(parse("zero"), Some(SpokenNumber::Integer(0)));
        assert_eq!(parse("oh"), Some(SpokenNumber::Integer(0)));
        assert_eq!(parse("Oh!"), Some(SpokenNumber::Integer(0)));
    }

    #[test]
    fn decimals() {
        assert_eq!(parse("3.5"), Some(SpokenNumber::Decimal(3.5)));
        assert_eq!(parse("3 point 25"), Some(SpokenNumber::Decimal(3.25)));
        assert_eq!(parse("it's 12."), Some(SpokenNumber::Integer(12)));
    }

    #[test]
    fn fillers_around_a_word() {
        assert_eq!(
            parse("what is the answer uh twelve"),
            Some(SpokenNumber::Integer(12))
        );
    }

    #[test]
    fn homophones_only_match_alone() {
        assert_eq!(parse("for"), Some(SpokenNumber::Integer(4)));
        assert_eq!(parse("go to sleep"), None);
    }

    #[test]
    fn tens_words_do_not_stack() {
        assert_eq!(parse("twenty ten"), Some(SpokenNumber::Integer(10)));
        assert_eq!(parse("thirty twenty five"), Some(SpokenNumber::Integer(25)));
        assert_eq!(parse("forty two"), Some(SpokenNumber::Integer(42)));
    }

    #[test]
    fn hundreds_multiply() {
        assert_eq!(parse("two hundred"), Some(SpokenNumber::Integer(200)));
        assert_eq!(parse("three hundred and five"), Some(SpokenNumber::Integer(305)));
        assert_eq!(parse("one hundred twenty one"), Some(SpokenNumber::Integer(121)));
        assert_eq!(parse("minus two hundred"), Some(SpokenNumber::Integer(-200)));
        assert_eq!(parse("hundred"), Some(SpokenNumber::Integer(100)));
    }

    #[test]
    fn digit_groups_and_lists() {
        assert_eq!(parse("1,200"), Some(SpokenNumber::Integer(1200)));
        assert_eq!(parse("12,345,678"), Some(SpokenNumber::Integer(12_345_678)));
        assert_eq!(parse("3, 4"), Some(SpokenNumber::Integer(3)));
        assert_eq!(parse("12,34"), Some(SpokenNumber::Integer(12)));
    }

    #[test]
    fn only_ascii_digits_count() {
        assert_eq!(parse("٣ then 12"), Some(SpokenNumber::Integer(12)));
        assert_eq!(parse("minus ٣"), None);
    }

    #[test]
    fn normalize_drops_punctuation_and_fillers() {
        assert_eq!(normalize("Um, the answer is: 4.5!"), "4.5");
        assert_eq!(normalize("twenty-one"), "twenty one");
    }

    #[test]
    fn display_matches_input_format() {
        assert_eq!(SpokenNumber::Integer(-3).to_string(), "-3");
        assert_eq!(SpokenNumber::Decimal(2.5).to_string(), "2.5");
    }
}
