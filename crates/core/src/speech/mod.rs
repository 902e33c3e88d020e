//! Turning recognized speech into answers.

mod lexicon;
mod transcript;

pub use lexicon::NumberWordLexicon;
pub use transcript::{FILLER_WORDS, SpokenNumber, TranscriptParser};
