use std::collections::BTreeSet;
use std::fmt::Write as _;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("a question needs at least one number")]
    NoLevels,
}

/// Number of distractors offered next to the correct answer.
const WRONG_OPTIONS: usize = 3;

/// Largest distance between a distractor and the correct answer.
const MAX_OFFSET: i64 = 7;

/// Draws `levels` operands for one question.
///
/// Up to three numbers stay positive (1..=9); longer chains mix in small
/// negatives (-9..=9, never zero).
///
/// # Errors
///
/// Returns `QuestionError::NoLevels` when `levels` is zero.
pub fn generate_numbers<R: Rng + ?Sized>(
    levels: usize,
    rng: &mut R,
) -> Result<Vec<i64>, QuestionError> {
    if levels == 0 {
        return Err(QuestionError::NoLevels);
    }

    let numbers: Vec<i64> = (0..levels)
        .map(|_| {
            if levels <= 3 {
                rng.random_range(1..=9)
            } else {
                match rng.random_range(-9..=9) {
                    0 => 1,
                    n => n,
                }
            }
        })
        .collect();
    Ok(numbers)
}

/// Returns a shuffled copy of `values`.
#[must_use]
pub fn shuffle<T: Clone, R: Rng + ?Sized>(values: &[T], rng: &mut R) -> Vec<T> {
    let mut out = values.to_vec();
    out.shuffle(rng);
    out
}

/// Four answer options, one of which is the sum of the operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipleChoice {
    pub options: Vec<i64>,
    pub correct_index: usize,
}

impl MultipleChoice {
    #[must_use]
    pub fn correct(&self) -> Option<i64> {
        self.options.get(self.correct_index).copied()
    }
}

/// Builds a multiple-choice set around the sum of `numbers`.
#[must_use]
pub fn generate_mcq<R: Rng + ?Sized>(numbers: &[i64], rng: &mut R) -> MultipleChoice {
    let answer: i64 = numbers.iter().sum();
    let mut wrong = BTreeSet::new();
    while wrong.len() < WRONG_OPTIONS {
        let offset = rng.random_range(-MAX_OFFSET..=MAX_OFFSET);
        if offset != 0 {
            wrong.insert(answer + offset);
        }
    }

    let mut all: Vec<i64> = wrong.into_iter().collect();
    all.push(answer);
    let options = shuffle(&all, rng);
    let correct_index = options
        .iter()
        .position(|option| *option == answer)
        .unwrap_or_default();

    MultipleChoice {
        options,
        correct_index,
    }
}

/// One arithmetic question: add up every operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    operands: Vec<i64>,
    choice: MultipleChoice,
}

impl Question {
    /// Draws a fresh question with `levels` operands.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoLevels` when `levels` is zero.
    pub fn generate<R: Rng + ?Sized>(levels: usize, rng: &mut R) -> Result<Self, QuestionError> {
        let operands = generate_numbers(levels, rng)?;
        let choice = generate_mcq(&operands, rng);
        Ok(Self { operands, choice })
    }

    /// Builds a question from known operands.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoLevels` when `operands` is empty.
    pub fn from_operands<R: Rng + ?Sized>(
        operands: Vec<i64>,
        rng: &mut R,
    ) -> Result<Self, QuestionError> {
        if operands.is_empty() {
            return Err(QuestionError::NoLevels);
        }
        let choice = generate_mcq(&operands, rng);
        Ok(Self { operands, choice })
    }

    #[must_use]
    pub fn operands(&self) -> &[i64] {
        &self.operands
    }

    #[must_use]
    pub fn num1(&self) -> i64 {
        self.operands.first().copied().unwrap_or_default()
    }

    #[must_use]
    pub fn num2(&self) -> i64 {
        self.operands.get(1).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn answer(&self) -> i64 {
        self.operands.iter().sum()
    }

    #[must_use]
    pub fn choice(&self) -> &MultipleChoice {
        &self.choice
    }

    /// Written form, e.g. `4 + 2 - 3`.
    #[must_use]
    pub fn expression(&self) -> String {
        let mut out = String::new();
        for (i, n) in self.operands.iter().enumerate() {
            match (i, *n < 0) {
                (0, _) => {
                    let _ = write!(out, "{n}");
                }
                (_, true) => {
                    let _ = write!(out, " - {}", n.unsigned_abs());
                }
                (_, false) => {
                    let _ = write!(out, " + {n}");
                }
            }
        }
        out
    }

    /// Spoken form, e.g. `What is 4 plus 2?`.
    #[must_use]
    pub fn prompt(&self) -> String {
        let mut out = String::from("What is");
        for (i, n) in self.operands.iter().enumerate() {
            match (i, *n < 0) {
                (_, true) => {
                    let _ = write!(out, " minus {}", n.unsigned_abs());
                }
                (0, false) => {
                    let _ = write!(out, " {n}");
                }
                (_, false) => {
                    let _ = write!(out, " plus {n}");
                }
            }
        }
        out.push('?');
        out
    }
}
