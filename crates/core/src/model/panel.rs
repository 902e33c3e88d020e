use rand::Rng;

use crate::model::ids::PanelId;
use crate::model::question::{Question, QuestionError};

/// Colour hint for the result line of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTone {
    #[default]
    Neutral,
    Success,
    Error,
}

/// Outcome of checking the current input against the expected answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnswerCheck {
    Correct { answer: i64 },
    Incorrect { given: Option<f64>, expected: i64 },
}

impl AnswerCheck {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        matches!(self, AnswerCheck::Correct { .. })
    }
}

/// One practice panel: a question, the typed or spoken input, the result
/// line and the running score.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPanel {
    id: PanelId,
    question: Question,
    input: String,
    result: Option<(String, ResultTone)>,
    marks: u32,
    round: u64,
}

impl QuizPanel {
    #[must_use]
    pub fn new(id: PanelId, question: Question) -> Self {
        Self {
            id,
            question,
            input: String::new(),
            result: None,
            marks: 0,
            round: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> PanelId {
        self.id
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> i64 {
        self.question.answer()
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Current result line, if any.
    #[must_use]
    pub fn result(&self) -> Option<(&str, ResultTone)> {
        self.result
            .as_ref()
            .map(|(message, tone)| (message.as_str(), *tone))
    }

    pub fn show_result(&mut self, message: impl Into<String>, tone: ResultTone) {
        self.result = Some((message.into(), tone));
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    #[must_use]
    pub fn marks(&self) -> u32 {
        self.marks
    }

    /// Number of questions this panel has moved past.
    #[must_use]
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Compares the input with the expected sum and updates score and result.
    pub fn check_answer(&mut self) -> AnswerCheck {
        let expected = self.answer();
        let given = self.input.trim().parse::<f64>().ok();

        #[allow(clippy::cast_precision_loss)]
        let correct = given.is_some_and(|value| (value - expected as f64).abs() < f64::EPSILON);

        if correct {
            self.marks = self.marks.saturating_add(1);
            self.show_result("✓ Correct! +1 point", ResultTone::Success);
            AnswerCheck::Correct { answer: expected }
        } else {
            self.show_result("✗ Try again!", ResultTone::Error);
            AnswerCheck::Incorrect { given, expected }
        }
    }

    /// Replaces the question and resets the input and result line.
    pub fn next_question(&mut self, question: Question) {
        self.question = question;
        self.input.clear();
        self.result = None;
        self.round += 1;
    }
}

/// All panels shown on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizBoard {
    levels: usize,
    panels: Vec<QuizPanel>,
}

impl QuizBoard {
    /// Creates `count` panels, each with a fresh question of `levels` operands.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoLevels` when `levels` is zero.
    pub fn generate<R: Rng + ?Sized>(
        count: u32,
        levels: usize,
        rng: &mut R,
    ) -> Result<Self, QuestionError> {
        let panels = (0..count)
            .map(|i| {
                Question::generate(levels, &mut *rng).map(|q| QuizPanel::new(PanelId::new(i), q))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { levels, panels })
    }

    /// Builds a board from prepared panels.
    #[must_use]
    pub fn from_panels(levels: usize, panels: Vec<QuizPanel>) -> Self {
        Self { levels, panels }
    }

    #[must_use]
    pub fn levels(&self) -> usize {
        self.levels
    }

    #[must_use]
    pub fn panels(&self) -> &[QuizPanel] {
        &self.panels
    }

    #[must_use]
    pub fn get(&self, id: PanelId) -> Option<&QuizPanel> {
        self.panels.iter().find(|panel| panel.id() == id)
    }

    pub fn get_mut(&mut self, id: PanelId) -> Option<&mut QuizPanel> {
        self.panels.iter_mut().find(|panel| panel.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: PanelId) -> bool {
        self.get(id).is_some()
    }

    /// Total score across panels.
    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.panels.iter().map(QuizPanel::marks).sum()
    }

    /// Draws a new question for one panel. Returns `Ok(false)` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the board was built with zero levels.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        id: PanelId,
        rng: &mut R,
    ) -> Result<bool, QuestionError> {
        let levels = self.levels;
        let Some(panel) = self.get_mut(id) else {
            return Ok(false);
        };
        panel.next_question(Question::generate(levels, rng)?);
        Ok(true)
    }
}
