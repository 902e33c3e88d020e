use thiserror::Error;

use crate::model::{QuestionError, SettingsError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}
