mod ids;
mod panel;
mod question;
mod settings;

pub use ids::{PanelId, ParseIdError};
pub use panel::{AnswerCheck, QuizBoard, QuizPanel, ResultTone};
pub use question::{
    MultipleChoice, Question, QuestionError, generate_mcq, generate_numbers, shuffle,
};
pub use settings::{SettingsError, SpeakerVoice, VoiceSettings, VoiceSettingsDraft};
