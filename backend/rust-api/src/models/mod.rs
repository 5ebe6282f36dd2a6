pub mod attempt;
pub mod outcome;
pub mod question;
pub mod quiz;

pub use attempt::{AnswerEvent, Attempt, AttemptStats, EventLog, LogEntry};
pub use outcome::{Adjustment, FinishReason, ModeOutcome, Selection};
pub use question::{AnswerOption, Difficulty, Question, QuestionId, QuestionPayload, QuestionType};
