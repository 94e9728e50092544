pub mod question;
pub mod request;
pub mod task;

pub use question::{ParseError, ParseErrorReason, Question, OPTION_COUNT};
pub use request::{Complexity, GenerationRequest, QuestionType, Subject, MAX_COUNT, MIN_COUNT};
pub use task::{Task, TaskError, TaskErrorKind, TaskStatus};
