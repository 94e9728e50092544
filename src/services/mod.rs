pub mod question_archive;
pub mod question_parser;

pub use question_archive::{
    ArchiveRow, ArchivedQuestion, LoadedArchive, QuestionArchive, ARCHIVE_COLUMNS,
};
pub use question_parser::{parse_questions, ParseOutcome};
