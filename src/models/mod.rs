mod question;
mod survey;

pub use question::{Question, QuizOption, OPTION_ID_SENTINEL};
pub use survey::{BankOption, BankQuestion, QuizBank, Survey};
