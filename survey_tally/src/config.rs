// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One answer of a question that carries a percentage breakdown.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WeightedAnswer {
    pub answer: String,
    pub value: u64,
    /// The percentage as exported by the survey tool, for example `"80%"`.
    /// It is kept as text: the exports are already rounded.
    pub percent: String,
}

impl WeightedAnswer {
    pub fn new(answer: &str, value: u64, percent: &str) -> WeightedAnswer {
        WeightedAnswer {
            answer: answer.to_string(),
            value,
            percent: percent.to_string(),
        }
    }
}

/// The answers of a question, in the order of the export.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum QuestionOptions {
    /// Each answer has a count and a percentage.
    Weighted(Vec<WeightedAnswer>),
    /// A skipped question: a flat answer -> count tally, without percentages.
    Skipped(Vec<(String, u64)>),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub title: String,
    pub options: QuestionOptions,
}

impl Question {
    pub fn is_skipped(&self) -> bool {
        matches!(self.options, QuestionOptions::Skipped(_))
    }

    /// The option cardinality: the number of distinct answers.
    pub fn option_count(&self) -> usize {
        match &self.options {
            QuestionOptions::Weighted(answers) => answers.len(),
            QuestionOptions::Skipped(answers) => answers.len(),
        }
    }
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnswerRow {
    pub answer: String,
    pub value: u64,
    pub percent: String,
}

/// How a question is presented.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Presentation {
    Pie,
    /// Horizontal bars.
    Bar,
    /// Only written to the summary table, never charted.
    SkippedTable,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SummaryCell {
    Label(String),
    Count(u64),
}

/// The table written to the spreadsheet for one question: a header row and the data rows.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SummaryTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SummaryCell>>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionResult {
    pub title: String,
    pub presentation: Presentation,
    /// The rows in chart order. Empty for skipped questions.
    pub chart_rows: Vec<AnswerRow>,
    pub summary: SummaryTable,
}

/// Errors that prevent a question from being tallied.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    /// The numeric part of a percentage could not be read.
    InvalidPercent { answer: String, percent: String },
    /// A question mixed answers with and without percentages.
    MixedOptions { answer: String },
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::InvalidPercent { answer, percent } => {
                write!(f, "invalid percentage {:?} for answer {:?}", percent, answer)
            }
            TallyError::MixedOptions { answer } => {
                write!(
                    f,
                    "answer {:?} does not match the other answers of the question",
                    answer
                )
            }
        }
    }
}

// ********* Labels **********

// The summary tables follow the Korean layout of the survey reports.

/// Header of the first column.
pub const CATEGORY_LABEL: &str = "구분";
/// Header of the last column.
pub const TOTAL_LABEL: &str = "합계";
/// Label of the response count row.
pub const RESPONSE_COUNT_LABEL: &str = "응답수";
/// Label of the response rate row.
pub const RESPONSE_RATE_LABEL: &str = "응답률";

/// Questions with at least this many options are drawn as bars, the others as pies.
pub const BAR_MIN_OPTIONS: usize = 3;
