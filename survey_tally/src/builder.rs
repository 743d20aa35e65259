pub use crate::config::*;

/// A builder for questions.
///
/// Answers are kept in the order they are added. A question is either weighted (every answer
/// has a percentage) or skipped (plain counts); mixing both is an error.
///
/// ```
/// use survey_tally::builder::Builder;
/// # use survey_tally::TallyError;
///
/// let mut builder = Builder::new("Favourite colour?");
/// builder.add_answer("Blue", 3, "60%")?;
/// builder.add_answer("Red", 2, "40%")?;
///
/// let question = builder.build();
/// assert_eq!(question.option_count(), 2);
/// assert!(!question.is_skipped());
///
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    pub(crate) _title: String,
    pub(crate) _skipped: Option<bool>,
    pub(crate) _weighted: Vec<WeightedAnswer>,
    pub(crate) _flat: Vec<(String, u64)>,
}

impl Builder {
    pub fn new(title: &str) -> Builder {
        Builder {
            _title: title.to_string(),
            _skipped: None,
            _weighted: Vec::new(),
            _flat: Vec::new(),
        }
    }

    /// Adds an answer with its count and its percentage.
    pub fn add_answer(&mut self, answer: &str, value: u64, percent: &str) -> Result<(), TallyError> {
        self.check_kind(answer, false)?;
        self._weighted.push(WeightedAnswer::new(answer, value, percent));
        Ok(())
    }

    /// Adds an answer of a skipped question: only a count is known.
    pub fn add_count(&mut self, answer: &str, value: u64) -> Result<(), TallyError> {
        self.check_kind(answer, true)?;
        self._flat.push((answer.to_string(), value));
        Ok(())
    }

    /// Marks the question as skipped, even when no answer gets added.
    pub fn skipped(mut self, skipped: bool) -> Builder {
        self._skipped = Some(skipped);
        self
    }

    pub fn build(self) -> Question {
        let options = if self._skipped.unwrap_or(!self._flat.is_empty()) {
            QuestionOptions::Skipped(self._flat)
        } else {
            QuestionOptions::Weighted(self._weighted)
        };
        Question {
            title: self._title,
            options,
        }
    }

    fn check_kind(&self, answer: &str, skipped: bool) -> Result<(), TallyError> {
        let current = self._skipped.or(if !self._flat.is_empty() {
            Some(true)
        } else if !self._weighted.is_empty() {
            Some(false)
        } else {
            None
        });
        match current {
            Some(s) if s != skipped => Err(TallyError::MixedOptions {
                answer: answer.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
