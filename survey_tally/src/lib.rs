/*!
Response distributions for survey exports.

Each question of a survey export comes with a tally of its answers. This crate turns one
question into:

- the answer rows in the order used by charts,
- the presentation of the question (pie, horizontal bars, or a table only),
- the summary table that gets written to a spreadsheet: a header row followed by the response
  count row and, for questions with percentages, the response rate row.

```
use survey_tally::*;

let question = Question {
    title: "Do you like X?".to_string(),
    options: QuestionOptions::Weighted(vec![
        WeightedAnswer::new("Yes", 8, "80%"),
        WeightedAnswer::new("No", 2, "20%"),
    ]),
};
let result = tally_question(&question)?;
assert_eq!(result.presentation, Presentation::Pie);
assert_eq!(result.summary.headers, vec!["구분", "Yes", "No", "합계"]);
assert_eq!(
    result.summary.rows[0],
    vec![
        SummaryCell::Label("응답수".to_string()),
        SummaryCell::Count(8),
        SummaryCell::Count(2),
        SummaryCell::Count(10),
    ]
);
# Ok::<(), TallyError>(())
```

The crate does not perform any I/O.
*/

pub mod builder;
mod config;
use log::{debug, warn};

pub use crate::config::*;

/// Chooses how a question is presented from its option cardinality.
pub fn presentation_for(option_count: usize, skipped: bool) -> Presentation {
    if skipped {
        Presentation::SkippedTable
    } else if option_count < BAR_MIN_OPTIONS {
        Presentation::Pie
    } else {
        Presentation::Bar
    }
}

/// Sorts the rows for charts.
///
/// Questions with fewer than `BAR_MIN_OPTIONS` answers are sorted by increasing count, the others
/// by decreasing count. The sort is stable: answers with the same count keep the export order.
pub fn chart_order(rows: &[AnswerRow]) -> Vec<AnswerRow> {
    let mut res = rows.to_vec();
    if rows.len() < BAR_MIN_OPTIONS {
        res.sort_by_key(|r| r.value);
    } else {
        res.sort_by(|a, b| b.value.cmp(&a.value));
    }
    res
}

/// Sorts the rows for the summary table: always by decreasing count, stable.
pub fn sheet_order(rows: &[AnswerRow]) -> Vec<AnswerRow> {
    let mut res = rows.to_vec();
    res.sort_by(|a, b| b.value.cmp(&a.value));
    res
}

/// The numeric part of a percentage: everything before the first `%`.
pub fn percent_prefix(answer: &str, percent: &str) -> Result<f64, TallyError> {
    let prefix = percent.split('%').next().unwrap_or(percent);
    prefix
        .trim()
        .parse::<f64>()
        .map_err(|_| TallyError::InvalidPercent {
            answer: answer.to_string(),
            percent: percent.to_string(),
        })
}

/// The total of the response rate row.
///
/// The numeric parts of the percentages are added in row order and a `%` is appended. The
/// percentages are rounded by the survey tool, so the total is not always `100%`.
pub fn percent_total(rows: &[AnswerRow]) -> Result<String, TallyError> {
    let mut total = 0.0_f64;
    for r in rows {
        total += percent_prefix(&r.answer, &r.percent)?;
    }
    Ok(format!("{}%", total))
}

/// Tallies one question.
pub fn tally_question(question: &Question) -> Result<QuestionResult, TallyError> {
    let presentation = presentation_for(question.option_count(), question.is_skipped());
    debug!(
        "tally_question: {:?}: {} options, presentation {:?}",
        question.title,
        question.option_count(),
        presentation
    );
    let res = match &question.options {
        QuestionOptions::Weighted(answers) => {
            let rows: Vec<AnswerRow> = answers
                .iter()
                .map(|a| AnswerRow {
                    answer: a.answer.clone(),
                    value: a.value,
                    percent: a.percent.clone(),
                })
                .collect();
            let summary = weighted_summary(&question.title, &sheet_order(&rows))?;
            QuestionResult {
                title: question.title.clone(),
                presentation,
                chart_rows: chart_order(&rows),
                summary,
            }
        }
        QuestionOptions::Skipped(counts) => QuestionResult {
            title: question.title.clone(),
            presentation,
            chart_rows: vec![],
            summary: skipped_summary(counts),
        },
    };
    Ok(res)
}

fn weighted_summary(title: &str, rows: &[AnswerRow]) -> Result<SummaryTable, TallyError> {
    let total: u64 = rows.iter().map(|r| r.value).sum();
    let total_percent = percent_total(rows)?;
    if total_percent != "100%" {
        warn!(
            "Question {:?}: the response rates add up to {}",
            title, total_percent
        );
    }

    let mut headers: Vec<String> = vec![CATEGORY_LABEL.to_string()];
    headers.extend(rows.iter().map(|r| r.answer.clone()));
    headers.push(TOTAL_LABEL.to_string());

    let mut counts: Vec<SummaryCell> = vec![SummaryCell::Label(RESPONSE_COUNT_LABEL.to_string())];
    counts.extend(rows.iter().map(|r| SummaryCell::Count(r.value)));
    counts.push(SummaryCell::Count(total));

    let mut rates: Vec<SummaryCell> = vec![SummaryCell::Label(RESPONSE_RATE_LABEL.to_string())];
    rates.extend(rows.iter().map(|r| SummaryCell::Label(r.percent.clone())));
    rates.push(SummaryCell::Label(total_percent));

    Ok(SummaryTable {
        headers,
        rows: vec![counts, rates],
    })
}

fn skipped_summary(counts: &[(String, u64)]) -> SummaryTable {
    let mut sorted: Vec<(String, u64)> = counts.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    let total: u64 = sorted.iter().map(|(_, v)| *v).sum();

    let mut headers: Vec<String> = vec![CATEGORY_LABEL.to_string()];
    headers.extend(sorted.iter().map(|(k, _)| k.clone()));
    headers.push(TOTAL_LABEL.to_string());

    let mut row: Vec<SummaryCell> = vec![SummaryCell::Label(RESPONSE_COUNT_LABEL.to_string())];
    row.extend(sorted.iter().map(|(_, v)| SummaryCell::Count(*v)));
    row.push(SummaryCell::Count(total));

    SummaryTable {
        headers,
        rows: vec![row],
    }
}
