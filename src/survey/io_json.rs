// Reading survey exports.
//
// A survey file is a JSON array of questions:
//
//   [{"title": "...", "skip": false, "options": {"Yes": {"value": 8, "percent": "80%"}, ...}},
//    {"title": "...", "skip": true, "options": {"A": 5, "B": 2}}]

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::{OptionExt, ResultExt};
use survey_tally::builder::Builder;

use crate::survey::*;

/// All the entries of the input directory, sorted by name.
///
/// Nothing is filtered out: a file that is not a survey export fails when it gets read.
pub fn list_survey_files(dir: &Path) -> SurveyResult<Vec<PathBuf>> {
    let path = dir.display().to_string();
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).context(ListingInputsSnafu { path: path.clone() })? {
        let entry = entry.context(ListingInputsSnafu { path: path.clone() })?;
        files.push(entry.path());
    }
    files.sort();
    debug!("list_survey_files: {:?}", files);
    Ok(files)
}

pub fn read_survey_file(path: &Path) -> SurveyResult<Vec<Question>> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path_s.clone(),
    })?;
    read_survey_str(&path_s, &contents)
}

/// Parses the content of a survey file. `path` is only used in the error messages.
pub fn read_survey_str(path: &str, contents: &str) -> SurveyResult<Vec<Question>> {
    let js: JSValue = serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    let questions_js = js.as_array().context(NotAQuestionListSnafu { path })?;
    let mut res: Vec<Question> = Vec::new();
    for (index, q) in questions_js.iter().enumerate() {
        res.push(read_question(path, index, q)?);
    }
    debug!("read_survey_str: {}: {} questions", path, res.len());
    Ok(res)
}

fn read_question(path: &str, index: usize, js: &JSValue) -> SurveyResult<Question> {
    let obj = js
        .as_object()
        .context(QuestionNotAnObjectSnafu { path, index })?;
    let title = obj
        .get("title")
        .and_then(|t| t.as_str())
        .context(InvalidQuestionFieldSnafu {
            path,
            index,
            field: "title",
        })?;
    let skip = match obj.get("skip") {
        None | Some(JSValue::Null) => false,
        Some(JSValue::Bool(b)) => *b,
        Some(_) => {
            return InvalidQuestionFieldSnafu {
                path,
                index,
                field: "skip",
            }
            .fail()
        }
    };
    let options: &JSMap<String, JSValue> = obj
        .get("options")
        .and_then(|o| o.as_object())
        .context(InvalidQuestionFieldSnafu {
            path,
            index,
            field: "options",
        })?;

    let mut builder = Builder::new(title).skipped(skip);
    for (answer, value) in options.iter() {
        let added = if skip {
            builder.add_count(answer, read_count(title, answer, Some(value))?)
        } else {
            let fields = value.as_object().context(InvalidAnswerFieldSnafu {
                title,
                answer,
                field: "value",
            })?;
            let count = read_count(title, answer, fields.get("value"))?;
            let percent = read_percent(title, answer, fields.get("percent"))?;
            builder.add_answer(answer, count, &percent)
        };
        added.context(TallySnafu { title })?;
    }
    Ok(builder.build())
}

/// Counts are integers, integral floats (`8.0`) or numeric strings (`"8"`).
fn read_count(title: &str, answer: &str, x: Option<&JSValue>) -> SurveyResult<u64> {
    let count = match x {
        None => {
            return InvalidAnswerFieldSnafu {
                title,
                answer,
                field: "value",
            }
            .fail()
        }
        Some(JSValue::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Some(JSValue::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    count.with_context(|| ParsingCountSnafu {
        title,
        answer,
        content: format!("{}", x.unwrap_or(&JSValue::Null)),
    })
}

/// Percentages are usually strings (`"80%"`). Numbers are kept with their JSON text.
fn read_percent(title: &str, answer: &str, x: Option<&JSValue>) -> SurveyResult<String> {
    match x {
        Some(JSValue::String(s)) => Ok(s.clone()),
        Some(JSValue::Number(n)) => Ok(n.to_string()),
        _ => InvalidAnswerFieldSnafu {
            title,
            answer,
            field: "percent",
        }
        .fail(),
    }
}
