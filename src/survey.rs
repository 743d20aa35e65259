use log::{debug, info};

use snafu::{prelude::*, Snafu};
use survey_tally::*;

use std::path::{Path, PathBuf};

pub mod chart;
pub mod config_reader;
pub mod io_common;
pub mod io_json;
pub mod io_xlsx;
pub mod render_session;

use crate::survey::chart::Chart;
use crate::survey::config_reader::SurveySettings;
use crate::survey::io_common::{ensure_dir, file_stem, sheet_name, title_path_segment};
use crate::survey::io_json::{list_survey_files, read_survey_file};
use crate::survey::io_xlsx::WorkbookWriter;
use crate::survey::render_session::RenderSession;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error listing the survey files in {path}"))]
    ListingInputs {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening survey file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing survey file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Survey file {path} does not contain a list of questions"))]
    NotAQuestionList { path: String },
    #[snafu(display("Survey file {path}: question #{index} is not an object"))]
    QuestionNotAnObject { path: String, index: usize },
    #[snafu(display("Survey file {path}: question #{index} has a missing or invalid field {field}"))]
    InvalidQuestionField {
        path: String,
        index: usize,
        field: String,
    },
    #[snafu(display("Question {title:?}: answer {answer:?} has a missing or invalid field {field}"))]
    InvalidAnswerField {
        title: String,
        answer: String,
        field: String,
    },
    #[snafu(display("Question {title:?}: could not read the count of answer {answer:?}: {content}"))]
    ParsingCount {
        title: String,
        answer: String,
        content: String,
    },
    #[snafu(display("Question {title:?} could not be tallied"))]
    Tally {
        source: TallyError,
        title: String,
    },

    #[snafu(display("Error opening settings file {path}"))]
    OpeningSettings {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing settings file {path}"))]
    ParsingSettings {
        source: serde_json::Error,
        path: String,
    },

    #[snafu(display("Error creating directory {path}"))]
    CreatingDirectory {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error starting the render session"))]
    StartingSession { source: std::io::Error },
    #[snafu(display("Error drawing chart {title:?}: {message}"))]
    Drawing { title: String, message: String },
    #[snafu(display("Exporting chart {title:?} took more than {timeout:?}"))]
    ExportTimeout {
        title: String,
        timeout: std::time::Duration,
    },
    #[snafu(display("The render session stopped before exporting chart {title:?}"))]
    SessionClosed { title: String },

    #[snafu(display("Sheet name {name:?} contains the forbidden character {character:?}"))]
    InvalidSheetName { name: String, character: char },
    #[snafu(display("Error writing workbook {path}"))]
    WritingWorkbook {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error packaging workbook {path}"))]
    PackagingWorkbook {
        source: zip::result::ZipError,
        path: String,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// What was produced for one survey file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FileReport {
    pub stem: String,
    pub workbook: PathBuf,
    pub questions: usize,
    pub charts: Vec<PathBuf>,
}

/// Processes every file of the input directory, one after the other.
///
/// The first error stops the run. Files that were completed before stay on disk.
pub fn run_surveys(settings: &SurveySettings) -> SurveyResult<Vec<FileReport>> {
    info!(
        "Reading surveys from {:?}, writing to {:?}",
        settings.input_directory, settings.output_directory
    );
    ensure_dir(&settings.output_directory)?;
    let files = list_survey_files(&settings.input_directory)?;
    let mut reports: Vec<FileReport> = Vec::new();
    for path in files.iter() {
        reports.push(process_survey_file(path, settings)?);
    }
    Ok(reports)
}

/// Processes one survey file: a chart directory per charted question and one workbook.
///
/// The workbook is only written once all the questions went through.
pub fn process_survey_file(path: &Path, settings: &SurveySettings) -> SurveyResult<FileReport> {
    info!("Processing survey file {:?}", path);
    let questions = read_survey_file(path)?;
    let stem = file_stem(path);
    let output_file_dir = settings.output_directory.join(&stem);
    ensure_dir(&output_file_dir)?;

    // One session for all the charts of this file, released when it goes out of scope.
    let mut session = RenderSession::open(&settings.render)?;
    let mut workbook = WorkbookWriter::new();
    let mut charts: Vec<PathBuf> = Vec::new();

    for question in questions.iter() {
        let result = tally_question(question).context(TallySnafu {
            title: question.title.clone(),
        })?;
        debug!(
            "process_survey_file: {:?}: {:?}",
            result.title, result.presentation
        );

        if let Some(chart) = Chart::build(&result) {
            let segment = title_path_segment(&result.title);
            let chart_dir = output_file_dir.join(&segment);
            ensure_dir(&chart_dir)?;
            let exported = session.export(chart, &chart_dir, &segment)?;
            info!("{}", result.title);
            charts.push(exported.png);
            charts.push(exported.svg);
        }

        workbook.add_sheet(&sheet_name(&result.title), &result.summary)?;
    }

    let workbook_path = settings.output_directory.join(format!("{}.xlsx", stem));
    debug!(
        "process_survey_file: sheets {:?}",
        workbook.sheet_names()
    );
    workbook.finish(&workbook_path)?;
    info!(
        "Wrote {:?}: {} questions, {} chart files",
        workbook_path,
        questions.len(),
        charts.len()
    );

    Ok(FileReport {
        stem,
        workbook: workbook_path,
        questions: questions.len(),
        charts,
    })
}
