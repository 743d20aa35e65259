use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::survey::render_session::RenderSettings;
use crate::survey::*;

/// The environment variable pointing at the base directory of the inputs and outputs.
pub const BASE_DIR_ENV: &str = "SURVEY_CHARTS_BASE_DIR";
pub const DEFAULT_INPUT_DIR: &str = "inputs";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 500;

/// The content of a settings file. All the keys are optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(rename = "inputDirectory")]
    pub input_directory: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "exportTimeoutSecs")]
    pub export_timeout_secs: Option<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveySettings {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub render: RenderSettings,
}

pub fn read_settings_file(path: &str) -> SurveyResult<SettingsFile> {
    let contents = fs::read_to_string(path).context(OpeningSettingsSnafu { path })?;
    let settings: SettingsFile =
        serde_json::from_str(contents.as_str()).context(ParsingSettingsSnafu { path })?;
    debug!("read_settings_file: {:?}", settings);
    Ok(settings)
}

pub fn base_dir_from_env() -> PathBuf {
    env::var_os(BASE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Combines the command line, the settings file and the defaults, in this order of priority.
///
/// The directories of a settings file are relative to the directory of that file.
pub fn resolve_settings(
    base_dir: &Path,
    settings_file: Option<(&Path, &SettingsFile)>,
    input: Option<&str>,
    output: Option<&str>,
) -> SurveySettings {
    let file_dir: Option<&Path> = settings_file.and_then(|(p, _)| p.parent());
    let file = settings_file.map(|(_, f)| f);

    let input_directory = input
        .map(PathBuf::from)
        .or_else(|| relative_to(file_dir, file.and_then(|f| f.input_directory.as_deref())))
        .unwrap_or_else(|| base_dir.join(DEFAULT_INPUT_DIR));
    let output_directory = output
        .map(PathBuf::from)
        .or_else(|| relative_to(file_dir, file.and_then(|f| f.output_directory.as_deref())))
        .unwrap_or_else(|| base_dir.join(DEFAULT_OUTPUT_DIR));
    let timeout_secs = file
        .and_then(|f| f.export_timeout_secs)
        .unwrap_or(DEFAULT_EXPORT_TIMEOUT_SECS);

    SurveySettings {
        input_directory,
        output_directory,
        render: RenderSettings {
            export_timeout: Duration::from_secs(timeout_secs),
        },
    }
}

fn relative_to(dir: Option<&Path>, path: Option<&str>) -> Option<PathBuf> {
    path.map(|p| match dir {
        Some(d) => d.join(p),
        None => PathBuf::from(p),
    })
}
