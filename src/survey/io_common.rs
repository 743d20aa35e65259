use std::fs;
use std::path::Path;

use log::debug;
use snafu::ResultExt;

use crate::survey::*;

/// The name of a survey file up to its first dot: `career.2021.json` gives `career`.
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// The worksheet name of a question: the title without question marks.
pub fn sheet_name(title: &str) -> String {
    title.replace('?', "")
}

/// The directory and file base name of a chart.
///
/// Question marks are dropped like for sheet names. Path separators become `_` so that a title
/// always maps to a single directory under the output directory. A segment that is empty or made
/// only of dots (`.`, `..`) gets a `_` prefix.
pub fn title_path_segment(title: &str) -> String {
    let segment = sheet_name(title).replace(['/', '\\'], "_");
    if segment.chars().all(|c| c == '.') {
        format!("_{}", segment)
    } else {
        segment
    }
}

/// Creates the directory if it does not exist yet.
pub fn ensure_dir(path: &Path) -> SurveyResult<()> {
    if !path.is_dir() {
        debug!("ensure_dir: creating {:?}", path);
        fs::create_dir_all(path).context(CreatingDirectorySnafu {
            path: path.display().to_string(),
        })?;
    }
    Ok(())
}
