use clap::Parser;

/// Draws the charts and the summary workbooks of survey exports.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON settings file. The keys inputDirectory, outputDirectory and
    /// exportTimeoutSecs are all optional. Directories are relative to the settings file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory) The directory containing the survey files. Overrides the settings file.
    /// Defaults to `inputs` under $SURVEY_CHARTS_BASE_DIR (or the current directory).
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (directory) Where the charts and the workbooks are written. Overrides the settings file.
    /// Defaults to `outputs` under $SURVEY_CHARTS_BASE_DIR (or the current directory).
    #[clap(short, long, value_parser)]
    pub output: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
