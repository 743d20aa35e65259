use std::path::Path;

use clap::Parser;
use log::{error, info, LevelFilter};

mod args;
mod survey;

use crate::survey::config_reader::{
    base_dir_from_env, read_settings_file, resolve_settings, SettingsFile,
};
use crate::survey::{run_surveys, SurveyResult};

fn run(args: &args::Args) -> SurveyResult<()> {
    let settings_file: Option<SettingsFile> = match &args.config {
        Some(path) => Some(read_settings_file(path)?),
        None => None,
    };
    let settings = resolve_settings(
        &base_dir_from_env(),
        args.config
            .as_deref()
            .map(Path::new)
            .zip(settings_file.as_ref()),
        args.input.as_deref(),
        args.output.as_deref(),
    );

    let reports = run_surveys(&settings)?;
    for report in reports.iter() {
        info!(
            "{}: {} questions, {} chart files, workbook {:?}",
            report.stem,
            report.questions,
            report.charts.len(),
            report.workbook
        );
    }
    Ok(())
}

fn main() {
    let args = args::Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("An error occurred: {}", e);
        let mut cause = std::error::Error::source(&e);
        while let Some(c) = cause {
            eprintln!("  caused by: {}", c);
            cause = c.source();
        }
        std::process::exit(1);
    }
}
