use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use plotters::prelude::*;
use snafu::{OptionExt, ResultExt};

use crate::survey::chart::Chart;
use crate::survey::*;

/// The settings of the render sessions.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RenderSettings {
    /// How long one chart export may take.
    pub export_timeout: Duration,
}

/// The image files of one chart.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ExportedChart {
    pub png: PathBuf,
    pub svg: PathBuf,
}

struct ExportJob {
    chart: Chart,
    directory: PathBuf,
    base_name: String,
    reply: Sender<SurveyResult<ExportedChart>>,
}

/// A worker thread that exports charts, one at a time.
///
/// A session is opened for the charts of one survey file. Dropping it stops the worker and
/// waits for it, unless an export timed out: a stalled worker is left behind.
pub struct RenderSession {
    jobs: Option<Sender<ExportJob>>,
    worker: Option<JoinHandle<()>>,
    timeout: Duration,
    stalled: bool,
}

impl RenderSession {
    pub fn open(settings: &RenderSettings) -> SurveyResult<RenderSession> {
        let (jobs, receiver) = mpsc::channel::<ExportJob>();
        let worker = thread::Builder::new()
            .name("render-session".to_string())
            .spawn(move || run_worker(receiver))
            .context(StartingSessionSnafu {})?;
        debug!("RenderSession::open: timeout {:?}", settings.export_timeout);
        Ok(RenderSession {
            jobs: Some(jobs),
            worker: Some(worker),
            timeout: settings.export_timeout,
            stalled: false,
        })
    }

    /// Writes `<directory>/<base_name>.png` and `<directory>/<base_name>.svg`.
    pub fn export(
        &mut self,
        chart: Chart,
        directory: &Path,
        base_name: &str,
    ) -> SurveyResult<ExportedChart> {
        let title = chart.title().to_string();
        let (reply, answer) = mpsc::channel();
        let job = ExportJob {
            chart,
            directory: directory.to_path_buf(),
            base_name: base_name.to_string(),
            reply,
        };
        let jobs = self.jobs.as_ref().context(SessionClosedSnafu {
            title: title.clone(),
        })?;
        if jobs.send(job).is_err() {
            return SessionClosedSnafu { title }.fail();
        }
        match answer.recv_timeout(self.timeout) {
            Ok(res) => res,
            Err(RecvTimeoutError::Timeout) => {
                self.stalled = true;
                ExportTimeoutSnafu {
                    title,
                    timeout: self.timeout,
                }
                .fail()
            }
            Err(RecvTimeoutError::Disconnected) => SessionClosedSnafu { title }.fail(),
        }
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if self.stalled {
                warn!("Leaving a stalled render session behind");
            } else if worker.join().is_err() {
                warn!("The render session panicked");
            }
        }
    }
}

fn run_worker(jobs: Receiver<ExportJob>) {
    for job in jobs {
        let res = export_chart(&job.chart, &job.directory, &job.base_name);
        // The session may have given up waiting.
        let _ = job.reply.send(res);
    }
    debug!("run_worker: session closed");
}

/// Draws the chart on both backends.
pub fn export_chart(chart: &Chart, directory: &Path, base_name: &str) -> SurveyResult<ExportedChart> {
    let png = directory.join(format!("{}.png", base_name));
    let svg = directory.join(format!("{}.svg", base_name));
    let size = chart.size();
    debug!("export_chart: {:?} {:?}", png, size);

    chart
        .draw(&BitMapBackend::new(&png, size).into_drawing_area())
        .map_err(|e| SurveyError::Drawing {
            title: chart.title().to_string(),
            message: e.to_string(),
        })?;
    chart
        .draw(&SVGBackend::new(&svg, size).into_drawing_area())
        .map_err(|e| SurveyError::Drawing {
            title: chart.title().to_string(),
            message: e.to_string(),
        })?;
    Ok(ExportedChart { png, svg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::chart::{fonts_available, pie_chart, Chart};

    fn settings() -> RenderSettings {
        RenderSettings {
            export_timeout: Duration::from_secs(500),
        }
    }

    #[test]
    fn session_opens_and_closes_without_exports() {
        let session = RenderSession::open(&settings()).unwrap();
        drop(session);
    }

    #[test]
    fn drawing_errors_come_back_from_the_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RenderSession::open(&settings()).unwrap();
        let chart = Chart::Pie(pie_chart("Q", &[]));
        // The directory does not exist: the bitmap cannot be saved.
        let res = session.export(chart, &dir.path().join("missing"), "Q");
        assert!(res.is_err());
        // The session still accepts work afterwards.
        let chart = Chart::Pie(pie_chart("R", &[]));
        assert!(session.export(chart, &dir.path().join("missing"), "R").is_err());
    }

    #[test]
    fn slow_export_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RenderSession::open(&RenderSettings {
            export_timeout: Duration::from_nanos(1),
        })
        .unwrap();
        let chart = Chart::Pie(pie_chart("Q", &[]));
        let res = session.export(chart, &dir.path().join("missing"), "Q");
        match res {
            Err(e @ SurveyError::ExportTimeout { .. }) => {
                assert_eq!(
                    e.to_string(),
                    "Exporting chart \"Q\" took more than 1ns"
                );
            }
            x => panic!("unexpected result {:?}", x),
        }
        // The stalled worker is not waited for.
        drop(session);
    }

    #[test]
    fn exports_png_and_svg() {
        if !fonts_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut session = RenderSession::open(&settings()).unwrap();
        let chart = Chart::Pie(pie_chart("Q", &[]));
        let exported = session.export(chart, dir.path(), "Q").unwrap();
        assert_eq!(exported.png, dir.path().join("Q.png"));
        assert!(exported.png.is_file());
        assert!(exported.svg.is_file());
    }
}
