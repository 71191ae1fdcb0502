use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use capscan_core::naming::file_stamp;
use chrono::Local;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Log writer that can be pointed at a per-run file and detached again.
/// Events are dropped while nothing is attached.
#[derive(Clone, Default)]
pub struct RunLogSink {
    file: Arc<Mutex<Option<File>>>,
}

impl RunLogSink {
    fn slot(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attach(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        *self.slot() = Some(file);
        Ok(())
    }

    pub fn detach(&self) {
        if let Some(mut file) = self.slot().take() {
            let _ = file.flush();
        }
    }
}

impl Write for RunLogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.slot().as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.slot().as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RunLogSink {
    type Writer = RunLogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Handles that must outlive every log call.
pub struct Logging {
    _guards: Vec<WorkerGuard>,
    pub run_sink: RunLogSink,
    pub warnings_path: PathBuf,
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capscan.log".to_string());
    (dir, name)
}

pub fn init_logger(log_dir: &Path) -> Logging {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);
    let stamp = file_stamp(&Local::now());

    let log_file_path = env::var("LOG_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| log_dir.join(format!("capscan_{}.log", stamp)));
    let (log_file_dir, log_file_name) = split_log_path(&log_file_path);
    let file_appender = tracing_appender::rolling::never(log_file_dir, log_file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let warnings_name = format!("error_warning_log_{}.txt", stamp);
    let warnings_path = log_dir.join(&warnings_name);
    let warnings_appender = tracing_appender::rolling::never(log_dir, warnings_name);
    let (warnings_writer, warnings_guard) = tracing_appender::non_blocking(warnings_appender);

    let run_sink = RunLogSink::default();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(
            fmt::layer()
                .with_writer(warnings_writer)
                .with_ansi(false)
                .with_filter(LevelFilter::WARN),
        )
        .with(
            fmt::layer()
                .with_writer(run_sink.clone())
                .with_target(false)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    info!("Tracing is configured for stdout, process log and warnings log.");

    Logging {
        _guards: vec![guard, warnings_guard],
        run_sink,
        warnings_path,
    }
}
