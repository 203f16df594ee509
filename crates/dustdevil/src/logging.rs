//! Logging setup
//!
//! Initializes the tracing subscriber per the `[log]` config section:
//! console or JSON format, to stdout or to a file. File logging goes
//! through a reopenable writer; when `log.rotate` is set, a SIGUSR2
//! listener reopens the file so external log rotation works without a
//! restart.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dustdevil_config::{LogConfig, LogFormat};

/// Initialize the tracing subscriber for logging
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.level.as_str())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match config.file_path() {
        None => match config.format {
            LogFormat::Console => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_target(true))
                    .with(filter)
                    .init();
            }
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(fmt::layer().json())
                    .with(filter)
                    .init();
            }
        },
        Some(path) => {
            let file = Arc::new(
                ReopenableFile::open(&path)
                    .with_context(|| format!("unable to open logfile {}", path.display()))?,
            );

            if config.rotate {
                spawn_logrotate(Arc::clone(&file));
            }

            let make_writer = move || ReopenWriter(Arc::clone(&file));
            match config.format {
                LogFormat::Console => {
                    tracing_subscriber::registry()
                        .with(fmt::layer().with_target(true).with_ansi(false).with_writer(make_writer))
                        .with(filter)
                        .init();
                }
                LogFormat::Json => {
                    tracing_subscriber::registry()
                        .with(fmt::layer().json().with_writer(make_writer))
                        .with(filter)
                        .init();
                }
            }
        }
    }

    Ok(())
}

/// A log file that can be atomically reopened at its original path
struct ReopenableFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl ReopenableFile {
    fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Self::open_file(path)?),
        })
    }

    fn open_file(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    /// Swap in a freshly opened handle at the same path
    fn reopen(&self) -> io::Result<()> {
        let fresh = Self::open_file(&self.path)?;
        *self.file.lock().unwrap_or_else(|e| e.into_inner()) = fresh;
        Ok(())
    }
}

/// Writer handed to the fmt layer; locks the shared handle per write
struct ReopenWriter(Arc<ReopenableFile>);

impl Write for ReopenWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .file
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .file
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .flush()
    }
}

/// Reopen the log file on SIGUSR2
#[cfg(unix)]
fn spawn_logrotate(file: Arc<ReopenableFile>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut usr2 = match signal(SignalKind::user_defined2()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "unable to install SIGUSR2 handler");
                return;
            }
        };

        while usr2.recv().await.is_some() {
            match file.reopen() {
                Ok(()) => tracing::info!("SIGUSR2: reopened log file"),
                Err(e) => tracing::error!(error = %e, "SIGUSR2: failed to reopen log file"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_logrotate(_file: Arc<ReopenableFile>) {}
