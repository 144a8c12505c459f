use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Maximum size per log file before rotation (~5 MB)
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Number of rotated log files to keep
const MAX_LOG_FILES: usize = 5;
const LOG_FILE_NAME: &str = "songshelf";

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub debug: bool,
}

/// Installs the global subscriber: stderr always, plus a rotating file when
/// `log_dir` is set. `RUST_LOG` overrides the level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_timer(LocalTimer)
        .with_writer(io::stderr);

    let file_layer = match &config.log_dir {
        Some(dir) => {
            let mut file = RotatingLogFile::open(dir)?;
            // Session marker
            writeln!(
                file,
                "=== songshelf session started at {} ===",
                Local::now().format("%Y-%m-%d %H:%M:%S %Z")
            )?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_timer(LocalTimer)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Append-only log file that rotates by size:
/// songshelf.log → songshelf.1.log → songshelf.2.log → …
pub struct RotatingLogFile {
    dir: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    max_files: usize,
}

impl RotatingLogFile {
    pub fn open<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        Self::with_limits(dir, MAX_LOG_FILE_SIZE, MAX_LOG_FILES)
    }

    pub fn with_limits<P: AsRef<Path>>(dir: P, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let path = current_path(&dir);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            dir,
            file,
            written,
            max_bytes,
            max_files: max_files.max(1),
        })
    }

    pub fn path(&self) -> PathBuf {
        current_path(&self.dir)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for i in (1..self.max_files).rev() {
            let from = rotated_path(&self.dir, i);
            if from.exists() {
                fs::rename(&from, rotated_path(&self.dir, i + 1))?;
            }
        }
        fs::rename(current_path(&self.dir), rotated_path(&self.dir, 1))?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(current_path(&self.dir))?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn current_path(dir: &Path) -> PathBuf {
    dir.join(format!("{LOG_FILE_NAME}.log"))
}

fn rotated_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{LOG_FILE_NAME}.{index}.log"))
}
