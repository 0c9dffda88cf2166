use crate::{
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
    utils::expand_path,
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, SyncSender, TrySendError},
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

/// Flush every 50 lines while debugging so a crash keeps the tail of the negotiation.
#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 50;

#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 500;

/// Number of dropped UI lines after which a notice is pushed to the UI feed.
const UI_DROP_NOTICE_AFTER: usize = 10;

const LOG_SECTION: &str = "Logging";
const PATH_KEY: &str = "client_log_path";
const FILENAME_KEY: &str = "client_log_filename";
const DEFAULT_APP_NAME: &str = "loopcall";

/// Bounded, non-blocking file logger.
///
/// Producers enqueue through [`LoggerHandle`]; one worker thread owns the file.
/// The worker also forwards a sample of lines to a second channel that the
/// terminal demo drains next to the chat log. Warn and Error are never sampled
/// out.
pub struct Logger {
    handle: LoggerHandle,
    ui_log_rx: Receiver<String>,
    _thread: Option<thread::JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Starts the logger using the `[Logging]` section of `config`.
    ///
    /// Without `client_log_path` the log lands in `logs/` next to the executable.
    #[must_use]
    pub fn start_from_config(cap: usize, ui_cap: usize, sample_every: u32, config: &Config) -> Self {
        let app_name = config.get_non_empty_or_default(LOG_SECTION, FILENAME_KEY, DEFAULT_APP_NAME);
        let dir = config
            .get_non_empty(LOG_SECTION, PATH_KEY)
            .map_or_else(|| exe_dir_fallback_cwd().join("logs"), expand_path);
        Self::start_in_dir(dir, app_name, cap, ui_cap, sample_every)
    }

    /// Starts the logger writing to `<dir>/<app_name>-<timestamp>-pid<N>.log`.
    ///
    /// The worker falls back to a temp file, then to `io::sink()`, if the target
    /// cannot be opened; logging never takes the call down.
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: &str,
        cap: usize,
        ui_cap: usize,
        sample_every: u32,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let sample_every = sample_every.max(1);
        let fname = format!(
            "{}-{}-pid{}.log",
            app_name,
            timestamp_for_filename(),
            std::process::id()
        );
        let file_path = dir.join(fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap);
        let (ui_tx, ui_rx) = mpsc::sync_channel::<String>(ui_cap);

        let worker_path = file_path.clone();
        let _thread = thread::Builder::new()
            .name("logger-worker".into())
            .spawn(move || run_worker(&worker_path, &rx, &ui_tx, sample_every))
            .ok();

        Self {
            handle: LoggerHandle { tx },
            ui_log_rx: ui_rx,
            _thread,
            file_path,
        }
    }

    /// Enqueues a line without blocking; see [`LoggerHandle::try_log`].
    ///
    /// # Errors
    /// Returns the rejected message when the queue is full or the worker is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), TrySendError<LogMsg>> {
        self.handle.try_log(level, text, target)
    }

    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    /// Pops one sampled line for display, if any.
    #[must_use]
    pub fn try_recv_ui(&self) -> Option<String> {
        self.ui_log_rx.try_recv().ok()
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn open_writer(path: &Path) -> BufWriter<Box<dyn Write + Send>> {
    let writer: Box<dyn Write + Send> =
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Box::new(f),
            Err(_) => {
                let fallback = std::env::temp_dir().join("loopcall-fallback.log");
                match OpenOptions::new().create(true).append(true).open(&fallback) {
                    Ok(f) => Box::new(f),
                    Err(_) => Box::new(io::sink()),
                }
            }
        };
    BufWriter::new(writer)
}

fn run_worker(path: &Path, rx: &Receiver<LogMsg>, ui_tx: &SyncSender<String>, sample_every: u32) {
    let mut out = open_writer(path);
    let mut sampled: u32 = 0;
    let mut lines_written: u32 = 0;
    let mut dropped_to_ui: usize = 0;

    while let Ok(m) = rx.recv() {
        let _ = writeln!(&mut out, "{}", m.render());
        lines_written = lines_written.wrapping_add(1);
        if lines_written.is_multiple_of(FLUSH_BATCH_SIZE) {
            let _ = out.flush();
        }

        let forward = m.level >= LogLevel::Warn || {
            sampled = sampled.wrapping_add(1);
            sampled.is_multiple_of(sample_every)
        };
        if forward && ui_tx.try_send(format!("[{}] {}", m.level, m.text)).is_err() {
            dropped_to_ui += 1;
        }
        if dropped_to_ui >= UI_DROP_NOTICE_AFTER {
            let _ = ui_tx.try_send(format!(
                "(logger) UI log queue dropped {dropped_to_ui} lines"
            ));
            dropped_to_ui = 0;
        }
    }

    let _ = out.flush();
}

/// Directory of the running executable, or the working directory.
fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// `YYYYMMDD_HHMMSS` in UTC, e.g. `20261015_093012`.
fn timestamp_for_filename() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let (year, mon, day) = civil_from_days(secs / 86_400);
    let rem = secs % 86_400;
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        year,
        mon,
        day,
        rem / 3_600,
        (rem % 3_600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to a Gregorian (year, month, day).
fn civil_from_days(days: u64) -> (i64, u64, u64) {
    let z = i64::try_from(days).unwrap_or(i64::MAX / 2) + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m.unsigned_abs(), d.unsigned_abs())
}
