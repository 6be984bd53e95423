//! # LogWriter
//!
//! LogWriter appends timestamped lines to a log file and archives the file
//! once it grows past a size threshold. Every call names its destination
//! explicitly (a directory and a file name), so there is no handle to keep
//! around: the writer checks the current size, renames the file aside with a
//! Unix timestamp suffix when it is too large, and then appends the message.
//!
//! Records are written as `YYYYMMDDHHMMSS message\r\n`. Archived files keep
//! the original name with the seconds since the epoch appended, so `app.log`
//! becomes `app.log1374687045`.
//!
//! Diagnostics produced by this crate go through `tracing`. Call
//! [`configure_error_sink`] once at startup to route them (and any other
//! `tracing` events and panics in the process) to a file of your choosing.
//!
//! ## Example
//!
//! ```rust
//! use logwriter::{ArchiveCollision, LogWriterBuilder, RotationSize, TimeZone};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = tempfile::tempdir()?;
//!
//!     // Default configuration: 50 MiB limit, local time stamps.
//!     logwriter::write_to_log("service started", dir.path(), "app.log")?;
//!
//!     let writer = LogWriterBuilder::new()
//!         .max_size(RotationSize::KB(256))
//!         .time_zone(TimeZone::UTC)
//!         .collision(ArchiveCollision::Disambiguate)
//!         .build();
//!     writer.write_to_log("configuration loaded", dir.path(), "app.log")?;
//!
//!     // Periodic maintenance without writing a record.
//!     writer.check_and_archive("app.log", dir.path(), 1024)?;
//!
//!     Ok(())
//! }
//! ```
use {
    chrono::{Local, Utc},
    regex::Regex,
    std::{
        collections::HashMap,
        fs::{self, OpenOptions},
        io::{self, Write as _},
        path::{Path, PathBuf},
        sync::{Arc, Mutex, OnceLock, PoisonError},
    },
};

#[cfg(unix)]
use std::{fs::Permissions, os::unix::fs::PermissionsExt};

pub use chrono::FixedOffset;

/// Size limit used by [`write_to_log`] when the caller does not supply one
/// (50 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 52_428_800;

/// `chrono` format of the timestamp that prefixes every record.
const RECORD_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Defines size thresholds for archiving log files in various units.
///
/// A log file is archived when its size is strictly greater than the
/// threshold at the time of a check.
///
/// * `Bytes` - Direct byte count (e.g., 1048576 bytes)
/// * `KB` - Kilobytes (1 KB = 1024 bytes)
/// * `MB` - Megabytes (1 MB = 1024 KB)
/// * `GB` - Gigabytes (1 GB = 1024 MB)
///
/// # Examples
/// ```
/// use logwriter::{LogWriterBuilder, RotationSize};
///
/// // Archive once the file grows past 100 MB
/// let writer = LogWriterBuilder::new()
///     .max_size(RotationSize::MB(100))
///     .build();
/// assert_eq!(RotationSize::MB(100).bytes(), 104_857_600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationSize {
    /// Raw byte count
    Bytes(u64),
    /// Kilobytes (1 KB = 1024 bytes)
    KB(u64),
    /// Megabytes (1 MB = 1024 KB = 1,048,576 bytes)
    MB(u64),
    /// Gigabytes (1 GB = 1024 MB = 1,073,741,824 bytes)
    GB(u64),
}

impl RotationSize {
    /// Get the threshold in bytes. Values too large for a `u64` saturate,
    /// which means the file is never archived.
    pub fn bytes(&self) -> u64 {
        match self {
            RotationSize::Bytes(b) => *b,
            RotationSize::KB(kb) => kb.saturating_mul(1 << 10),
            RotationSize::MB(mb) => mb.saturating_mul(1 << 20),
            RotationSize::GB(gb) => gb.saturating_mul(1 << 30),
        }
    }
}

impl Default for RotationSize {
    fn default() -> Self {
        RotationSize::Bytes(DEFAULT_MAX_SIZE_BYTES)
    }
}

/// Specifies the time zone used for the timestamp at the start of each
/// record.
///
/// Archive names are not affected: they always carry seconds since the Unix
/// epoch, which has no time zone.
///
/// # Examples
/// ```
/// use logwriter::{FixedOffset, TimeZone};
///
/// // Use UTC time for global deployments
/// let utc = TimeZone::UTC;
///
/// // Use local system time zone (follows system settings, including DST)
/// let local = TimeZone::Local;
///
/// // Use a fixed offset for a specific region (e.g., UTC+8 for China)
/// let china = TimeZone::Fix(FixedOffset::east_opt(8 * 3600).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub enum TimeZone {
    /// Use UTC time zone.
    UTC,
    /// Use the system's local time zone, resolved on every write.
    #[default]
    Local,
    /// Use a fixed time zone offset regardless of where the application
    /// runs.
    Fix(FixedOffset),
}

/// What to do when the archive name for a rotation is already taken.
///
/// Archive names have one-second resolution, so two rotations of the same
/// file within one second produce the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveCollision {
    /// Replace the earlier archive. Its contents are lost.
    Overwrite,
    /// Append a counter to the archive name (`app.log1374687045.1`,
    /// `app.log1374687045.2`, ...) until the name is free.
    #[default]
    Disambiguate,
    /// Leave both files in place and report
    /// [`LogWriterError::RotationFailed`].
    Fail,
}

/// Configuration shared by every call made through a [`LogWriter`].
#[derive(Debug, Clone)]
struct LogWriterMeta {
    /// Time zone of the record timestamps.
    time_zone: TimeZone,
    /// Threshold used when the caller does not pass one explicitly.
    max_size: RotationSize,
    /// Policy for same-second archive name clashes.
    collision: ArchiveCollision,
    /// The file permissions to set on newly created log files (Unix-like
    /// systems only), in octal notation (e.g., 0o644 for rw-r--r--).
    file_mode: Option<u32>,
    /// Create the target directory when it is missing instead of failing
    /// with [`LogWriterError::PathUnavailable`].
    create_directory: bool,
}

impl LogWriterMeta {
    fn new() -> Self {
        LogWriterMeta {
            time_zone: TimeZone::default(),
            max_size: RotationSize::default(),
            collision: ArchiveCollision::default(),
            file_mode: None,
            create_directory: false,
        }
    }

    /// Current time in the configured zone, formatted as `YYYYMMDDHHMMSS`.
    fn record_timestamp(&self) -> String {
        match &self.time_zone {
            TimeZone::UTC => Utc::now().format(RECORD_TIMESTAMP_FORMAT).to_string(),
            TimeZone::Local => Local::now().format(RECORD_TIMESTAMP_FORMAT).to_string(),
            TimeZone::Fix(offset) => Utc::now()
                .with_timezone(offset)
                .format(RECORD_TIMESTAMP_FORMAT)
                .to_string(),
        }
    }

    /// Build one record line: timestamp, a single space, the message, CRLF.
    fn format_record(&self, message: &str) -> String {
        format!("{} {message}\r\n", self.record_timestamp())
    }

    /// Archive the log file if it is larger than `max_size_bytes`.
    /// # Returns
    /// The path of the archive if the file was renamed, otherwise None.
    fn archive_if_oversized(
        &self,
        directory: &Path,
        filename: &Path,
        max_size_bytes: u64,
    ) -> Result<Option<PathBuf>, LogWriterError> {
        let size = file_size(&directory.join(filename))?;
        if size <= max_size_bytes {
            return Ok(None);
        }
        self.archive(directory, filename, Utc::now().timestamp()).map(Some)
    }

    /// Rename `directory/filename` to `directory/filename<timestamp>`,
    /// resolving name clashes according to the collision policy.
    fn archive(&self, directory: &Path, filename: &Path, timestamp: i64) -> Result<PathBuf, LogWriterError> {
        let log_path = directory.join(filename);
        let archive_path = self.archive_path(directory, filename, timestamp)?;

        fs::rename(&log_path, &archive_path).map_err(|err| LogWriterError::RotationFailed {
            from: log_path.clone(),
            to: archive_path.clone(),
            error: err.to_string(),
        })?;

        tracing::debug!(
            from = %log_path.display(),
            to = %archive_path.display(),
            "archived log file"
        );
        Ok(archive_path)
    }

    /// Pick the archive name for a rotation at `timestamp`.
    fn archive_path(&self, directory: &Path, filename: &Path, timestamp: i64) -> Result<PathBuf, LogWriterError> {
        let base_name = format!("{}{timestamp}", filename.to_string_lossy());
        let candidate = directory.join(&base_name);

        match self.collision {
            ArchiveCollision::Overwrite => Ok(candidate),
            ArchiveCollision::Fail => {
                if candidate.exists() {
                    return Err(LogWriterError::RotationFailed {
                        from: directory.join(filename),
                        to: candidate,
                        error: "archive already exists".to_string(),
                    });
                }
                Ok(candidate)
            }
            ArchiveCollision::Disambiguate => {
                if !candidate.exists() {
                    return Ok(candidate);
                }
                let mut counter: u64 = 1;
                loop {
                    let candidate = directory.join(format!("{base_name}.{counter}"));
                    if !candidate.exists() {
                        return Ok(candidate);
                    }
                    counter += 1;
                }
            }
        }
    }

    /// Append one record to the log file, creating the file if necessary.
    /// The file handle is released before returning, whether or not the
    /// write succeeded.
    fn append(&self, message: &str, directory: &Path, log_path: &Path) -> Result<(), LogWriterError> {
        self.ensure_directory(directory)?;

        let created = !log_path.exists();
        let mut log_file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(log_path)
            .map_err(|err| LogWriterError::from_io(log_path, err))?;

        // One write_all per record keeps each line contiguous.
        log_file
            .write_all(self.format_record(message).as_bytes())
            .map_err(|err| LogWriterError::WriteFailed {
                path: log_path.to_path_buf(),
                error: err.to_string(),
            })?;

        // The record is already on disk if this fails.
        if created {
            self.set_permissions(log_path)?;
        }
        Ok(())
    }

    fn ensure_directory(&self, directory: &Path) -> Result<(), LogWriterError> {
        if directory_available(directory) {
            return Ok(());
        }
        if !self.create_directory {
            return Err(LogWriterError::PathUnavailable {
                path: directory.to_path_buf(),
                error: "directory does not exist".to_string(),
            });
        }
        fs::create_dir_all(directory).map_err(|err| match err.kind() {
            io::ErrorKind::PermissionDenied => LogWriterError::PermissionDenied {
                path: directory.to_path_buf(),
                error: err.to_string(),
            },
            _ => LogWriterError::PathUnavailable {
                path: directory.to_path_buf(),
                error: err.to_string(),
            },
        })
    }

    /// Set the permissions for a newly created log file based on the
    /// configured file mode.
    ///
    /// # Platform-specific behavior
    /// * On Unix systems: Sets the file mode using the octal permissions (e.g.,
    ///   0o644 for rw-r--r--)
    /// * On non-Unix systems: Emits a warning and does nothing
    fn set_permissions(&self, path: &Path) -> Result<(), LogWriterError> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                let perms = Permissions::from_mode(mode);
                fs::set_permissions(path, perms).map_err(|err| LogWriterError::from_io(path, err))?
            }
            #[cfg(not(unix))]
            {
                let _ = mode;
                tracing::warn!(
                    path = %path.display(),
                    "setting file permissions is not supported on non-Unix platforms"
                );
            }
        }
        Ok(())
    }
}

/// Size in bytes of the file at `log_path`, or 0 if it does not exist.
fn file_size(log_path: &Path) -> Result<u64, LogWriterError> {
    match fs::metadata(log_path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(err) => Err(LogWriterError::from_io(log_path, err)),
    }
}

type FileLocks = Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

/// Locks for the paths currently in use, keyed as given, so `logs/app.log`
/// and `./logs/app.log` get separate locks.
fn file_locks() -> &'static FileLocks {
    static FILE_LOCKS: OnceLock<FileLocks> = OnceLock::new();
    FILE_LOCKS.get_or_init(Default::default)
}

/// Lock serializing check-rotate-append for one path within this process.
fn file_lock(log_path: &Path) -> Arc<Mutex<()>> {
    let mut locks = file_locks().lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(log_path.to_path_buf()).or_default())
}

/// Drop the registry entry for `log_path` once no other caller holds it.
fn release_file_lock(log_path: &Path, lock: Arc<Mutex<()>>) {
    let mut locks = file_locks().lock().unwrap_or_else(PoisonError::into_inner);
    // Clones are only handed out under the registry lock, so the count is
    // stable here: one for the registry, one for `lock`.
    if Arc::strong_count(&lock) == 2 {
        locks.remove(log_path);
    }
}

/// Run `f` while holding the lock for `log_path`.
fn with_file_lock<T>(log_path: &Path, f: impl FnOnce() -> T) -> T {
    let lock = file_lock(log_path);
    let result = {
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    };
    release_file_lock(log_path, lock);
    result
}

/// Whether `directory` can receive files. An empty path means the working
/// directory.
fn directory_available(directory: &Path) -> bool {
    directory.as_os_str().is_empty() || directory.is_dir()
}

/// Errors that can occur when writing or archiving log files.
#[derive(Debug, thiserror::Error)]
pub enum LogWriterError {
    #[error("Path unavailable '{path}': {error}")]
    PathUnavailable { path: PathBuf, error: String },
    #[error("Permission denied for '{path}': {error}")]
    PermissionDenied { path: PathBuf, error: String },
    #[error("Failed to archive log file from '{from}' to '{to}': {error}")]
    RotationFailed { from: PathBuf, to: PathBuf, error: String },
    #[error("Failed to write to '{path}': {error}")]
    WriteFailed { path: PathBuf, error: String },
    #[error("Error sink is already configured at '{0}'")]
    ErrorSinkAlreadyConfigured(PathBuf),
    #[error("Failed to install error sink: {0}")]
    ErrorSinkFailed(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LogWriterError {
    /// Classify an I/O failure on `path`.
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => LogWriterError::PermissionDenied {
                path: path.to_path_buf(),
                error: err.to_string(),
            },
            io::ErrorKind::NotFound => LogWriterError::PathUnavailable {
                path: path.to_path_buf(),
                error: err.to_string(),
            },
            _ => LogWriterError::WriteFailed {
                path: path.to_path_buf(),
                error: err.to_string(),
            },
        }
    }
}

/// Writes records to size-limited log files.
///
/// A `LogWriter` only carries configuration; the destination is passed on
/// every call. Within one process, calls that target the same path are
/// serialized, so a rotation never races an append. Nothing coordinates
/// writers in different processes.
#[derive(Debug, Clone)]
pub struct LogWriter {
    meta: LogWriterMeta,
}

impl Default for LogWriter {
    fn default() -> Self {
        LogWriterBuilder::new().build()
    }
}

impl LogWriter {
    /// Append `message` to `directory/filename`, archiving the file first if
    /// it is larger than the configured [`RotationSize`].
    ///
    /// If the rename fails, the message is still appended to the active file
    /// and [`LogWriterError::RotationFailed`] is returned.
    /// # Returns
    /// The archive path if a rotation happened.
    pub fn write_to_log<D: AsRef<Path>, F: AsRef<Path>>(
        &self,
        message: &str,
        directory: D,
        filename: F,
    ) -> Result<Option<PathBuf>, LogWriterError> {
        self.write_to_log_with_limit(message, directory, filename, self.meta.max_size.bytes())
    }

    /// Same as [`LogWriter::write_to_log`] with an explicit threshold in
    /// bytes.
    pub fn write_to_log_with_limit<D: AsRef<Path>, F: AsRef<Path>>(
        &self,
        message: &str,
        directory: D,
        filename: F,
        max_size_bytes: u64,
    ) -> Result<Option<PathBuf>, LogWriterError> {
        let (directory, filename) = (directory.as_ref(), filename.as_ref());
        let log_path = directory.join(filename);

        with_file_lock(&log_path, || {
            // A failed rotation still appends to the active file; the record
            // is kept and the rotation error is reported afterwards.
            let archived = self.meta.archive_if_oversized(directory, filename, max_size_bytes);
            self.meta.append(message, directory, &log_path)?;
            archived
        })
    }

    /// Archive `directory/filename` if it is larger than `max_size_bytes`.
    /// Never writes a record.
    /// # Returns
    /// The archive path if a rotation happened.
    pub fn check_and_archive<F: AsRef<Path>, D: AsRef<Path>>(
        &self,
        filename: F,
        directory: D,
        max_size_bytes: u64,
    ) -> Result<Option<PathBuf>, LogWriterError> {
        let (directory, filename) = (directory.as_ref(), filename.as_ref());

        with_file_lock(&directory.join(filename), || {
            self.meta.archive_if_oversized(directory, filename, max_size_bytes)
        })
    }

    /// Best-effort [`LogWriter::write_to_log`]. Failures are reported
    /// through `tracing` and otherwise ignored.
    pub fn write_to_log_quietly<D: AsRef<Path>, F: AsRef<Path>>(&self, message: &str, directory: D, filename: F) {
        if let Err(err) = self.write_to_log(message, directory, filename) {
            tracing::warn!(error = %err, "failed to write log record");
        }
    }

    /// Best-effort [`LogWriter::check_and_archive`]. Failures are reported
    /// through `tracing` and otherwise ignored.
    pub fn check_and_archive_quietly<F: AsRef<Path>, D: AsRef<Path>>(
        &self,
        filename: F,
        directory: D,
        max_size_bytes: u64,
    ) {
        if let Err(err) = self.check_and_archive(filename, directory, max_size_bytes) {
            tracing::warn!(error = %err, "failed to archive log file");
        }
    }
}

/// Provides a fluent interface for configuring [`LogWriter`] instances.
///
/// # Default Configuration
///
/// * Archive when the file exceeds 52,428,800 bytes (50 MiB)
/// * Local system time zone for record timestamps
/// * Same-second archive clashes get a numeric suffix
/// * Standard file permissions
/// * A missing directory is an error
///
/// # Examples
///
/// ```rust
/// use logwriter::{ArchiveCollision, LogWriterBuilder, RotationSize, TimeZone};
///
/// let writer = LogWriterBuilder::new()
///     .max_size(RotationSize::MB(10))
///     .time_zone(TimeZone::UTC)
///     .collision(ArchiveCollision::Fail)
///     .file_mode(0o640)
///     .create_directory(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct LogWriterBuilder {
    meta: LogWriterMeta,
}

impl Default for LogWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogWriterBuilder {
    /// Create a new log writer builder with the default configuration.
    pub fn new() -> Self {
        LogWriterBuilder {
            meta: LogWriterMeta::new(),
        }
    }

    /// Set the time zone for record timestamps.
    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            meta: LogWriterMeta { time_zone, ..self.meta },
        }
    }

    /// Set the threshold used by [`LogWriter::write_to_log`].
    pub fn max_size(self, max_size: RotationSize) -> Self {
        Self {
            meta: LogWriterMeta { max_size, ..self.meta },
        }
    }

    /// Set the policy for archive name clashes.
    pub fn collision(self, collision: ArchiveCollision) -> Self {
        Self {
            meta: LogWriterMeta { collision, ..self.meta },
        }
    }

    /// Set the file permissions for newly created log files (Unix-like
    /// systems only). For example, 0o644 for rw-r--r-- permissions.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: LogWriterMeta {
                file_mode: Some(mode),
                ..self.meta
            },
        }
    }

    /// Create the target directory (and its parents) when it is missing.
    pub fn create_directory(self, create_directory: bool) -> Self {
        Self {
            meta: LogWriterMeta {
                create_directory,
                ..self.meta
            },
        }
    }

    /// Build the log writer.
    pub fn build(self) -> LogWriter {
        LogWriter { meta: self.meta }
    }
}

/// Append `message` to `directory/filename` with the default configuration,
/// archiving the file first if it exceeds [`DEFAULT_MAX_SIZE_BYTES`].
pub fn write_to_log<D: AsRef<Path>, F: AsRef<Path>>(
    message: &str,
    directory: D,
    filename: F,
) -> Result<Option<PathBuf>, LogWriterError> {
    LogWriter::default().write_to_log(message, directory, filename)
}

/// Append `message` to `directory/filename` with the default configuration,
/// archiving the file first if it exceeds `max_size_bytes`.
pub fn write_to_log_with_limit<D: AsRef<Path>, F: AsRef<Path>>(
    message: &str,
    directory: D,
    filename: F,
    max_size_bytes: u64,
) -> Result<Option<PathBuf>, LogWriterError> {
    LogWriter::default().write_to_log_with_limit(message, directory, filename, max_size_bytes)
}

/// Archive `directory/filename` if it is larger than `max_size_bytes`.
pub fn check_and_archive<F: AsRef<Path>, D: AsRef<Path>>(
    filename: F,
    directory: D,
    max_size_bytes: u64,
) -> Result<Option<PathBuf>, LogWriterError> {
    LogWriter::default().check_and_archive(filename, directory, max_size_bytes)
}

/// Like [`write_to_log`], but never fails.
pub fn write_to_log_quietly<D: AsRef<Path>, F: AsRef<Path>>(message: &str, directory: D, filename: F) {
    LogWriter::default().write_to_log_quietly(message, directory, filename)
}

/// Like [`check_and_archive`], but never fails.
pub fn check_and_archive_quietly<F: AsRef<Path>, D: AsRef<Path>>(filename: F, directory: D, max_size_bytes: u64) {
    LogWriter::default().check_and_archive_quietly(filename, directory, max_size_bytes)
}

/// Size of `directory/filename` in bytes. A missing file has size 0.
pub fn log_size<F: AsRef<Path>, D: AsRef<Path>>(filename: F, directory: D) -> Result<u64, LogWriterError> {
    file_size(&directory.as_ref().join(filename))
}

/// List the archives of `filename` in `directory`, oldest first.
///
/// Archives are files named `<filename><unix-seconds>` or
/// `<filename><unix-seconds>.<counter>`; anything else in the directory is
/// ignored.
pub fn list_archives<D: AsRef<Path>, F: AsRef<Path>>(
    directory: D,
    filename: F,
) -> Result<Vec<PathBuf>, LogWriterError> {
    let directory = directory.as_ref();
    let pattern = Regex::new(&format!(
        r"^{}(\d+)(?:\.(\d+))?$",
        regex::escape(&filename.as_ref().to_string_lossy())
    ))
    .map_err(|err| LogWriterError::InternalError(err.to_string()))?;

    let entries = fs::read_dir(directory).map_err(|err| LogWriterError::from_io(directory, err))?;

    let mut archives = Vec::new();
    for entry in entries.flatten() {
        if !entry.file_type().is_ok_and(|file_type| file_type.is_file()) {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Some(captures) = pattern.captures(&file_name) {
            let timestamp = captures[1].parse::<u64>().unwrap_or(u64::MAX);
            let counter = captures
                .get(2)
                .and_then(|counter| counter.as_str().parse::<u64>().ok())
                .unwrap_or(0);
            archives.push(((timestamp, counter), entry.path()));
        }
    }

    archives.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(archives.into_iter().map(|(_, path)| path).collect())
}

static ERROR_SINK: OnceLock<PathBuf> = OnceLock::new();

/// Route the process's diagnostics to `directory/filename`.
///
/// Installs the global `tracing` subscriber, writing events at WARN level and
/// above (including the warnings emitted by the `*_quietly` functions), and
/// a panic hook that reports panics there before running the previous hook.
/// This is meant to be called once at startup: the sink cannot be removed,
/// and later calls fail with [`LogWriterError::ErrorSinkAlreadyConfigured`].
pub fn configure_error_sink<F: AsRef<Path>, D: AsRef<Path>>(
    filename: F,
    directory: D,
) -> Result<PathBuf, LogWriterError> {
    if let Some(existing) = ERROR_SINK.get() {
        return Err(LogWriterError::ErrorSinkAlreadyConfigured(existing.clone()));
    }

    let directory = directory.as_ref();
    if !directory_available(directory) {
        return Err(LogWriterError::PathUnavailable {
            path: directory.to_path_buf(),
            error: "directory does not exist".to_string(),
        });
    }
    let sink_path = directory.join(filename);
    let sink = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&sink_path)
        .map_err(|err| LogWriterError::from_io(&sink_path, err))?;

    let subscriber = tracing_subscriber::fmt()
        .with_writer(Mutex::new(sink))
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| LogWriterError::ErrorSinkFailed(err.to_string()))?;

    // Only the caller that installed the subscriber gets here.
    ERROR_SINK.get_or_init(|| sink_path.clone());
    report_panics_to_error_sink();

    Ok(sink_path)
}

/// Path of the configured error sink, if any.
pub fn error_sink() -> Option<&'static Path> {
    ERROR_SINK.get().map(PathBuf::as_path)
}

fn report_panics_to_error_sink() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "process panicked");
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_fifty_mebibytes() {
        assert_eq!(RotationSize::default().bytes(), 52_428_800);
        assert_eq!(RotationSize::MB(50).bytes(), DEFAULT_MAX_SIZE_BYTES);
        assert_eq!(RotationSize::KB(2).bytes(), 2048);
        assert_eq!(RotationSize::GB(1).bytes(), 1 << 30);
    }

    #[test]
    fn record_has_fixed_width_timestamp_and_crlf() {
        let meta = LogWriterMeta {
            time_zone: TimeZone::UTC,
            ..LogWriterMeta::new()
        };
        let record = meta.format_record("User login failed");

        let pattern = Regex::new(r"^\d{14} User login failed\r\n$").unwrap();
        assert!(pattern.is_match(&record), "unexpected record {record:?}");
    }

    #[test]
    fn fixed_offset_timestamp_is_fourteen_digits() {
        let meta = LogWriterMeta {
            time_zone: TimeZone::Fix(FixedOffset::east_opt(0).unwrap()),
            ..LogWriterMeta::new()
        };
        assert_eq!(meta.record_timestamp().len(), 14);
    }

    #[test]
    fn archive_name_appends_seconds_without_separator() {
        let dir = tempfile::tempdir().unwrap();
        let meta = LogWriterMeta::new();

        let path = meta
            .archive_path(dir.path(), Path::new("app.log"), 1_374_687_045)
            .unwrap();
        assert_eq!(path, dir.path().join("app.log1374687045"));
    }

    #[test]
    fn disambiguate_appends_first_free_counter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log1374687045"), "first").unwrap();
        fs::write(dir.path().join("app.log1374687045.1"), "second").unwrap();
        let meta = LogWriterMeta::new();

        let path = meta
            .archive_path(dir.path(), Path::new("app.log"), 1_374_687_045)
            .unwrap();
        assert_eq!(path, dir.path().join("app.log1374687045.2"));
    }

    #[test]
    fn fail_policy_rejects_taken_name_and_keeps_both_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log1374687045"), "earlier").unwrap();
        fs::write(dir.path().join("app.log"), "current").unwrap();
        let meta = LogWriterMeta {
            collision: ArchiveCollision::Fail,
            ..LogWriterMeta::new()
        };

        let err = meta
            .archive(dir.path(), Path::new("app.log"), 1_374_687_045)
            .unwrap_err();
        assert!(matches!(err, LogWriterError::RotationFailed { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("app.log1374687045")).unwrap(), "earlier");
        assert_eq!(fs::read_to_string(dir.path().join("app.log")).unwrap(), "current");
    }

    #[test]
    fn overwrite_policy_replaces_earlier_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log1374687045"), "earlier").unwrap();
        fs::write(dir.path().join("app.log"), "current").unwrap();
        let meta = LogWriterMeta {
            collision: ArchiveCollision::Overwrite,
            ..LogWriterMeta::new()
        };

        let archived = meta.archive(dir.path(), Path::new("app.log"), 1_374_687_045).unwrap();
        assert_eq!(archived, dir.path().join("app.log1374687045"));
        assert_eq!(fs::read_to_string(&archived).unwrap(), "current");
        assert!(!dir.path().join("app.log").exists());
    }

    #[test]
    fn io_errors_are_classified() {
        let path = Path::new("/nowhere/app.log");
        assert!(matches!(
            LogWriterError::from_io(path, io::Error::from(io::ErrorKind::NotFound)),
            LogWriterError::PathUnavailable { .. }
        ));
        assert!(matches!(
            LogWriterError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied)),
            LogWriterError::PermissionDenied { .. }
        ));
        assert!(matches!(
            LogWriterError::from_io(path, io::Error::from(io::ErrorKind::WriteZero)),
            LogWriterError::WriteFailed { .. }
        ));
    }

    fn lock_registered(log_path: &Path) -> bool {
        file_locks()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(log_path)
    }

    #[test]
    fn same_path_shares_one_lock() {
        let shared = Path::new("/tmp/shared/app.log");
        let other = Path::new("/tmp/shared/other.log");
        let a = file_lock(shared);
        let b = file_lock(shared);
        let c = file_lock(other);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));

        release_file_lock(shared, a);
        assert!(lock_registered(shared));
        release_file_lock(shared, b);
        assert!(!lock_registered(shared));
        release_file_lock(other, c);
        assert!(!lock_registered(other));
    }

    #[test]
    fn lock_registry_forgets_paths_after_use() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::default();

        for day in 1..=5 {
            let name = format!("app-2026-10-{day:02}.log");
            writer.write_to_log(&name, dir.path(), &name).unwrap();
            assert!(!lock_registered(&dir.path().join(&name)));
        }
    }

    #[test]
    fn oversized_units_saturate_instead_of_overflowing() {
        assert_eq!(RotationSize::GB(u64::MAX).bytes(), u64::MAX);
        assert_eq!(RotationSize::GB(u64::MAX / 1024).bytes(), u64::MAX);
        assert_eq!(RotationSize::MB(u64::MAX).bytes(), u64::MAX);
        assert_eq!(RotationSize::KB(u64::MAX).bytes(), u64::MAX);
    }

    #[test]
    fn empty_directory_means_working_directory() {
        assert!(directory_available(Path::new("")));
        assert!(directory_available(Path::new(".")));
        assert!(!directory_available(Path::new("/nowhere/at/all")));
    }
}
