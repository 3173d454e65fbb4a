//! Size-based rotating log files
//!
//! The active file is rolled over to numbered backups once the next write
//! would take it past `max_bytes`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;

use super::retention::{backup_path, prune_backups};
use super::Sink;
use crate::record::Record;

/// Rotate once a file would grow past 10 MiB
pub const DEFAULT_MAX_BYTES: u64 = 10_485_760;

/// Keep at most this many rotated backups
pub const DEFAULT_BACKUP_COUNT: u32 = 20;

/// A file writer that rotates by size
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    file: File,
    size: u64,
}

impl RotatingFileWriter {
    /// Open (or create) `path` for appending
    ///
    /// `max_bytes == 0` disables rotation. `backup_count == 0` truncates the
    /// file on rotation instead of keeping backups.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backup_count: u32) -> io::Result<Self> {
        let path = path.into();
        // Log directories are created on demand
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        // Appending resumes at the current size so the next rollover is on time
        let size = file.metadata()?.len();
        // A smaller backup count than last run leaves stale backups behind
        prune_backups(&path, backup_count)?;

        Ok(Self {
            path,
            max_bytes,
            backup_count,
            file,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn backup_count(&self) -> u32 {
        self.backup_count
    }

    /// Bytes in the active file
    pub fn size(&self) -> u64 {
        self.size
    }

    fn should_rollover(&self, incoming: usize) -> bool {
        self.max_bytes > 0 && self.size > 0 && self.size + incoming as u64 > self.max_bytes
    }

    fn rollover(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backup_count > 0 {
            // Shift name.1..name.(N-1) up by one, oldest first
            for index in (1..self.backup_count).rev() {
                let source = backup_path(&self.path, index);
                if source.exists() {
                    fs::rename(&source, backup_path(&self.path, index + 1))?;
                }
            }
            // The active file becomes name.1
            fs::rename(&self.path, backup_path(&self.path, 1))?;
            self.file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
        } else {
            // No backups kept: start the active file over
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
        }

        self.size = 0;
        // name.(N+1) from the shift above is past the limit
        prune_backups(&self.path, self.backup_count)?;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rollover(buf.len()) {
            self.rollover()?;
        }
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Sink writing one line per record to a [`RotatingFileWriter`]
#[derive(Debug)]
pub struct RotatingFileSink {
    writer: Mutex<RotatingFileWriter>,
}

impl RotatingFileSink {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backup_count: u32) -> io::Result<Self> {
        Ok(Self {
            writer: Mutex::new(RotatingFileWriter::open(path, max_bytes, backup_count)?),
        })
    }

    /// Path of the active file
    pub fn path(&self) -> PathBuf {
        self.lock().path().to_path_buf()
    }

    /// Rotation threshold and backup count
    pub fn rotation(&self) -> (u64, u32) {
        let writer = self.lock();
        (writer.max_bytes(), writer.backup_count())
    }

    fn lock(&self) -> MutexGuard<'_, RotatingFileWriter> {
        // A panic mid-write leaves the file usable, so keep logging.
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Sink for RotatingFileSink {
    fn write_line(&self, _record: &Record, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.lock().write_all(buf.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// Writer handed out to `tracing_subscriber::fmt` layers
pub struct RotatingFileGuard<'a> {
    guard: MutexGuard<'a, RotatingFileWriter>,
}

impl Write for RotatingFileGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFileSink {
    type Writer = RotatingFileGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingFileGuard { guard: self.lock() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::sink::retention::existing_backups;
    use tempfile::TempDir;

    fn line_of(len: usize) -> String {
        "x".repeat(len - 1) + "\n"
    }

    #[test]
    fn test_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/deeper/info.log");
        let writer = RotatingFileWriter::open(&path, 100, 2).unwrap();
        assert!(path.exists());
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("info.log");
        fs::write(&path, "earlier\n").unwrap();

        let mut writer = RotatingFileWriter::open(&path, 0, 0).unwrap();
        assert_eq!(writer.size(), 8);
        writer.write_all(b"later\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn test_rotates_when_next_write_exceeds_limit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("info.log");
        let mut writer = RotatingFileWriter::open(&path, 100, 3).unwrap();

        writer.write_all(line_of(60).as_bytes()).unwrap();
        writer.write_all(line_of(40).as_bytes()).unwrap();
        // Exactly at the limit, nothing rotated yet.
        assert!(!backup_path(&path, 1).exists());

        writer.write_all(line_of(10).as_bytes()).unwrap();
        assert_eq!(fs::metadata(backup_path(&path, 1)).unwrap().len(), 100);
        assert_eq!(fs::metadata(&path).unwrap().len(), 10);
    }

    #[test]
    fn test_never_keeps_more_than_backup_count() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("errors.log");
        let mut writer = RotatingFileWriter::open(&path, 50, 3).unwrap();

        for i in 0..20 {
            writer
                .write_all(format!("{:>39}\n", i).as_bytes())
                .unwrap();
        }

        let backups = existing_backups(&path).unwrap();
        let indexes: Vec<u32> = backups.iter().map(|(index, _)| *index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);

        // Newest backup holds the record written just before the active one.
        assert_eq!(fs::read_to_string(backup_path(&path, 1)).unwrap().trim(), "18");
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "19");
    }

    #[test]
    fn test_zero_backups_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("info.log");
        let mut writer = RotatingFileWriter::open(&path, 10, 0).unwrap();

        writer.write_all(b"first12\n").unwrap();
        writer.write_all(b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert!(existing_backups(&path).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_record_on_empty_file_is_written() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("info.log");
        let mut writer = RotatingFileWriter::open(&path, 10, 2).unwrap();

        writer.write_all(line_of(25).as_bytes()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 25);
        assert!(!backup_path(&path, 1).exists());
    }

    #[test]
    fn test_open_prunes_stale_backups() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("info.log");
        for index in 1..=4 {
            fs::write(backup_path(&path, index), "old").unwrap();
        }

        RotatingFileWriter::open(&path, 100, 2).unwrap();
        let backups = existing_backups(&path).unwrap();
        assert_eq!(backups.len(), 2);
    }

    #[test]
    fn test_sink_writes_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("info.log");
        let sink = RotatingFileSink::open(&path, DEFAULT_MAX_BYTES, DEFAULT_BACKUP_COUNT).unwrap();

        let record = Record::new(Level::Info, "app", "hello");
        sink.write_line(&record, "hello").unwrap();
        sink.write_line(&record, "world").unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\nworld\n");
        assert_eq!(sink.rotation(), (10_485_760, 20));
        assert_eq!(sink.path(), path);
    }

    #[test]
    fn test_make_writer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fmt.log");
        let sink = RotatingFileSink::open(&path, 0, 0).unwrap();

        sink.make_writer().write_all(b"from fmt layer\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "from fmt layer\n");
    }

    #[test]
    fn test_shared_sink_across_threads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("info.log");
        let sink = std::sync::Arc::new(RotatingFileSink::open(&path, 500, 2).unwrap());

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    let record = Record::new(Level::Info, "app", "");
                    let line = format!("{}{}", t, "x".repeat(48));
                    for _ in 0..100 {
                        sink.write_line(&record, &line).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        sink.flush().unwrap();

        let backups = existing_backups(&path).unwrap();
        assert_eq!(backups.len(), 2);
        assert!(fs::metadata(&path).unwrap().len() <= 500);
        for (_, backup) in backups {
            let content = fs::read_to_string(&backup).unwrap();
            // Ten whole 50-byte lines per file
            assert_eq!(content.len(), 500);
            assert!(content.lines().all(|line| line.len() == 49));
        }
    }
}
