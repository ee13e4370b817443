//! Semicolon-delimited `epoch;loss` log.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct LossLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LossLog {
    /// Starts a new log, discarding any previous content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_file(path, file))
    }

    /// Continues an existing log (or starts one), keeping earlier epochs.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one `epoch;loss` line and flushes it to disk.
    pub fn record(&mut self, epoch: usize, loss: f64) -> Result<()> {
        writeln!(self.writer, "{epoch};{loss:.6}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| Error::io(&self.path, e))
    }
}

/// Reads back the `(epoch, loss)` pairs of a log, skipping blank lines.
///
/// Fails with the 1-based number of the first line that is not `epoch;loss`.
pub fn parse_loss_log(content: &str) -> std::result::Result<Vec<(usize, f64)>, usize> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_line(line).ok_or(index + 1))
        .collect()
}

fn parse_line(line: &str) -> Option<(usize, f64)> {
    let (epoch, loss) = line.split_once(';')?;
    Some((epoch.trim().parse().ok()?, loss.trim().parse().ok()?))
}

/// Last epoch recorded in the log at `path`, if any.
pub fn last_epoch(path: &Path) -> Result<Option<usize>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let entries = parse_loss_log(&content).map_err(|line| Error::InvalidLossLog {
        path: path.to_path_buf(),
        line,
    })?;
    Ok(entries.last().map(|&(epoch, _)| epoch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_fixed_precision_lines() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("loss.txt");
        let mut log = LossLog::create(&path).unwrap();
        log.record(1, 0.25).unwrap();
        log.record(2, 0.1234567).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1;0.250000\n2;0.123457\n");
        assert_eq!(
            parse_loss_log(&content).unwrap(),
            vec![(1, 0.25), (2, 0.123457)]
        );
    }

    #[test]
    fn append_keeps_history_and_create_truncates() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("loss.txt");
        LossLog::create(&path).unwrap().record(1, 1.0).unwrap();
        LossLog::append(&path).unwrap().record(2, 0.5).unwrap();
        assert_eq!(last_epoch(&path).unwrap(), Some(2));

        LossLog::create(&path).unwrap();
        assert_eq!(last_epoch(&path).unwrap(), None);
        assert_eq!(last_epoch(&dir.path().join("missing.txt")).unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_loss_log("1;0.5\nnot a line\n"), Err(2));
        assert_eq!(parse_loss_log("1;0.5\n\n2;x\n"), Err(3));
        assert_eq!(parse_loss_log("\n3;2.0\n\n").unwrap(), vec![(3, 2.0)]);
    }

    #[test]
    fn malformed_log_is_an_error_when_resuming() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("loss.txt");
        std::fs::write(&path, "1;0.5\n2;0.4\nedited by hand\n").unwrap();
        assert!(matches!(
            last_epoch(&path),
            Err(Error::InvalidLossLog { line: 3, .. })
        ));
    }
}
