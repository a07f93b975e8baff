//! Per-run export log
//!
//! A plain-text file `<scene>_<YYYY-mm-dd_HH-MM-SS>.log` receiving one line
//! per progress event and a closing summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use o3dexport_core::Result;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const LINE_TIMESTAMP_FORMAT: &str = "%H:%M:%S";

#[derive(Debug)]
pub struct ExportLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl ExportLog {
    /// Creates a fresh log for `scene_name` in `dir`
    pub fn create(dir: &Path, scene_name: &str) -> Result<Self> {
        let stamp = Local::now().format(FILE_TIMESTAMP_FORMAT);
        let path = dir.join(format!("{}_{}.log", scene_name, stamp));
        let file = File::create(&path)?;
        tracing::debug!(path = %path.display(), "opened export log");
        Ok(Self { path, writer: Some(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Appends a timestamped line. Write failures are reported once and
    /// close the log.
    pub fn line(&mut self, message: &str) {
        let Some(writer) = self.writer.as_mut() else { return };
        let stamp = Local::now().format(LINE_TIMESTAMP_FORMAT);
        if let Err(err) = writeln!(writer, "[{}] {}", stamp, message) {
            tracing::warn!(path = %self.path.display(), error = %err, "export log write failed");
            self.writer = None;
        }
    }

    /// Writes `[done/total] exported` and closes the log
    pub fn close(&mut self, done: usize, total: usize) {
        self.line(&format!("[{}/{}] exported", done, total));
        self.close_silently();
    }

    /// Flushes and closes without a summary
    pub fn close_silently(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.flush() {
                tracing::warn!(path = %self.path.display(), error = %err, "export log flush failed");
            }
        }
    }
}

impl Drop for ExportLog {
    fn drop(&mut self) {
        self.close_silently();
    }
}
