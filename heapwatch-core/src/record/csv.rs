use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use super::{row_fields, HEADER};
use crate::error::WriteError;
use crate::sample::Sample;
use crate::sink::RecordSink;
use crate::utils::format::escape_csv_field;

/// Writes samples as comma separated rows. Opening truncates the file.
pub struct CsvRecordSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl CsvRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn io_error(&self, source: std::io::Error) -> WriteError {
        WriteError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn write_line(&mut self, line: String) -> Result<(), WriteError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(WriteError::NotOpen {
                path: self.path.clone(),
            });
        };

        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        result.map_err(|e| self.io_error(e))
    }
}

fn to_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|field| escape_csv_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl RecordSink for CsvRecordSink {
    async fn open(&mut self) -> Result<(), WriteError> {
        if self.writer.is_some() {
            debug!(path = %self.path.display(), "Record sink already open");
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let file = File::create(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        self.writer = Some(BufWriter::new(file));

        if let Err(e) = self.write_line(to_line(HEADER)).await {
            self.writer = None;
            return Err(e);
        }

        info!(path = %self.path.display(), "Opened record file");
        Ok(())
    }

    async fn append(&mut self, sample: &Sample) -> Result<(), WriteError> {
        self.write_line(to_line(row_fields(sample))).await
    }

    async fn close(&mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };

        if let Err(e) = writer.shutdown().await {
            warn!(path = %self.path.display(), error = %e, "Failed to close record file");
            return;
        }
        info!(path = %self.path.display(), "Closed record file");
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}
