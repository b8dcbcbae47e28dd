use crate::batch::FieldSet;
use crate::config::types::{ParseErrorStrategy, SourceConfig};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::warn;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line} is not a JSON event object: {source}")]
    Parse {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

enum LineSource {
    File(BufReader<File>),
    Stdin(io::Stdin),
}

impl LineSource {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match self {
            LineSource::File(reader) => reader.read_line(buf),
            LineSource::Stdin(stdin) => stdin.lock().read_line(buf),
        }
    }
}

/// Reads NDJSON event envelopes: one JSON object per line, keyed by input
/// field name. Blank lines are skipped; malformed lines are dropped or abort
/// the reader depending on the configured strategy.
pub struct EnvelopeReader {
    path: PathBuf,
    follow: bool,
    parse_error_strategy: ParseErrorStrategy,
    input: Option<LineSource>,
    line_number: u64,
}

impl EnvelopeReader {
    pub fn new(config: &SourceConfig, parse_error_strategy: ParseErrorStrategy) -> Self {
        Self {
            path: config.path.clone(),
            follow: config.follow,
            parse_error_strategy,
            input: None,
            line_number: 0,
        }
    }

    /// Open the event source. '-' binds stdin.
    pub fn open(&mut self) -> Result<(), SourceError> {
        let input = if self.path == Path::new("-") {
            LineSource::Stdin(io::stdin())
        } else {
            LineSource::File(BufReader::new(File::open(&self.path)?))
        };
        self.input = Some(input);
        Ok(())
    }

    /// Read the next event. `None` means the source is exhausted. In follow
    /// mode EOF is never final; the reader polls for appended lines.
    pub async fn next_event(&mut self) -> Result<Option<FieldSet>, SourceError> {
        if self.input.is_none() {
            self.open()?;
        }

        loop {
            let mut line = String::new();
            let bytes_read = {
                let Some(input) = self.input.as_mut() else {
                    return Ok(None);
                };
                input.read_line(&mut line)?
            };

            if bytes_read == 0 {
                if self.follow {
                    sleep(Duration::from_millis(100)).await;
                    continue;
                }
                return Ok(None);
            }

            self.line_number += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<FieldSet>(line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => match self.parse_error_strategy {
                    ParseErrorStrategy::Drop => {
                        warn!(line = self.line_number, error = %e, "Dropping malformed event line");
                        continue;
                    }
                    ParseErrorStrategy::Abort => {
                        return Err(SourceError::Parse {
                            line: self.line_number,
                            source: e,
                        });
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config(path: PathBuf, follow: bool) -> SourceConfig {
        SourceConfig { path, follow }
    }

    #[tokio::test]
    async fn test_reads_events_in_order() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, r#"{{"time": 1, "temperature": 20.5}}"#).unwrap();
        writeln!(temp).unwrap();
        writeln!(temp, r#"{{"time": 2}}"#).unwrap();
        temp.flush().unwrap();

        let mut reader = EnvelopeReader::new(
            &config(temp.path().to_path_buf(), false),
            ParseErrorStrategy::Abort,
        );

        let first = reader.next_event().await.unwrap().unwrap();
        assert_eq!(first.get("temperature"), Some(&json!(20.5)));

        let second = reader.next_event().await.unwrap().unwrap();
        assert_eq!(second.get("time"), Some(&json!(2)));

        assert!(reader.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drop_strategy_skips_malformed_lines() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "not json").unwrap();
        writeln!(temp, "[1, 2]").unwrap();
        writeln!(temp, r#"{{"time": 7}}"#).unwrap();
        temp.flush().unwrap();

        let mut reader = EnvelopeReader::new(
            &config(temp.path().to_path_buf(), false),
            ParseErrorStrategy::Drop,
        );

        let event = reader.next_event().await.unwrap().unwrap();
        assert_eq!(event.get("time"), Some(&json!(7)));
        assert!(reader.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_abort_strategy_errors_on_malformed_line() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "not json").unwrap();
        temp.flush().unwrap();

        let mut reader = EnvelopeReader::new(
            &config(temp.path().to_path_buf(), false),
            ParseErrorStrategy::Abort,
        );

        let result = reader.next_event().await;
        assert!(matches!(result, Err(SourceError::Parse { line: 1, .. })));
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let mut reader = EnvelopeReader::new(
            &config(PathBuf::from("/nonexistent/events.ndjson"), false),
            ParseErrorStrategy::Drop,
        );

        assert!(matches!(
            reader.next_event().await,
            Err(SourceError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_file_is_exhausted() {
        let temp = NamedTempFile::new().unwrap();

        let mut reader = EnvelopeReader::new(
            &config(temp.path().to_path_buf(), false),
            ParseErrorStrategy::Abort,
        );

        assert!(reader.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_follow_picks_up_appended_lines() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, r#"{{"time": 1}}"#).unwrap();
        temp.flush().unwrap();

        let mut reader = EnvelopeReader::new(
            &config(temp.path().to_path_buf(), true),
            ParseErrorStrategy::Abort,
        );

        let first = reader.next_event().await.unwrap().unwrap();
        assert_eq!(first.get("time"), Some(&json!(1)));

        let path = temp.path().to_path_buf();
        let writer = tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, r#"{{"time": 2}}"#).unwrap();
        });

        let second = tokio::time::timeout(Duration::from_secs(5), reader.next_event())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(second.get("time"), Some(&json!(2)));
        writer.await.unwrap();
    }
}
