use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use prequal_core::record::FieldRecord;
use serde::Serialize;
use tracing::warn;

/// Finished record handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub submitted_at: String,
    pub branch: Option<String>,
    pub record: FieldRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Where the submission was written, for sinks that write files.
    pub path: Option<PathBuf>,
}

pub trait SubmissionSink {
    fn submit(&self, submission: &Submission) -> Result<SubmissionReceipt>;
}

/// Writes each submission as pretty JSON named after the current time.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

const MAX_NAME_ATTEMPTS: u32 = 100;

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SubmissionSink for JsonFileSink {
    fn submit(&self, submission: &Submission) -> Result<SubmissionReceipt> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!(
                "failed to create submissions directory {}",
                self.dir.display()
            )
        })?;

        let payload =
            serde_json::to_string_pretty(submission).context("failed to serialize submission")?;
        let stamp = prequal_core::time::now_unix_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{stamp}.json")
            } else {
                format!("{stamp}-{attempt}.json")
            };
            let path = self.dir.join(file_name);

            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(error) if error.kind() == ErrorKind::AlreadyExists => continue,
                Err(error) => {
                    return Err(error)
                        .with_context(|| format!("failed to create {}", path.display()));
                }
            };

            write_or_remove(file, &path, &payload)?;
            return Ok(SubmissionReceipt { path: Some(path) });
        }

        bail!(
            "could not find a free submission file name in {}",
            self.dir.display()
        )
    }
}

/// Writes the payload, removing `path` again if the write fails.
fn write_or_remove(mut writer: impl Write, path: &Path, payload: &str) -> Result<()> {
    let written = writer
        .write_all(payload.as_bytes())
        .and_then(|()| writer.write_all(b"\n"))
        .and_then(|()| writer.flush());

    if let Err(error) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial submission");
        }
        return Err(error)
            .with_context(|| format!("failed to write submission to {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use prequal_core::form::FormValues;
    use prequal_core::record::collect_record;
    use prequal_core::registry::StepRegistry;

    use super::*;

    fn submission() -> Submission {
        let registry = StepRegistry::builtin().expect("builtin registry");
        let values = FormValues::for_registry(&registry);
        Submission {
            submitted_at: "2026-01-01T00:00:00Z".to_string(),
            branch: Some("owner".to_string()),
            record: collect_record(&registry, &values),
        }
    }

    #[test]
    fn json_file_sink_writes_pretty_json() {
        let temp = tempfile::tempdir().expect("temp dir");
        let sink = JsonFileSink::new(temp.path().join("submissions"));

        let receipt = sink.submit(&submission()).expect("submit");
        let path = receipt.path.expect("receipt path");
        assert_eq!(path.extension().and_then(|value| value.to_str()), Some("json"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(written["branch"], "owner");
        assert_eq!(written["record"]["email"], serde_json::Value::Null);
    }

    #[test]
    fn json_file_sink_never_overwrites() {
        let temp = tempfile::tempdir().expect("temp dir");
        let sink = JsonFileSink::new(temp.path());

        let first = sink.submit(&submission()).expect("first").path;
        let second = sink.submit(&submission()).expect("second").path;
        assert_ne!(first, second);
        assert_eq!(fs::read_dir(temp.path()).expect("read dir").count(), 2);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_removes_the_created_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("1.json");
        fs::write(&path, "").expect("create file");

        let error = write_or_remove(FailingWriter, &path, "{}").expect_err("write fails");

        assert!(format!("{error:#}").contains("disk full"));
        assert!(!path.exists());
    }
}
