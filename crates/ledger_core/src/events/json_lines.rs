use super::{EventSink, LedgerEvent};
use crate::error::LedgerError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends each event as one JSON object per line.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonLinesSink {
    fn publish(&self, event: &LedgerEvent) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| LedgerError::io(format!("{}: {}", self.path.display(), err)))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::JsonLinesSink;
    use crate::events::{EventSink, LedgerEvent};
    use crate::model::Principal;

    #[test]
    fn appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("nested").join("events.jsonl"));

        for proof_id in 1..=2 {
            sink.publish(&LedgerEvent::ProofSubmitted {
                proof_id,
                task_id: 1,
                submitter: Principal::from("bob"),
                evidence_hash: format!("hash-{proof_id}"),
            })
            .unwrap();
        }

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "proof_submitted");
        assert_eq!(lines[1]["evidence_hash"], "hash-2");
    }
}
