use crate::error::LedgerError;
use crate::index::Indices;
use crate::ledger::Ledger;
use crate::model::{CompletionProof, Task};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "ledger.json";
const STORE_ENV_VAR: &str = "PROOF_LEDGER_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredLedger {
    schema_version: u32,
    task_counter: u64,
    proof_counter: u64,
    tasks: Vec<Task>,
    proofs: Vec<CompletionProof>,
    indices: Indices,
}

/// Resolution order: `PROOF_LEDGER_STORE_PATH`, then `configured`, then the
/// per-user default location.
pub fn store_path_with(configured: Option<&str>) -> Result<PathBuf, LedgerError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    match configured {
        Some(path) => Ok(PathBuf::from(path)),
        None => default_store_path(),
    }
}

fn default_store_path() -> Result<PathBuf, LedgerError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| LedgerError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("proof_ledger")
            .join(STORE_FILE_NAME))
    } else {
        let home =
            std::env::var("HOME").map_err(|_| LedgerError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("proof_ledger")
            .join(STORE_FILE_NAME))
    }
}

/// Loads the snapshot at `path`, or an empty ledger when no snapshot exists.
///
/// The stored indices must match the ones rebuilt from the task and proof
/// tables; a mismatch means the file was edited or torn.
pub fn load_ledger(path: &Path) -> Result<Ledger, LedgerError> {
    if !path.exists() {
        return Ok(Ledger::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| LedgerError::io(format!("{}: {}", path.display(), err)))?;
    let stored: StoredLedger = serde_json::from_str(&content).map_err(|err| {
        LedgerError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(LedgerError::invalid_data("schema_version mismatch"));
    }
    if stored.task_counter != stored.tasks.len() as u64 {
        return Err(LedgerError::invalid_data("task_counter does not match task table"));
    }
    if stored.proof_counter != stored.proofs.len() as u64 {
        return Err(LedgerError::invalid_data("proof_counter does not match proof table"));
    }

    let ledger = Ledger::from_records(stored.tasks, stored.proofs)?;
    if ledger.indices() != &stored.indices {
        return Err(LedgerError::invalid_data("stored indices disagree with records"));
    }

    debug!(path = %path.display(), tasks = stored.task_counter, proofs = stored.proof_counter, "ledger loaded");
    Ok(ledger)
}

/// Writes the snapshot through a temporary sibling file that is renamed over
/// `path`, so readers see either the old or the new state.
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<(), LedgerError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let counters = ledger.get_counters();
    let stored = StoredLedger {
        schema_version: SCHEMA_VERSION,
        task_counter: counters.total_tasks,
        proof_counter: counters.total_proofs,
        tasks: ledger.tasks().to_vec(),
        proofs: ledger.proofs().to_vec(),
        indices: ledger.indices().clone(),
    };
    let content = serde_json::to_string_pretty(&stored)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(content.as_bytes())?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .map_err(|err| LedgerError::io(format!("{}: {}", path.display(), err.error)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    debug!(path = %path.display(), tasks = counters.total_tasks, proofs = counters.total_proofs, "ledger saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SCHEMA_VERSION, load_ledger, save_ledger};
    use crate::ledger::Ledger;
    use crate::model::Principal;
    use std::fs;
    use time::Duration;
    use time::macros::datetime;

    fn sample_ledger() -> Ledger {
        let now = datetime!(2025-12-20 09:00 UTC);
        let alice = Principal::from("alice");
        let bob = Principal::from("bob");

        let mut ledger = Ledger::new();
        ledger
            .create_task("Write report", "q4", now + Duration::hours(1), "pdf", &alice, now)
            .unwrap();
        let proof = ledger
            .submit_proof(1, "report.pdf", "0xfeed", &bob, now + Duration::minutes(5))
            .unwrap();
        ledger
            .verify_completion(proof, true, "good", &alice, now + Duration::minutes(10))
            .unwrap();
        ledger.drain_events();
        ledger
    }

    #[test]
    fn missing_file_loads_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = load_ledger(&dir.path().join("absent.json")).unwrap();
        assert_eq!(ledger, Ledger::new());
    }

    #[test]
    fn save_then_load_preserves_records_and_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let ledger = sample_ledger();

        save_ledger(&path, &ledger).unwrap();
        let loaded = load_ledger(&path).unwrap();

        assert_eq!(loaded, ledger);
        assert_eq!(loaded.get_user_completion_count(&Principal::from("bob")), 1);
    }

    #[test]
    fn snapshot_exposes_tables_counters_and_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        save_ledger(&path, &sample_ledger()).unwrap();

        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(stored["schema_version"], SCHEMA_VERSION);
        assert_eq!(stored["task_counter"], 1);
        assert_eq!(stored["proof_counter"], 1);
        assert_eq!(stored["tasks"][0]["title"], "Write report");
        assert_eq!(stored["proofs"][0]["verification"]["approved"], true);
        assert_eq!(stored["indices"]["task_proofs"]["1"], serde_json::json!([1]));
        assert_eq!(stored["indices"]["user_tasks"]["alice"], serde_json::json!([1]));
        assert_eq!(stored["indices"]["completion_counts"]["bob"], 1);
    }

    #[cfg(unix)]
    #[test]
    fn saved_snapshot_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        save_ledger(&path, &sample_ledger()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn load_rejects_unknown_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        save_ledger(&path, &sample_ledger()).unwrap();

        let mut stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        stored["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        fs::write(&path, stored.to_string()).unwrap();

        let err = load_ledger(&path).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn load_rejects_tampered_completion_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        save_ledger(&path, &sample_ledger()).unwrap();

        let mut stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        stored["indices"]["completion_counts"]["bob"] = serde_json::json!(5);
        fs::write(&path, stored.to_string()).unwrap();

        let err = load_ledger(&path).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn load_rejects_counter_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        save_ledger(&path, &sample_ledger()).unwrap();

        let mut stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        stored["proof_counter"] = serde_json::json!(4);
        fs::write(&path, stored.to_string()).unwrap();

        let err = load_ledger(&path).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn load_reports_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_ledger(&path).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }
}
