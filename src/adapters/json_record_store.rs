//! Backtest records stored as `{id}.json` files in one directory.

use crate::domain::error::CallerError;
use crate::domain::record::BacktestRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::record_port::RecordPort;
use std::fs;
use std::path::PathBuf;

pub struct JsonRecordStore {
    dir: PathBuf,
}

impl JsonRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, CallerError> {
        let dir = config
            .get_string("records", "directory")
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| CallerError::ConfigMissing {
                section: "records".into(),
                key: "directory".into(),
            })?;
        Ok(Self::new(dir))
    }

    fn path(&self, id: &str) -> Result<PathBuf, CallerError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(CallerError::Record {
                reason: format!("invalid record id '{id}'"),
            });
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl RecordPort for JsonRecordStore {
    fn save(&self, record: &BacktestRecord) -> Result<(), CallerError> {
        let path = self.path(&record.id)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, record.to_bytes()?)?;
        tracing::info!(id = %record.id, path = %path.display(), "saved backtest record");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<BacktestRecord, CallerError> {
        let path = self.path(id)?;
        let bytes = fs::read(&path).map_err(|e| CallerError::Record {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        BacktestRecord::from_bytes(&bytes)
    }

    fn list(&self) -> Result<Vec<String>, CallerError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
