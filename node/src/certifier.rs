//! Local adapter for the certifier component.
//!
//! Outward calls are appended as JSON lines to an outbox file that the
//! certifier deployment consumes. The active validator set is tracked locally
//! from the configured initial set and the removals sent.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tasknet_types::{Address, CertifierCall, CertifierError, CertifierRegistry, Timestamp};

/// One line of the outbox file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub at: Timestamp,
    pub call: CertifierCall,
}

pub struct OutboxCertifier {
    path: PathBuf,
    active: Mutex<BTreeSet<Address>>,
}

impl OutboxCertifier {
    pub fn new(path: impl Into<PathBuf>, active: impl IntoIterator<Item = Address>) -> Self {
        Self {
            path: path.into(),
            active: Mutex::new(active.into_iter().collect()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, call: CertifierCall) -> Result<(), CertifierError> {
        let entry = OutboxEntry {
            at: Timestamp::now(),
            call,
        };
        let mut line =
            serde_json::to_string(&entry).map_err(|e| CertifierError::Rejected(e.to_string()))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CertifierError::Unavailable(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| CertifierError::Unavailable(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), call = ?entry.call, "certifier call queued");
        Ok(())
    }

    /// Read back every queued call.
    pub fn read_outbox(&self) -> Result<Vec<OutboxEntry>, CertifierError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CertifierError::Unavailable(e.to_string())),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(|e| CertifierError::Rejected(e.to_string())))
            .collect()
    }

    fn active(&self) -> Result<std::sync::MutexGuard<'_, BTreeSet<Address>>, CertifierError> {
        self.active
            .lock()
            .map_err(|_| CertifierError::Unavailable("active set lock poisoned".to_string()))
    }
}

impl CertifierRegistry for OutboxCertifier {
    fn remove_validator(&self, validator: &Address) -> Result<(), CertifierError> {
        self.append(CertifierCall::RemoveValidator(validator.clone()))?;
        self.active()?.remove(validator);
        Ok(())
    }

    fn halve_period(&self) -> Result<(), CertifierError> {
        self.append(CertifierCall::HalvePeriod)
    }

    fn double_period(&self) -> Result<(), CertifierError> {
        self.append(CertifierCall::DoublePeriod)
    }

    fn num_validators(&self) -> u64 {
        self.active().map(|a| a.len() as u64).unwrap_or(0)
    }

    fn is_active_validator(&self, validator: &Address) -> bool {
        self.active().map(|a| a.contains(validator)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let v1 = Address::new("tn_v1");
        let certifier = OutboxCertifier::new(dir.path().join("outbox.jsonl"), [v1.clone()]);
        assert!(certifier.read_outbox().unwrap().is_empty());
        assert!(certifier.is_active_validator(&v1));

        certifier.remove_validator(&v1).unwrap();
        certifier.halve_period().unwrap();

        let calls: Vec<CertifierCall> = certifier
            .read_outbox()
            .unwrap()
            .into_iter()
            .map(|e| e.call)
            .collect();
        assert_eq!(calls, vec![CertifierCall::RemoveValidator(v1.clone()), CertifierCall::HalvePeriod]);
        assert!(!certifier.is_active_validator(&v1));
        assert_eq!(certifier.num_validators(), 0);
    }

    #[test]
    fn unwritable_outbox_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let certifier = OutboxCertifier::new(dir.path().join("missing").join("outbox.jsonl"), []);
        assert!(matches!(
            certifier.double_period(),
            Err(CertifierError::Unavailable(_))
        ));
    }
}
