//! Nullable certifier: records outward calls and answers active-set queries.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tasknet_types::{Address, CertifierCall, CertifierError, CertifierRegistry};

#[derive(Default)]
pub struct NullCertifier {
    calls: Mutex<Vec<CertifierCall>>,
    active: Mutex<BTreeSet<Address>>,
    unavailable: AtomicBool,
}

impl NullCertifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(validators: impl IntoIterator<Item = Address>) -> Self {
        let certifier = Self::new();
        certifier.active.lock().unwrap().extend(validators);
        certifier
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<CertifierCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every following call fail with [`CertifierError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn record(&self, call: CertifierCall) -> Result<(), CertifierError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CertifierError::Unavailable("null certifier offline".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl CertifierRegistry for NullCertifier {
    fn remove_validator(&self, validator: &Address) -> Result<(), CertifierError> {
        self.record(CertifierCall::RemoveValidator(validator.clone()))?;
        self.active.lock().unwrap().remove(validator);
        Ok(())
    }

    fn halve_period(&self) -> Result<(), CertifierError> {
        self.record(CertifierCall::HalvePeriod)
    }

    fn double_period(&self) -> Result<(), CertifierError> {
        self.record(CertifierCall::DoublePeriod)
    }

    fn num_validators(&self) -> u64 {
        self.active.lock().unwrap().len() as u64
    }

    fn is_active_validator(&self, validator: &Address) -> bool {
        self.active.lock().unwrap().contains(validator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_validator_updates_active_set() {
        let v = Address::new("tn_v1");
        let certifier = NullCertifier::with_active([v.clone(), Address::new("tn_v2")]);
        assert_eq!(certifier.num_validators(), 2);
        certifier.dispatch(&CertifierCall::RemoveValidator(v.clone())).unwrap();
        assert!(!certifier.is_active_validator(&v));
        assert_eq!(certifier.calls(), vec![CertifierCall::RemoveValidator(v)]);
    }

    #[test]
    fn test_unavailable_rejects_calls() {
        let certifier = NullCertifier::new();
        certifier.set_unavailable(true);
        assert!(certifier.halve_period().is_err());
        assert!(certifier.calls().is_empty());
    }
}
