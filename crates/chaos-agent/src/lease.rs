//! Exclusive per-interface leases for network faults.
//!
//! An interface carries at most one root queueing rule. A network fault holds
//! the lease from before it installs the rule until after it removes it; a
//! second network fault on the same interface is refused instead of racing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chaos_core::FaultError;

#[derive(Debug, Clone, Default)]
pub struct InterfaceLeases {
    held: Arc<Mutex<HashSet<String>>>,
}

impl InterfaceLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease on `interface`, or fail with [`FaultError::InterfaceBusy`].
    pub fn try_acquire(&self, interface: &str) -> Result<InterfaceLease, FaultError> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(interface.to_string()) {
            return Err(FaultError::InterfaceBusy(interface.to_string()));
        }
        Ok(InterfaceLease {
            interface: interface.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, interface: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(interface)
    }
}

/// Released on drop.
#[derive(Debug)]
pub struct InterfaceLease {
    interface: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl InterfaceLease {
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl Drop for InterfaceLease {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.interface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let leases = InterfaceLeases::new();
        let lease = leases.try_acquire("eth0").unwrap();
        assert_eq!(lease.interface(), "eth0");
        assert_eq!(
            leases.try_acquire("eth0").unwrap_err(),
            FaultError::InterfaceBusy("eth0".to_string())
        );
    }

    #[test]
    fn test_interfaces_are_independent() {
        let leases = InterfaceLeases::new();
        let _a = leases.try_acquire("eth0").unwrap();
        let _b = leases.try_acquire("eth1").unwrap();
        assert!(leases.is_held("eth0"));
        assert!(leases.is_held("eth1"));
    }

    #[test]
    fn test_drop_releases() {
        let leases = InterfaceLeases::new();
        {
            let _lease = leases.try_acquire("eth0").unwrap();
            assert!(leases.is_held("eth0"));
        }
        assert!(!leases.is_held("eth0"));
        assert!(leases.try_acquire("eth0").is_ok());
    }
}
