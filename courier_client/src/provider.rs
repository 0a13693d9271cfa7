use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use courier_protocol::{ArcCall, CallRequest, ProviderAddress, ServiceIdentity};

/// The pooled set of live connections toward one provider address for one
/// service identity. Pool internals (locking, multiplexing) belong to the
/// connection provider; this core only asks about availability.
pub trait ConnectionGroup: Send + Sync {
    fn address(&self) -> &ProviderAddress;
    fn is_available(&self) -> bool;
}

pub type GroupHandle = Arc<dyn ConnectionGroup>;

/// Resolves a symbolic address to pooled connection groups and keeps the
/// service-to-groups registry.
pub trait ConnectionProvider: Send + Sync {
    /// Registering an already-known address must be a no-op.
    fn register_address(&self, service: &ServiceIdentity, address: &ProviderAddress);

    /// Every group known for the service, in registration order. May be
    /// empty; availability is reported per group.
    fn connection_groups(&self, service: &ServiceIdentity) -> Vec<GroupHandle>;
}

/// Accepts an outbound call and settles it exactly once, from a thread it
/// owns: reply payload, remote error, or timeout expiry.
pub trait Transport: Send + Sync {
    fn send(&self, group: &GroupHandle, request: CallRequest, timeout: Duration, call: ArcCall);
}

/// Connection group over a fixed address with a manual availability switch.
pub struct StaticConnectionGroup {
    address: ProviderAddress,
    available: AtomicBool,
}

impl StaticConnectionGroup {
    pub fn new(address: ProviderAddress) -> Self {
        StaticConnectionGroup {
            address,
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl ConnectionGroup for StaticConnectionGroup {
    fn address(&self) -> &ProviderAddress {
        &self.address
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// Provider over a fixed address set, for consumers that do not run service
/// discovery. Also the registry reference implementation used by the demos
/// and the test suite.
#[derive(Default)]
pub struct StaticConnectionProvider {
    groups: RwLock<HashMap<ServiceIdentity, Vec<Arc<StaticConnectionGroup>>>>,
}

impl StaticConnectionProvider {
    pub fn new() -> Self {
        Default::default()
    }

    /// Flip the health of one registered address; false when unknown.
    pub fn set_available(
        &self,
        service: &ServiceIdentity,
        address: &ProviderAddress,
        available: bool,
    ) -> bool {
        let groups = self.groups.read().unwrap();
        if let Some(entries) = groups.get(service) {
            for group in entries {
                if group.address() == address {
                    group.set_available(available);
                    return true;
                }
            }
        }
        false
    }
}

impl ConnectionProvider for StaticConnectionProvider {
    fn register_address(&self, service: &ServiceIdentity, address: &ProviderAddress) {
        let mut groups = self.groups.write().unwrap();
        let entries = groups.entry(service.clone()).or_insert_with(Vec::new);
        if entries.iter().any(|g| g.address() == address) {
            return;
        }
        entries.push(Arc::new(StaticConnectionGroup::new(address.clone())));
    }

    fn connection_groups(&self, service: &ServiceIdentity) -> Vec<GroupHandle> {
        let groups = self.groups.read().unwrap();
        match groups.get(service) {
            Some(entries) => entries.iter().map(|g| g.clone() as GroupHandle).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arith() -> ServiceIdentity {
        ServiceIdentity::new("test", "1.0.0", "Arith")
    }

    #[test]
    fn register_is_idempotent() {
        let provider = StaticConnectionProvider::new();
        let addr = ProviderAddress::new("127.0.0.1", 8972);
        provider.register_address(&arith(), &addr);
        provider.register_address(&arith(), &addr);
        assert_eq!(1, provider.connection_groups(&arith()).len());
    }

    #[test]
    fn groups_keep_registration_order() {
        let provider = StaticConnectionProvider::new();
        for port in &[1u16, 2, 3] {
            provider.register_address(&arith(), &ProviderAddress::new("10.0.0.1", *port));
        }
        let ports: Vec<u16> = provider
            .connection_groups(&arith())
            .iter()
            .map(|g| g.address().port)
            .collect();
        assert_eq!(vec![1, 2, 3], ports);
    }

    #[test]
    fn availability_toggle() {
        let provider = StaticConnectionProvider::new();
        let addr = ProviderAddress::new("127.0.0.1", 8972);
        provider.register_address(&arith(), &addr);
        assert!(provider.set_available(&arith(), &addr, false));
        let groups = provider.connection_groups(&arith());
        assert!(!groups[0].is_available());
        assert!(!provider.set_available(&arith(), &ProviderAddress::new("other", 1), false));
    }

    #[test]
    fn unknown_service_has_no_groups() {
        let provider = StaticConnectionProvider::new();
        assert!(provider.connection_groups(&arith()).is_empty());
    }
}
