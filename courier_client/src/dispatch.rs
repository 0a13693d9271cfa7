use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use strum_macros::{Display, EnumIter, EnumString};

use courier_protocol::{ArcCall, Call, CallError, CallRequest, CallResult};

use crate::hooks::{CallListener, ConsumerHook, InvocationRecord};
use crate::provider::{ConnectionProvider, GroupHandle, Transport};

/// Applied when neither the builder nor a per-method override set a timeout.
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 3_000;

#[derive(Debug, Copy, Clone, Display, PartialEq, EnumIter, EnumString)]
pub enum DispatchMode {
    //Round selects one healthy provider per call, in cyclic order
    Round = 0,
    //Broadcast fans the call out to every healthy provider
    Broadcast = 1,
}

/// Picks target connection group(s) for one logical call and owns the
/// per-call policy: timeouts, hooks, optional listener. One dispatcher serves
/// exactly one proxy, hence one service identity.
pub struct Dispatcher {
    mode: DispatchMode,
    provider: Arc<dyn ConnectionProvider>,
    transport: Arc<dyn Transport>,
    timeout_millis: u64,
    method_timeouts: BTreeMap<String, u64>,
    hooks: Vec<Arc<dyn ConsumerHook>>,
    listener: Option<Arc<dyn CallListener>>,
    cursor: AtomicUsize,
}

impl Dispatcher {
    pub fn new(
        mode: DispatchMode,
        provider: Arc<dyn ConnectionProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Dispatcher {
            mode,
            provider,
            transport,
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            method_timeouts: BTreeMap::new(),
            hooks: Vec::new(),
            listener: None,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn set_timeout_millis(&mut self, timeout_millis: u64) {
        self.timeout_millis = timeout_millis;
    }

    pub fn set_method_timeouts(&mut self, method_timeouts: BTreeMap<String, u64>) {
        self.method_timeouts = method_timeouts;
    }

    pub fn set_hooks(&mut self, hooks: Vec<Arc<dyn ConsumerHook>>) {
        self.hooks = hooks;
    }

    pub fn set_listener(&mut self, listener: Arc<dyn CallListener>) {
        self.listener = Some(listener);
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Per-method override, then the configured default, then the built-in.
    pub fn timeout_for(&self, method: &str) -> Duration {
        let millis = self
            .method_timeouts
            .get(method)
            .copied()
            .unwrap_or(self.timeout_millis);
        Duration::from_millis(millis)
    }

    /// Select target group(s) and hand one sub-invocation per target to the
    /// transport. Fails before any send when no provider is healthy.
    pub fn dispatch(&self, request: &CallRequest) -> CallResult<Vec<ArcCall>> {
        let groups: Vec<GroupHandle> = self
            .provider
            .connection_groups(&request.service)
            .into_iter()
            .filter(|g| g.is_available())
            .collect();
        if groups.is_empty() {
            return Err(CallError::NoProviderAvailable(request.service.to_string()));
        }

        let targets = match self.mode {
            DispatchMode::Round => {
                let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % groups.len();
                vec![groups[idx].clone()]
            }
            DispatchMode::Broadcast => groups,
        };

        let timeout = self.timeout_for(&request.method);
        let mut calls = Vec::with_capacity(targets.len());
        for group in targets {
            calls.push(self.submit(group, request.clone(), timeout));
        }
        Ok(calls)
    }

    fn submit(&self, group: GroupHandle, request: CallRequest, timeout: Duration) -> ArcCall {
        let record = InvocationRecord::new(&request, group.address().clone());

        for hook in &self.hooks {
            if let Err(err) = hook.before(&record, &request) {
                warn!("hook failed before {}: {}", record, err);
            }
        }

        let call = Arc::new(Call::new(timeout));
        for hook in &self.hooks {
            let hook = hook.clone();
            let record = record.clone();
            call.on_settled(Box::new(move |outcome| {
                if let Err(err) = hook.after(&record, outcome) {
                    warn!("hook failed after {}: {}", record, err);
                }
            }));
        }
        if let Some(listener) = &self.listener {
            let listener = listener.clone();
            let address = group.address().clone();
            call.on_settled(Box::new(move |outcome| match outcome {
                Ok(payload) => listener.complete(&address, payload.clone()),
                Err(err) => listener.failure(&address, err.clone()),
            }));
        }

        debug!("dispatching {}", record);
        self.transport.send(&group, request, timeout, call.clone());
        call
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_protocol::{Metadata, ProviderAddress, SerializeType, ServiceIdentity};

    use crate::provider::StaticConnectionProvider;

    struct NullTransport;

    impl Transport for NullTransport {
        fn send(&self, _: &GroupHandle, _: CallRequest, _: Duration, _: ArcCall) {}
    }

    fn dispatcher(mode: DispatchMode) -> Dispatcher {
        Dispatcher::new(
            mode,
            Arc::new(StaticConnectionProvider::new()),
            Arc::new(NullTransport),
        )
    }

    fn request(method: &str) -> CallRequest {
        CallRequest::new(
            ServiceIdentity::new("test", "1.0.0", "Arith"),
            method,
            Metadata::new(),
            Vec::new(),
            SerializeType::Json,
        )
    }

    #[test]
    fn timeout_resolution_order() {
        let mut d = dispatcher(DispatchMode::Round);
        assert_eq!(
            Duration::from_millis(DEFAULT_TIMEOUT_MILLIS),
            d.timeout_for("hello")
        );

        d.set_timeout_millis(5_000);
        assert_eq!(Duration::from_millis(5_000), d.timeout_for("hello"));

        let mut overrides = BTreeMap::new();
        overrides.insert("hello".to_owned(), 50);
        d.set_method_timeouts(overrides);
        assert_eq!(Duration::from_millis(50), d.timeout_for("hello"));
        assert_eq!(Duration::from_millis(5_000), d.timeout_for("other"));
    }

    #[test]
    fn dispatch_without_providers_fails() {
        let d = dispatcher(DispatchMode::Round);
        match d.dispatch(&request("hello")) {
            Err(CallError::NoProviderAvailable(service)) => {
                assert_eq!("test/Arith:1.0.0", service)
            }
            other => panic!("expected NoProviderAvailable, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn round_skips_unavailable_groups() {
        let provider = Arc::new(StaticConnectionProvider::new());
        let service = ServiceIdentity::new("test", "1.0.0", "Arith");
        let down = ProviderAddress::new("10.0.0.1", 1);
        let up = ProviderAddress::new("10.0.0.1", 2);
        provider.register_address(&service, &down);
        provider.register_address(&service, &up);
        provider.set_available(&service, &down, false);

        let d = Dispatcher::new(DispatchMode::Round, provider, Arc::new(NullTransport));
        for _ in 0..4 {
            let calls = d.dispatch(&request("hello")).unwrap();
            assert_eq!(1, calls.len());
        }
    }

    #[test]
    fn broadcast_targets_every_available_group() {
        let provider = Arc::new(StaticConnectionProvider::new());
        let service = ServiceIdentity::new("test", "1.0.0", "Arith");
        for port in &[1u16, 2, 3] {
            provider.register_address(&service, &ProviderAddress::new("10.0.0.1", *port));
        }

        let d = Dispatcher::new(DispatchMode::Broadcast, provider, Arc::new(NullTransport));
        let calls = d.dispatch(&request("hello")).unwrap();
        assert_eq!(3, calls.len());
    }
}
