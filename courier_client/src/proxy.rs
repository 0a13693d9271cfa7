use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use courier_protocol::{
    CallParam, CallRequest, CallResult, ConfigError, Metadata, ProviderAddress, SerializeType,
    ServiceIdentity,
};

use crate::dispatch::{DispatchMode, Dispatcher};
use crate::hooks::{CallListener, ConsumerHook};
use crate::invoker::{CallbackInvoker, FutureInvoker, InvokeMode, Invoker, SyncInvoker};
use crate::provider::{ConnectionProvider, Transport};

/// Identity metadata a remote-callable contract declares: group, version and
/// an optional provider name. Read once, at proxy build time.
pub trait ServiceContract {
    const GROUP: &'static str;
    const VERSION: &'static str;
    /// Blank means "use the contract type's own name".
    const NAME: &'static str = "";
}

/// Accumulates proxy configuration field by field; `build` runs every
/// cross-field check at once and wires dispatcher and invoker exactly once.
pub struct ProxyBuilder<C: ServiceContract> {
    provider: Option<Arc<dyn ConnectionProvider>>,
    transport: Option<Arc<dyn Transport>>,
    addresses: Vec<ProviderAddress>,
    invoke_mode: InvokeMode,
    dispatch_mode: DispatchMode,
    timeout_millis: Option<u64>,
    method_timeouts: BTreeMap<String, u64>,
    hooks: Vec<Arc<dyn ConsumerHook>>,
    listener: Option<Arc<dyn CallListener>>,
    serialize_type: SerializeType,
    _contract: PhantomData<C>,
}

impl<C: ServiceContract> Default for ProxyBuilder<C> {
    fn default() -> Self {
        ProxyBuilder {
            provider: None,
            transport: None,
            addresses: Vec::new(),
            invoke_mode: InvokeMode::Sync,
            dispatch_mode: DispatchMode::Round,
            timeout_millis: None,
            method_timeouts: BTreeMap::new(),
            hooks: Vec::new(),
            listener: None,
            serialize_type: SerializeType::Json,
            _contract: PhantomData,
        }
    }
}

impl<C: ServiceContract> ProxyBuilder<C> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the connection provider.
    pub fn connector(mut self, provider: Arc<dyn ConnectionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the transport that carries outbound calls.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Adds one provider address; call repeatedly for more.
    pub fn add_provider_address(mut self, address: ProviderAddress) -> Self {
        self.addresses.push(address);
        self
    }

    /// Blocking, future-based or callback-based completion; default Sync.
    pub fn invoke_mode(mut self, mode: InvokeMode) -> Self {
        self.invoke_mode = mode;
        self
    }

    /// Round or broadcast target selection; default Round.
    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    pub fn timeout_millis(mut self, timeout_millis: u64) -> Self {
        self.timeout_millis = Some(timeout_millis);
        self
    }

    /// Per-method timeout override; wins over the proxy-wide timeout.
    pub fn method_timeout_millis(mut self, method: &str, timeout_millis: u64) -> Self {
        self.method_timeouts.insert(method.to_owned(), timeout_millis);
        self
    }

    pub fn add_hook(mut self, hook: Arc<dyn ConsumerHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Completion listener; only legal together with callback invocation.
    pub fn listener(mut self, listener: Arc<dyn CallListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn serialize_type(mut self, serialize_type: SerializeType) -> Self {
        self.serialize_type = serialize_type;
        self
    }

    /// Validate the whole configuration, register the addresses with the
    /// provider and produce the one proxy this builder is good for. No
    /// network activity happens before validation passes.
    pub fn build(self) -> Result<ServiceProxy<C>, ConfigError> {
        let provider = self.provider.ok_or(ConfigError::MissingProvider)?;
        let transport = self.transport.ok_or(ConfigError::MissingTransport)?;
        if self.addresses.is_empty() {
            return Err(ConfigError::NoAddresses);
        }
        if self.dispatch_mode == DispatchMode::Broadcast && self.invoke_mode != InvokeMode::Callback
        {
            return Err(ConfigError::BroadcastRequiresCallback);
        }
        if self.listener.is_some() && self.invoke_mode != InvokeMode::Callback {
            return Err(ConfigError::ListenerWithoutCallback);
        }
        if self.invoke_mode == InvokeMode::Callback && self.listener.is_none() {
            return Err(ConfigError::MissingListener);
        }
        let service = resolve_identity::<C>()?;

        for address in &self.addresses {
            provider.register_address(&service, address);
        }

        let mut dispatcher = Dispatcher::new(self.dispatch_mode, provider, transport);
        if let Some(timeout_millis) = self.timeout_millis {
            dispatcher.set_timeout_millis(timeout_millis);
        }
        if !self.method_timeouts.is_empty() {
            dispatcher.set_method_timeouts(self.method_timeouts);
        }
        dispatcher.set_hooks(self.hooks);
        if let Some(listener) = self.listener {
            dispatcher.set_listener(listener);
        }
        let dispatcher = Arc::new(dispatcher);

        let invoker = match self.invoke_mode {
            InvokeMode::Sync => Invoker::Sync(SyncInvoker::new(dispatcher)),
            InvokeMode::Future => Invoker::Future(FutureInvoker::new(dispatcher)),
            InvokeMode::Callback => Invoker::Callback(CallbackInvoker::new(dispatcher)),
        };

        Ok(ServiceProxy {
            service,
            serialize_type: self.serialize_type,
            invoker,
            _contract: PhantomData,
        })
    }
}

fn resolve_identity<C: ServiceContract>() -> Result<ServiceIdentity, ConfigError> {
    if C::GROUP.trim().is_empty() {
        return Err(ConfigError::MissingMetadata("group".to_owned()));
    }
    if C::VERSION.trim().is_empty() {
        return Err(ConfigError::MissingMetadata("version".to_owned()));
    }
    let name = if C::NAME.trim().is_empty() {
        simple_type_name::<C>()
    } else {
        C::NAME.to_owned()
    };
    Ok(ServiceIdentity::new(C::GROUP, C::VERSION, &name))
}

fn simple_type_name<C>() -> String {
    std::any::type_name::<C>()
        .rsplit("::")
        .next()
        .unwrap_or("")
        .to_owned()
}

/// Callable proxy bound to one capability contract, one dispatcher and one
/// invoker for its whole lifetime. Shared freely across threads.
pub struct ServiceProxy<C: ServiceContract> {
    service: ServiceIdentity,
    serialize_type: SerializeType,
    invoker: Invoker,
    _contract: PhantomData<C>,
}

impl<C: ServiceContract> ServiceProxy<C> {
    pub fn service(&self) -> &ServiceIdentity {
        &self.service
    }

    pub fn serialize_type(&self) -> SerializeType {
        self.serialize_type
    }

    /// Uniform entry used by generated stubs. Blocking proxies return the
    /// decoded reply; future and callback proxies return `R::default()` at
    /// once, with the real result parked in the invocation context or
    /// delivered to the listener.
    pub fn call<A, R>(&self, method: &str, args: &A) -> CallResult<R>
    where
        A: CallParam,
        R: CallParam + Default,
    {
        self.call_with_metadata(method, Metadata::new(), args)
    }

    pub fn call_with_metadata<A, R>(
        &self,
        method: &str,
        metadata: Metadata,
        args: &A,
    ) -> CallResult<R>
    where
        A: CallParam,
        R: CallParam + Default,
    {
        let payload = args.into_bytes(self.serialize_type)?;
        let request = CallRequest::new(
            self.service.clone(),
            method,
            metadata,
            payload,
            self.serialize_type,
        );
        match self.invoker.invoke(request)? {
            Some(reply_data) => {
                let mut reply: R = Default::default();
                reply.from_slice(self.serialize_type, &reply_data)?;
                Ok(reply)
            }
            None => Ok(Default::default()),
        }
    }
}

/// Declares a capability contract and its typed stub: one struct carrying the
/// identity metadata, one dispatch table forwarding each operation into the
/// proxy by method name.
#[macro_export]
macro_rules! service_contract {
    (
        contract $contract:ident {
            group: $group:expr,
            version: $version:expr,
            name: $name:expr $(,)?
        }
        stub $stub:ident {
            $( fn $method:ident($args:ty) -> $reply:ty; )*
        }
    ) => {
        pub struct $contract;

        impl $crate::ServiceContract for $contract {
            const GROUP: &'static str = $group;
            const VERSION: &'static str = $version;
            const NAME: &'static str = $name;
        }

        $crate::service_contract! {
            @stub $contract, $stub {
                $( fn $method($args) -> $reply; )*
            }
        }
    };
    (
        contract $contract:ident {
            group: $group:expr,
            version: $version:expr $(,)?
        }
        stub $stub:ident {
            $( fn $method:ident($args:ty) -> $reply:ty; )*
        }
    ) => {
        pub struct $contract;

        impl $crate::ServiceContract for $contract {
            const GROUP: &'static str = $group;
            const VERSION: &'static str = $version;
        }

        $crate::service_contract! {
            @stub $contract, $stub {
                $( fn $method($args) -> $reply; )*
            }
        }
    };
    (
        @stub $contract:ident, $stub:ident {
            $( fn $method:ident($args:ty) -> $reply:ty; )*
        }
    ) => {
        pub struct $stub {
            proxy: $crate::ServiceProxy<$contract>,
        }

        impl $stub {
            pub fn new(proxy: $crate::ServiceProxy<$contract>) -> Self {
                $stub { proxy }
            }

            pub fn proxy(&self) -> &$crate::ServiceProxy<$contract> {
                &self.proxy
            }

            $(
                pub fn $method(&self, args: &$args) -> $crate::CallResult<$reply> {
                    self.proxy.call(stringify!($method), args)
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Arith;

    impl ServiceContract for Arith {
        const GROUP: &'static str = "test";
        const VERSION: &'static str = "1.0.0";
    }

    struct Named;

    impl ServiceContract for Named {
        const GROUP: &'static str = "test";
        const VERSION: &'static str = "1.0.0";
        const NAME: &'static str = "CustomName";
    }

    struct Blank;

    impl ServiceContract for Blank {
        const GROUP: &'static str = "";
        const VERSION: &'static str = "1.0.0";
    }

    #[test]
    fn blank_name_falls_back_to_type_name() {
        let id = resolve_identity::<Arith>().unwrap();
        assert_eq!(ServiceIdentity::new("test", "1.0.0", "Arith"), id);
    }

    #[test]
    fn declared_name_wins() {
        let id = resolve_identity::<Named>().unwrap();
        assert_eq!("CustomName", id.name);
    }

    #[test]
    fn blank_group_is_rejected() {
        assert_eq!(
            Err(ConfigError::MissingMetadata("group".to_owned())),
            resolve_identity::<Blank>()
        );
    }

    #[test]
    fn build_without_connector_fails() {
        let result = ProxyBuilder::<Arith>::new().build();
        assert_eq!(Err(ConfigError::MissingProvider), result.map(|_| ()));
    }
}
