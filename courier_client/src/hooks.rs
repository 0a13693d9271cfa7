use std::fmt;
use std::time::{Duration, Instant};

use courier_protocol::{
    CallError, CallOutcome, CallRequest, HookError, ProviderAddress, ServiceIdentity,
};

/// Snapshot of one (sub-)invocation, created at dispatch time and handed to
/// hooks on both sides of the call.
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub service: ServiceIdentity,
    pub method: String,
    pub address: ProviderAddress,
    pub started_at: Instant,
}

impl InvocationRecord {
    pub fn new(request: &CallRequest, address: ProviderAddress) -> Self {
        InvocationRecord {
            service: request.service.clone(),
            method: request.method.clone(),
            address,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl fmt::Display for InvocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}@{}", self.service, self.method, self.address)
    }
}

/// Instrumentation callback around each (sub-)invocation. An `Err` from
/// either side is logged and swallowed; hooks never steer the call.
pub trait ConsumerHook: Send + Sync {
    fn before(&self, record: &InvocationRecord, request: &CallRequest) -> Result<(), HookError>;
    fn after(&self, record: &InvocationRecord, outcome: &CallOutcome) -> Result<(), HookError>;
}

/// Hook that logs each (sub-)invocation and its outcome.
pub struct LoggingHook;

impl ConsumerHook for LoggingHook {
    fn before(&self, record: &InvocationRecord, _request: &CallRequest) -> Result<(), HookError> {
        log::debug!("calling {}", record);
        Ok(())
    }

    fn after(&self, record: &InvocationRecord, outcome: &CallOutcome) -> Result<(), HookError> {
        match outcome {
            Ok(_) => log::debug!("{} completed in {:?}", record, record.elapsed()),
            Err(err) => log::debug!("{} failed in {:?}: {}", record, record.elapsed(), err),
        }
        Ok(())
    }
}

/// Receives callback-mode completions. Runs on a transport-owned thread,
/// never on the thread that issued the call; under broadcast dispatch it
/// hears one notification per targeted provider.
pub trait CallListener: Send + Sync {
    fn complete(&self, from: &ProviderAddress, reply: Vec<u8>);
    fn failure(&self, from: &ProviderAddress, error: CallError);
}
