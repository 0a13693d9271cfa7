use std::sync::Arc;

use strum_macros::{Display, EnumIter, EnumString};

use courier_protocol::{CallError, CallFuture, CallOutcome, CallRequest, CallResult};

use crate::context;
use crate::dispatch::Dispatcher;

#[derive(Debug, Copy, Clone, Display, PartialEq, EnumIter, EnumString)]
pub enum InvokeMode {
    //Sync blocks the calling thread until the reply or the resolved timeout
    Sync = 0,
    //Future returns at once; the pending reply parks in the invocation context
    Future = 1,
    //Callback returns at once; the listener hears every (sub-)result
    Callback = 2,
}

/// Completion strategy bound to a proxy at build time.
pub enum Invoker {
    Sync(SyncInvoker),
    Future(FutureInvoker),
    Callback(CallbackInvoker),
}

impl Invoker {
    /// Route one call. `Some(payload)` only in blocking mode; the deferred
    /// modes hand the result over via the context slot or the listener.
    pub fn invoke(&self, request: CallRequest) -> CallResult<Option<Vec<u8>>> {
        match self {
            Invoker::Sync(invoker) => invoker.invoke(request).map(Some),
            Invoker::Future(invoker) => {
                invoker.invoke(request)?;
                Ok(None)
            }
            Invoker::Callback(invoker) => {
                invoker.invoke(request)?;
                Ok(None)
            }
        }
    }
}

/// Blocks the calling thread for the round trip, up to the resolved timeout.
pub struct SyncInvoker {
    dispatcher: Arc<Dispatcher>,
}

impl SyncInvoker {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        SyncInvoker { dispatcher }
    }

    pub fn invoke(&self, request: CallRequest) -> CallOutcome {
        let timeout = self.dispatcher.timeout_for(&request.method);
        let calls = self.dispatcher.dispatch(&request)?;
        let call = calls
            .into_iter()
            .next()
            .ok_or_else(|| CallError::Channel("dispatch produced no call".to_owned()))?;
        call.wait(timeout)
    }
}

/// Returns immediately; the pending call is handed back and parked in the
/// calling thread's context slot.
pub struct FutureInvoker {
    dispatcher: Arc<Dispatcher>,
}

impl FutureInvoker {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        FutureInvoker { dispatcher }
    }

    pub fn invoke(&self, request: CallRequest) -> CallResult<CallFuture> {
        let calls = self.dispatcher.dispatch(&request)?;
        let call = calls
            .into_iter()
            .next()
            .ok_or_else(|| CallError::Channel("dispatch produced no call".to_owned()))?;
        let future = CallFuture::new(call);
        context::set_pending(future.clone());
        Ok(future)
    }
}

/// Returns immediately; completions reach the dispatcher's listener on a
/// transport thread, one per targeted provider.
pub struct CallbackInvoker {
    dispatcher: Arc<Dispatcher>,
}

impl CallbackInvoker {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        CallbackInvoker { dispatcher }
    }

    pub fn invoke(&self, request: CallRequest) -> CallResult<()> {
        self.dispatcher.dispatch(&request)?;
        Ok(())
    }
}
