use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arith_model::{Arith, ArithAddArgs, ArithAddReply, ArithStub};
use courier::*;

/// In-process stand-in for the wire transport: computes the reply on its own
/// thread, the way an I/O thread would deliver it.
struct ArithTransport;

impl Transport for ArithTransport {
    fn send(&self, _group: &GroupHandle, request: CallRequest, _timeout: Duration, call: ArcCall) {
        thread::spawn(move || {
            let mut args = ArithAddArgs::default();
            if let Err(err) = args.from_slice(request.serialize_type, &request.payload) {
                call.fail(CallError::Remote(err.to_string()));
                return;
            }
            let reply = match request.method.as_str() {
                "add" => ArithAddReply { c: args.a + args.b },
                "mul" => ArithAddReply { c: args.a * args.b },
                other => {
                    call.fail(CallError::Remote(format!("unknown method {}", other)));
                    return;
                }
            };
            match reply.into_bytes(request.serialize_type) {
                Ok(payload) => {
                    call.complete(payload);
                }
                Err(err) => {
                    call.fail(CallError::Remote(err.to_string()));
                }
            }
        });
    }
}

pub fn main() {
    env_logger::init();

    let provider = Arc::new(StaticConnectionProvider::new());

    let proxy = ProxyBuilder::<Arith>::new()
        .connector(provider.clone())
        .transport(Arc::new(ArithTransport))
        .add_provider_address(ProviderAddress::new("127.0.0.1", 8972))
        .add_provider_address(ProviderAddress::new("127.0.0.1", 8973))
        .add_hook(Arc::new(LoggingHook))
        .timeout_millis(1_000)
        .build()
        .expect("proxy configuration");
    let arith = ArithStub::new(proxy);

    for a in 1..=5u64 {
        match arith.mul(&ArithAddArgs { a, b: 10 }) {
            Ok(reply) => println!("received: {:?}", reply),
            Err(err) => println!("received err:{}", err),
        }
    }

    // same service, future-mode: the call returns at once and the reply is
    // consumed from the invocation context
    let deferred = ProxyBuilder::<Arith>::new()
        .connector(provider)
        .transport(Arc::new(ArithTransport))
        .add_provider_address(ProviderAddress::new("127.0.0.1", 8972))
        .invoke_mode(InvokeMode::Future)
        .timeout_millis(1_000)
        .build()
        .expect("proxy configuration");
    let arith = ArithStub::new(deferred);

    let _ = arith.add(&ArithAddArgs { a: 20, b: 22 });
    if let Some(future) = take_pending() {
        let reply: CallResult<ArithAddReply> = decode_reply(future.wait(), SerializeType::Json);
        println!("deferred: {:?}", reply);
    }
}
