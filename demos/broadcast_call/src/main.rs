use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arith_model::{Arith, ArithAddArgs, ArithAddReply, ArithStub};
use courier::*;

/// Echo transport that answers from "every provider": the reply carries the
/// sum, delivered from a thread per sub-invocation.
struct FanoutTransport;

impl Transport for FanoutTransport {
    fn send(&self, _group: &GroupHandle, request: CallRequest, _timeout: Duration, call: ArcCall) {
        thread::spawn(move || {
            let mut args = ArithAddArgs::default();
            if let Err(err) = args.from_slice(request.serialize_type, &request.payload) {
                call.fail(CallError::Remote(err.to_string()));
                return;
            }
            let reply = ArithAddReply { c: args.a + args.b };
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

struct PrintListener;

impl CallListener for PrintListener {
    fn complete(&self, from: &ProviderAddress, reply: Vec<u8>) {
        let reply: CallResult<ArithAddReply> = decode_reply(Ok(reply), SerializeType::Json);
        println!("{} answered: {:?}", from, reply);
    }

    fn failure(&self, from: &ProviderAddress, error: CallError) {
        println!("{} failed: {}", from, error);
    }
}

pub fn main() {
    env_logger::init();

    let proxy = ProxyBuilder::<Arith>::new()
        .connector(Arc::new(StaticConnectionProvider::new()))
        .transport(Arc::new(FanoutTransport))
        .add_provider_address(ProviderAddress::new("127.0.0.1", 8972))
        .add_provider_address(ProviderAddress::new("127.0.0.1", 8973))
        .add_provider_address(ProviderAddress::new("127.0.0.1", 8974))
        .invoke_mode(InvokeMode::Callback)
        .dispatch_mode(DispatchMode::Broadcast)
        .listener(Arc::new(PrintListener))
        .timeout_millis(1_000)
        .build()
        .expect("proxy configuration");
    let arith = ArithStub::new(proxy);

    for a in 1..=3u64 {
        let _ = arith.add(&ArithAddArgs { a, b: 100 });
    }

    // give the transport threads a moment to deliver
    thread::sleep(Duration::from_millis(200));
}
