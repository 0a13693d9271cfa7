pub mod context;
pub mod dispatch;
pub mod hooks;
pub mod invoker;
pub mod provider;
pub mod proxy;

pub use context::*;
pub use dispatch::*;
pub use hooks::*;
pub use invoker::*;
pub use provider::*;
pub use proxy::*;

pub use courier_protocol::*;
