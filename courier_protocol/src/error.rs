use thiserror::Error;

/// Result type for everything that happens after a proxy has been built.
pub type CallResult<T> = std::result::Result<T, CallError>;

/// Invalid proxy configuration, detected before any network activity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("connection provider is required")]
    MissingProvider,
    #[error("transport is required")]
    MissingTransport,
    #[error("at least one provider address is required")]
    NoAddresses,
    #[error("broadcast dispatch only supports callback invocation")]
    BroadcastRequiresCallback,
    #[error("a listener requires callback invocation")]
    ListenerWithoutCallback,
    #[error("callback invocation requires a listener")]
    MissingListener,
    #[error("service metadata is incomplete: {0} is blank")]
    MissingMetadata(String),
}

/// Failure of a single (sub-)invocation. Timeouts are a distinct kind so
/// callers can apply different recovery policy than for remote errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("no provider available for {0}")]
    NoProviderAvailable(String),
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("call timed out after {0}ms")]
    Timeout(u64),
    #[error("channel failure: {0}")]
    Channel(String),
    #[error("codec error: {0}")]
    Codec(String),
}

/// Raised by a consumer hook. The dispatcher logs it and moves on; it never
/// alters the outcome of the invocation it decorated.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct HookError(pub String);

impl From<String> for HookError {
    fn from(msg: String) -> Self {
        HookError(msg)
    }
}

impl From<&str> for HookError {
    fn from(msg: &str) -> Self {
        HookError(msg.to_owned())
    }
}
