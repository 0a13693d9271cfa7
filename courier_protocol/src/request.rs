use std::collections::HashMap;
use std::fmt;

use strum_macros::{Display, EnumIter, EnumString};

/// Per-call key/value pairs carried to the provider untouched.
pub type Metadata = HashMap<String, String>;

/// Argument/reply encodings understood by `CallParam` implementations.
#[derive(Debug, Copy, Clone, Display, PartialEq, EnumIter, EnumString)]
pub enum SerializeType {
    Json = 0,
    MsgPack = 1,
}

/// Identity triple naming one logical remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    pub group: String,
    pub version: String,
    pub name: String,
}

impl ServiceIdentity {
    pub fn new(group: &str, version: &str, name: &str) -> Self {
        ServiceIdentity {
            group: group.to_owned(),
            version: version.to_owned(),
            name: name.to_owned(),
        }
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.group, self.name, self.version)
    }
}

/// Symbolic provider endpoint. Resolution to live connections is the
/// connection provider's job, never this crate's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderAddress {
    pub host: String,
    pub port: u16,
}

impl ProviderAddress {
    pub fn new(host: &str, port: u16) -> Self {
        ProviderAddress {
            host: host.to_owned(),
            port,
        }
    }
}

impl fmt::Display for ProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Outbound call descriptor handed to the transport.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub service: ServiceIdentity,
    pub method: String,
    pub metadata: Metadata,
    pub payload: Vec<u8>,
    pub serialize_type: SerializeType,
}

impl CallRequest {
    pub fn new(
        service: ServiceIdentity,
        method: &str,
        metadata: Metadata,
        payload: Vec<u8>,
        serialize_type: SerializeType,
    ) -> Self {
        CallRequest {
            service,
            method: method.to_owned(),
            metadata,
            payload,
            serialize_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn identity_display() {
        let id = ServiceIdentity::new("test", "1.0.0", "Arith");
        assert_eq!("test/Arith:1.0.0", id.to_string());
    }

    #[test]
    fn address_display() {
        let addr = ProviderAddress::new("127.0.0.1", 8972);
        assert_eq!("127.0.0.1:8972", addr.to_string());
    }

    #[test]
    fn serialize_type_from_str() {
        assert_eq!(SerializeType::Json, SerializeType::from_str("Json").unwrap());
        assert_eq!(
            SerializeType::MsgPack,
            SerializeType::from_str("MsgPack").unwrap()
        );
    }
}
