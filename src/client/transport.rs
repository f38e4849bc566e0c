//! Service transport selection for clients.
//!
//! A client without TLS material gets a plain transport built from its
//! address alone. With a key/certificate pair the TLS constructor receives five
//! positional slots: address, root CA, client key, client certificate and
//! server-name override. Server trust is assumed to be provisioned already, so
//! the root CA and server-name slots stay empty.

use serde::Serialize;
use std::fmt;

/// Transport a client connects through; nothing is dialed at assembly time
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceClient {
    Plain {
        address: String,
    },
    Tls {
        address: String,
        root_ca: Option<String>,
        #[serde(skip_serializing)]
        client_key: String,
        client_cert: String,
        server_name: Option<String>,
    },
}

impl ServiceClient {
    pub fn plain(address: impl Into<String>) -> Self {
        Self::Plain {
            address: address.into(),
        }
    }

    pub fn tls(
        address: impl Into<String>,
        client_key: impl Into<String>,
        client_cert: impl Into<String>,
    ) -> Self {
        Self::Tls {
            address: address.into(),
            root_ca: None,
            client_key: client_key.into(),
            client_cert: client_cert.into(),
            server_name: None,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Self::Plain { address } | Self::Tls { address, .. } => address,
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }

    /// Positional constructor arguments, unset slots as `None`
    pub fn constructor_slots(&self) -> Vec<Option<&str>> {
        match self {
            Self::Plain { address } => vec![Some(address.as_str())],
            Self::Tls {
                address,
                root_ca,
                client_key,
                client_cert,
                server_name,
            } => vec![
                Some(address.as_str()),
                root_ca.as_deref(),
                Some(client_key.as_str()),
                Some(client_cert.as_str()),
                server_name.as_deref(),
            ],
        }
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain { address } => f.debug_struct("Plain").field("address", address).finish(),
            Self::Tls {
                address,
                root_ca,
                client_cert,
                server_name,
                ..
            } => f
                .debug_struct("Tls")
                .field("address", address)
                .field("root_ca", root_ca)
                .field("client_key", &"[MASKED]")
                .field("client_cert", client_cert)
                .field("server_name", server_name)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_counts() {
        let plain = ServiceClient::plain("localhost:7233");
        assert_eq!(plain.constructor_slots(), vec![Some("localhost:7233")]);

        let tls = ServiceClient::tls("cloud:7233", "key.pem", "cert.pem");
        assert_eq!(
            tls.constructor_slots(),
            vec![Some("cloud:7233"), None, Some("key.pem"), Some("cert.pem"), None]
        );
        assert!(tls.is_tls());
        assert_eq!(tls.address(), "cloud:7233");
    }

    #[test]
    fn test_debug_masks_key() {
        let tls = ServiceClient::tls("cloud:7233", "very-secret", "cert.pem");
        let rendered = format!("{tls:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("[MASKED]"));
    }
}
