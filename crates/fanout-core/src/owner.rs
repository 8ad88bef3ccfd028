//! Owner (account identity) types.

use crate::{CoreError, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An account identity on whose behalf actions are performed.
///
/// Immutable for the duration of a run. The core references owners by
/// id; the capability handle is only ever handed to the action
/// executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    /// Unique owner identifier.
    pub id: OwnerId,

    /// Human-readable display name.
    pub display_name: String,

    /// Credentials and network egress used to perform actions.
    pub capability: Capability,
}

impl Owner {
    /// Create a new Owner.
    pub fn new(id: impl Into<OwnerId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            capability: Capability::default(),
        }
    }

    /// Builder method to set the capability handle.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }
}

/// Validate a loaded owner list: non-empty, no blank ids, no
/// duplicates.
pub fn validate_owners(owners: &[Owner]) -> Result<(), CoreError> {
    if owners.is_empty() {
        return Err(CoreError::InsufficientOwners { needed: 1, have: 0 });
    }
    let mut seen = HashSet::new();
    for owner in owners {
        if owner.id.as_str().is_empty() {
            return Err(CoreError::InvalidInput("owner with empty id".to_string()));
        }
        if !seen.insert(&owner.id) {
            return Err(CoreError::InvalidInput(format!(
                "duplicate owner id: {}",
                owner.id
            )));
        }
    }
    Ok(())
}

/// Opaque capability handle: credentials plus the egress point used for
/// this owner's remote calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Authentication secret for the remote service.
    pub secret: String,

    /// User agent string presented on requests.
    pub user_agent: String,

    /// Optional dedicated egress proxy.
    pub proxy: Option<ProxyEndpoint>,
}

impl Capability {
    /// Create a new capability with a secret and user agent.
    pub fn new(secret: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            user_agent: user_agent.into(),
            proxy: None,
        }
    }

    /// Builder method to set the egress proxy.
    pub fn with_proxy(mut self, proxy: ProxyEndpoint) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

/// A proxy egress point, `host:port` with optional credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyEndpoint {
    /// Parse a `host:port[:user:password]` string, the format used by
    /// account sources.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        let host = parts.next()?.to_string();
        let port = parts.next()?.parse().ok()?;
        let username = parts.next().map(str::to_owned);
        let password = parts.next().map(str::to_owned);
        if host.is_empty() {
            return None;
        }
        Some(Self {
            host,
            port,
            username,
            password,
        })
    }
}
