use std::fmt;

use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientFingerprintError {
    #[error("missing client attribute: {0}")]
    MissingAttribute(&'static str),
}

/// Client attributes captured when a refresh session is issued.
///
/// The triple is compared again on every rotation. A presented fingerprint is
/// accepted when **any one** attribute matches the stored value, so a client
/// whose IP changes (mobile networks, VPN hops) keeps its session. This is a
/// weak binding: an attacker who replays a stolen token with the victim's
/// user agent passes the check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredFingerprint")]
pub struct ClientFingerprint {
    user_agent: String,
    fingerprint_id: String,
    ip: String,
}

impl ClientFingerprint {
    /// All three attributes are required and must be non-blank.
    pub fn new(
        user_agent: impl Into<String>,
        fingerprint_id: impl Into<String>,
        ip: impl Into<String>,
    ) -> Result<Self, ClientFingerprintError> {
        let user_agent = user_agent.into();
        let fingerprint_id = fingerprint_id.into();
        let ip = ip.into();

        if user_agent.trim().is_empty() {
            return Err(ClientFingerprintError::MissingAttribute("user agent"));
        }
        if fingerprint_id.trim().is_empty() {
            return Err(ClientFingerprintError::MissingAttribute("fingerprint"));
        }
        if ip.trim().is_empty() {
            return Err(ClientFingerprintError::MissingAttribute("ip"));
        }

        Ok(Self {
            user_agent,
            fingerprint_id,
            ip,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn fingerprint_id(&self) -> &str {
        &self.fingerprint_id
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// True when at least one attribute equals the corresponding attribute of
    /// `presented`. Every attribute is compared so timing does not reveal
    /// which one matched.
    pub fn shares_any_attribute(&self, presented: &ClientFingerprint) -> bool {
        let ip = secure_eq(&self.ip, &presented.ip);
        let user_agent = secure_eq(&self.user_agent, &presented.user_agent);
        let fingerprint = secure_eq(&self.fingerprint_id, &presented.fingerprint_id);
        ip | user_agent | fingerprint
    }
}

#[derive(Deserialize)]
struct StoredFingerprint {
    user_agent: String,
    fingerprint_id: String,
    ip: String,
}

impl TryFrom<StoredFingerprint> for ClientFingerprint {
    type Error = ClientFingerprintError;

    fn try_from(stored: StoredFingerprint) -> Result<Self, Self::Error> {
        Self::new(stored.user_agent, stored.fingerprint_id, stored.ip)
    }
}

fn secure_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && constant_time_eq(a.as_bytes(), b.as_bytes())
}

impl fmt::Display for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ip, self.user_agent)
    }
}
