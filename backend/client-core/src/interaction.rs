//! Decrypted interaction records.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// One recorded callback (DNS lookup, HTTP hit, ...) against a bait address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub protocol: String,
    #[serde(rename = "unique-id")]
    pub unique_id: String,
    #[serde(rename = "full-id")]
    pub full_id: String,
    #[serde(rename = "q-type", default, skip_serializing_if = "Option::is_none")]
    pub q_type: Option<String>,
    #[serde(rename = "raw-request", default, skip_serializing_if = "Option::is_none")]
    pub raw_request: Option<String>,
    #[serde(rename = "raw-response", default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(rename = "smtp-from", default, skip_serializing_if = "Option::is_none")]
    pub smtp_from: Option<String>,
    #[serde(rename = "remote-address")]
    pub remote_address: String,
    pub timestamp: String,
}

/// Known protocol tags reported by collaborator servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionProtocol {
    Dns,
    Http,
    Smtp,
    Ldap,
    Ftp,
    Smb,
    Responder,
    Other,
}

impl From<&str> for InteractionProtocol {
    fn from(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "dns" => InteractionProtocol::Dns,
            "http" | "https" => InteractionProtocol::Http,
            "smtp" | "smtps" => InteractionProtocol::Smtp,
            "ldap" => InteractionProtocol::Ldap,
            "ftp" => InteractionProtocol::Ftp,
            "smb" => InteractionProtocol::Smb,
            "responder" => InteractionProtocol::Responder,
            _ => InteractionProtocol::Other,
        }
    }
}

impl Interaction {
    /// Decode one interaction from decrypted plaintext.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn protocol_kind(&self) -> InteractionProtocol {
        InteractionProtocol::from(self.protocol.as_str())
    }

    /// Server timestamp parsed as RFC 3339. `None` if the server sent something else.
    pub fn received_at(&self) -> Option<SystemTime> {
        humantime::parse_rfc3339_weak(&self.timestamp).ok()
    }
}
