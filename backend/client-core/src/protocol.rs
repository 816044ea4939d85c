//! Wire shapes exchanged with the collaborator server.

use serde::{Deserialize, Serialize};

pub const REGISTER_ENDPOINT: &str = "register";
pub const POLL_ENDPOINT: &str = "poll";
pub const DEREGISTER_ENDPOINT: &str = "deregister";

pub const POLL_ID_PARAM: &str = "id";
pub const POLL_SECRET_PARAM: &str = "secret";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    #[serde(rename = "public-key")]
    pub public_key: String,
    #[serde(rename = "secret-key")]
    pub secret_key: String,
    #[serde(rename = "correlation-id")]
    pub correlation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeregisterRequest {
    #[serde(rename = "correlationID")]
    pub correlation_id: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
}

/// Poll envelope: encrypted items sharing one wrapped key, plus optional
/// plaintext batches some servers attach.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollResponse {
    #[serde(default)]
    pub data: Option<Vec<String>>,
    #[serde(default)]
    pub aes_key: String,
    #[serde(default)]
    pub extra: Option<Vec<String>>,
    #[serde(default)]
    pub tld_data: Option<Vec<String>>,
}

impl PollResponse {
    pub fn encrypted_items(&self) -> &[String] {
        self.data.as_deref().unwrap_or_default()
    }

    /// `extra` followed by `tld_data`, in server order.
    pub fn plaintext_items(&self) -> impl Iterator<Item = &String> {
        self.extra
            .iter()
            .flatten()
            .chain(self.tld_data.iter().flatten())
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted_items().is_empty() && self.plaintext_items().next().is_none()
    }
}
