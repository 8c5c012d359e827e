use serde::{Deserialize, Serialize};

pub const ENDPOINT_ID_VAR: &str = "MQLITE_ENDPOINT_ID";
pub const LOCATOR_VAR: &str = "MQLITE_LOCATOR";

/// Identity of one endpoint on the messaging fabric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Name other endpoints look this one up by. Requests are served on
    /// `<endpoint_id>-request`.
    pub endpoint_id: String,
    /// Transport locator advertised as the owner of every handle this
    /// endpoint issues.
    pub locator: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            endpoint_id: "server".to_string(),
            locator: "memory://localhost".to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn new(endpoint_id: impl Into<String>) -> Self {
        EndpointConfig {
            endpoint_id: endpoint_id.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint_id(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = endpoint_id.into();
        self
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = locator.into();
        self
    }

    /// Defaults overridden by `MQLITE_ENDPOINT_ID` and `MQLITE_LOCATOR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        EndpointConfig {
            endpoint_id: lookup(ENDPOINT_ID_VAR)
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.endpoint_id),
            locator: lookup(LOCATOR_VAR)
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.locator),
        }
    }

    pub fn request_queue(&self) -> String {
        mqlite_client::request_queue(&self.endpoint_id)
    }
}
