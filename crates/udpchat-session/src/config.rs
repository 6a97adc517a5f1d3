use serde::{Deserialize, Serialize};
use udpchat_protocol::MAX_CLIENTS;

/// Configuration for the chat directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Maximum number of concurrently joined users.
    pub max_clients: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            max_clients: MAX_CLIENTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_clients_is_ten() {
        assert_eq!(DirectoryConfig::default().max_clients, 10);
    }

    #[test]
    fn test_deserialize_empty_object_uses_defaults() {
        let cfg: DirectoryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, DirectoryConfig::default());
    }
}
