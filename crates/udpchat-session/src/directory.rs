//! The directory: tracks every joined endpoint and its username.
//!
//! # Concurrency note
//!
//! `Directory` uses plain `HashMap`s. It is owned by the server's receive
//! loop and only ever touched from that one task, so no locking is needed.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::{DirectoryConfig, SessionError};

/// What a successful [`Directory::join`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Joined {
    /// A new entry was created.
    New,
    /// The endpoint was already joined under this username; nothing changed.
    Unchanged,
    /// The endpoint was joined under another name, which was released.
    Renamed {
        /// The username the endpoint held before.
        previous: String,
    },
}

/// The server's live table of chat identities.
///
/// ## Invariants
///
/// - `by_endpoint` and `by_name` always hold exactly the same pairs.
/// - `len() <= config.max_clients`.
#[derive(Debug, Default)]
pub struct Directory {
    /// Endpoint → username.
    by_endpoint: HashMap<SocketAddr, String>,
    /// Username → endpoint. Kept in sync with `by_endpoint`.
    by_name: HashMap<String, SocketAddr>,
    config: DirectoryConfig,
}

impl Directory {
    /// Creates an empty directory.
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            by_endpoint: HashMap::new(),
            by_name: HashMap::new(),
            config,
        }
    }

    /// Associates `endpoint` with `username`.
    ///
    /// Capacity is checked first, for every join: a full directory refuses
    /// even an endpoint that is already in it. Otherwise an endpoint that is
    /// already joined may rejoin. Under the same name nothing changes, under
    /// a new one the entry is renamed.
    ///
    /// # Errors
    /// - [`SessionError::ServerFull`] if the directory holds `max_clients`
    ///   entries.
    /// - [`SessionError::UsernameUnavailable`] if another endpoint holds
    ///   `username`.
    pub fn join(&mut self, endpoint: SocketAddr, username: &str) -> Result<Joined, SessionError> {
        if self.by_endpoint.len() >= self.config.max_clients {
            return Err(SessionError::ServerFull {
                capacity: self.config.max_clients,
            });
        }

        if let Some(&owner) = self.by_name.get(username) {
            if owner == endpoint {
                return Ok(Joined::Unchanged);
            }
            return Err(SessionError::UsernameUnavailable(username.to_string()));
        }

        if let Some(previous) = self.by_endpoint.remove(&endpoint) {
            self.by_name.remove(&previous);
            self.insert(endpoint, username);
            tracing::debug!(%endpoint, %previous, username, "directory entry renamed");
            return Ok(Joined::Renamed { previous });
        }

        self.insert(endpoint, username);
        tracing::debug!(%endpoint, username, clients = self.len(), "directory entry added");
        Ok(Joined::New)
    }

    fn insert(&mut self, endpoint: SocketAddr, username: &str) {
        self.by_endpoint.insert(endpoint, username.to_string());
        self.by_name.insert(username.to_string(), endpoint);
    }

    /// Removes the entry for `endpoint`, returning its username.
    pub fn leave(&mut self, endpoint: &SocketAddr) -> Option<String> {
        let username = self.by_endpoint.remove(endpoint)?;
        self.by_name.remove(&username);
        Some(username)
    }

    /// The username joined from `endpoint`.
    pub fn username(&self, endpoint: &SocketAddr) -> Option<&str> {
        self.by_endpoint.get(endpoint).map(String::as_str)
    }

    /// The endpoint `username` is joined from.
    pub fn endpoint(&self, username: &str) -> Option<SocketAddr> {
        self.by_name.get(username).copied()
    }

    /// All usernames in lexicographic order.
    pub fn usernames_sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of joined endpoints.
    pub fn len(&self) -> usize {
        self.by_endpoint.len()
    }

    /// `true` if nobody is joined.
    pub fn is_empty(&self) -> bool {
        self.by_endpoint.is_empty()
    }

    /// The configured maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.config.max_clients
    }
}

#[cfg(test)]
mod tests {
    //! Naming: `test_{function}_{scenario}_{expected}`.

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn directory() -> Directory {
        Directory::new(DirectoryConfig::default())
    }

    fn directory_with_capacity(max_clients: usize) -> Directory {
        Directory::new(DirectoryConfig { max_clients })
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_new_endpoint_creates_entry() {
        let mut dir = directory();

        assert_eq!(dir.join(addr(1), "alice"), Ok(Joined::New));
        assert_eq!(dir.username(&addr(1)), Some("alice"));
        assert_eq!(dir.endpoint("alice"), Some(addr(1)));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_join_taken_username_returns_unavailable() {
        let mut dir = directory();
        dir.join(addr(1), "alice").unwrap();

        let result = dir.join(addr(2), "alice");

        assert_eq!(
            result,
            Err(SessionError::UsernameUnavailable("alice".to_string()))
        );
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.username(&addr(2)), None);
    }

    #[test]
    fn test_join_at_capacity_returns_server_full() {
        let mut dir = directory();
        for port in 1..=10 {
            dir.join(addr(port), &format!("user{port}")).unwrap();
        }

        let result = dir.join(addr(11), "eleventh");

        assert_eq!(result, Err(SessionError::ServerFull { capacity: 10 }));
        assert_eq!(dir.len(), 10);
    }

    #[test]
    fn test_join_taken_username_at_capacity_returns_server_full() {
        let mut dir = directory();
        for port in 1..=10 {
            dir.join(addr(port), &format!("user{port}")).unwrap();
        }

        let result = dir.join(addr(11), "user1");

        assert_eq!(result, Err(SessionError::ServerFull { capacity: 10 }));
        assert_eq!(dir.endpoint("user1"), Some(addr(1)));
    }

    #[test]
    fn test_join_same_endpoint_same_name_is_unchanged() {
        let mut dir = directory();
        dir.join(addr(1), "alice").unwrap();

        assert_eq!(dir.join(addr(1), "alice"), Ok(Joined::Unchanged));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_join_same_endpoint_new_name_renames_entry() {
        let mut dir = directory();
        dir.join(addr(1), "alice").unwrap();

        let result = dir.join(addr(1), "alicia");

        assert_eq!(
            result,
            Ok(Joined::Renamed {
                previous: "alice".to_string()
            })
        );
        assert_eq!(dir.endpoint("alice"), None, "old name released");
        assert_eq!(dir.endpoint("alicia"), Some(addr(1)));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_join_rejoin_when_full_returns_server_full() {
        let mut dir = directory_with_capacity(1);
        dir.join(addr(1), "alice").unwrap();

        assert_eq!(
            dir.join(addr(1), "alice"),
            Err(SessionError::ServerFull { capacity: 1 })
        );
        assert_eq!(
            dir.join(addr(1), "alicia"),
            Err(SessionError::ServerFull { capacity: 1 })
        );
        assert_eq!(dir.username(&addr(1)), Some("alice"), "entry untouched");
    }

    // =====================================================================
    // leave()
    // =====================================================================

    #[test]
    fn test_leave_joined_endpoint_returns_username() {
        let mut dir = directory();
        dir.join(addr(1), "alice").unwrap();

        assert_eq!(dir.leave(&addr(1)), Some("alice".to_string()));
        assert!(dir.is_empty());
        assert_eq!(dir.endpoint("alice"), None);
    }

    #[test]
    fn test_leave_unknown_endpoint_returns_none() {
        let mut dir = directory();
        assert_eq!(dir.leave(&addr(9)), None);
    }

    #[test]
    fn test_leave_frees_username_for_rejoin() {
        let mut dir = directory();
        dir.join(addr(1), "alice").unwrap();
        dir.leave(&addr(1));

        assert_eq!(dir.join(addr(2), "alice"), Ok(Joined::New));
    }

    #[test]
    fn test_leave_frees_capacity() {
        let mut dir = directory_with_capacity(1);
        dir.join(addr(1), "alice").unwrap();
        dir.leave(&addr(1));

        assert_eq!(dir.join(addr(2), "bob"), Ok(Joined::New));
    }

    // =====================================================================
    // usernames_sorted()
    // =====================================================================

    #[test]
    fn test_usernames_sorted_returns_lexicographic_order() {
        let mut dir = directory();
        dir.join(addr(1), "charlie").unwrap();
        dir.join(addr(2), "alice").unwrap();
        dir.join(addr(3), "bob").unwrap();

        assert_eq!(dir.usernames_sorted(), ["alice", "bob", "charlie"]);
    }

    #[test]
    fn test_usernames_sorted_empty_directory_is_empty() {
        assert!(directory().usernames_sorted().is_empty());
    }

    #[test]
    fn test_capacity_reflects_config() {
        assert_eq!(directory_with_capacity(3).capacity(), 3);
    }
}
