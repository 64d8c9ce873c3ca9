use anyhow::{Context, Result};
use keyring::Entry;

use super::store::TokenStore;

const SERVICE_NAME: &str = "dailypictrack";

/// Keychain account under which the session token is kept
const TOKEN_ACCOUNT: &str = "session-token";

/// Keeps the session token in the OS keychain.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a different keychain service name (separate profiles, tests)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, TOKEN_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn get(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn remove(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Needs a real OS keychain (login keychain, Credential Manager or the
    // kernel keyring); CI containers usually have none.
    #[test]
    #[ignore]
    fn test_keychain_round_trip() {
        let store = KeyringTokenStore::with_service("dailypictrack-test");
        store.remove().unwrap();

        store.set("tok-123").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("tok-123"));

        store.set("tok-456").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("tok-456"));

        store.remove().unwrap();
        assert_eq!(store.get().unwrap(), None);
        // Removing again is not an error
        store.remove().unwrap();
    }
}
