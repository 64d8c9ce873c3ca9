//! Session inspection: reading identity and liveness out of the stored token.
//!
//! # Trust model
//!
//! Tokens are decoded locally **without verifying their signature**. The
//! server is the only authority on whether a token is genuine; the client
//! reads claims purely for display and for an optimistic expiry check. A
//! tampered but well-formed token will pass `is_authenticated`, and the first
//! privileged request will come back 401, which `ApiClient` turns into a
//! session teardown. Do not add a local signature check here: the client has
//! no key to check against.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::store::TokenStore;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// User id. Backends disagree on the claim name and on string vs number,
    /// and some send more than one; `user_id` picks between them.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(
        default,
        rename = "_id",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub object_id: Option<String>,
    #[serde(
        default,
        rename = "userId",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub user_ref: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiry, seconds since the epoch
    #[serde(default, deserialize_with = "numeric_timestamp")]
    pub exp: Option<i64>,
    #[serde(default, deserialize_with = "numeric_timestamp")]
    pub iat: Option<i64>,
    /// Any claims not modelled above
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Identity {
    /// Best available label for the user
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .or(self.sub.as_deref())
            .unwrap_or("User")
    }

    /// The user id: `id`, then `_id`, then `userId`, then the subject claim
    pub fn user_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.object_id.as_deref())
            .or(self.user_ref.as_deref())
            .or(self.sub.as_deref())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// True only when `exp` is present and strictly after `now`.
    /// No clock-skew allowance is applied.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.map(|exp| exp > now.timestamp()).unwrap_or(false)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn numeric_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(number.and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64))))
}

/// Decode the claims of `token` without checking its signature.
pub fn decode_claims(token: &str) -> Option<Identity> {
    match jsonwebtoken::dangerous::insecure_decode::<Identity>(token) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!(error = %e, "Session token could not be decoded");
            None
        }
    }
}

/// Session validity as observed through the token store.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No credential stored
    Unauthenticated,
    /// A decodable credential with `exp` in the future
    Authenticated(Identity),
    /// The credential was expired or undecodable and has been evicted
    Expired,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Reads the shared credential and judges whether the session is usable.
///
/// Decode failures never surface to callers: the credential is evicted and
/// the session reads as signed out.
#[derive(Clone)]
pub struct SessionInspector {
    store: Arc<dyn TokenStore>,
}

impl SessionInspector {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Stored token, treating a storage failure as "no token".
    fn stored_token(&self) -> Option<String> {
        match self.store.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read session token");
                None
            }
        }
    }

    fn evict(&self, reason: &str) {
        debug!(reason, "Evicting session token");
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove session token");
        }
    }

    /// Current session state, evicting the credential if it is expired or
    /// malformed.
    pub fn state(&self) -> SessionState {
        self.state_at(Utc::now())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        let Some(token) = self.stored_token() else {
            return SessionState::Unauthenticated;
        };

        match decode_claims(&token) {
            Some(identity) if identity.is_live_at(now) => SessionState::Authenticated(identity),
            Some(_) => {
                self.evict("expired");
                SessionState::Expired
            }
            None => {
                self.evict("malformed");
                SessionState::Expired
            }
        }
    }

    /// Whether a stored credential exists and has not expired
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Claims of the stored credential, whether or not it has expired.
    /// A malformed credential is evicted and reads as `None`.
    pub fn current_user(&self) -> Option<Identity> {
        let token = self.stored_token()?;
        let identity = decode_claims(&token);
        if identity.is_none() {
            self.evict("malformed");
        }
        identity
    }

    /// Store a freshly issued token and return the identity it carries.
    pub fn login(&self, token: &str) -> Result<Option<Identity>> {
        self.store.set(token)?;
        Ok(self.current_user())
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove()
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    /// Build an unsigned JWT with the given JSON payload
    pub fn jwt(claims: &str) -> String {
        let header = r#"{"alg":"HS256","typ":"JWT"}"#;
        format!(
            "{}.{}.fake_signature",
            URL_SAFE_NO_PAD.encode(header.as_bytes()),
            URL_SAFE_NO_PAD.encode(claims.as_bytes())
        )
    }

    pub fn jwt_expiring_in(seconds: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + seconds;
        jwt(&format!(
            r#"{{"id":"u-1","name":"Ada","email":"ada@example.com","exp":{},"iat":1700000000}}"#,
            exp
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::test_tokens::{jwt, jwt_expiring_in};
    use super::*;
    use crate::auth::MemoryTokenStore;

    fn inspector_with(token: Option<&str>) -> SessionInspector {
        let store = match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        };
        SessionInspector::new(Arc::new(store))
    }

    #[test]
    fn test_no_token_is_unauthenticated() {
        let inspector = inspector_with(None);
        assert!(!inspector.is_authenticated());
        assert_eq!(inspector.state(), SessionState::Unauthenticated);
        assert!(inspector.current_user().is_none());
    }

    #[test]
    fn test_live_token_is_authenticated() {
        let token = jwt_expiring_in(3600);
        let inspector = inspector_with(Some(&token));
        assert!(inspector.is_authenticated());
        // Checking does not consume the token
        assert_eq!(inspector.store().get().unwrap(), Some(token));
    }

    #[test]
    fn test_expired_token_is_evicted() {
        let inspector = inspector_with(Some(&jwt_expiring_in(-60)));
        assert!(!inspector.is_authenticated());
        assert_eq!(inspector.store().get().unwrap(), None);
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let token = jwt(&format!(r#"{{"exp":{}}}"#, now.timestamp()));
        let inspector = inspector_with(Some(&token));
        assert_eq!(inspector.state_at(now), SessionState::Expired);
    }

    #[test]
    fn test_missing_exp_is_not_authenticated() {
        let inspector = inspector_with(Some(&jwt(r#"{"name":"NoExpiry"}"#)));
        assert!(!inspector.is_authenticated());
        assert_eq!(inspector.store().get().unwrap(), None);
    }

    #[test]
    fn test_malformed_token_is_evicted_without_error() {
        for garbage in ["not-a-jwt", "a.b.c", "", "eyJhbGciOiJIUzI1NiJ9.!!!.sig"] {
            let inspector = inspector_with(Some(garbage));
            assert!(!inspector.is_authenticated(), "accepted {:?}", garbage);
            assert_eq!(inspector.store().get().unwrap(), None);
        }
    }

    #[test]
    fn test_current_user_reads_claims() {
        let inspector = inspector_with(Some(&jwt_expiring_in(3600)));
        let user = inspector.current_user().expect("identity");
        assert_eq!(user.id.as_deref(), Some("u-1"));
        assert_eq!(user.display_name(), "Ada");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert!(user.expires_at().is_some());
    }

    #[test]
    fn test_current_user_of_expired_token_still_decodes() {
        let inspector = inspector_with(Some(&jwt_expiring_in(-60)));
        assert_eq!(inspector.current_user().unwrap().display_name(), "Ada");
    }

    #[test]
    fn test_current_user_malformed_evicts() {
        let inspector = inspector_with(Some("garbage"));
        assert!(inspector.current_user().is_none());
        assert_eq!(inspector.store().get().unwrap(), None);
    }

    #[test]
    fn test_numeric_id_and_extra_claims() {
        let token = jwt(r#"{"userId":42,"role":"admin","exp":9999999999.5}"#);
        let identity = decode_claims(&token).unwrap();
        assert_eq!(identity.user_id(), Some("42"));
        assert_eq!(identity.exp, Some(9_999_999_999));
        assert_eq!(identity.other.get("role"), Some(&Value::from("admin")));
        assert_eq!(identity.display_name(), "User");
    }

    #[test]
    fn test_several_id_claims_decode() {
        let token = jwt(r#"{"id":"u-1","_id":"66a0","userId":"legacy","exp":9999999999}"#);
        let inspector = inspector_with(Some(&token));
        assert!(inspector.is_authenticated());
        let identity = inspector.current_user().unwrap();
        assert_eq!(identity.user_id(), Some("u-1"));
        assert_eq!(identity.object_id.as_deref(), Some("66a0"));
        assert_eq!(inspector.store().get().unwrap(), Some(token));

        let mongo_only = decode_claims(&jwt(r#"{"_id":"66a0","sub":"s-9"}"#)).unwrap();
        assert_eq!(mongo_only.user_id(), Some("66a0"));
    }

    #[test]
    fn test_login_replaces_previous_token() {
        let inspector = inspector_with(Some(&jwt_expiring_in(3600)));
        let replacement = jwt(r#"{"name":"Grace","exp":9999999999}"#);
        let user = inspector.login(&replacement).unwrap().unwrap();
        assert_eq!(user.display_name(), "Grace");
        assert_eq!(inspector.store().get().unwrap(), Some(replacement));

        inspector.logout().unwrap();
        assert!(!inspector.is_authenticated());
    }
}
