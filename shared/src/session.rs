//! Signed-in state: tokens, the cached user record, and the storage keys the
//! core reads and writes through the shell's key-value store.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capabilities::{KvError, KvKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    User,
    CurrentLocation,
    Contacts,
    SafePlaces { owner: String },
}

impl StorageKey {
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::AccessToken => "accessToken".into(),
            Self::RefreshToken => "refreshToken".into(),
            Self::User => "user".into(),
            Self::CurrentLocation => "CURRENT_LOCATION_V1".into(),
            Self::Contacts => "CONTACTS_V1".into(),
            Self::SafePlaces { owner } => format!("SAFE_PLACES_V1_{owner}"),
        }
    }

    pub fn kv_key(&self) -> Result<KvKey, KvError> {
        KvKey::new(self.name())
    }
}

/// The user record exactly as the backend returned it. Field names vary
/// between endpoints, so it stays untyped and is read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub Value);

impl UserProfile {
    fn text(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn id(&self) -> Option<String> {
        ["_id", "id"].iter().find_map(|field| match self.0.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.text("email")
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.text("phone")
    }

    /// `full_name`, then `first_name last_name`, then `first_name`, then
    /// `name`, then the local part of `email`.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = self.text("full_name") {
            return Some(full.to_string());
        }
        match (self.text("first_name"), self.text("last_name")) {
            (Some(first), Some(last)) => return Some(format!("{first} {last}")),
            (Some(first), None) => return Some(first.to_string()),
            _ => {}
        }
        if let Some(name) = self.text("name") {
            return Some(name.to_string());
        }
        self.email()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
    }
}

/// Tokens and user pulled out of a login or refresh response.
#[derive(Debug, Default)]
pub struct TokenGrant {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub user: Option<UserProfile>,
}

impl TokenGrant {
    #[must_use]
    pub fn from_json(body: &Value) -> Self {
        let secret = |fields: &[&str]| {
            fields
                .iter()
                .find_map(|f| body.get(*f).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(|s| SecretString::new(s.to_string()))
        };
        let user = ["user", "data"]
            .iter()
            .find_map(|f| body.get(*f))
            .filter(|v| v.is_object())
            .cloned()
            .map(UserProfile);

        Self {
            access_token: secret(&["accessToken", "access_token", "token"]),
            refresh_token: secret(&["refreshToken", "refresh_token"]),
            user,
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    pub user: Option<UserProfile>,
}

impl Session {
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token.filter(|t| !t.is_empty()).map(SecretString::new);
    }

    pub fn set_refresh_token(&mut self, token: Option<String>) {
        self.refresh_token = token.filter(|t| !t.is_empty()).map(SecretString::new);
    }

    #[must_use]
    pub fn auth_header(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    /// Values that changed, as `(key, raw bytes)` pairs to write to storage.
    /// Fields absent from the grant keep their current value.
    pub fn apply_grant(&mut self, grant: TokenGrant) -> Vec<(StorageKey, Vec<u8>)> {
        let mut writes = Vec::new();
        if let Some(access) = grant.access_token {
            writes.push((StorageKey::AccessToken, access.expose_secret().as_bytes().to_vec()));
            self.access_token = Some(access);
        }
        if let Some(refresh) = grant.refresh_token {
            writes.push((StorageKey::RefreshToken, refresh.expose_secret().as_bytes().to_vec()));
            self.refresh_token = Some(refresh);
        }
        if let Some(user) = grant.user {
            writes.push((StorageKey::User, user.0.to_string().into_bytes()));
            self.user = Some(user);
        }
        writes
    }

    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.user = None;
    }

    /// Short fingerprint that namespaces per-user caches without putting the
    /// user id or token itself into a storage key.
    #[must_use]
    pub fn cache_owner(&self) -> String {
        let material = self
            .user
            .as_ref()
            .and_then(UserProfile::id)
            .or_else(|| self.access_token.as_ref().map(|t| t.expose_secret().clone()));

        match material {
            Some(m) => {
                let hash = blake3::hash(m.as_bytes());
                hash.to_hex()[..16].to_string()
            }
            None => "anon".to_string(),
        }
    }

    #[must_use]
    pub fn safe_places_key(&self) -> StorageKey {
        StorageKey::SafePlaces {
            owner: self.cache_owner(),
        }
    }
}
