use serde::{Deserialize, Serialize};

use crate::store::{RecordStore, USER_RECORD};

/// Name used when sign-in is submitted without one.
pub const DEFAULT_NAME: &str = "John Doe";
/// Email used when sign-in is submitted without one.
pub const DEFAULT_EMAIL: &str = "john@example.com";

/// Display-only identity. Its presence decides whether completed jobs are
/// saved to history; it is not an authorization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl User {
    /// Blank name or email fall back to the defaults.
    pub fn new(name: &str, email: &str) -> Self {
        let name = non_blank(name).unwrap_or(DEFAULT_NAME);
        let email = non_blank(email).unwrap_or(DEFAULT_EMAIL);
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            avatar: avatar_for(name),
        }
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Avatar URL derived from the display name alone.
pub fn avatar_for(name: &str) -> String {
    let seed: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", seed)
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Persistence for the single optional user record.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    store: Option<RecordStore>,
}

impl IdentityStore {
    pub fn in_memory() -> Self {
        Self { store: None }
    }

    pub fn new(store: RecordStore) -> Self {
        Self { store: Some(store) }
    }

    /// The saved user, or None if absent or unreadable.
    pub fn load(&self) -> Option<User> {
        self.store.as_ref()?.load_or_absent(USER_RECORD)
    }

    pub fn save(&self, user: &User) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(USER_RECORD, user) {
                tracing::error!("Failed to save user: {:#}", e);
            }
        }
    }

    pub fn clear(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(USER_RECORD) {
                tracing::error!("Failed to remove user: {:#}", e);
            }
        }
    }
}
