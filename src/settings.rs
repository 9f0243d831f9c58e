/// User configuration persisted in extension storage
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{KeyValueStore, SETTINGS_KEY, get_typed, set_typed};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    /// Overrides the default course API; a `.json` URL is fetched verbatim
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Portal login (NIM)
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Pre-solved captcha value for the login form
    #[serde(default)]
    pub captcha: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Login values the content script types into the portal
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub captcha: Option<&'a str>,
}

impl Settings {
    pub fn api_base_url(&self) -> Option<&str> {
        present(&self.api_base_url)
    }

    pub fn token(&self) -> Option<&str> {
        present(&self.token)
    }

    /// Username is required; an empty password is passed through as-is
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        Some(Credentials {
            username: present(&self.username)?,
            password: self.password.as_deref().unwrap_or(""),
            captcha: present(&self.captcha),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    /// Blank fields are stored as absent
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Settings {
            api_base_url: clean(self.api_base_url),
            token: clean(self.token),
            username: clean(self.username),
            password: self.password.filter(|p| !p.is_empty()),
            captcha: clean(self.captcha),
        }
    }

    pub async fn load<S: KeyValueStore>(store: &S) -> Result<Settings> {
        Ok(get_typed(store, SETTINGS_KEY).await?.unwrap_or_default())
    }

    pub async fn save<S: KeyValueStore>(self, store: &S) -> Result<()> {
        set_typed(store, SETTINGS_KEY, &self.normalized()).await
    }
}
