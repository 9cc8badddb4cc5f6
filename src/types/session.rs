use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::SessionError;

/// A named, persisted group of tabs tied to a persona.
///
/// `persona_id` is a weak reference: it is looked up in the persona
/// registry, never owned or checked by the session store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowsingSession {
    pub id: String,
    pub name: String,
    pub persona_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Tabs in creation order.
    pub tabs: Vec<TabSession>,
    pub active_tab: Option<String>,
}

impl BrowsingSession {
    /// Creates an empty session with a fresh id.
    pub fn new(name: &str, persona_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            persona_id: persona_id.to_string(),
            created_at: now,
            last_accessed: now,
            tabs: Vec::new(),
            active_tab: None,
        }
    }

    /// Appends a tab and returns its id. The first tab becomes active.
    pub fn add_tab(&mut self, tab: TabSession) -> String {
        let id = tab.id.clone();
        self.tabs.push(tab);
        if self.active_tab.is_none() {
            self.active_tab = Some(id.clone());
        }
        self.touch();
        id
    }

    /// Marks `tab_id` as the active tab. Fails if no such tab exists.
    pub fn set_active_tab(&mut self, tab_id: &str) -> Result<(), SessionError> {
        if self.tab(tab_id).is_none() {
            return Err(SessionError::InvalidSession(format!(
                "active tab {} is not part of session {}",
                tab_id, self.id
            )));
        }
        self.active_tab = Some(tab_id.to_string());
        self.touch();
        Ok(())
    }

    pub fn tab(&self, tab_id: &str) -> Option<&TabSession> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    /// Bumps `last_accessed` to now.
    pub fn touch(&mut self) {
        self.last_accessed = Utc::now().max(self.created_at);
    }

    /// Checks the graph invariants the store relies on.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.id.is_empty() {
            return Err(SessionError::InvalidSession("session id cannot be empty".to_string()));
        }
        if self.last_accessed < self.created_at {
            return Err(SessionError::InvalidSession(format!(
                "session {} was last accessed before it was created",
                self.id
            )));
        }
        for (i, tab) in self.tabs.iter().enumerate() {
            if tab.id.is_empty() {
                return Err(SessionError::InvalidSession(format!(
                    "tab #{} of session {} has an empty id",
                    i, self.id
                )));
            }
            if tab.last_accessed < tab.created_at {
                return Err(SessionError::InvalidSession(format!(
                    "tab {} was last accessed before it was created",
                    tab.id
                )));
            }
            if self.tabs[..i].iter().any(|other| other.id == tab.id) {
                return Err(SessionError::InvalidSession(format!(
                    "duplicate tab id {} in session {}",
                    tab.id, self.id
                )));
            }
        }
        if let Some(active) = &self.active_tab {
            if self.tab(active).is_none() {
                return Err(SessionError::InvalidSession(format!(
                    "active tab {} is not part of session {}",
                    active, self.id
                )));
            }
        }
        Ok(())
    }
}

/// One persisted tab's navigation state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabSession {
    pub id: String,
    pub url: String,
    pub title: String,
    pub persona_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Visited URLs, most recent last.
    pub history: Vec<String>,
    pub scroll_position: i64,
    pub zoom_factor: f64,
}

impl TabSession {
    pub fn new(url: &str, title: &str, persona_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: title.to_string(),
            persona_id: persona_id.to_string(),
            created_at: now,
            last_accessed: now,
            history: vec![url.to_string()],
            scroll_position: 0,
            zoom_factor: 1.0,
        }
    }

    /// Records a navigation: the new URL becomes current and is appended to history.
    pub fn navigate(&mut self, url: &str) {
        self.url = url.to_string();
        self.history.push(url.to_string());
        self.scroll_position = 0;
        self.last_accessed = Utc::now().max(self.created_at);
    }
}

/// Row returned by `SessionStore::list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub persona_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub tab_count: usize,
}

/// JSON stored in the `sessions.metadata` column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionMetadata {
    #[serde(default)]
    pub active_tab: Option<String>,
}
