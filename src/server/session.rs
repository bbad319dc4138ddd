//! Dashboard sessions
//!
//! Each browser tab gets a session id. The session remembers the API key the
//! user typed and the knowledge base built from the last loaded file.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::query::KnowledgeBase;
use crate::{Error, Result};

#[derive(Clone)]
pub struct Session {
    pub api_key: Option<String>,
    pub file_name: Option<String>,
    pub knowledge_base: Option<Arc<KnowledgeBase>>,
    last_used: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            api_key: None,
            file_name: None,
            knowledge_base: None,
            last_used: Instant::now(),
        }
    }
}

/// In-memory mapping from session id to session
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, Session::new());
        tracing::debug!("Created session {}", id);
        id
    }

    /// Snapshot of a session; marks it as used
    pub async fn get(&self, id: Uuid) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        session.last_used = Instant::now();
        Ok(session.clone())
    }

    pub async fn set_api_key(&self, id: Uuid, api_key: &str) -> Result<()> {
        let key = api_key.trim();
        self.update(id, |s| {
            s.api_key = if key.is_empty() { None } else { Some(key.to_string()) };
        })
        .await
    }

    pub async fn set_knowledge_base(&self, id: Uuid, file_name: &str, kb: KnowledgeBase) -> Result<()> {
        let kb = Arc::new(kb);
        self.update(id, |s| {
            s.file_name = Some(file_name.to_string());
            s.knowledge_base = Some(kb);
        })
        .await
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than `ttl`, returning how many went
    pub async fn prune_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_used.elapsed() <= ttl);
        before - sessions.len()
    }

    async fn update(&self, id: Uuid, f: impl FnOnce(&mut Session)) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        f(session);
        session.last_used = Instant::now();
        Ok(())
    }
}
