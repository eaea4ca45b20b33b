//! Session lifecycle.
//!
//! Every browser tab works in its own session: a server-generated id, an
//! index directory derived from that id, and an entry in the in-memory
//! registry. All lookups go through [`SessionManager::resolve`], so index
//! paths are only ever derived from ids this process generated. Sessions
//! idle past the TTL are swept together with their on-disk index.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::RagError;

const SESSION_TTL: Duration = Duration::from_secs(60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

const SESSION_DIR_PREFIX: &str = "session_";
const INDEX_FILE_NAME: &str = "chunks.db";

/// Where one session keeps its index.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Directory owned by this session, removed when the session expires.
    pub index_dir: PathBuf,
    /// SQLite file inside `index_dir`; both upload and ask use this path.
    pub index_db_path: PathBuf,
}

impl SessionContext {
    pub fn new(session_id: &str, index_root: &Path) -> Self {
        let index_dir = index_root.join(format!("{SESSION_DIR_PREFIX}{session_id}"));
        let index_db_path = index_dir.join(INDEX_FILE_NAME);
        Self {
            session_id: session_id.to_string(),
            index_dir,
            index_db_path,
        }
    }
}

struct SessionEntry {
    context: SessionContext,
    last_activity: Instant,
}

/// In-memory registry of live sessions.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    index_root: PathBuf,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(index_root: impl Into<PathBuf>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            index_root: index_root.into(),
            ttl: SESSION_TTL,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Registers a fresh session and returns its context.
    pub async fn create_session(&self) -> SessionContext {
        let session_id = Uuid::new_v4().to_string();
        let context = SessionContext::new(&session_id, &self.index_root);
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session_id.clone(),
            SessionEntry {
                context: context.clone(),
                last_activity: Instant::now(),
            },
        );
        info!(session_id = %context.session_id, "session created");
        context
    }

    /// Looks a session up and refreshes its activity clock.
    pub async fn resolve(&self, session_id: &str) -> Result<SessionContext, RagError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(entry) => {
                entry.last_activity = Instant::now();
                Ok(entry.context.clone())
            }
            None => Err(RagError::UnknownSession(session_id.to_string())),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle past the TTL and removes their index directories.
    /// Returns how many were swept.
    pub async fn sweep_expired(&self) -> usize {
        let mut expired = Vec::new();
        {
            let mut sessions = self.sessions.write().await;
            sessions.retain(|_, entry| {
                if entry.last_activity.elapsed() > self.ttl {
                    expired.push(entry.context.clone());
                    false
                } else {
                    true
                }
            });
        }
        for context in &expired {
            debug!(session_id = %context.session_id, "sweeping expired session");
            if let Err(err) = tokio::fs::remove_dir_all(&context.index_dir).await
                && err.kind() != ErrorKind::NotFound
            {
                warn!(
                    session_id = %context.session_id,
                    error = %err,
                    "failed to remove session index directory"
                );
            }
        }
        expired.len()
    }

    /// Removes `session_*` directories that no live session owns.
    ///
    /// The registry lives in memory, so after a restart every directory from
    /// the previous run is an orphan. Call once at startup.
    pub async fn clean_orphans(&self) -> std::io::Result<usize> {
        let live: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions.keys().cloned().collect()
        };

        let mut entries = match tokio::fs::read_dir(&self.index_root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(session_id) = name.strip_prefix(SESSION_DIR_PREFIX) else {
                continue;
            };
            if live.iter().any(|id| id == session_id) {
                continue;
            }
            debug!(directory = %entry.path().display(), "removing orphaned index directory");
            tokio::fs::remove_dir_all(entry.path()).await?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Spawns the periodic sweep loop for the lifetime of the process.
    pub fn start_sweeper(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let swept = self.sweep_expired().await;
                if swept > 0 {
                    info!(swept, "expired sessions removed");
                }
            }
        });
    }
}
