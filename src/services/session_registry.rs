use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::context::WorkspaceContext;
use crate::db::WorkspaceStore;
use crate::error::AppError;
use crate::models::{User, Workspace};

/// A logged-in user's workspace plus the bookkeeping that keeps its saves ordered.
pub struct LiveWorkspace {
    context: Mutex<WorkspaceContext>,
    revision: AtomicU64,
    saved_revision: Mutex<u64>,
}

pub type SharedContext = Arc<LiveWorkspace>;

impl LiveWorkspace {
    fn new(context: WorkspaceContext) -> Self {
        Self {
            context: Mutex::new(context),
            revision: AtomicU64::new(0),
            saved_revision: Mutex::new(0),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, WorkspaceContext> {
        self.context.lock().await
    }

    /// Call while holding the context lock so revisions follow mutation order.
    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Writes `snapshot` unless a newer revision already reached the store.
    async fn write(
        &self,
        store: &dyn WorkspaceStore,
        user: &User,
        snapshot: &Workspace,
        revision: u64,
    ) -> Result<(), AppError> {
        let mut saved = self.saved_revision.lock().await;
        if *saved >= revision {
            debug!("skipping stale revision {} for {}", revision, user.storage_key());
            return Ok(());
        }
        store.save(user, snapshot).await?;
        *saved = revision;
        Ok(())
    }
}

struct Session {
    user_key: String,
    context: SharedContext,
    last_seen: Instant,
}

#[derive(Default)]
struct Registry {
    tokens: HashMap<String, Session>,
    users: HashMap<String, Arc<OnceCell<SharedContext>>>,
}

/// Live workspaces keyed by bearer token.
///
/// Every token of a user resolves to the same `LiveWorkspace`; the workspace
/// is loaded once per user and dropped when its last token goes away.
pub struct SessionRegistry {
    store: Arc<dyn WorkspaceStore>,
    inner: Mutex<Registry>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(Registry::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn WorkspaceStore> {
        &self.store
    }

    async fn open(&self, user: &User) -> Result<SharedContext, AppError> {
        let workspace = self.store.load(user).await?;
        Ok(Arc::new(LiveWorkspace::new(WorkspaceContext::new(user.clone(), workspace))))
    }

    pub async fn login(&self, user: User) -> Result<(String, SharedContext), AppError> {
        let user_key = user.storage_key();

        loop {
            let cell = self
                .inner
                .lock()
                .await
                .users
                .entry(user_key.clone())
                .or_default()
                .clone();

            let context = match cell.get_or_try_init(|| self.open(&user)).await {
                Ok(context) => context.clone(),
                Err(e) => {
                    let mut registry = self.inner.lock().await;
                    if registry
                        .users
                        .get(&user_key)
                        .is_some_and(|c| Arc::ptr_eq(c, &cell) && !c.initialized())
                    {
                        registry.users.remove(&user_key);
                    }
                    return Err(e);
                }
            };

            let mut registry = self.inner.lock().await;
            let current = registry
                .users
                .entry(user_key.clone())
                .or_insert_with(|| cell.clone());
            if !Arc::ptr_eq(current, &cell) {
                // the user was released and reopened while this login waited
                continue;
            }

            let token = Uuid::new_v4().simple().to_string();
            registry.tokens.insert(
                token.clone(),
                Session {
                    user_key: user_key.clone(),
                    context: context.clone(),
                    last_seen: Instant::now(),
                },
            );
            info!("session opened for {}", user_key);
            return Ok((token, context));
        }
    }

    pub async fn get(&self, token: &str) -> Result<SharedContext, AppError> {
        let mut registry = self.inner.lock().await;
        let session = registry.tokens.get_mut(token).ok_or(AppError::Unauthorized)?;
        session.last_seen = Instant::now();
        Ok(session.context.clone())
    }

    /// Drops the token and waits for the final save.
    pub async fn logout(&self, token: &str) -> Result<User, AppError> {
        let session = self
            .inner
            .lock()
            .await
            .tokens
            .remove(token)
            .ok_or(AppError::Unauthorized)?;

        let user = self.flush(&session.context).await;
        self.release(&session.user_key).await;
        info!("session closed for {}", session.user_key);
        user
    }

    pub async fn active_sessions(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }

    /// Closes sessions idle for longer than `max_idle`, saving their workspaces.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let expired: Vec<Session> = {
            let mut registry = self.inner.lock().await;
            let now = Instant::now();
            let stale: Vec<String> = registry
                .tokens
                .iter()
                .filter(|(_, s)| now.duration_since(s.last_seen) > max_idle)
                .map(|(token, _)| token.clone())
                .collect();
            stale.iter().filter_map(|t| registry.tokens.remove(t)).collect()
        };

        for session in &expired {
            if let Err(e) = self.flush(&session.context).await {
                error!("failed to save expired session of {}: {}", session.user_key, e);
            }
            self.release(&session.user_key).await;
        }
        expired.len()
    }

    /// Expires idle sessions on a fixed interval. Runs until the process exits.
    pub async fn run_expiry(self: Arc<Self>, max_idle: Duration, interval: Duration) {
        info!("session expiry running (idle limit {:?}, every {:?})", max_idle, interval);
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let expired = self.expire_idle(max_idle).await;
            if expired > 0 {
                info!("expired {} idle sessions", expired);
            }
        }
    }

    /// Saves a snapshot in the background. Failures are logged and dropped.
    ///
    /// Takes the guard of `live` so the revision matches the state it saves.
    pub fn persist(&self, live: &SharedContext, ctx: &WorkspaceContext) {
        let revision = live.next_revision();
        let store = self.store.clone();
        let live = live.clone();
        let user = ctx.user().clone();
        let snapshot = ctx.snapshot();

        tokio::spawn(async move {
            match live.write(store.as_ref(), &user, &snapshot, revision).await {
                Ok(()) => debug!("saved revision {} for {}", revision, user.storage_key()),
                Err(e) => error!("failed to save workspace for {}: {}", user.storage_key(), e),
            }
        });
    }

    async fn flush(&self, live: &SharedContext) -> Result<User, AppError> {
        let ctx = live.lock().await;
        let revision = live.next_revision();
        live.write(self.store.as_ref(), ctx.user(), ctx.workspace(), revision).await?;
        Ok(ctx.user().clone())
    }

    /// Forgets the user's workspace once no token refers to it.
    async fn release(&self, user_key: &str) {
        let mut registry = self.inner.lock().await;
        if !registry.tokens.values().any(|s| s.user_key == user_key) {
            registry.users.remove(user_key);
        }
    }
}
