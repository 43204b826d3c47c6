//! Registry of live sessions.

use crate::{Mark, RegistryError, Session, SessionId, SessionSummary, Transition};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Fewest participants a session may be created for.
pub const MIN_PLAYERS: usize = 2;

/// Most participants a session may be created for.
pub const MAX_PLAYERS: usize = Mark::alphabet_len();

struct RegistryInner<H> {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, Arc<Session<H>>>>,
}

/// Owns every live session and allocates session ids.
///
/// Cloning is cheap and shares the same sessions. The map lock is held only
/// to insert, look up or remove an entry; it is never held while a session
/// lock is taken.
pub struct SessionRegistry<H> {
    inner: Arc<RegistryInner<H>>,
}

impl<H> Clone for SessionRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H> std::fmt::Debug for SessionRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("next_id", &self.inner.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<H: Clone> Default for SessionRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> SessionRegistry<H> {
    /// Creates an empty registry. The first session gets id 1.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session registry");
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Session<H>>>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates and stores an empty session for `capacity` players.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidCapacity`] if `capacity` is outside
    /// [`MIN_PLAYERS`]..=[`MAX_PLAYERS`]; no session or id is consumed.
    #[instrument(skip(self, creator), fields(creator = %creator.as_ref()))]
    pub fn create(
        &self,
        capacity: usize,
        creator: impl AsRef<str>,
    ) -> Result<Arc<Session<H>>, RegistryError> {
        let id = self.allocate(capacity)?;
        let session = Arc::new(Session::new(id, capacity, creator.as_ref()));
        self.sessions().insert(id, Arc::clone(&session));

        info!(session_id = %id, capacity, "Created new session");
        Ok(session)
    }

    /// Creates a session with `creator` seated as [`Mark::X`], then stores it.
    ///
    /// `publish` receives the creator's join transition before the session
    /// is stored, so nobody else can join or observe it first.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidCapacity`], as for [`create`](Self::create).
    #[instrument(skip(self, creator, handle, publish), fields(creator = %creator.as_ref()))]
    pub fn host(
        &self,
        capacity: usize,
        creator: impl AsRef<str>,
        handle: H,
        publish: impl FnOnce(&Session<H>, &Transition<Mark, H>),
    ) -> Result<(Arc<Session<H>>, Transition<Mark, H>), RegistryError> {
        let id = self.allocate(capacity)?;
        let (session, transition) = Session::with_creator(id, capacity, creator.as_ref(), handle);
        publish(&session, &transition);

        let session = Arc::new(session);
        self.sessions().insert(id, Arc::clone(&session));

        info!(session_id = %id, capacity, "Hosted new session");
        Ok((session, transition))
    }

    fn allocate(&self, capacity: usize) -> Result<SessionId, RegistryError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&capacity) {
            warn!(capacity, "Rejected session with unsupported player count");
            return Err(RegistryError::InvalidCapacity {
                requested: capacity,
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
            });
        }
        Ok(SessionId::from(
            self.inner.next_id.fetch_add(1, Ordering::Relaxed),
        ))
    }

    /// Lists sessions that can still be joined, ordered by id.
    ///
    /// Full, in-progress and finished sessions are left out: the lobby only
    /// offers seats that are actually free.
    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session<H>>> = self.sessions().values().cloned().collect();

        let mut joinable: Vec<SessionSummary> = sessions
            .iter()
            .filter(|s| s.is_joinable())
            .map(|s| s.summary())
            .collect();
        joinable.sort_by_key(|s| s.id);

        debug!(total = sessions.len(), joinable = joinable.len(), "Listed sessions");
        joinable
    }

    /// Looks up a session.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if no session has this id.
    #[instrument(skip(self))]
    pub fn get(&self, id: SessionId) -> Result<Arc<Session<H>>, RegistryError> {
        self.sessions().get(&id).cloned().ok_or_else(|| {
            debug!(session_id = %id, "Session not found");
            RegistryError::NotFound(id)
        })
    }

    /// Removes a session. Returns whether it was present; removing twice is
    /// harmless.
    #[instrument(skip(self))]
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions().remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Removed session");
        }
        removed
    }

    /// Number of stored sessions, joinable or not.
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// True if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}
