//! The code → session map.

use std::collections::HashMap;
use std::sync::Arc;

use farkle_game::{GameConfig, Outbound, RollerFactory, Session};
use farkle_protocol::{GameCode, ParticipantId};
use rand::Rng;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::{RegistryConfig, RegistryError};

/// A session behind its own lock, shared by the registry and by every
/// participant bound to it.
pub type SharedSession = Arc<Mutex<Session>>;

/// How many fresh codes to draw before giving up on a create.
const MAX_CODE_ATTEMPTS: usize = 16;

/// A successful create or join.
///
/// `guard` still holds the session lock so the caller can deliver
/// `events` before any other operation on the session is observed.
pub struct Seated {
    pub code: GameCode,
    pub session: SharedSession,
    pub guard: OwnedMutexGuard<Session>,
    pub slot: usize,
    pub events: Outbound,
}

/// All live sessions, keyed by code.
pub struct Registry {
    sessions: Mutex<HashMap<GameCode, SharedSession>>,
    pub(crate) config: RegistryConfig,
    game: GameConfig,
    rollers: RollerFactory,
}

impl Registry {
    /// Creates an empty registry. Every session it creates uses `game`
    /// rules and a roller from `rollers`.
    pub fn new(config: RegistryConfig, game: GameConfig, rollers: RollerFactory) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
            game,
            rollers,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates a session under a fresh code and seats `creator` in slot 0.
    ///
    /// # Errors
    /// [`RegistryError::CodeSpaceExhausted`] if no unused code turned up.
    pub async fn create(
        &self,
        creator: ParticipantId,
        name: &str,
        victory_target: Option<i64>,
    ) -> Result<Seated, RegistryError> {
        let mut sessions = self.sessions.lock().await;
        let code = self.fresh_code(&sessions)?;

        let mut session = Session::new(
            code.clone(),
            self.game.clone(),
            victory_target,
            (self.rollers)(),
        );
        let (slot, events) = session.join(creator, name)?;
        let target = session.victory_target();

        let shared: SharedSession = Arc::new(Mutex::new(session));
        // Nobody else can see this session yet, so this never waits.
        let guard = Arc::clone(&shared).lock_owned().await;
        sessions.insert(code.clone(), Arc::clone(&shared));
        let live = sessions.len();
        drop(sessions);

        tracing::info!(%code, %creator, target, live, "game created");
        Ok(Seated {
            code,
            session: shared,
            guard,
            slot,
            events,
        })
    }

    /// Seats `who` in the first empty slot of the session named by `code`.
    ///
    /// `code` is normalised first, so case and surrounding whitespace
    /// don't matter.
    ///
    /// # Errors
    /// - [`RegistryError::CodeRequired`]: empty code
    /// - [`RegistryError::NotFound`]: no such live session
    /// - [`RegistryError::Game`]: full or finished
    pub async fn join(
        &self,
        code: &str,
        who: ParticipantId,
        name: &str,
    ) -> Result<Seated, RegistryError> {
        let code = GameCode::new(code);
        if code.is_empty() {
            return Err(RegistryError::CodeRequired);
        }
        let session = self
            .find(&code)
            .await
            .ok_or_else(|| RegistryError::NotFound(code.clone()))?;

        let mut guard = Arc::clone(&session).lock_owned().await;
        // Abandoned between lookup and lock: already on its way out.
        if guard.occupied_count() == 0 {
            return Err(RegistryError::NotFound(code));
        }
        let (slot, events) = guard.join(who, name)?;

        Ok(Seated {
            code,
            session,
            guard,
            slot,
            events,
        })
    }

    /// Looks up a live session.
    pub async fn find(&self, code: &GameCode) -> Option<SharedSession> {
        self.sessions.lock().await.get(code).cloned()
    }

    /// Deletes `code` only if it still maps to `session`.
    ///
    /// Used after an abandonment, when the code may already have been
    /// evicted and handed out again.
    pub async fn discard(&self, code: &GameCode, session: &SharedSession) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(code) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(code);
                tracing::debug!(%code, "session discarded");
                true
            }
            _ => false,
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Evicts finished sessions older than the retention window.
    pub async fn sweep(&self) -> Vec<GameCode> {
        self.sweep_at(Instant::now()).await
    }

    /// [`sweep`](Self::sweep) with an explicit clock reading.
    ///
    /// Sessions whose lock is busy are left for the next sweep rather than
    /// waited on.
    pub async fn sweep_at(&self, now: Instant) -> Vec<GameCode> {
        let retention = self.config.retention;
        let mut evicted = Vec::new();

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|code, session| {
            let Ok(guard) = session.try_lock() else {
                return true;
            };
            let expired = guard
                .finished_at()
                .is_some_and(|at| now.saturating_duration_since(at) > retention);
            if expired {
                evicted.push(code.clone());
            }
            !expired
        });
        let live = sessions.len();
        drop(sessions);

        for code in &evicted {
            tracing::info!(%code, live, "session evicted");
        }
        evicted
    }

    /// Draws codes until one is unused.
    fn fresh_code(
        &self,
        sessions: &HashMap<GameCode, SharedSession>,
    ) -> Result<GameCode, RegistryError> {
        let alphabet = &self.config.code_alphabet;
        if alphabet.is_empty() || self.config.code_length == 0 {
            return Err(RegistryError::CodeSpaceExhausted);
        }
        let mut rng = rand::rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let raw: String = (0..self.config.code_length)
                .map(|_| alphabet[rng.random_range(0..alphabet.len())])
                .collect();
            let code = GameCode::new(&raw);
            if !sessions.contains_key(&code) {
                return Ok(code);
            }
        }
        tracing::warn!(
            attempts = MAX_CODE_ATTEMPTS,
            live = sessions.len(),
            "no free game code"
        );
        Err(RegistryError::CodeSpaceExhausted)
    }
}
