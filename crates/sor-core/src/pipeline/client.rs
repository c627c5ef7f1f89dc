//! ChatClient: drives a user submission from gate check through settlement.
//!
//! The client owns the identity context, the in-memory session store, and
//! the turn lock, and coordinates the repositories and the generation
//! backend. Control flow per turn: gate -> session ready -> generation
//! (single-shot image or incremental text/search) -> finalize -> settle.
//! All generation failures abort the turn without charging anything; state
//! committed before the failure stays as-is.

use chrono::Utc;
use futures_util::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sor_types::chat::{ChatMessage, ChatMode, ChatSession, MessageKind, SessionOwner};
use sor_types::error::{RepositoryError, TurnError};
use sor_types::generation::Attachment;
use sor_types::identity::{Plan, User};

use crate::generation::GenerationBackend;
use crate::identity::IdentityContext;
use crate::quota::{self, QuotaDecision};
use crate::repository::{SessionRepository, UserRepository};
use crate::session::SessionStore;

use super::turn::TurnLock;

/// User-message content recorded when a submission carries only a file.
const ATTACHMENT_NOTE: &str = "Uploaded a file for analysis";

/// Assistant-message content accompanying a generated image.
const IMAGE_NOTE: &str = "Image generated successfully.";

/// Orchestrates sessions, quota, and generation turns.
///
/// Generic over the repository and backend ports so the core stays free of
/// storage and network concerns. Single cooperative flow: every mutation
/// of the session store goes through this client.
pub struct ChatClient<U: UserRepository, S: SessionRepository, G: GenerationBackend> {
    users: U,
    session_repo: S,
    backend: G,
    identity: IdentityContext,
    store: SessionStore,
    mode: ChatMode,
    turn: TurnLock,
}

impl<U: UserRepository, S: SessionRepository, G: GenerationBackend> ChatClient<U, S, G> {
    /// Create a client with empty state. Call [`bootstrap`](Self::bootstrap)
    /// before first use to rehydrate the cached identity.
    pub fn new(users: U, session_repo: S, backend: G) -> Self {
        Self {
            users,
            session_repo,
            backend,
            identity: IdentityContext::new(),
            store: SessionStore::new(),
            mode: ChatMode::default(),
            turn: TurnLock::new(),
        }
    }

    // --- Read surface for the presentation layer ---

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<&User> {
        self.identity.user()
    }

    /// Whether the one-time guest allowance has been consumed.
    pub fn guest_used(&self) -> bool {
        self.identity.guest_used()
    }

    /// All sessions, newest first.
    pub fn sessions(&self) -> &[ChatSession] {
        self.store.sessions()
    }

    /// The active session, if one is selected.
    pub fn active_session(&self) -> Option<&ChatSession> {
        self.store.active()
    }

    /// Whether a generation turn is in flight (send affordance disabled).
    pub fn is_generating(&self) -> bool {
        self.turn.is_held()
    }

    /// Current generation mode.
    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    // --- Session selection ---

    pub fn set_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
    }

    /// Make an existing session the active conversation.
    pub fn select_session(&mut self, id: Uuid) {
        self.store.set_active(id);
    }

    /// Start fresh: the next send creates a new conversation lazily.
    /// Resets the mode to chat.
    pub fn new_session(&mut self) {
        self.store.clear_active();
        self.mode = ChatMode::Chat;
    }

    // --- Identity lifecycle ---

    /// Startup rehydration: re-validate the cached identity and load its
    /// sessions. A stale cached identity is cleared and the user is
    /// treated as logged out.
    pub async fn bootstrap(&mut self) -> Result<(), RepositoryError> {
        self.identity.set_guest_used(self.users.guest_used().await?);

        let Some(cached) = self.users.current_user().await? else {
            return Ok(());
        };

        match self
            .users
            .find_user(&cached.username, cached.credential.as_deref())
            .await?
        {
            Some(fresh) => {
                self.users.set_current_user(Some(&fresh)).await?;
                let sessions = self
                    .session_repo
                    .sessions_for(&SessionOwner::User(fresh.id))
                    .await?;
                info!(user_id = %fresh.id, sessions = sessions.len(), "Rehydrated cached identity");
                self.identity.set_user(Some(fresh));
                self.store.replace_all(sessions);
            }
            None => {
                warn!(username = %cached.username, "Cached identity no longer valid; clearing");
                self.users.set_current_user(None).await?;
            }
        }

        Ok(())
    }

    /// Sign in: set the identity, persist the current-user marker, and
    /// load the user's sessions.
    pub async fn login(&mut self, user: User) -> Result<(), RepositoryError> {
        self.users.set_current_user(Some(&user)).await?;
        let sessions = self
            .session_repo
            .sessions_for(&SessionOwner::User(user.id))
            .await?;
        info!(user_id = %user.id, sessions = sessions.len(), "User signed in");
        self.identity.set_user(Some(user));
        self.store.replace_all(sessions);
        Ok(())
    }

    /// Sign out: clear the marker and all in-memory sessions, then
    /// recompute the guest flag from durable storage (guest usage is
    /// tracked independently of login state).
    pub async fn logout(&mut self) -> Result<(), RepositoryError> {
        self.users.set_current_user(None).await?;
        self.identity.set_user(None);
        self.store.replace_all(Vec::new());
        self.identity.set_guest_used(self.users.guest_used().await?);
        info!("User signed out");
        Ok(())
    }

    /// Change the current user's plan. Unlimited pins the balance to the
    /// inexhaustible sentinel; other plans add the purchased bonus points.
    /// No-op when logged out.
    pub async fn upgrade(&mut self, plan: Plan, bonus_points: u32) -> Result<(), RepositoryError> {
        let Some(mut user) = self.identity.user().cloned() else {
            return Ok(());
        };

        user.plan = plan;
        user.points = if plan == Plan::Unlimited {
            User::UNLIMITED_POINTS
        } else {
            user.points.saturating_add(bonus_points)
        };

        self.users.save_user(&user).await?;
        info!(user_id = %user.id, plan = %plan, "Plan upgraded");
        self.identity.set_user(Some(user));
        Ok(())
    }

    // --- The send turn ---

    /// Run one full turn: gate, append the user message, generate, settle.
    ///
    /// Returns the id of the session the turn ran in. Quota denials are
    /// returned before any state is created; failures after the gate leave
    /// previously committed state intact and charge nothing.
    pub async fn send(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<Uuid, TurnError> {
        if text.trim().is_empty() && attachment.is_none() {
            return Err(TurnError::EmptyInput);
        }
        if self.turn.is_held() {
            return Err(TurnError::Busy);
        }

        let decision = quota::evaluate(
            self.identity.user(),
            self.mode,
            attachment.is_some(),
            self.identity.guest_used(),
        );
        let cost = match decision {
            QuotaDecision::Allow { cost } => cost,
            QuotaDecision::RequireAuth => return Err(TurnError::RequiresAuth),
            QuotaDecision::RequireUpgrade => return Err(TurnError::RequiresUpgrade),
        };

        // The guard frees the slot on every exit from the turn, including
        // a send future dropped mid-await.
        let Some(_turn) = self.turn.try_acquire() else {
            return Err(TurnError::Busy);
        };
        self.run_turn(text, attachment, cost).await
    }

    /// Everything between gate approval and settlement, run with the turn
    /// lock held.
    async fn run_turn(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
        cost: u32,
    ) -> Result<Uuid, TurnError> {
        // SessionReady: locate the active conversation or synthesize one.
        let mut session = match self.store.active() {
            Some(existing) => existing.clone(),
            None => {
                let owner = match self.identity.user() {
                    Some(user) => SessionOwner::User(user.id),
                    None => SessionOwner::Guest,
                };
                let session =
                    ChatSession::new(owner, ChatSession::derive_title(text), self.mode);
                info!(session_id = %session.id, mode = %self.mode, "Conversation created");
                self.store.set_active(session.id);
                session
            }
        };

        let content = if text.is_empty() { ATTACHMENT_NOTE } else { text };
        session.messages.push(ChatMessage::user(content));
        session.updated_at = Utc::now();
        self.commit(session.clone()).await?;

        // Sending: exactly one of the two generation paths.
        match self.mode {
            ChatMode::Image => {
                if self.identity.user().is_none() {
                    // Second always-deny guard behind the gate's anonymous
                    // image rule.
                    warn!("Anonymous image generation rejected in pipeline");
                    return Err(TurnError::RequiresAuth);
                }
                let url = self.backend.generate_image(text).await?;
                session.messages.push(ChatMessage::assistant(
                    Uuid::now_v7(),
                    IMAGE_NOTE,
                    MessageKind::Image { url },
                ));
                session.updated_at = Utc::now();
                self.commit(session.clone()).await?;
            }
            ChatMode::Chat | ChatMode::Search => {
                let grounding = self.mode == ChatMode::Search;
                let mut stream =
                    self.backend
                        .stream_text(&session.messages, text, grounding, attachment.as_ref());

                let assistant_id = Uuid::now_v7();
                let mut full_content = String::new();

                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    full_content.push_str(&chunk.delta);

                    let kind = match chunk.citations {
                        Some(citations) if !citations.is_empty() => {
                            MessageKind::Grounded { citations }
                        }
                        _ => MessageKind::PlainText,
                    };
                    debug!(
                        message_id = %assistant_id,
                        content_len = full_content.len(),
                        "Stream increment folded"
                    );

                    // StreamingPartial: refresh the reactive view only; the
                    // durable write waits for finalization to avoid write
                    // amplification.
                    let mut view = session.clone();
                    view.messages.push(ChatMessage::assistant(
                        assistant_id,
                        full_content.clone(),
                        kind,
                    ));
                    self.store.upsert(view);
                }

                // Finalizing: one immutable message, same id, full content.
                session.messages.push(ChatMessage::assistant(
                    assistant_id,
                    full_content,
                    MessageKind::PlainText,
                ));
                session.updated_at = Utc::now();
                self.commit(session.clone()).await?;
            }
        }

        self.settle(cost).await?;
        Ok(session.id)
    }

    /// Reconcile a locally-mutated session: fold it into the in-memory
    /// store, then write it durably when an identity is set. Guest
    /// sessions never outlive the process. Last-writer-wins per id.
    async fn commit(&mut self, session: ChatSession) -> Result<(), RepositoryError> {
        self.store.upsert(session.clone());
        if self.identity.user().is_some() {
            self.session_repo.save_session(&session).await?;
        }
        Ok(())
    }

    /// Charge the turn's cost exactly once, after full completion.
    async fn settle(&mut self, cost: u32) -> Result<(), RepositoryError> {
        match self.identity.user().map(|u| u.plan) {
            None => {
                self.identity.mark_guest_used();
                self.users.mark_guest_used().await?;
                info!("Guest allowance consumed");
            }
            Some(Plan::Unlimited) => {
                debug!(cost, "Unlimited plan; balance untouched");
            }
            Some(_) => {
                self.identity.charge(cost);
                if let Some(user) = self.identity.user().cloned() {
                    self.users.save_user(&user).await?;
                    info!(user_id = %user.id, cost, points = user.points, "Points charged");
                }
            }
        }
        Ok(())
    }
}
