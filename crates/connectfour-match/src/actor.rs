//! Session actor: an isolated Tokio task that owns one [`Session`].
//!
//! Each session runs in its own task, communicating with the outside world
//! through an mpsc channel. Commands are handled one at a time, so two
//! writers racing for the same session (a join and the fallback timer, or
//! two moves) are simply serialized; different sessions never block each
//! other.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use connectfour_engine::BotStrategy;
use connectfour_protocol::{
    Player, PlayerId, ServerMessage, SessionId, SessionSnapshot,
};
use connectfour_session::{GameError, Session};
use tokio::sync::{mpsc, oneshot};

use crate::{MatchConfig, MatchError};

/// Identifies one live subscriber (usually a WebSocket connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Channel for delivering updates to one subscriber.
///
/// Unbounded so that broadcasting never waits on a slow reader.
pub type SubscriberSender = mpsc::UnboundedSender<ServerMessage>;

type Reply<T> = oneshot::Sender<Result<T, GameError>>;

/// Where a move came from.
pub(crate) enum MoveOrigin {
    /// A client request waiting for the outcome.
    Client(Reply<SessionSnapshot>),
    /// The bot driver; `attempt` counts re-plans after rejections.
    Bot { attempt: u32 },
}

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    Join {
        player: Player,
        reply: Reply<SessionSnapshot>,
    },
    Move {
        player_id: PlayerId,
        column: i64,
        origin: MoveOrigin,
    },
    Subscribe {
        subscriber: SubscriberId,
        sender: SubscriberSender,
    },
    Unsubscribe {
        subscriber: SubscriberId,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// The matchmaking window closed; seat the bot if still waiting.
    FallbackTimeout,
    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone: it's an `mpsc::Sender` plus the id. The registry holds
/// one per session and hands out clones.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    fn unavailable(&self) -> MatchError {
        MatchError::Unavailable(self.id.clone())
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), MatchError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    /// Seats `player` as the second player.
    pub async fn join(
        &self,
        player: Player,
    ) -> Result<SessionSnapshot, MatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Join { player, reply }).await?;
        Ok(rx.await.map_err(|_| self.unavailable())??)
    }

    /// Submits a move on behalf of `player_id`.
    pub async fn make_move(
        &self,
        player_id: PlayerId,
        column: i64,
    ) -> Result<SessionSnapshot, MatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Move {
            player_id,
            column,
            origin: MoveOrigin::Client(reply),
        })
        .await?;
        Ok(rx.await.map_err(|_| self.unavailable())??)
    }

    /// Attaches a subscriber. It receives the current snapshot right away,
    /// then every update after that.
    pub async fn subscribe(
        &self,
        subscriber: SubscriberId,
        sender: SubscriberSender,
    ) -> Result<(), MatchError> {
        self.send(SessionCommand::Subscribe { subscriber, sender })
            .await
    }

    /// Detaches a subscriber. Never affects the game itself.
    pub async fn unsubscribe(
        &self,
        subscriber: SubscriberId,
    ) -> Result<(), MatchError> {
        self.send(SessionCommand::Unsubscribe { subscriber }).await
    }

    /// Current state of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, MatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    pub(crate) async fn fallback_timeout(&self) -> Result<(), MatchError> {
        self.send(SessionCommand::FallbackTimeout).await
    }

    /// Stops the actor. Subscribers see their channel close.
    pub async fn shutdown(&self) -> Result<(), MatchError> {
        self.send(SessionCommand::Shutdown).await
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor {
    session: Session,
    subscribers: HashMap<SubscriberId, SubscriberSender>,
    receiver: mpsc::Receiver<SessionCommand>,
    /// Used by the bot driver to submit moves. Weak so the actor doesn't
    /// keep its own channel open after the registry lets go.
    weak_sender: mpsc::WeakSender<SessionCommand>,
    bot: Arc<dyn BotStrategy>,
    config: MatchConfig,
}

impl SessionActor {
    async fn run(mut self) {
        let id = self.session.id().clone();
        tracing::debug!(session_id = %id, "session actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SessionCommand::Join { player, reply } => {
                    let result = self.handle_join(player);
                    let _ = reply.send(result);
                }
                SessionCommand::Move {
                    player_id,
                    column,
                    origin,
                } => self.handle_move(player_id, column, origin),
                SessionCommand::Subscribe { subscriber, sender } => {
                    self.handle_subscribe(subscriber, sender);
                }
                SessionCommand::Unsubscribe { subscriber } => {
                    if self.subscribers.remove(&subscriber).is_some() {
                        tracing::debug!(
                            session_id = %id,
                            %subscriber,
                            "subscriber detached"
                        );
                    }
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                SessionCommand::FallbackTimeout => self.handle_fallback(),
                SessionCommand::Shutdown => break,
            }
        }

        tracing::debug!(session_id = %id, "session actor stopped");
    }

    fn handle_join(
        &mut self,
        player: Player,
    ) -> Result<SessionSnapshot, GameError> {
        self.session.join(player)?;
        self.broadcast();
        self.schedule_bot_move(0);
        Ok(self.session.snapshot())
    }

    fn handle_move(
        &mut self,
        player_id: PlayerId,
        column: i64,
        origin: MoveOrigin,
    ) {
        let result = self.session.apply_move(&player_id, column);

        if result.is_ok() {
            self.broadcast();
            self.schedule_bot_move(0);
        }

        match origin {
            MoveOrigin::Client(reply) => {
                let _ = reply.send(result.map(|_| self.session.snapshot()));
            }
            MoveOrigin::Bot { attempt } => {
                if let Err(err) = result {
                    tracing::warn!(
                        session_id = %self.session.id(),
                        column,
                        attempt,
                        error = %err,
                        "bot move rejected"
                    );
                    if attempt < self.config.bot_retry_limit {
                        self.schedule_bot_move(attempt + 1);
                    } else {
                        tracing::error!(
                            session_id = %self.session.id(),
                            "bot gave up after repeated rejections"
                        );
                    }
                }
            }
        }
    }

    fn handle_subscribe(
        &mut self,
        subscriber: SubscriberId,
        sender: SubscriberSender,
    ) {
        let snapshot = ServerMessage::GameUpdate(self.session.snapshot());
        if sender.send(snapshot).is_err() {
            return;
        }
        self.subscribers.insert(subscriber, sender);
        tracing::debug!(
            session_id = %self.session.id(),
            %subscriber,
            subscribers = self.subscribers.len(),
            "subscriber attached"
        );
    }

    fn handle_fallback(&mut self) {
        // A human may have joined since the timer was armed.
        if self.session.seat_bot() {
            self.broadcast();
            self.schedule_bot_move(0);
        } else {
            tracing::debug!(
                session_id = %self.session.id(),
                "fallback timer fired after session started, ignoring"
            );
        }
    }

    /// Sends the current snapshot to every subscriber, dropping the ones
    /// whose receiver is gone.
    fn broadcast(&mut self) {
        let msg = ServerMessage::GameUpdate(self.session.snapshot());
        self.subscribers
            .retain(|_, sender| sender.send(msg.clone()).is_ok());
    }

    /// If the bot is to move, plans its move off the actor task.
    ///
    /// The search runs on the blocking pool over a copy of the board, and
    /// the result comes back as an ordinary `Move` command, so it is
    /// validated exactly like a human's.
    fn schedule_bot_move(&self, attempt: u32) {
        if !self.session.is_bot_turn() {
            return;
        }
        let Some(bot_player) = self.session.current_player() else {
            return;
        };

        let player_id = bot_player.id.clone();
        let board = *self.session.board();
        let seat = self.session.current_seat();
        let strategy = Arc::clone(&self.bot);
        let weak = self.weak_sender.clone();
        let delay = self.config.bot_move_delay;
        let budget = self.config.bot_deadline;
        let session_id = self.session.id().clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let chosen = tokio::task::spawn_blocking(move || {
                let deadline = Instant::now() + budget;
                strategy.choose_column(&board, seat, seat.other(), deadline)
            })
            .await;

            let column = match chosen {
                Ok(Some(column)) => column,
                Ok(None) => {
                    tracing::warn!(%session_id, "bot found no legal column");
                    return;
                }
                Err(e) => {
                    tracing::error!(%session_id, error = %e, "bot search panicked");
                    return;
                }
            };

            // The session may have been swept while the bot was thinking.
            let Some(sender) = weak.upgrade() else {
                return;
            };
            let _ = sender
                .send(SessionCommand::Move {
                    player_id,
                    column: column as i64,
                    origin: MoveOrigin::Bot { attempt },
                })
                .await;
        });
    }
}

/// Spawns a session actor owning `session` and returns its handle.
pub(crate) fn spawn_session(
    session: Session,
    bot: Arc<dyn BotStrategy>,
    config: MatchConfig,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let id = session.id().clone();

    let actor = SessionActor {
        session,
        subscribers: HashMap::new(),
        receiver: rx,
        weak_sender: tx.downgrade(),
        bot,
        config,
    };

    tokio::spawn(actor.run());

    SessionHandle { id, sender: tx }
}
