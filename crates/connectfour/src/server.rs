//! `ConnectFourServer` builder and server loop.
//!
//! This is the entry point for running a match server. It ties together
//! the layers: transport → protocol → match registry → session. The REST
//! routes and `/ws` share one port; a dedicated WebSocket listener can be
//! added next to them.

use std::net::SocketAddr;
use std::sync::Arc;

use connectfour_engine::{BotStrategy, HeuristicBot};
use connectfour_match::{MatchConfig, MatchRegistry};
use connectfour_protocol::{Codec, JsonCodec};
use connectfour_session::{InMemoryLeaderboard, LeaderboardStore};
use connectfour_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;

use crate::handler::handle_connection;
use crate::{http, ConnectFourError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The registry
/// does its own locking; nothing here needs a mutex.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<MatchRegistry>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use connectfour::prelude::*;
///
/// # async fn run() -> Result<(), ConnectFourError> {
/// let server = ConnectFourServer::builder()
///     .http_addr("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ConnectFourServerBuilder {
    config: ServerConfig,
    bot: Option<Arc<dyn BotStrategy>>,
    leaderboard: Option<Arc<dyn LeaderboardStore>>,
}

impl ConnectFourServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            bot: None,
            leaderboard: None,
        }
    }

    /// Replaces the whole configuration, e.g. with
    /// [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address for the REST listener.
    pub fn http_addr(mut self, addr: &str) -> Self {
        self.config.http_addr = addr.to_string();
        self
    }

    /// Adds a dedicated WebSocket listener on `addr`, next to `/ws` on
    /// the REST port.
    pub fn ws_addr(mut self, addr: &str) -> Self {
        self.config.ws_addr = Some(addr.to_string());
        self
    }

    /// Sets the match timers.
    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.config.matches = config;
        self
    }

    /// Replaces the fallback bot. Defaults to [`HeuristicBot`].
    pub fn bot(mut self, bot: impl BotStrategy) -> Self {
        self.bot = Some(Arc::new(bot));
        self
    }

    /// Replaces the leaderboard store. Defaults to an in-memory one.
    pub fn leaderboard(mut self, store: Arc<dyn LeaderboardStore>) -> Self {
        self.leaderboard = Some(store);
        self
    }

    /// Binds the REST listener, plus the WebSocket listener if one was
    /// configured.
    ///
    /// Uses `JsonCodec`, which is what the browser client speaks.
    pub async fn build(
        self,
    ) -> Result<ConnectFourServer<JsonCodec>, ConnectFourError> {
        let transport = match &self.config.ws_addr {
            Some(addr) => Some(WebSocketTransport::bind(addr).await?),
            None => None,
        };
        let http = TcpListener::bind(&self.config.http_addr).await?;
        tracing::info!(addr = %self.config.http_addr, "HTTP listener bound");

        let bot = self
            .bot
            .unwrap_or_else(|| Arc::new(HeuristicBot::default()));
        let leaderboard = self
            .leaderboard
            .unwrap_or_else(|| Arc::new(InMemoryLeaderboard::new()));

        let state = Arc::new(ServerState {
            registry: Arc::new(MatchRegistry::new(
                self.config.matches,
                bot,
                leaderboard,
            )),
            codec: JsonCodec,
        });

        Ok(ConnectFourServer {
            transport,
            http,
            state,
        })
    }
}

impl Default for ConnectFourServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound match server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct ConnectFourServer<C: Codec> {
    transport: Option<WebSocketTransport>,
    http: TcpListener,
    state: Arc<ServerState<C>>,
}

impl ConnectFourServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ConnectFourServerBuilder {
        ConnectFourServerBuilder::new()
    }
}

impl<C> ConnectFourServer<C>
where
    C: Codec + 'static,
{
    /// Returns the address the REST listener is bound to.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// Returns the address of the dedicated WebSocket listener, if any.
    pub fn ws_addr(&self) -> Option<std::io::Result<SocketAddr>> {
        self.transport.as_ref().map(WebSocketTransport::local_addr)
    }

    /// The registry behind this server.
    pub fn registry(&self) -> &Arc<MatchRegistry> {
        &self.state.registry
    }

    /// Runs the server.
    ///
    /// Starts the stale-session sweeper and the HTTP routes, then accepts
    /// connections on the dedicated WebSocket listener (if any) and spawns
    /// a handler task for each. Returns only if the HTTP server stops.
    pub async fn run(self) -> Result<(), ConnectFourError> {
        let Self {
            transport,
            http: listener,
            state,
        } = self;

        let _sweeper = state.registry.spawn_sweeper();
        let app = http::router(Arc::clone(&state));
        let mut http_task =
            tokio::spawn(async move { axum::serve(listener, app).await });

        tracing::info!("Connect Four server running");

        let Some(mut transport) = transport else {
            let served = http_task.await;
            tracing::error!("HTTP server stopped");
            return match served {
                Ok(result) => result.map_err(ConnectFourError::Io),
                Err(e) => Err(std::io::Error::other(e).into()),
            };
        };

        loop {
            tokio::select! {
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                served = &mut http_task => {
                    tracing::error!("HTTP server stopped");
                    return match served {
                        Ok(result) => result.map_err(ConnectFourError::Io),
                        Err(e) => Err(std::io::Error::other(e).into()),
                    };
                }
            }
        }
    }
}
