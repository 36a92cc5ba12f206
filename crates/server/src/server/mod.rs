//! Websocket server: accept loop and per-connection sessions.

use crate::config::Config;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use protocol::PlayerId;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{info, warn};

pub mod broadcast;
pub mod game;
pub mod registry;

pub use game::{run_game_loop, ServerState};

/// Bind the configured address and run the server until interrupted.
///
/// Failure to bind is the only fatal startup error; everything that
/// happens on individual connections afterwards is contained to them.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let listener =
        TcpListener::bind(format!("{}:{}", config.server.bind, config.server.port)).await?;
    info!("Listening on ws://{}", listener.local_addr()?);
    serve(listener, config).await
}

/// Accept connections on an already bound listener.
///
/// Split out of [`run`] so tests can bind an ephemeral port first. On
/// interrupt the accept loop stops, the tick loop finishes its
/// in-flight cycle, and session tasks close their sockets.
pub async fn serve(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let tick = config.server.tick_duration();
    let max_connections = config.server.max_connections;
    let state = Arc::new(RwLock::new(ServerState::new(config)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let game_loop = tokio::spawn(run_game_loop(
        Arc::clone(&state),
        tick,
        shutdown_rx.clone(),
    ));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;

                {
                    let server = state.read().await;
                    if server.registry.len() >= max_connections {
                        warn!("Connection rejected (limit reached): {}", addr);
                        continue;
                    }
                }

                let state = Arc::clone(&state);
                let shutdown = shutdown_rx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, state, shutdown).await {
                        warn!("Connection error from {}: {}", addr, e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    // Stop accepting, let the in-flight tick finish, then the session
    // tasks observe the signal and close their sockets.
    let _ = shutdown_tx.send(true);
    let _ = game_loop.await;

    Ok(())
}

/// Handle a single websocket connection for its whole lifetime.
///
/// Registration happens before the first inbound frame is touched, and
/// every exit path funnels through unregistration.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<RwLock<ServerState>>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (write, read) = ws_stream.split();

    // Register and take the initial snapshot under one lock, so the
    // first frame the client sees already contains its own player.
    let send_buffer = state.read().await.config.server.send_buffer;
    let (outbound_tx, outbound_rx) = mpsc::channel::<Message>(send_buffer);
    let (player_id, snapshot) = {
        let mut server = state.write().await;
        let id = server.add_player(outbound_tx);
        match protocol::encode_state(&server.game) {
            Ok(snapshot) => (id, snapshot),
            Err(e) => {
                server.remove_player(id);
                return Err(e.into());
            }
        }
    };
    info!("Player {} joined from {}", player_id, addr);

    let result = session(
        write,
        read,
        &state,
        player_id,
        outbound_rx,
        shutdown,
        snapshot,
    )
    .await;

    // Teardown is unconditional; a second unregistration from the
    // broadcast dispatcher is a no-op.
    {
        let mut server = state.write().await;
        server.remove_player(player_id);
    }
    info!("Player {} disconnected", player_id);

    result
}

/// Per-connection message loop: inbound frames feed the command
/// processor, the outbound channel feeds the socket.
async fn session(
    mut write: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut read: SplitStream<WebSocketStream<TcpStream>>,
    state: &Arc<RwLock<ServerState>>,
    player_id: PlayerId,
    mut outbound_rx: mpsc::Receiver<Message>,
    mut shutdown: watch::Receiver<bool>,
    snapshot: String,
) -> anyhow::Result<()> {
    write.send(Message::Text(snapshot.into())).await?;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(payload))) => {
                        let mut server = state.write().await;
                        if let Err(e) = server.handle_message(player_id, payload.as_str()) {
                            // Malformed input is discarded; the
                            // connection stays open.
                            warn!("Player {}: {}", player_id, e);
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Player {}: binary frame discarded", player_id);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        // Transport failure; treated as a disconnect.
                        warn!("Player {}: websocket error: {}", player_id, e);
                        break;
                    }
                    _ => {}
                }
            }
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => write.send(frame).await?,
                    // The registry dropped its sender: this player was
                    // unregistered (stalled or dead send queue).
                    None => break,
                }
            }
            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    Ok(())
}
