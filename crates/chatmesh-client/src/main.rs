//! # chatmesh
//!
//! Demo chat room client. Joins a room on an in-process mesh together with a
//! scripted remote peer and prints the chat log as the session synchronizes
//! it: join/leave notifications, messages, renames.
//!
//! ```bash
//! # Run with default settings
//! chatmesh
//!
//! # Run with a fixed nickname
//! CHATMESH_ROOM=lobby chatmesh
//! ```

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chatmesh_core::{ChatEntry, Command, NicknameState, Session};
use chatmesh_protocol::{codec, Packet};
use chatmesh_transport::{MeshHub, Transport};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatmesh=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    let nickname = match &config.nick {
        Some(nick) => NicknameState::new(nick),
        None => NicknameState::random(),
    };

    tracing::info!("Joining room {} as {}", config.room, nickname.nick());

    let hub = MeshHub::new();
    let (transport, transport_rx) = hub.attach(nickname.nick());

    let session = Session::with_nick(Arc::new(transport), nickname)
        .with_ticker_period(Duration::from_millis(config.ticker_interval_ms));
    let mut entries = session.subscribe_log();

    session
        .join(&config.room)
        .await
        .context("Failed to join room")?;

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let actor = tokio::spawn(session.run(transport_rx, command_rx));

    // Stand-in for the excluded UI: print every log append as it happens.
    let printer = tokio::spawn(async move {
        while let Ok(entry) = entries.recv().await {
            match entry {
                ChatEntry::Message { username, payload } => println!("{}: {}", username, payload),
                ChatEntry::Notification { payload } => println!("* {}", payload),
            }
        }
    });

    run_scripted_peer(&hub, &config.room)
        .await
        .context("Scripted peer failed")?;

    // The local side of the conversation.
    command_tx.send(Command::InputChanged("Hello from this side!".into()))?;
    command_tx.send(Command::Send)?;
    command_tx.send(Command::BeginRename)?;
    command_tx.send(Command::CommitRename("Host".into()))?;
    drop(command_tx);

    actor.await.context("Session actor panicked")?;
    printer.await.context("Printer task panicked")?;

    Ok(())
}

/// A remote participant with a fixed script: types, chats, renames, leaves.
async fn run_scripted_peer(hub: &MeshHub, room: &str) -> Result<()> {
    let (peer, _events) = hub.attach("Anon77");
    peer.join_room(room).await?;

    let script = [
        Packet::typing(true),
        Packet::chat("Anon77", "hey there"),
        Packet::change_nick("Scout"),
    ];

    for packet in script {
        sleep(Duration::from_millis(250)).await;
        let (kind, body) = codec::encode(&packet)?;
        peer.broadcast(kind, body).await?;
    }

    sleep(Duration::from_millis(250)).await;
    peer.detach();
    Ok(())
}
