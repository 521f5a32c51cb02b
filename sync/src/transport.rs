//! Newline-delimited TCP front end for a [`Lobby`].

use std::io;

use siege_core::PlayerId;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
    sync::mpsc::{unbounded_channel, UnboundedReceiver},
};
use tracing::{debug, info, warn};

use crate::{
    host::Outbox,
    protocol::{decode_client, ClientMessage, Codec, CodecError, ServerMessage},
    runtime::{Lobby, LobbyError, RoomHandle},
};

/// Failures that end a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Socket failure.
    #[error("connection i/o failed: {0}")]
    Io(#[from] io::Error),
    /// A server message could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The requested room could not be joined.
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

/// Accepts connections until the listener fails.
///
/// Clients speak newline-delimited JSON; server messages use `codec`.
pub async fn serve(listener: TcpListener, lobby: Lobby, codec: Codec) -> io::Result<()> {
    info!(address = %listener.local_addr()?, ?codec, "listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let lobby = lobby.clone();
        let _ = tokio::spawn(async move {
            debug!(%peer, "connection accepted");
            if let Err(error) = handle_connection(stream, lobby, codec).await {
                warn!(%peer, %error, "connection failed");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    lobby: Lobby,
    codec: Codec,
) -> Result<(), ConnectionError> {
    let (reader, writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let (outbox, inbox) = unbounded_channel();
    let writer = tokio::spawn(write_messages(writer, inbox, codec));

    let Some(room) = await_join(&mut lines, &outbox).await? else {
        return Ok(());
    };
    let (player, handle) = match lobby.join(&room, outbox.clone()) {
        Ok(joined) => joined,
        Err(error) => {
            let _ = outbox.send(ServerMessage::Error {
                message: error.to_string(),
            });
            return Err(error.into());
        }
    };

    let result = pump(&mut lines, &handle, player, &outbox).await;
    handle.leave(player);
    drop(outbox);

    match writer.await {
        Ok(Err(error)) => debug!(player = player.get(), %error, "writer stopped"),
        Err(error) => debug!(player = player.get(), %error, "writer task failed"),
        Ok(Ok(())) => {}
    }
    result
}

async fn await_join(
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
    outbox: &Outbox,
) -> Result<Option<String>, ConnectionError> {
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let message = match decode_client(&line) {
            Ok(ClientMessage::Join { room }) => return Ok(Some(room)),
            Ok(_) => "join a room first".to_owned(),
            Err(error) => error.to_string(),
        };
        let _ = outbox.send(ServerMessage::Error { message });
    }
    Ok(None)
}

async fn pump(
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
    handle: &RoomHandle,
    player: PlayerId,
    outbox: &Outbox,
) -> Result<(), ConnectionError> {
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = handle.closed() => {
                debug!(player = player.get(), room = handle.room(), "room closed");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_client(&line) {
            Ok(message) => {
                if !handle.submit(player, message) {
                    break;
                }
            }
            Err(error) => {
                let _ = outbox.send(ServerMessage::Error {
                    message: error.to_string(),
                });
            }
        }
    }
    Ok(())
}

async fn write_messages(
    mut writer: OwnedWriteHalf,
    mut inbox: UnboundedReceiver<ServerMessage>,
    codec: Codec,
) -> Result<(), ConnectionError> {
    while let Some(message) = inbox.recv().await {
        let frame = codec.encode(&message)?;
        writer.write_all(&frame).await?;
    }
    writer.shutdown().await?;
    Ok(())
}
