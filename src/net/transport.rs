//! WebTransport server implementation
//!
//! Each session opens one bidirectional stream for framed JSON messages and
//! may also send single-message datagrams. Inbound messages become lobby
//! commands; outbound frames come from the participant's broadcaster queue.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::lobby::manager::LobbyHandle;
use crate::lobby::participant::ParticipantId;
use crate::metrics::Metrics;
use crate::net::broadcast::{ConnectionBroadcaster, OutboundFrame};
use crate::net::framing::{read_message, validate_datagram_size, write_message, FramingError};
use crate::net::protocol::{decode_client_message, ClientMessage};
use crate::net::tls::TlsConfig;

/// WebTransport server
pub struct WebTransportServer {
    config: ServerConfig,
    tls_config: TlsConfig,
    lobby: LobbyHandle,
    broadcaster: Arc<ConnectionBroadcaster>,
    metrics: Arc<Metrics>,
}

impl WebTransportServer {
    /// Create a new WebTransport server
    pub async fn new(
        config: ServerConfig,
        lobby: LobbyHandle,
        broadcaster: Arc<ConnectionBroadcaster>,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let tls_config = TlsConfig::load(
            config.tls_cert_path.as_deref(),
            config.tls_key_path.as_deref(),
        )
        .await?;

        Ok(Self {
            config,
            tls_config,
            lobby,
            broadcaster,
            metrics,
        })
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        self.tls_config.cert_hash()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.bind_address, self.config.port)
    }

    /// Run the accept loop until the endpoint fails
    pub async fn run(self) -> anyhow::Result<()> {
        use wtransport::Endpoint;

        let bind_addr = self.bind_addr();
        let server_config = wtransport::ServerConfig::builder()
            .with_bind_address(bind_addr)
            .with_identity(self.tls_config.identity)
            .keep_alive_interval(Some(self.config.keep_alive))
            .max_idle_timeout(Some(self.config.idle_timeout))?
            .build();

        let server = Endpoint::server(server_config)?;

        info!("WebTransport server listening on {}", bind_addr);

        loop {
            let incoming = server.accept().await;

            let lobby = self.lobby.clone();
            let broadcaster = self.broadcaster.clone();
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(incoming, lobby, broadcaster, metrics).await {
                    warn!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Handle a single WebTransport session from handshake to cleanup
async fn handle_connection(
    incoming: wtransport::endpoint::IncomingSession,
    lobby: LobbyHandle,
    broadcaster: Arc<ConnectionBroadcaster>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let session_request = incoming.await?;
    debug!(
        "New session from {:?}, path: {}",
        session_request.authority(),
        session_request.path()
    );

    let connection = session_request.accept().await?;
    let (send, recv) = connection.accept_bi().await?;

    let participant: ParticipantId = Uuid::new_v4();
    let outbound = broadcaster.register(participant);
    lobby.connect(participant);
    metrics.connection_opened();
    debug!("Participant {} connected", participant);

    let writer = tokio::spawn(write_frames(send, outbound));
    // Frame reads are not cancel-safe, so they get their own task
    let mut reader = tokio::spawn(read_frames(recv, participant, lobby.clone(), metrics.clone()));

    loop {
        tokio::select! {
            result = &mut reader => {
                match result {
                    Ok(FramingError::ConnectionClosed) => debug!("Participant {} closed its stream", participant),
                    Ok(e) => warn!("Participant {} stream error: {}", participant, e),
                    Err(e) => warn!("Participant {} reader task failed: {}", participant, e),
                }
                break;
            }
            datagram = connection.receive_datagram() => {
                match datagram {
                    Ok(datagram) => {
                        let payload = datagram.payload();
                        match validate_datagram_size(&payload) {
                            Ok(()) => dispatch(participant, &payload, &lobby, &metrics),
                            Err(e) => {
                                warn!("Dropping datagram from {}: {}", participant, e);
                                metrics.record_malformed();
                            }
                        }
                    }
                    Err(e) => {
                        debug!("Participant {} datagram error: {}", participant, e);
                        break;
                    }
                }
            }
        }
    }

    reader.abort();
    writer.abort();
    lobby.disconnect(participant);
    broadcaster.unregister(participant);
    metrics.connection_closed();
    debug!("Participant {} disconnected", participant);
    Ok(())
}

/// Read frames until the stream ends, returning why it ended
async fn read_frames<R: AsyncRead + Unpin>(
    mut recv: R,
    participant: ParticipantId,
    lobby: LobbyHandle,
    metrics: Arc<Metrics>,
) -> FramingError {
    loop {
        match read_message(&mut recv).await {
            Ok(data) => dispatch(participant, &data, &lobby, &metrics),
            Err(e) => return e,
        }
    }
}

/// Drain the participant's outbound queue onto the stream
async fn write_frames<W: AsyncWrite + Unpin>(
    mut send: W,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_message(&mut send, &frame).await {
            debug!("Stream write error: {}", e);
            break;
        }
    }
}

/// Route one inbound message to the lobby
fn dispatch(participant: ParticipantId, data: &[u8], lobby: &LobbyHandle, metrics: &Metrics) {
    match decode_client_message(data) {
        Ok(Some(message)) => {
            metrics.record_message_received();
            match message {
                ClientMessage::JoinQueue => lobby.join_queue(participant),
                ClientMessage::PaddleMove { y } => lobby.paddle_move(participant, y),
            }
        }
        Ok(None) => {
            metrics.record_message_received();
            debug!("Ignoring unknown message type from {}", participant);
        }
        Err(e) => {
            warn!("Malformed message from {}: {}", participant, e);
            metrics.record_malformed();
        }
    }
}

#[cfg(test)]
mod tests {
    // Full sessions need a QUIC client, so these cover the stream plumbing
    // with mock IO instead.

    use super::*;
    use crate::lobby::manager::LobbyCommand;
    use tokio_test::io::Builder;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_dispatch_routes_commands() {
        let (lobby, mut rx) = LobbyHandle::channel();
        let metrics = Metrics::new();
        let id = Uuid::new_v4();

        dispatch(id, br#"{"type":"join_queue"}"#, &lobby, &metrics);
        dispatch(id, br#"{"type":"paddle_move","y":42.5}"#, &lobby, &metrics);

        assert!(matches!(rx.try_recv(), Ok(LobbyCommand::JoinQueue { participant }) if participant == id));
        assert!(matches!(
            rx.try_recv(),
            Ok(LobbyCommand::PaddleMove { participant, y: Some(y) }) if participant == id && y == 42.5
        ));
        assert_eq!(metrics.snapshot().messages_received, 2);
    }

    #[test]
    fn test_dispatch_ignores_unknown_and_malformed() {
        let (lobby, mut rx) = LobbyHandle::channel();
        let metrics = Metrics::new();
        let id = Uuid::new_v4();

        dispatch(id, br#"{"type":"chat","text":"hi"}"#, &lobby, &metrics);
        dispatch(id, b"not json", &lobby, &metrics);
        dispatch(id, br#"{"y":1}"#, &lobby, &metrics);

        assert!(rx.try_recv().is_err());
        assert_eq!(metrics.snapshot().messages_malformed, 2);
    }

    #[tokio::test]
    async fn test_read_frames_until_close() {
        let (lobby, mut rx) = LobbyHandle::channel();
        let metrics = Arc::new(Metrics::new());
        let id = Uuid::new_v4();

        let stream = Builder::new()
            .read(&frame(br#"{"type":"join_queue"}"#))
            .read(&frame(b"{oops"))
            .read(&frame(br#"{"type":"paddle_move"}"#))
            .build();

        let reason = read_frames(stream, id, lobby, metrics.clone()).await;
        assert!(matches!(reason, FramingError::ConnectionClosed));

        assert!(matches!(rx.try_recv(), Ok(LobbyCommand::JoinQueue { .. })));
        assert!(matches!(rx.try_recv(), Ok(LobbyCommand::PaddleMove { y: None, .. })));
        assert!(rx.try_recv().is_err());
        assert_eq!(metrics.snapshot().messages_malformed, 1);
    }

    #[tokio::test]
    async fn test_read_frames_rejects_oversized() {
        let (lobby, _rx) = LobbyHandle::channel();
        let stream = Builder::new().read(&u32::MAX.to_le_bytes()).build();

        let reason = read_frames(stream, Uuid::new_v4(), lobby, Arc::new(Metrics::new())).await;
        assert!(matches!(reason, FramingError::MessageTooLarge(..)));
    }

    #[tokio::test]
    async fn test_write_frames_drains_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Arc::new(b"{\"type\":\"countdown\",\"count\":3}".to_vec())).unwrap();
        tx.send(Arc::new(b"{\"type\":\"opponent_disconnected\"}".to_vec())).unwrap();
        drop(tx);

        let stream = Builder::new()
            .write(&frame(b"{\"type\":\"countdown\",\"count\":3}"))
            .write(&frame(b"{\"type\":\"opponent_disconnected\"}"))
            .build();

        write_frames(stream, rx).await;
    }
}
