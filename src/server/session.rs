//! Per-client streaming session

use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::ephemeris::moon_position_now;
use crate::models::WELCOME_MESSAGE;
use crate::server::error::{SessionEnd, SessionError};
use crate::server::registry::{ClientGuard, ClientId};

/// Drive one client until it disconnects.
///
/// Sends the welcome frame, then a fresh position every `period`. Inbound
/// frames are drained and ignored; a close frame or the end of the inbound
/// stream stops the session, as does any failed send. The client stays in
/// the registry exactly as long as `guard` is held by this call.
pub async fn run_session<S, R>(
    mut sink: S,
    stream: R,
    guard: ClientGuard,
    period: Duration,
) -> SessionEnd
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Send + Unpin + 'static,
{
    let client = guard.id();
    tracing::info!(%client, addr = %guard.addr(), "New client connected");

    let cancel = CancellationToken::new();
    let reader = tokio::spawn(drain_inbound(stream, cancel.clone(), client));

    let end = stream_positions(&mut sink, &cancel, period).await;

    cancel.cancel();
    if let Err(e) = reader.await {
        tracing::warn!(%client, error = %e, "Inbound reader task failed");
    }

    match &end {
        SessionEnd::PeerClosed => {
            tracing::info!(%client, addr = %guard.addr(), "Client disconnected")
        }
        SessionEnd::SendFailed(e) => {
            tracing::warn!(%client, addr = %guard.addr(), error = %e, "Client dropped")
        }
    }

    drop(guard);
    end
}

async fn stream_positions<S>(
    sink: &mut S,
    cancel: &CancellationToken,
    period: Duration,
) -> SessionEnd
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    if let Err(e) = send_text(sink, cancel, WELCOME_MESSAGE.to_string()).await {
        return e;
    }

    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::PeerClosed,
            _ = ticker.tick() => {
                let message = moon_position_now().to_message();
                tracing::debug!(%message, "Sending position");
                if let Err(e) = send_text(sink, cancel, message).await {
                    return e;
                }
            }
        }
    }
}

/// Send one text frame, giving up if the peer closes while the send is pending.
async fn send_text<S>(
    sink: &mut S,
    cancel: &CancellationToken,
    text: String,
) -> Result<(), SessionEnd>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionEnd::PeerClosed),
        sent = sink.send(Message::Text(text)) => {
            sent.map_err(|e| SessionEnd::SendFailed(SessionError::Send(e)))
        }
    }
}

async fn drain_inbound<R>(mut stream: R, cancel: CancellationToken, client: ClientId)
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    // Cancels the session however this task ends, unwinding included
    let _cancel_on_exit = cancel.clone().drop_guard();

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => tracing::debug!(%client, "Ignoring inbound frame"),
            Some(Err(e)) => {
                tracing::debug!(%client, error = %e, "Inbound stream failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use futures::channel::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    use crate::server::registry::ClientRegistry;

    const PERIOD: Duration = Duration::from_secs(10);

    struct TestClient {
        outbound: mpsc::UnboundedReceiver<Message>,
        inbound: mpsc::UnboundedSender<Result<Message, axum::Error>>,
        session: JoinHandle<SessionEnd>,
    }

    impl TestClient {
        async fn next_text(&mut self) -> String {
            match self.outbound.next().await {
                Some(Message::Text(text)) => text,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    fn connect(registry: &Arc<ClientRegistry>, port: u16) -> TestClient {
        let (out_tx, out_rx) = mpsc::unbounded::<Message>();
        let (in_tx, in_rx) = mpsc::unbounded::<Result<Message, axum::Error>>();
        let guard = registry.register(SocketAddr::from(([127, 0, 0, 1], port)));
        let sink = out_tx.sink_map_err(|e| axum::Error::new(e));

        TestClient {
            outbound: out_rx,
            inbound: in_tx,
            session: tokio::spawn(run_session(sink, in_rx, guard, PERIOD)),
        }
    }

    fn assert_position_frame(text: &str) {
        assert!(text.starts_with("Moon RA: "), "{text}");
        assert!(text.contains(", Dec: "), "{text}");
        assert!(text.ends_with('°'), "{text}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_welcome_then_one_frame_per_period() {
        let registry = ClientRegistry::new();
        let mut client = connect(&registry, 9000);

        assert_eq!(client.next_text().await, WELCOME_MESSAGE);
        assert_eq!(registry.len(), 1);

        // First position follows the welcome without waiting
        let start = Instant::now();
        assert_position_frame(&client.next_text().await);
        assert!(start.elapsed() < Duration::from_secs(1));

        for n in 1..=3 {
            assert_position_frame(&client.next_text().await);
            let elapsed = start.elapsed();
            assert!(elapsed >= PERIOD * n, "frame {n} after {elapsed:?}");
            assert!(
                elapsed < PERIOD * n + Duration::from_secs(1),
                "frame {n} after {elapsed:?}"
            );
        }

        client.inbound.close_channel();
        let end = client.session.await.unwrap();
        assert!(end.is_peer_closed());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_frame_ends_session() {
        let registry = ClientRegistry::new();
        let mut client = connect(&registry, 9001);
        client.next_text().await;

        client.inbound.unbounded_send(Ok(Message::Close(None))).unwrap();
        let end = client.session.await.unwrap();

        assert!(end.is_peer_closed());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_ends_session() {
        let registry = ClientRegistry::new();
        let mut client = connect(&registry, 9002);
        client.next_text().await;

        // Receiver gone: the next send fails
        drop(client.outbound);
        let end = client.session.await.unwrap();

        assert!(matches!(end, SessionEnd::SendFailed(SessionError::Send(_))));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_frames_are_ignored() {
        let registry = ClientRegistry::new();
        let mut client = connect(&registry, 9003);
        assert_eq!(client.next_text().await, WELCOME_MESSAGE);

        for frame in [
            Message::Text("not a command".to_string()),
            Message::Binary(vec![0xff, 0x00, 0xfe]),
            Message::Ping(vec![1, 2, 3]),
            Message::Pong(Vec::new()),
        ] {
            client.inbound.unbounded_send(Ok(frame)).unwrap();
        }

        assert_position_frame(&client.next_text().await);
        assert_position_frame(&client.next_text().await);
        assert_eq!(registry.len(), 1);

        client.inbound.close_channel();
        assert!(client.session.await.unwrap().is_peer_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_reader_ends_session() {
        let registry = ClientRegistry::new();
        let (out_tx, mut out_rx) = mpsc::unbounded::<Message>();
        let guard = registry.register(SocketAddr::from(([127, 0, 0, 1], 9005)));
        let sink = out_tx.sink_map_err(|e| axum::Error::new(e));
        let inbound = futures::stream::poll_fn(
            |_| -> std::task::Poll<Option<Result<Message, axum::Error>>> {
                panic!("inbound stream blew up")
            },
        );

        let end = run_session(sink, inbound, guard, PERIOD).await;

        assert!(end.is_peer_closed());
        assert!(registry.is_empty());
        // Nothing is sent after the reader is gone, at most the welcome and one position
        let mut sent = 0;
        while let Ok(Some(_)) = out_rx.try_next() {
            sent += 1;
        }
        assert!(sent <= 2, "{sent} frames sent");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_error_ends_session() {
        let registry = ClientRegistry::new();
        let mut client = connect(&registry, 9004);
        client.next_text().await;

        let error = axum::Error::new(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        client.inbound.unbounded_send(Err(error)).unwrap();

        assert!(client.session.await.unwrap().is_peer_closed());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_disconnect_leaves_others_streaming() {
        let registry = ClientRegistry::new();
        let mut clients: Vec<_> = (0..4).map(|i| connect(&registry, 9100 + i)).collect();

        for client in clients.iter_mut() {
            assert_eq!(client.next_text().await, WELCOME_MESSAGE);
            assert_position_frame(&client.next_text().await);
        }
        assert_eq!(registry.len(), 4);

        let leaving = clients.remove(1);
        leaving.inbound.close_channel();
        assert!(leaving.session.await.unwrap().is_peer_closed());
        assert_eq!(registry.len(), 3);

        let start = Instant::now();
        for client in clients.iter_mut() {
            assert_position_frame(&client.next_text().await);
        }
        assert!(start.elapsed() <= PERIOD);
        assert_eq!(registry.len(), 3);
    }
}
