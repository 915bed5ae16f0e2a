//! Tokio driver: Socket.IO WebSocket link, timers and operator input.

use std::time::{Duration, Instant};

use clanview_model::{socketio, OpenInfo, Packet};
use clanview_render::FrameRecorder;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::console::{ConsoleCommand, HELP};
use crate::error::{Error, Result};
use crate::link::{Link, TransportEvent};
use crate::session::Session;

/// Transport event tagged with the connection generation that produced it.
pub type TaggedEvent = (u64, TransportEvent);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`Link`] speaking Socket.IO over a tokio-tungstenite WebSocket.
///
/// Each `open` spawns a connection task with a fresh generation number.
/// Events from older generations are stale and dropped by the driver.
/// An attempt that has not completed the Socket.IO handshake within
/// `open_timeout` reports [`TransportEvent::OpenFailed`].
pub struct WsLink {
    url: String,
    open_timeout: Duration,
    events: mpsc::UnboundedSender<TaggedEvent>,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl WsLink {
    pub fn new(
        url: &str,
        open_timeout: Duration,
        events: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Self {
        Self {
            url: socketio::endpoint(url),
            open_timeout,
            events,
            generation: 0,
            outbound: None,
            task: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn stop_task(&mut self) {
        self.outbound = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Link for WsLink {
    fn open(&mut self) {
        self.stop_task();
        self.generation += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        self.task = Some(tokio::spawn(run_connection(
            self.url.clone(),
            self.open_timeout,
            self.generation,
            rx,
            self.events.clone(),
        )));
    }

    fn close(&mut self) {
        self.stop_task();
        self.generation += 1;
    }

    fn send(&mut self, frame: String) -> Result<()> {
        let outbound = self.outbound.as_ref().ok_or(Error::NotConnected)?;
        outbound
            .send(frame)
            .map_err(|_| Error::Transport("connection task has stopped".into()))
    }
}

impl Drop for WsLink {
    fn drop(&mut self) {
        self.stop_task();
    }
}

/// Engine.IO open, then the default namespace connect.
async fn handshake(url: &str) -> Result<(WsStream, OpenInfo)> {
    let (mut ws, _response) = connect_async(url).await?;
    let mut open = None;

    loop {
        let text = match ws.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                return Err(Error::Transport("closed during handshake".into()))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        };

        match Packet::decode(&text)? {
            Packet::Open(info) => {
                debug!(sid = %info.sid, ping_interval = info.ping_interval, "engine open");
                ws.send(Message::Text(Packet::Connect.encode())).await?;
                open = Some(info);
            }
            Packet::Ping => ws.send(Message::Text(Packet::Pong.encode())).await?,
            Packet::Connect => {
                return match open {
                    Some(info) => Ok((ws, info)),
                    None => Err(Error::Transport("namespace connect before engine open".into())),
                }
            }
            Packet::ConnectError(message) => {
                return Err(Error::Transport(format!("namespace refused: {message}")))
            }
            Packet::Close | Packet::Disconnect => {
                return Err(Error::Transport("closed during handshake".into()))
            }
            other => debug!(?other, "ignoring packet during handshake"),
        }
    }
}

async fn run_connection(
    url: String,
    open_timeout: Duration,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TaggedEvent>,
) {
    let (ws, open) = match tokio::time::timeout(open_timeout, handshake(&url)).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            let _ = events.send((generation, TransportEvent::OpenFailed(e.to_string())));
            return;
        }
        Err(_) => {
            let reason = format!("connection timed out after {open_timeout:?}");
            let _ = events.send((generation, TransportEvent::OpenFailed(reason)));
            return;
        }
    };
    let _ = events.send((generation, TransportEvent::Opened));
    let (mut write, mut read) = ws.split();

    // The server pings every interval; silence past interval + timeout means it is gone
    let liveness = open.liveness_window();
    let mut last_heard = tokio::time::Instant::now();

    let reason = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        break e.to_string();
                    }
                }
                None => {
                    let _ = write.send(Message::Text(Packet::Disconnect.encode())).await;
                    let _ = write.close().await;
                    break "closed by client".to_string();
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    last_heard = tokio::time::Instant::now();
                    match Packet::decode(&text) {
                        Ok(Packet::Ping) => {
                            if let Err(e) = write.send(Message::Text(Packet::Pong.encode())).await {
                                break e.to_string();
                            }
                        }
                        Ok(Packet::Close | Packet::Disconnect) => break "closed by server".to_string(),
                        Ok(Packet::Pong | Packet::Noop) => {}
                        _ => {
                            let _ = events.send((generation, TransportEvent::Frame(text)));
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break "closed by server".to_string(),
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
            },
            _ = tokio::time::sleep_until(last_heard + liveness) => break "ping timeout".to_string(),
        }
    };

    debug!(generation, "connection task finished: {}", reason);
    let _ = events.send((generation, TransportEvent::Closed(reason)));
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

/// Run an interactive session until `quit`, end of input or Ctrl-C.
pub async fn run(config: ClientConfig) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let link = WsLink::new(&config.server_url, config.reconnect.interval, event_tx);
    info!(url = %config.server_url, "Starting clanview session");

    let mut session = Session::new(config, link, FrameRecorder::new());
    session.start(Instant::now());
    println!("{HELP}");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    loop {
        for notice in session.drain_notices() {
            println!("{notice}");
        }

        let deadline = session.next_deadline();
        tokio::select! {
            Some((generation, event)) = event_rx.recv() => {
                if generation != session.link().generation() {
                    debug!(generation, "dropping stale transport event");
                    continue;
                }
                session.handle_transport(event, Instant::now());
            }
            _ = sleep_until(deadline) => session.on_tick(Instant::now()),
            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => {
                        if let Some(text) = command.execute(&mut session, Instant::now()) {
                            println!("{text}");
                        }
                    }
                    Err(e) => println!("{e}"),
                },
                Ok(None) => {
                    info!("Input closed, running until interrupted");
                    input_open = false;
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    input_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    session.shutdown();
    for notice in session.drain_notices() {
        println!("{notice}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clanview_model::ClientCommand;
    use tokio::net::TcpListener;

    const WAIT: Duration = Duration::from_secs(5);

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TaggedEvent>) -> TransportEvent {
        let (_, event) = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        event
    }

    async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (stream, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    }

    async fn expect_text(ws: &mut WebSocketStream<TcpStream>, expected: &str) {
        let msg = ws.next().await.unwrap().unwrap();
        assert_eq!(msg, Message::Text(expected.to_string()));
    }

    #[tokio::test]
    async fn send_before_open_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut link = WsLink::new("ws://127.0.0.1:9", Duration::from_secs(2), tx);
        assert!(matches!(link.send("{}".into()), Err(Error::NotConnected)));
        assert_eq!(link.generation(), 0);
    }

    #[tokio::test]
    async fn unreachable_server_reports_open_failed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Port 9 (discard) is closed on test hosts
        let mut link = WsLink::new("ws://127.0.0.1:9", Duration::from_secs(2), tx);
        link.open();
        assert_eq!(link.generation(), 1);

        let (generation, event) = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(generation, 1);
        assert!(matches!(event, TransportEvent::OpenFailed(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out_the_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept TCP but never answer the upgrade
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                held.push(stream);
            }
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut link = WsLink::new(&format!("ws://{addr}"), Duration::from_millis(200), tx);
        link.open();

        match next_event(&mut rx).await {
            TransportEvent::OpenFailed(reason) => assert!(reason.contains("timed out"), "{reason}"),
            other => panic!("unexpected event {other:?}"),
        }
        server.abort();
    }

    #[tokio::test]
    async fn socketio_handshake_and_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            ws.send(Message::Text(
                r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#.into(),
            ))
            .await
            .unwrap();
            expect_text(&mut ws, "40").await;
            ws.send(Message::Text(r#"40{"sid":"n1"}"#.into())).await.unwrap();

            ws.send(Message::Text("2".into())).await.unwrap();
            expect_text(&mut ws, "3").await;

            ws.send(Message::Text(r#"42["simulation_state",{"step":7,"running":true}]"#.into()))
                .await
                .unwrap();
            expect_text(&mut ws, r#"42["request_state"]"#).await;
            ws.send(Message::Text("41".into())).await.unwrap();
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut link = WsLink::new(&format!("ws://{addr}"), WAIT, tx);
        link.open();

        assert_eq!(next_event(&mut rx).await, TransportEvent::Opened);
        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Frame(r#"42["simulation_state",{"step":7,"running":true}]"#.into())
        );
        link.send(ClientCommand::RequestState.to_frame().unwrap()).unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Closed("closed by server".into())
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_namespace_fails_the_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            ws.send(Message::Text(r#"0{"sid":"s1"}"#.into())).await.unwrap();
            expect_text(&mut ws, "40").await;
            ws.send(Message::Text(r#"44{"message":"Not authorized"}"#.into()))
                .await
                .unwrap();
            ws
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut link = WsLink::new(&format!("ws://{addr}"), WAIT, tx);
        link.open();

        match next_event(&mut rx).await {
            TransportEvent::OpenFailed(reason) => assert!(reason.contains("Not authorized"), "{reason}"),
            other => panic!("unexpected event {other:?}"),
        }
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn missing_pings_close_the_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            ws.send(Message::Text(r#"0{"sid":"s1","pingInterval":50,"pingTimeout":50}"#.into()))
                .await
                .unwrap();
            expect_text(&mut ws, "40").await;
            ws.send(Message::Text("40".into())).await.unwrap();
            // Hold the socket open without pinging
            let _ = ws.next().await;
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut link = WsLink::new(&format!("ws://{addr}"), WAIT, tx);
        link.open();

        assert_eq!(next_event(&mut rx).await, TransportEvent::Opened);
        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Closed("ping timeout".into())
        );
        server.abort();
    }

    #[tokio::test]
    async fn close_bumps_generation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut link = WsLink::new("ws://127.0.0.1:9", Duration::from_secs(2), tx);
        link.open();
        link.close();
        assert_eq!(link.generation(), 2);
        assert!(link.send("{}".into()).is_err());
    }
}
