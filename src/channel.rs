//! The push channel: one websocket to the backend that carries subject
//! announcements out and sample batches in.

use crate::discovery::session_cookie;
use crate::errors::ChannelError;
use crate::models::{SubjectId, parse_batch};
use crate::multiplexer::{Announcer, ChannelEvent};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Queues announcements for the channel task to write.
#[derive(Clone)]
pub struct ChannelAnnouncer {
    tx: mpsc::UnboundedSender<Vec<SubjectId>>,
}

impl Announcer for ChannelAnnouncer {
    fn announce(&mut self, ids: &[SubjectId]) -> Result<(), ChannelError> {
        self.tx.send(ids.to_vec()).map_err(|_| ChannelError::Closed)
    }
}

pub fn announcer() -> (ChannelAnnouncer, mpsc::UnboundedReceiver<Vec<SubjectId>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelAnnouncer { tx }, rx)
}

/// JSON array of ids. Numeric ids go out as integers since the backend looks
/// sensors up by integer key.
pub fn encode_announcement(ids: &[SubjectId]) -> String {
    let ids = ids
        .iter()
        .map(|id| match id.as_str().parse::<i64>() {
            Ok(number) if number.to_string() == id.as_str() => Value::from(number),
            _ => Value::from(id.as_str()),
        })
        .collect();
    Value::Array(ids).to_string()
}

pub struct ChannelSettings {
    pub url: String,
    pub session_id: Option<String>,
    /// `None` stops the task after the first disconnect.
    pub reconnect_delay: Option<Duration>,
}

enum Exit {
    Disconnected(ChannelError),
    Shutdown,
}

/// Keeps the websocket up and translates it into [`ChannelEvent`]s. Returns
/// once the multiplexer side hangs up, or after a disconnect when reconnecting
/// is disabled.
pub async fn run_channel(
    settings: ChannelSettings,
    events: mpsc::Sender<ChannelEvent>,
    mut outbound: mpsc::UnboundedReceiver<Vec<SubjectId>>,
) {
    loop {
        let exit = match connect(&settings).await {
            Ok(stream) => {
                info!("push channel connected to {}", settings.url);
                while outbound.try_recv().is_ok() {}
                if events.send(ChannelEvent::Opened).await.is_err() {
                    return;
                }
                pump(stream, &events, &mut outbound).await
            }
            Err(err) => Exit::Disconnected(err),
        };

        let err = match exit {
            Exit::Shutdown => return,
            Exit::Disconnected(err) => err,
        };
        if events.send(ChannelEvent::Error(err)).await.is_err() {
            return;
        }

        let Some(delay) = settings.reconnect_delay else {
            info!("push channel stopped, reconnect disabled");
            return;
        };
        debug!("reconnecting push channel in {delay:?}");
        tokio::time::sleep(delay).await;
    }
}

type Stream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(settings: &ChannelSettings) -> Result<Stream, ChannelError> {
    let mut request = settings
        .url
        .as_str()
        .into_client_request()
        .map_err(|err| ChannelError::Connect(err.to_string()))?;

    if let Some(session_id) = &settings.session_id {
        let cookie = HeaderValue::from_str(&session_cookie(session_id))
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        request.headers_mut().insert(header::COOKIE, cookie);
    }

    let (stream, _) = connect_async(request)
        .await
        .map_err(|err| ChannelError::Connect(err.to_string()))?;
    Ok(stream)
}

async fn pump(
    stream: Stream,
    events: &mpsc::Sender<ChannelEvent>,
    outbound: &mut mpsc::UnboundedReceiver<Vec<SubjectId>>,
) -> Exit {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = read.next() => {
                let payload = match frame {
                    Some(Ok(Message::Text(text))) => text.into_bytes(),
                    Some(Ok(Message::Binary(bytes))) => bytes,
                    Some(Ok(Message::Close(_))) | None => return Exit::Disconnected(ChannelError::Closed),
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => return Exit::Disconnected(ChannelError::Transport(err.to_string())),
                };

                match parse_batch(&payload) {
                    Ok(batch) if batch.is_empty() => {}
                    Ok(batch) => {
                        if events.send(ChannelEvent::SampleBatch(batch)).await.is_err() {
                            return Exit::Shutdown;
                        }
                    }
                    Err(err) => warn!("dropping channel message: {err}"),
                }
            }
            ids = outbound.recv() => {
                let Some(ids) = ids else {
                    return Exit::Shutdown;
                };
                let announcement = encode_announcement(&ids);
                debug!("announcing {announcement}");
                if let Err(err) = write.send(Message::Text(announcement)).await {
                    return Exit::Disconnected(ChannelError::Transport(err.to_string()));
                }
            }
        }
    }
}
