use crate::board::SharedBoard;
use crate::channel::{self, ChannelSettings};
use crate::config::Config;
use crate::discovery::HttpSubjectSource;
use crate::multiplexer::{Announcer, ChannelEvent, ChartSink, Multiplexer, SubjectSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

const EVENT_QUEUE: usize = 64;

pub struct LiveMetrics {
    pub channel: JoinHandle<()>,
    pub multiplexer: JoinHandle<()>,
}

impl LiveMetrics {
    pub fn abort(&self) {
        self.channel.abort();
        self.multiplexer.abort();
    }
}

/// Starts the push channel and the multiplexer that paints into `board`.
pub fn start(config: &Config, board: SharedBoard) -> LiveMetrics {
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
    let (announcer, outbound) = channel::announcer();

    let settings = ChannelSettings {
        url: config.channel_url.clone(),
        session_id: config.session_id.clone(),
        reconnect_delay: config.reconnect_delay,
    };
    let source = HttpSubjectSource::new(&config.backend_url, config.session_id.clone());
    let multiplexer = Multiplexer::with_capacity(config.window_capacity, board, announcer);

    LiveMetrics {
        channel: tokio::spawn(channel::run_channel(settings, events_tx, outbound)),
        multiplexer: tokio::spawn(run_multiplexer(multiplexer, source, events_rx)),
    }
}

/// Feeds events to the multiplexer strictly one at a time.
pub async fn run_multiplexer<S, A, D>(
    mut multiplexer: Multiplexer<S, A>,
    source: D,
    mut events: mpsc::Receiver<ChannelEvent>,
) where
    S: ChartSink,
    A: Announcer,
    D: SubjectSource,
{
    while let Some(event) = events.recv().await {
        multiplexer.handle(event, &source).await;
    }
    info!("push channel gone, multiplexer stopped");
}
