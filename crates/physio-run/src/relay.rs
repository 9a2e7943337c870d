//! Device relay: decode notification payloads and republish them as a stream.
//!
//! The feed (producer) and the relay (consumer) talk over a bounded
//! single-producer queue. Only the relay touches the normalization window and
//! the sink.

use crate::outlet::SampleSink;
use anyhow::{Context, Result};
use log::{info, warn};
use physio_lib::io::text::parse_hex_payload;
use physio_lib::source::DeviceChannel;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the notification queue between feed and relay.
pub const QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub published: usize,
    pub rejected: usize,
}

pub struct DeviceRelay {
    channel: DeviceChannel,
    sink: Box<dyn SampleSink>,
    stats: RelayStats,
}

impl DeviceRelay {
    pub fn new(channel: DeviceChannel, sink: Box<dyn SampleSink>) -> Self {
        Self {
            channel,
            sink,
            stats: RelayStats::default(),
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Handle one notification. Undecodable payloads are logged and skipped;
    /// sink failures are returned.
    pub fn on_notification(&mut self, payload: &[u8]) -> Result<Option<f64>> {
        let value = match self.channel.ingest(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!("dropping notification: {err}");
                self.stats.rejected += 1;
                return Ok(None);
            }
        };
        self.sink.push_sample(&[value as f32])?;
        self.stats.published += 1;
        Ok(Some(value))
    }

    /// Consume notifications until the feed closes or `shutdown` resolves.
    pub async fn run<F, C>(
        &mut self,
        mut rx: mpsc::Receiver<Vec<u8>>,
        shutdown: F,
        mut on_value: C,
    ) -> Result<RelayStats>
    where
        F: Future,
        C: FnMut(f64),
    {
        tokio::pin!(shutdown);
        info!(
            "relaying {:?} notifications to {}",
            self.channel.layout(),
            self.sink.decl().name
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                payload = rx.recv() => match payload {
                    Some(payload) => {
                        if let Some(value) = self.on_notification(&payload)? {
                            on_value(value);
                        }
                    }
                    None => {
                        info!("notification feed closed");
                        break;
                    }
                },
            }
        }
        Ok(self.stats)
    }
}

/// Spawn a feed that reads one hex-encoded payload per line and queues it.
///
/// The task ends at end of input or when the relay has gone away.
pub fn spawn_line_feed<R>(reader: R, tx: mpsc::Sender<Vec<u8>>) -> JoinHandle<Result<usize>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut sent = 0usize;
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await.context("reading notification feed")? {
            line_no += 1;
            let payload = match parse_hex_payload(&line) {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(err) => {
                    warn!("skipping feed line {line_no}: {err:#}");
                    continue;
                }
            };
            if tx.send(payload).await.is_err() {
                break;
            }
            sent += 1;
        }
        Ok(sent)
    })
}
