//! Output streams: declaration plus the sinks samples are pushed into.

use anyhow::{ensure, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Float32,
}

/// Identity and shape of one published stream. Immutable once opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDecl {
    pub name: String,
    /// Content type tag consumers filter on, e.g. `physio` or `metrics`.
    pub kind: String,
    pub channel_count: usize,
    /// Nominal sampling rate in Hz, 0 for irregular streams.
    pub nominal_rate: f64,
    pub format: SampleFormat,
    pub source_id: String,
}

impl StreamDecl {
    pub fn new(
        name: &str,
        kind: &str,
        channel_count: usize,
        nominal_rate: f64,
        source_id: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            channel_count,
            nominal_rate,
            format: SampleFormat::Float32,
            source_id: source_id.to_string(),
        }
    }

    pub fn ekg_raw(fs: f64) -> Self {
        Self::new("EKG_raw", "physio", 1, fs, "ekg_raw_001")
    }

    pub fn rsp_raw(fs: f64) -> Self {
        Self::new("RSP_raw", "physio", 1, fs, "rsp_raw_001")
    }

    /// Irregular metrics stream carrying `[rate, variability]` per channel.
    pub fn metrics(channels: usize) -> Self {
        Self::new("physio_metrics", "metrics", channels * 2, 0.0, "metrics_001")
    }

    pub fn breath_belt(fs: f64) -> Self {
        Self::new("RSP_raw", "physio", 1, fs, "myuid34234")
    }

    pub fn heart_rate() -> Self {
        Self::new("physio_metrics", "metrics", 1, 0.0, "polar-verity-001")
    }

    fn check(&self, values: &[f32]) -> Result<()> {
        ensure!(
            values.len() == self.channel_count,
            "stream {} expects {} channel(s), got {}",
            self.name,
            self.channel_count,
            values.len()
        );
        Ok(())
    }
}

/// Destination for the samples of one declared stream.
pub trait SampleSink {
    fn decl(&self) -> &StreamDecl;
    fn push_sample(&mut self, values: &[f32]) -> Result<()>;
}

/// Discards samples after validating their shape.
pub struct NullSink {
    decl: StreamDecl,
}

impl NullSink {
    pub fn new(decl: StreamDecl) -> Self {
        Self { decl }
    }
}

impl SampleSink for NullSink {
    fn decl(&self) -> &StreamDecl {
        &self.decl
    }
    fn push_sample(&mut self, values: &[f32]) -> Result<()> {
        self.decl.check(values)
    }
}

pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

pub fn shared_writer<W: Write + Send + 'static>(writer: W) -> SharedWriter {
    Arc::new(Mutex::new(Box::new(writer)))
}

#[derive(Serialize)]
struct JsonLine<'a> {
    stream: &'a str,
    values: &'a [f32],
}

/// Writes one `{"stream": .., "values": [..]}` object per line.
///
/// Several streams may share a writer; lines are never interleaved.
pub struct JsonLinesSink {
    decl: StreamDecl,
    writer: SharedWriter,
}

impl JsonLinesSink {
    pub fn new(decl: StreamDecl, writer: SharedWriter) -> Self {
        Self { decl, writer }
    }
}

impl SampleSink for JsonLinesSink {
    fn decl(&self) -> &StreamDecl {
        &self.decl
    }
    fn push_sample(&mut self, values: &[f32]) -> Result<()> {
        self.decl.check(values)?;
        let line = serde_json::to_string(&JsonLine {
            stream: &self.decl.name,
            values,
        })?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("json-lines writer poisoned"))?;
        writeln!(writer, "{}", line)
            .with_context(|| format!("writing sample for {}", self.decl.name))?;
        Ok(())
    }
}

/// Samples pushed into a [`MemorySink`], shared with whoever holds the log.
pub type SampleLog = Arc<Mutex<Vec<Vec<f32>>>>;

/// Keeps every pushed sample in memory.
pub struct MemorySink {
    decl: StreamDecl,
    log: SampleLog,
}

impl MemorySink {
    pub fn new(decl: StreamDecl) -> (Self, SampleLog) {
        let log: SampleLog = Arc::default();
        (
            Self {
                decl,
                log: log.clone(),
            },
            log,
        )
    }
}

impl SampleSink for MemorySink {
    fn decl(&self) -> &StreamDecl {
        &self.decl
    }
    fn push_sample(&mut self, values: &[f32]) -> Result<()> {
        self.decl.check(values)?;
        self.log
            .lock()
            .map_err(|_| anyhow::anyhow!("sample log poisoned"))?
            .push(values.to_vec());
        Ok(())
    }
}

/// Where newly opened streams go.
#[derive(Clone)]
pub enum SinkTarget {
    Null,
    JsonLines(SharedWriter),
    #[cfg(feature = "lsl")]
    Lsl,
}

impl SinkTarget {
    pub fn open(&self, decl: StreamDecl) -> Result<Box<dyn SampleSink>> {
        info!(
            "opening stream {} (type {}, {} ch @ {} Hz, id {})",
            decl.name, decl.kind, decl.channel_count, decl.nominal_rate, decl.source_id
        );
        Ok(match self {
            SinkTarget::Null => Box::new(NullSink::new(decl)),
            SinkTarget::JsonLines(writer) => Box::new(JsonLinesSink::new(decl, writer.clone())),
            #[cfg(feature = "lsl")]
            SinkTarget::Lsl => Box::new(lsl_outlet::LslSink::open(decl)?),
        })
    }
}

/// A stream seen on the network during discovery.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredStream {
    pub name: String,
    pub kind: String,
    pub channel_count: usize,
    pub nominal_rate: f64,
    pub source_id: String,
}

#[cfg(feature = "lsl")]
pub use lsl_outlet::discover_streams;

#[cfg(feature = "lsl")]
mod lsl_outlet {
    use super::{DiscoveredStream, SampleSink, StreamDecl};
    use anyhow::{anyhow, Result};
    use lsl::Pushable;

    pub struct LslSink {
        decl: StreamDecl,
        outlet: lsl::StreamOutlet,
    }

    impl LslSink {
        pub fn open(decl: StreamDecl) -> Result<Self> {
            let info = lsl::StreamInfo::new(
                &decl.name,
                &decl.kind,
                decl.channel_count as u32,
                decl.nominal_rate,
                lsl::ChannelFormat::Float32,
                &decl.source_id,
            )
            .map_err(|err| anyhow!("Failed to describe LSL stream {}: {err:?}", decl.name))?;
            let outlet = lsl::StreamOutlet::new(&info, 0, 360)
                .map_err(|err| anyhow!("Failed to open LSL outlet {}: {err:?}", decl.name))?;
            Ok(Self { decl, outlet })
        }
    }

    impl SampleSink for LslSink {
        fn decl(&self) -> &StreamDecl {
            &self.decl
        }
        fn push_sample(&mut self, values: &[f32]) -> Result<()> {
            self.decl.check(values)?;
            self.outlet
                .push_sample(&values.to_vec())
                .map_err(|err| anyhow!("LSL push to {} failed: {err:?}", self.decl.name))
        }
    }

    /// Resolve every stream visible within `wait_s` seconds.
    pub fn discover_streams(wait_s: f64) -> Result<Vec<DiscoveredStream>> {
        let infos = lsl::resolve_streams(wait_s)
            .map_err(|err| anyhow!("Stream discovery failed: {err:?}"))?;
        Ok(infos
            .into_iter()
            .map(|info| DiscoveredStream {
                name: info.stream_name(),
                kind: info.stream_type(),
                channel_count: info.channel_count().max(0) as usize,
                nominal_rate: info.nominal_srate().max(0.0),
                source_id: info.source_id(),
            })
            .collect())
    }
}
