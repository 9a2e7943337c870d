pub mod config;
pub mod driver;
pub mod outlet;
pub mod record;
pub mod relay;

pub use config::{read_session, SessionConfig, SessionFile, Waveform};
pub use driver::{
    format_status, run_offline, run_realtime, synthetic_session, ChannelState, MetricsCadence,
    Session,
};
pub use outlet::{shared_writer, SampleSink, SinkTarget, StreamDecl};
pub use record::{read_metrics_tsv, MetricsRecorder};
pub use relay::{spawn_line_feed, DeviceRelay, RelayStats};
