use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use physio_lib::{
    io::text as text_io,
    source::{DeviceChannel, MinMaxNormalizer, PayloadLayout},
    AnalysisProfile, SignalKind,
};
use physio_run::{
    config::{check_window, read_session, SessionConfig, SessionFile, Waveform},
    driver::{format_status, run_offline, run_realtime, synthetic_session},
    outlet::{shared_writer, SharedWriter, SinkTarget, StreamDecl},
    record::MetricsRecorder,
    relay::{spawn_line_feed, DeviceRelay, QUEUE_DEPTH},
};
use std::{
    cell::Cell,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "physio",
    version,
    about = "Stream synthetic and device physiological signals with live rate metrics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// Lab Streaming Layer outlets (needs the `lsl` feature)
    Lsl,
    /// One JSON object per sample, written to --out
    Jsonl,
    /// Discard samples
    Null,
}

impl SinkKind {
    fn default_for_build() -> Self {
        if cfg!(feature = "lsl") {
            SinkKind::Lsl
        } else {
            SinkKind::Null
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum WaveformArg {
    Pqrst,
    Sine,
}

impl From<WaveformArg> for Waveform {
    fn from(arg: WaveformArg) -> Self {
        match arg {
            WaveformArg::Pqrst => Waveform::Pqrst,
            WaveformArg::Sine => Waveform::Sine,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum KindArg {
    Cardiac,
    Respiratory,
}

impl From<KindArg> for SignalKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Cardiac => SignalKind::Cardiac,
            KindArg::Respiratory => SignalKind::Respiratory,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LayoutArg {
    #[value(name = "breath-belt")]
    BreathBelt,
    #[value(name = "heart-rate")]
    HeartRate,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish synthetic ECG and respiration plus live rate/variability metrics
    Simulate {
        /// TOML session file; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        fs: Option<f64>,
        #[arg(long)]
        window_s: Option<f64>,
        #[arg(long)]
        metrics_period_s: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_enum)]
        waveform: Option<WaveformArg>,
        #[arg(long, value_enum, default_value_t = SinkKind::default_for_build())]
        sink: SinkKind,
        /// Destination of the jsonl sink
        #[arg(long)]
        out: Option<PathBuf>,
        /// Append every metrics frame to this TSV file
        #[arg(long)]
        record: Option<PathBuf>,
        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        duration: Option<f64>,
        /// Run on a simulated clock as fast as possible; requires --duration
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
    /// Normalize and republish device notifications given as hex lines on stdin or --input
    Relay {
        #[arg(long, value_enum, default_value_t = LayoutArg::BreathBelt)]
        layout: LayoutArg,
        #[arg(long)]
        input: Option<PathBuf>,
        /// Nominal notification rate of the belt (Hz)
        #[arg(long, default_value_t = 12.0)]
        rate: f64,
        /// Length of the min/max normalization window (seconds)
        #[arg(long, default_value_t = 20.0)]
        normalization_s: f64,
        /// Publish decoded values without normalization
        #[arg(long, default_value_t = false)]
        raw: bool,
        #[arg(long, value_enum, default_value_t = SinkKind::default_for_build())]
        sink: SinkKind,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Detect peaks and estimate rate for newline-delimited samples from stdin or --input
    Detect {
        #[arg(long, value_enum, default_value_t = KindArg::Cardiac)]
        kind: KindArg,
        #[arg(long, default_value_t = 100.0)]
        fs: f64,
        #[arg(long)]
        threshold_k: Option<f64>,
        #[arg(long)]
        min_distance_s: Option<f64>,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// List streams visible on the network
    ListStreams {
        /// Seconds to wait for stream announcements
        #[arg(long, default_value_t = 5.0)]
        wait: f64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate {
            config,
            fs,
            window_s,
            metrics_period_s,
            seed,
            waveform,
            sink,
            out,
            record,
            duration,
            offline,
        } => {
            let file = match config.as_deref() {
                Some(path) => read_session(path)?,
                None => SessionFile::default(),
            };
            let mut cfg = SessionConfig::from_file(&file);
            if let Some(fs) = fs {
                cfg.fs = fs;
            }
            if let Some(window_s) = window_s {
                cfg.window_s = window_s;
            }
            if let Some(period) = metrics_period_s {
                cfg.metrics_period_s = period;
            }
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            if let Some(waveform) = waveform {
                cfg.waveform = waveform.into();
            }
            cmd_simulate(
                &cfg,
                sink,
                out.as_deref(),
                record.as_deref(),
                duration,
                offline,
            )
            .await?
        }
        Commands::Relay {
            layout,
            input,
            rate,
            normalization_s,
            raw,
            sink,
            out,
        } => {
            cmd_relay(
                layout,
                input.as_deref(),
                rate,
                normalization_s,
                raw,
                sink,
                out.as_deref(),
            )
            .await?
        }
        Commands::Detect {
            kind,
            fs,
            threshold_k,
            min_distance_s,
            input,
        } => cmd_detect(
            kind.into(),
            fs,
            threshold_k,
            min_distance_s,
            input.as_deref(),
        )?,
        Commands::ListStreams { wait } => cmd_list_streams(wait)?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn open_target(kind: SinkKind, out: Option<&Path>) -> Result<(SinkTarget, Option<SharedWriter>)> {
    match kind {
        SinkKind::Null => Ok((SinkTarget::Null, None)),
        SinkKind::Jsonl => {
            let path = out.context("--sink jsonl needs --out <file>")?;
            let file = File::create(path)
                .with_context(|| format!("creating sample output {}", path.display()))?;
            let writer = shared_writer(BufWriter::new(file));
            Ok((SinkTarget::JsonLines(writer.clone()), Some(writer)))
        }
        #[cfg(feature = "lsl")]
        SinkKind::Lsl => Ok((SinkTarget::Lsl, None)),
        #[cfg(not(feature = "lsl"))]
        SinkKind::Lsl => bail!("this build has no LSL support; rebuild with --features lsl"),
    }
}

fn flush_writer(writer: Option<SharedWriter>) -> Result<()> {
    if let Some(writer) = writer {
        writer
            .lock()
            .map_err(|_| anyhow::anyhow!("sample writer poisoned"))?
            .flush()
            .context("flushing sample output")?;
    }
    Ok(())
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
}

async fn cmd_simulate(
    cfg: &SessionConfig,
    sink: SinkKind,
    out: Option<&Path>,
    record: Option<&Path>,
    duration: Option<f64>,
    offline: bool,
) -> Result<()> {
    cfg.validate()?;
    if let Some(d) = duration {
        if !(d.is_finite() && d >= 0.0) {
            bail!("duration must be a non-negative number of seconds, got {d}");
        }
    }
    let (target, writer) = open_target(sink, out)?;
    let mut session = synthetic_session(cfg, &target)?;
    let labels = session.labels();
    if let Some(path) = record {
        session = session.with_recorder(MetricsRecorder::create(path, &labels)?);
    }
    let print = |_: f64, frames: &[physio_lib::MetricsFrame]| {
        println!("{}", format_status(&labels, frames));
    };

    if offline {
        let duration = duration.context("--offline needs --duration")?;
        let frames = run_offline(&mut session, duration, print)?;
        log::info!("offline run finished: {frames} metrics frames");
    } else {
        let stopped = Cell::new(false);
        let shutdown = async {
            interrupted().await;
            stopped.set(true);
        };
        let frames = run_realtime(&mut session, duration, shutdown, print).await?;
        log::info!("realtime run finished: {frames} metrics frames");
        if stopped.get() {
            println!("Stopped.");
        }
    }
    flush_writer(writer)
}

async fn cmd_relay(
    layout: LayoutArg,
    input: Option<&Path>,
    rate: f64,
    normalization_s: f64,
    raw: bool,
    sink: SinkKind,
    out: Option<&Path>,
) -> Result<()> {
    let (layout, decl) = match layout {
        LayoutArg::BreathBelt => {
            check_window(rate, normalization_s).context("invalid belt settings")?;
            (PayloadLayout::BreathBelt, StreamDecl::breath_belt(rate))
        }
        LayoutArg::HeartRate => (PayloadLayout::HeartRate, StreamDecl::heart_rate()),
    };
    // Heart rate is already in physical units; only the belt amplitude is rescaled.
    let normalizer = match layout {
        PayloadLayout::BreathBelt if !raw => {
            Some(MinMaxNormalizer::with_seconds(rate, normalization_s))
        }
        _ => None,
    };

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening notification feed {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let (target, writer) = open_target(sink, out)?;
    let mut relay = DeviceRelay::new(DeviceChannel::new(layout, normalizer), target.open(decl)?);
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let feed = spawn_line_feed(reader, tx);

    let stopped = Cell::new(false);
    let shutdown = async {
        interrupted().await;
        stopped.set(true);
    };
    let stats = relay
        .run(rx, shutdown, |value| println!("{value:.4}"))
        .await?;
    log::info!(
        "relay finished: {} published, {} rejected",
        stats.published,
        stats.rejected
    );
    if stopped.get() {
        feed.abort();
        flush_writer(writer)?;
        println!("Stopped.");
        // A blocked stdin read would otherwise hold the runtime open.
        std::process::exit(0);
    }
    feed.await.context("notification feed task failed")??;
    flush_writer(writer)
}

fn cmd_detect(
    kind: SignalKind,
    fs: f64,
    threshold_k: Option<f64>,
    min_distance_s: Option<f64>,
    input: Option<&Path>,
) -> Result<()> {
    if !(fs.is_finite() && fs > 0.0) {
        bail!("sample rate must be positive, got {fs}");
    }
    let mut profile = AnalysisProfile::for_kind(kind);
    if let Some(k) = threshold_k {
        profile.threshold_k = k;
    }
    if let Some(d) = min_distance_s {
        profile.min_distance_s = d;
    }
    let data = read_samples(input)?;
    let analysis = profile.analyze(&data, fs);
    println!("{}", serde_json::to_string(&analysis)?);
    Ok(())
}

#[cfg(feature = "lsl")]
fn cmd_list_streams(wait: f64) -> Result<()> {
    let streams = physio_run::outlet::discover_streams(wait)?;
    if streams.is_empty() {
        println!("No streams found.");
    }
    for s in streams {
        println!(
            "{} | {} | {} ch | {} Hz | {}",
            s.name, s.kind, s.channel_count, s.nominal_rate, s.source_id
        );
    }
    Ok(())
}

#[cfg(not(feature = "lsl"))]
fn cmd_list_streams(_wait: f64) -> Result<()> {
    bail!("stream discovery needs LSL support; rebuild with --features lsl")
}
