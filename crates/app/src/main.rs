use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    thread,
};

use clap::{Parser, Subcommand};
use moodlight_core::{
    AnalysisEngine, AppConfig, ChannelVector, ControlFrame, ControlPayload, Dispatcher,
    MoodlightError, PlaybackClock, SampleClock, SpectrumAnalyser,
};
use tracing_subscriber::EnvFilter;

/// Control frames buffered between the analysis loop and the dispatcher.
const CONTROL_QUEUE: usize = 8;

fn main() -> moodlight_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyse {
            input,
            dispatch,
            realtime,
        } => run_analyse(&config, input.as_deref(), dispatch, dispatch || realtime),
        Commands::Relay => run_relay(&config),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_analyse(
    config: &AppConfig,
    input: Option<&Path>,
    dispatch: bool,
    realtime: bool,
) -> moodlight_core::Result<()> {
    tracing::info!(?input, dispatch, realtime, "starting analysis");

    let reader: Box<dyn Read> = match input {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };
    let mut reader = BufReader::new(reader);
    let mut analyser = SpectrumAnalyser::new(&config.audio)?;
    let mut engine = AnalysisEngine::new();
    let mut clock = SampleClock::new(config.audio.sample_rate, config.audio.tick_rate_hz);
    let hop = clock.hop_size();

    let mut sink = if dispatch {
        FrameSink::Dispatch(DispatchThread::spawn(config)?)
    } else {
        FrameSink::Stdout(BufWriter::new(io::stdout().lock()))
    };

    let mut block = vec![0u8; hop * 4];
    let mut ticks = 0u64;
    let wall = PlaybackClock::start();
    loop {
        let filled = read_block(&mut reader, &mut block)?;
        if filled == 0 {
            break;
        }
        let samples: Vec<f32> = block[..filled]
            .chunks_exact(4)
            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();

        let frame = analyser.process(&samples)?;
        let now_ms = clock.advance(samples.len());
        let analysed = engine.process(&frame, now_ms);
        if analysed.onset {
            tracing::debug!(time_ms = now_ms, bpm = analysed.bpm, mood = %analysed.mood, "onset");
        }
        if realtime {
            wall.wait_until(now_ms);
        }
        sink.send(analysed.control_frame())?;
        ticks += 1;
    }

    sink.finish()?;
    tracing::info!(ticks, bpm = engine.beat_state().bpm_estimate(), "analysis finished");
    Ok(())
}

fn run_relay(config: &AppConfig) -> moodlight_core::Result<()> {
    let mut dispatcher = Dispatcher::from_settings(&config.adapters)?;
    tracing::info!(adapters = ?dispatcher.enabled(), "relaying control frames from stdin");

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match ControlPayload::parse_message(&line) {
            Ok(payload) => {
                let report = dispatcher.dispatch_payload(&payload);
                tracing::trace!(?report, "frame dispatched");
            }
            Err(err) => tracing::warn!(error = %err, "discarding control message"),
        }
    }

    dispatcher.shutdown();
    Ok(())
}

/// Reads until `buf` is full or the input ends, returning whole samples only.
fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled - filled % 4)
}

enum FrameSink<W: Write> {
    Stdout(W),
    Dispatch(DispatchThread),
}

impl<W: Write> FrameSink<W> {
    fn send(&mut self, frame: ControlFrame) -> moodlight_core::Result<()> {
        match self {
            FrameSink::Stdout(out) => {
                writeln!(out, "{}", frame.to_message()?)?;
                Ok(())
            }
            FrameSink::Dispatch(thread) => thread.send(frame),
        }
    }

    fn finish(self) -> moodlight_core::Result<()> {
        match self {
            FrameSink::Stdout(mut out) => Ok(out.flush()?),
            FrameSink::Dispatch(thread) => thread.join(),
        }
    }
}

/// Dispatcher running behind a channel so the analysis loop never waits on it.
struct DispatchThread {
    frames: crossbeam_channel::Sender<ControlFrame>,
    handle: thread::JoinHandle<()>,
    dropped: u64,
}

impl DispatchThread {
    fn spawn(config: &AppConfig) -> moodlight_core::Result<Self> {
        let mut dispatcher = Dispatcher::from_settings(&config.adapters)?;
        tracing::info!(adapters = ?dispatcher.enabled(), "dispatching in-process");

        let (frames, inbox) = crossbeam_channel::bounded::<ControlFrame>(CONTROL_QUEUE);
        let handle = thread::Builder::new()
            .name("dispatcher".to_string())
            .spawn(move || {
                for frame in inbox.iter() {
                    let channels = ChannelVector::from_frame(&frame);
                    dispatcher.dispatch(&channels, frame.mood.as_str());
                }
                dispatcher.shutdown();
            })?;

        Ok(Self {
            frames,
            handle,
            dropped: 0,
        })
    }

    fn send(&mut self, frame: ControlFrame) -> moodlight_core::Result<()> {
        match self.frames.try_send(frame) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::debug!(dropped = self.dropped, "dispatcher busy, dropping frame");
                Ok(())
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                Err(MoodlightError::msg("dispatcher thread stopped"))
            }
        }
    }

    fn join(self) -> moodlight_core::Result<()> {
        if self.dropped > 0 {
            tracing::warn!(dropped = self.dropped, "control frames dropped before dispatch");
        }
        drop(self.frames);
        self.handle
            .join()
            .map_err(|_| MoodlightError::msg("dispatcher thread panicked"))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive lighting bridge", long_about = None)]
struct Cli {
    /// JSON configuration file. Environment variables override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse little-endian f32 mono PCM and emit control frames.
    Analyse {
        /// PCM file to read instead of stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Send frames straight to the lighting adapters instead of stdout.
        /// Implies --realtime.
        #[arg(short, long)]
        dispatch: bool,
        /// Emit one frame per tick in wall-clock time instead of as fast as
        /// the input can be read.
        #[arg(short, long)]
        realtime: bool,
    },
    /// Read control frames as JSON lines from stdin and dispatch them.
    Relay,
    /// Print the effective configuration.
    Config,
}
