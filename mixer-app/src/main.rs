//! mediamix-sim - simulated capture harness for the mixer engine.
//!
//! Wires the in-process sim backend into a [`Mixer`], captures synthetic
//! audio and video through the sync gate into the passthrough encoder, and
//! optionally plays the encoded packets back through the pacing link.

mod args;
mod harness;

use std::fs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediamix_capture::sim::{SimCaptureUnit, SimDevice, SimSessionFactory};
use mediamix_capture::DeviceFormat;
use mediamix_codec::EncodedPacket;
use mediamix_engine::Mixer;
use mediamix_ipc::{event_channel, MixerConfig, MixerEvent, Sample};

use crate::args::Args;

const PLAYBACK_DRAIN: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    run(args)
}

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "mediamix_sim=debug,mediamix_engine=debug,mediamix_capture=debug,mediamix_codec=debug,mediamix_link=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(args: &Args) -> Result<MixerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => MixerConfig::default(),
    };
    args.apply(&mut config);
    Ok(config)
}

/// Formats offered by the simulated camera. The first one is active at
/// startup and does not fit the HD presets.
fn camera_formats() -> Vec<DeviceFormat> {
    vec![
        DeviceFormat::new(640, 480, 30, true),
        DeviceFormat::new(1280, 720, 60, false),
        DeviceFormat::new(1920, 1080, 30, true),
        DeviceFormat::new(3840, 2160, 30, true),
    ]
}

#[derive(Debug, Default)]
struct EventSummary {
    audio_outputs: u64,
    video_outputs: u64,
    interruptions: u64,
    running_changes: u64,
    buffering_changes: u64,
}

fn spawn_event_logger(event_rx: Receiver<MixerEvent>) -> Result<JoinHandle<EventSummary>> {
    let handle = thread::Builder::new()
        .name("mediamix-events".into())
        .spawn(move || {
            let mut summary = EventSummary::default();
            for event in event_rx.iter() {
                match event {
                    MixerEvent::AudioOutput { .. } => summary.audio_outputs += 1,
                    MixerEvent::VideoOutput(_) => summary.video_outputs += 1,
                    MixerEvent::SessionInterrupted { reason } => {
                        summary.interruptions += 1;
                        info!(?reason, code = reason.code(), "Session interrupted");
                    }
                    MixerEvent::SessionInterruptionEnded { reason } => {
                        info!(?reason, "Session interruption ended");
                    }
                    MixerEvent::RunningChanged { is_running } => {
                        summary.running_changes += 1;
                        info!(is_running, "Session running state changed");
                    }
                    MixerEvent::BufferingChanged { is_buffering } => {
                        summary.buffering_changes += 1;
                        debug!(is_buffering, "Playback buffering changed");
                    }
                }
            }
            summary
        })?;
    Ok(handle)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    info!(?config, "mediamix-sim starting");

    let factory = Arc::new(SimSessionFactory::new());
    let device = Arc::new(SimDevice::new("sim-camera", camera_formats()));
    let mic = Arc::new(SimCaptureUnit::microphone());
    let camera = Arc::new(SimCaptureUnit::camera(device));

    let (event_tx, event_rx) = event_channel();
    let events = spawn_event_logger(event_rx)?;

    let mixer = Arc::new(Mixer::with_passthrough(
        &config,
        factory.clone(),
        mic,
        camera,
        event_tx,
    )?);

    mixer.start_running();
    if !mixer.is_running() {
        warn!("Capture session did not start");
    }

    // Encode
    let (packet_tx, packet_rx) = crossbeam_channel::unbounded::<EncodedPacket>();
    let collector = thread::Builder::new()
        .name("mediamix-packets".into())
        .spawn(move || packet_rx.iter().collect::<Vec<_>>())?;

    mixer.start_encoding(packet_tx);
    let (audio, video) = harness::spawn_sources(
        &mixer,
        Duration::from_millis(args.video_delay),
        args.fps,
    )?;

    let duration = Duration::from_millis(args.duration);
    thread::sleep(duration / 2);
    for fault in &args.inject {
        harness::inject(&factory, *fault);
    }
    thread::sleep(duration - duration / 2);

    let audio_admitted = audio.stop();
    let video_admitted = video.stop();
    if let Some(offset) = mixer.av_offset() {
        info!(offset_ms = offset * 1000.0, "Audio started after video anchor");
    }
    mixer.stop_encoding();

    let packets = collector
        .join()
        .map_err(|_| anyhow!("Packet collector panicked"))?;
    info!(
        packets = packets.len(),
        audio_admitted, video_admitted, "Encoding finished"
    );

    if args.playback {
        play_back(&mixer, &packets)?;
    }

    mixer.stop_running();
    println!("{}", serde_json::to_string_pretty(&mixer.metrics())?);

    drop(mixer);
    let summary = events
        .join()
        .map_err(|_| anyhow!("Event logger panicked"))?;
    info!(?summary, "Done");

    Ok(())
}

/// Feed encoded packets back at the pace they were captured.
fn play_back(mixer: &Mixer, packets: &[EncodedPacket]) -> Result<()> {
    // Audio and video were collected from separate threads.
    let mut ordered = packets.to_vec();
    ordered.sort_by_key(|p| p.pts);

    let Some(first_pts) = ordered.first().map(|p| p.pts) else {
        warn!("Nothing to play back");
        return Ok(());
    };

    info!(packets = ordered.len(), "Starting playback");
    mixer.start_decoding(mixer.event_output())?;

    let origin = Instant::now();
    for packet in ordered {
        let due = origin + Duration::from_secs_f64(packet.pts.seconds_since(first_pts));
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        mixer.enqueue_for_playback(Sample::new(packet.media_type, packet.pts, packet.data));
    }

    // Let the link drain what is still queued.
    thread::sleep(PLAYBACK_DRAIN);

    mixer.stop_decoding();
    Ok(())
}
