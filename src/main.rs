use color_eyre::{eyre::eyre, Result};
use std::f64::consts::TAU;
use steadyaxis::axis::{Axis, AxisMap, MotionFrame};
use steadyaxis::calibration::demo_rig;
use steadyaxis::settings::Settings;
use steadyaxis::stabilizer::{StabilizationPreset, StabilizedFrame, StabilizerHandle};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const SAMPLE_RATE_HZ: f64 = 90.0;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let mut settings = Settings::load_or_default();
    info!("Starting with stabilization preset: {}", settings.preset);

    let (frame_tx, frame_rx) = mpsc::channel(256);

    let mut stabilizer = StabilizerHandle::spawn(settings.preset, demo_rig(), frame_rx)
        .map_err(|e| eyre!("Failed to spawn stabilizer: {}", e))?;
    let mut output = stabilizer.subscribe();

    // Synthetic 90 Hz motion source standing in for the device tracker:
    // slow sinusoidal motion plus jitter, with a tracking glitch every
    // couple of seconds.
    let source = tokio::spawn(async move {
        let mut ticker = interval(Duration::from_micros(11_111));
        let mut noise: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut frame_index: u64 = 0;

        loop {
            ticker.tick().await;
            let t = frame_index as f64 / SAMPLE_RATE_HZ;

            let mut values = AxisMap::<f64>::default();
            values[Axis::Stroke] = 0.2 * (TAU * 0.5 * t).sin() + 0.004 * jitter(&mut noise);
            values[Axis::Surge] = 0.05 * (TAU * 0.2 * t).sin() + 0.004 * jitter(&mut noise);
            values[Axis::Sway] = 0.004 * jitter(&mut noise);
            values[Axis::Twist] = 10.0 * (TAU * 0.1 * t).sin() + 0.8 * jitter(&mut noise);
            values[Axis::Roll] = 30.0 * (TAU * 0.3 * t).sin() + 0.8 * jitter(&mut noise);
            values[Axis::Pitch] = 0.8 * jitter(&mut noise);

            // Single-frame tracking glitch on the stroke axis
            if frame_index % 180 == 90 {
                values[Axis::Stroke] += 0.6;
            }

            if frame_tx.send(MotionFrame::new(values, t)).await.is_err() {
                break;
            }
            frame_index += 1;
        }
    });

    observe(&mut output, 90).await?;

    info!("Switching to heavy stabilization");
    stabilizer
        .set_preset(StabilizationPreset::Heavy)
        .map_err(|e| eyre!("Preset change failed: {}", e))?;
    settings.preset = StabilizationPreset::Heavy;
    observe(&mut output, 90).await?;

    info!("Locking stroke axis");
    stabilizer
        .lock_axis(Axis::Stroke)
        .map_err(|e| eyre!("Lock failed: {}", e))?;
    observe(&mut output, 45).await?;

    info!("Unlocking stroke axis");
    stabilizer
        .unlock_axis(Axis::Stroke)
        .map_err(|e| eyre!("Unlock failed: {}", e))?;
    observe(&mut output, 45).await?;

    stabilizer
        .shutdown()
        .await
        .map_err(|e| eyre!("Shutdown failed: {}", e))?;
    source.abort();

    if let Err(e) = settings.save() {
        warn!("Could not persist settings: {}", e);
    }

    Ok(())
}

/// Follows the stabilized broadcast for `frames` frames, logging a
/// snapshot every 30th.
async fn observe(output: &mut watch::Receiver<StabilizedFrame>, frames: u32) -> Result<()> {
    for i in 0..frames {
        output.changed().await?;
        if i % 30 == 0 {
            let frame = *output.borrow();
            info!(
                "t={:6.2}s  stroke {:5.1}{} twist {:5.1} roll {:5.1}",
                frame.timestamp,
                frame.mapped[Axis::Stroke],
                if frame.locked[Axis::Stroke] { " [locked]" } else { "" },
                frame.mapped[Axis::Twist],
                frame.mapped[Axis::Roll],
            );
        }
    }
    Ok(())
}

/// Deterministic pseudo-noise in [-0.5, 0.5]; keeps the demo reproducible
/// without pulling in an RNG.
fn jitter(state: &mut u64) -> f64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    ((*state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
