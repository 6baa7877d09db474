//! Stabilizer service with statum state machine for lifecycle safety.
//!
//! Runs the [`PipelineManager`] in its own tokio task. Motion frames come
//! in over an mpsc channel from the device tracker, stabilized frames go
//! out over a watch channel to the recorder and the live display, and
//! control commands arrive on a separate mpsc channel that is drained
//! non-blockingly at frame boundaries, so the frame path never waits on
//! the control path.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Configured ──► Active ──► Deactivating ──► Deactivated
//!                     │              │           ▲
//!                     └──────────────┘           │
//!                       (activate)            (shutdown)
//! ```
//!
//! # Architecture
//!
//! ```text
//! MotionFrame ──► [PipelineManager] ──► StabilizedFrame
//!      ▲                 ▲                    │
//!      │          StabilizerCommand           ▼
//!  Input Channel   (drained per frame)  Watch Broadcast
//! ```

use crate::axis::{Axis, MotionFrame};
use crate::calibration::{AxisCalibration, CalibrationSet};
use crate::stabilizer::error::StabilizerError;
use crate::stabilizer::manager::PipelineManager;
use crate::stabilizer::preset::StabilizationPreset;
use crate::stabilizer::StabilizedFrame;
use chrono::Local;
use statum::{machine, state};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Control-path requests applied between frames.
#[derive(Clone, Debug)]
pub enum StabilizerCommand {
    /// Swap the stabilization preset for all axes, keeping stage state.
    SetPreset(StabilizationPreset),
    /// Freeze an axis at its current stabilized value.
    LockAxis(Axis),
    /// Resume live tracking for an axis, reseeding its stages.
    UnlockAxis(Axis),
    /// Lock if unlocked, unlock if locked.
    ToggleAxisLock(Axis),
    /// Replace one axis's calibration mapping (from the wizard).
    SetCalibration(Axis, AxisCalibration),
    /// Clear all stage state, e.g. when a new recording session starts.
    ResetAll,
}

/// States for the stabilizer service lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum StabilizerEngineState {
    Initializing, // Channels wired, no pipeline yet
    Configured,   // Pipeline manager built and validated
    Active,       // Processing frames in main loop
    Deactivating, // Shutting down gracefully
    Deactivated,  // Fully stopped
}

/// Stabilizer engine with compile-time state safety via statum
///
/// Owns the pipeline manager and the calibration set exclusively while
/// active; every state only exposes the operations that are valid in it.
#[machine]
pub struct StabilizerEngine<S: StabilizerEngineState> {
    frame_receiver: mpsc::Receiver<MotionFrame>,
    command_receiver: mpsc::Receiver<StabilizerCommand>,
    output_sender: watch::Sender<StabilizedFrame>,
    manager: Option<PipelineManager>,
    calibrations: CalibrationSet,
}

impl<S: StabilizerEngineState> StabilizerEngine<S> {
    /// Returns a fresh receiver for the stabilized frame broadcast.
    pub fn subscribe(&self) -> watch::Receiver<StabilizedFrame> {
        self.output_sender.subscribe()
    }
}

impl StabilizerEngine<Initializing> {
    pub fn create(
        frame_receiver: mpsc::Receiver<MotionFrame>,
        command_receiver: mpsc::Receiver<StabilizerCommand>,
    ) -> Self {
        info!("Initializing stabilizer engine");

        let (output_sender, _) = watch::channel(StabilizedFrame::default());
        debug!("Created watch channel for stabilized frame broadcasts");

        Self::new(
            frame_receiver,
            command_receiver,
            output_sender,
            None,                    // manager
            CalibrationSet::default(), // calibrations
        )
    }

    /// Builds the pipeline manager and transitions to Configured.
    ///
    /// The preset's parameter table is validated here, before any frame
    /// can reach it.
    pub fn configure(
        mut self,
        preset: StabilizationPreset,
        calibrations: CalibrationSet,
    ) -> Result<StabilizerEngine<Configured>, StabilizerError> {
        info!("Configuring stabilizer engine with preset: {}", preset);

        preset.config().validate()?;
        self.manager = Some(PipelineManager::with_preset(preset));
        self.calibrations = calibrations;

        info!("Stabilizer engine configured successfully");
        Ok(self.transition())
    }
}

impl StabilizerEngine<Configured> {
    pub fn activate(self) -> StabilizerEngine<Active> {
        info!("Activating stabilizer engine");
        self.transition()
    }
}

impl StabilizerEngine<Active> {
    /// Applies all pending control commands. Non-blocking; returns how
    /// many were handled.
    fn drain_commands(&mut self) -> u64 {
        let mut handled = 0;
        while let Ok(command) = self.command_receiver.try_recv() {
            self.apply_command(command);
            handled += 1;
        }
        handled
    }

    fn apply_command(&mut self, command: StabilizerCommand) {
        let manager = match &mut self.manager {
            Some(manager) => manager,
            None => {
                error!("No pipeline manager available for command: {:?}", command);
                return;
            }
        };

        match command {
            StabilizerCommand::SetPreset(preset) => manager.set_preset(preset),
            StabilizerCommand::LockAxis(axis) => {
                manager.lock_axis(axis);
            }
            StabilizerCommand::UnlockAxis(axis) => manager.unlock_axis(axis),
            StabilizerCommand::ToggleAxisLock(axis) => {
                if manager.is_locked(axis) {
                    manager.unlock_axis(axis);
                } else {
                    manager.lock_axis(axis);
                }
            }
            StabilizerCommand::SetCalibration(axis, calibration) => {
                debug!("Updating calibration for axis {}", axis);
                self.calibrations[axis] = calibration;
            }
            StabilizerCommand::ResetAll => manager.reset_all(),
        }
    }

    /// Runs one motion frame through every axis pipeline and broadcasts
    /// the result.
    fn process_frame(&mut self, frame: MotionFrame) {
        let manager = match &mut self.manager {
            Some(manager) => manager,
            None => {
                error!("No pipeline manager available, dropping frame");
                return;
            }
        };

        let mut output = StabilizedFrame {
            raw: frame.values,
            timestamp: frame.timestamp,
            ..StabilizedFrame::default()
        };

        for axis in Axis::ALL {
            let calibration = self.calibrations[axis];
            output.mapped[axis] = manager.process(
                axis,
                frame.values[axis],
                frame.timestamp,
                move |raw| calibration.map_value(raw),
            );
        }
        output.locked = manager.lock_flags();

        if self.output_sender.send(output).is_err() {
            // All receivers gone; keep processing so state stays warm for
            // late subscribers.
            debug!("No subscribers for stabilized frames");
        }
    }

    /// Main processing loop with graceful shutdown support
    ///
    /// Runs until the shutdown signal fires or the frame channel closes.
    /// Control commands are applied before each frame so a preset change
    /// and the frames following it stay ordered.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<StabilizerEngine<Deactivating>, StabilizerError> {
        info!("Starting stabilizer processing loop");

        // Throughput stats, logged every 30 seconds
        let mut frames: u64 = 0;
        let mut commands: u64 = 0;
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for stabilizer");
                    break;
                }

                maybe_frame = self.frame_receiver.recv() => {
                    match maybe_frame {
                        Some(frame) => {
                            commands += self.drain_commands();
                            self.process_frame(frame);
                            frames += 1;

                            let now = Local::now();
                            if now - last_stats_time > stats_interval {
                                let elapsed = (now - last_stats_time).num_seconds();
                                info!(
                                    "Stabilizer stats: {} frames, {} commands in {} seconds ({:.1} fps)",
                                    frames,
                                    commands,
                                    elapsed,
                                    frames as f64 / elapsed.max(1) as f64
                                );
                                frames = 0;
                                commands = 0;
                                last_stats_time = now;
                            }
                        }
                        None => {
                            warn!("Frame channel closed, stopping stabilizer");
                            break;
                        }
                    }
                }
            }
        }

        info!("Transitioning to Deactivating state");
        Ok(self.transition())
    }
}

impl StabilizerEngine<Deactivating> {
    /// Final cleanup and transition to Deactivated.
    pub fn shutdown(self) -> StabilizerEngine<Deactivated> {
        info!("Stabilizer engine shut down");
        self.transition()
    }
}

impl StabilizerEngine<Deactivated> {}

/// Handle for managing the stabilizer service in a tokio task
///
/// Provides lifecycle management plus a typed command surface for the UI
/// collaborator. Dropping the handle without calling
/// [`shutdown`](Self::shutdown) leaves the task running until the frame
/// channel closes.
#[derive(Debug)]
pub struct StabilizerHandle {
    command_sender: mpsc::Sender<StabilizerCommand>,
    output_receiver: watch::Receiver<StabilizedFrame>,
    task_handle: Option<JoinHandle<Result<(), StabilizerError>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl StabilizerHandle {
    /// Builds the engine, activates it and spawns the processing loop.
    ///
    /// # Returns
    ///
    /// The handle carrying the command sender and a watch receiver for
    /// stabilized frames.
    pub fn spawn(
        preset: StabilizationPreset,
        calibrations: CalibrationSet,
        frame_receiver: mpsc::Receiver<MotionFrame>,
    ) -> Result<Self, StabilizerError> {
        let (command_sender, command_receiver) = mpsc::channel(64);

        let engine = StabilizerEngine::create(frame_receiver, command_receiver)
            .configure(preset, calibrations)?;
        let output_receiver = engine.subscribe();
        let active_engine = engine.activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task_handle = tokio::spawn(async move {
            info!("Stabilizer task started");
            match active_engine.run_until_shutdown(shutdown_rx).await {
                Ok(deactivating_engine) => {
                    let _ = deactivating_engine.shutdown();
                    Ok(())
                }
                Err(e) => {
                    error!("Error running stabilizer engine: {}", e);
                    Err(e)
                }
            }
        });

        info!("Stabilizer service activated");
        Ok(Self {
            command_sender,
            output_receiver,
            task_handle: Some(task_handle),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Returns a receiver for the stabilized frame broadcast.
    pub fn subscribe(&self) -> watch::Receiver<StabilizedFrame> {
        self.output_receiver.clone()
    }

    /// Queues a control command for the next frame boundary.
    pub fn send_command(&self, command: StabilizerCommand) -> Result<(), StabilizerError> {
        self.command_sender
            .try_send(command)
            .map_err(|e| StabilizerError::ChannelError(format!("Failed to queue command: {}", e)))
    }

    pub fn set_preset(&self, preset: StabilizationPreset) -> Result<(), StabilizerError> {
        self.send_command(StabilizerCommand::SetPreset(preset))
    }

    pub fn lock_axis(&self, axis: Axis) -> Result<(), StabilizerError> {
        self.send_command(StabilizerCommand::LockAxis(axis))
    }

    pub fn unlock_axis(&self, axis: Axis) -> Result<(), StabilizerError> {
        self.send_command(StabilizerCommand::UnlockAxis(axis))
    }

    /// Gracefully shuts down the engine and waits for task completion
    pub async fn shutdown(&mut self) -> Result<(), StabilizerError> {
        debug!("Sending shutdown signal to stabilizer");

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Stabilizer task already terminated");
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Stabilizer task completed");
                    result
                }
                Err(e) => {
                    error!("Stabilizer task panicked: {}", e);
                    Err(StabilizerError::ThreadError(format!(
                        "Stabilizer task panicked: {}",
                        e
                    )))
                }
            }
        } else {
            debug!("Stabilizer already shut down");
            Ok(())
        }
    }
}
