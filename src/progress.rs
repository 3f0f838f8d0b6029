//! Cosmetic progress shown while the server prepares a file.
//!
//! The server sends nothing until the file is ready, so two timers stand in
//! for real feedback: one rotates status messages, the other creeps the bar
//! toward [`SIMULATED_CAP`]. Real byte counts take over once the body streams
//! (see [`byte_percent`]).

use std::time::Duration;

use rand::Rng;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Highest percentage the simulation may reach
pub const SIMULATED_CAP: f32 = 90.0;
pub const STAGE_PERIOD: Duration = Duration::from_millis(3000);
pub const FILL_PERIOD: Duration = Duration::from_millis(500);
/// Largest random step of the filler, in percentage points
pub const MAX_FILL_STEP: f32 = 10.0;

/// Status message and detail line
pub type Stage = (&'static str, &'static str);

pub const STAGES: [Stage; 3] = [
    ("Conectando con el servidor...", "Iniciando descarga"),
    (
        "Descargando video...",
        "Esto puede tardar varios minutos para videos largos",
    ),
    ("Procesando archivo...", "Casi listo..."),
];

pub const COMPLETE: Stage = ("¡Descarga completa!", "Guardando archivo...");

/// Output of the ticker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Stage(usize),
    Percent(f32),
}

/// Next simulated value: `current + step`, never above the cap
pub fn next_fill(current: f32, step: f32) -> f32 {
    if current >= SIMULATED_CAP {
        return current;
    }
    (current + step.clamp(0.0, MAX_FILL_STEP)).min(SIMULATED_CAP)
}

/// Percentage of an announced body length received so far
pub fn byte_percent(received: u64, total: Option<u64>) -> Option<f32> {
    match total {
        Some(total) if total > 0 => Some((received.min(total) as f32 / total as f32) * 100.0),
        _ => None,
    }
}

/// Running message rotation and bar filler; stop it with [`SimulatedProgress::stop`]
pub struct SimulatedProgress {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SimulatedProgress {
    /// Starts both timers. The message timer writes stages 0, 1 and 2 at
    /// one, two and three periods, then stops; until its first write the
    /// caller's initial text stays on screen.
    pub fn start<F>(mut emit: F) -> Self
    where
        F: FnMut(Tick) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let start = tokio::time::Instant::now();
        let task = tokio::spawn(async move {
            let mut stages = tokio::time::interval_at(start + STAGE_PERIOD, STAGE_PERIOD);
            let mut fill = tokio::time::interval_at(start + FILL_PERIOD, FILL_PERIOD);
            stages.set_missed_tick_behavior(MissedTickBehavior::Delay);
            fill.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut stage = 0;
            let mut percent = 0.0f32;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = stages.tick(), if stage < STAGES.len() => {
                        emit(Tick::Stage(stage));
                        stage += 1;
                    }
                    _ = fill.tick(), if percent < SIMULATED_CAP => {
                        let step = rand::thread_rng().gen_range(0.0..MAX_FILL_STEP);
                        percent = next_fill(percent, step);
                        emit(Tick::Percent(percent));
                    }
                }
            }
            debug!(stage, percent, "progress simulation stopped");
        });
        Self { cancel, task }
    }

    /// Cancels both timers; no tick is emitted once this returns
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
