use foldpipe::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Bridges the core progress events onto a single indicatif spinner.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner()
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::TargetStart { name, index, total } => {
                    pb_guard.println(format!("[{}/{}] {}", index + 1, total, name));
                }
                Progress::StageStart { name } => {
                    pb_guard.reset();
                    pb_guard.set_style(Self::spinner_style());
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb_guard.set_message(name);
                }
                Progress::StageFinish => {
                    pb_guard.disable_steady_tick();
                    pb_guard.finish_and_clear();
                }
                Progress::ModelStart { name } => {
                    pb_guard.set_message(format!("Running model {}", name));
                }
                Progress::ModelFinish { name, seconds } => {
                    pb_guard.println(format!("  ✓ {} ({:.1}s)", name, seconds));
                }
                Progress::Message(msg) => {
                    pb_guard.println(format!("  {}", msg));
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
    }

    #[test]
    fn stage_events_drive_the_spinner() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::StageStart { name: "Predicting" });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Predicting");
            assert!(!pb.is_finished());
        }

        callback(Progress::ModelStart {
            name: "model_1_pred_0".into(),
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Running model model_1_pred_0");
        }

        callback(Progress::StageFinish);
        {
            let pb = handler.pb.lock().unwrap();
            assert!(pb.is_finished());
        }
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        std::thread::spawn(move || {
            callback(Progress::StageStart { name: "Relaxing" });
            callback(Progress::StageFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
    }
}
