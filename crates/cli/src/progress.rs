use engine_core::progress::{ProgressObserver, ProgressStage, ProgressState};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(120);

fn style(color: &str, with_total: bool) -> ProgressStyle {
    let template = if with_total {
        format!("{{spinner:.{color}}} {{prefix}} [{{bar:40.{color}/blue}}] {{pos}}/{{len}} rows | {{elapsed_precise}} | {{msg}}")
    } else {
        format!("{{spinner:.{color}}} {{prefix}} {{pos}} rows | {{elapsed_precise}} | {{msg}}")
    };
    ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Terminal progress bar on stderr: green while running, yellow once
/// cancelled, red on failure.
pub struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(style("green", false));
        BarObserver { bar }
    }
}

impl ProgressObserver for BarObserver {
    fn on_start(&self, label: &str, _state: &ProgressState) {
        self.bar.set_prefix(label.to_string());
        self.bar.set_message("running");
        self.bar.enable_steady_tick(TICK);
    }

    fn on_progress(&self, _label: &str, state: &ProgressState) {
        if let Some(total) = state.total {
            if self.bar.length() != Some(total) {
                self.bar.set_length(total);
                self.bar.set_style(style("green", true));
            }
        }
        self.bar.set_position(state.processed);
    }

    fn on_finish(&self, _label: &str, state: &ProgressState) {
        let with_total = state.total.is_some();
        self.bar.set_position(state.processed);
        match state.stage {
            ProgressStage::Done => self.bar.finish_with_message("done"),
            ProgressStage::Cancelled => {
                self.bar.set_style(style("yellow", with_total));
                self.bar.abandon_with_message("cancelled");
            }
            ProgressStage::Failed => {
                self.bar.set_style(style("red", with_total));
                self.bar.abandon_with_message("failed");
            }
            ProgressStage::Idle | ProgressStage::Running => {}
        }
    }
}
