use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use solarmatch_acquire::{Slot, SlotStatus};
use std::time::Duration;

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

/// One spinner per acquisition slot, finished as completions arrive
pub struct AcquisitionProgress {
    _multi: MultiProgress,
    bars: Vec<(Slot, ProgressBar)>,
}

impl AcquisitionProgress {
    pub fn new(slots: &[Slot], hidden: bool) -> Self {
        let multi = if hidden {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let bars = slots
            .iter()
            .map(|slot| {
                let bar = multi.add(create_spinner(&format!("Fetching {}", slot)));
                (*slot, bar)
            })
            .collect();

        Self {
            _multi: multi,
            bars,
        }
    }

    pub fn update(&self, slot: Slot, status: SlotStatus, detail: &str) {
        let Some((_, bar)) = self.bars.iter().find(|(s, _)| *s == slot) else {
            return;
        };
        match status {
            SlotStatus::Ready => finish_success(bar, &format!("{}: {}", slot, detail)),
            SlotStatus::Failed => finish_error(bar, &format!("{}: {}", slot, detail)),
            SlotStatus::Idle | SlotStatus::Pending => bar.set_message(format!("{}: {}", slot, detail)),
        }
    }

    /// Stop any spinner still running
    pub fn finish(&self) {
        for (slot, bar) in &self.bars {
            if !bar.is_finished() {
                finish_error(bar, &format!("{}: abandoned", slot));
            }
        }
    }
}
