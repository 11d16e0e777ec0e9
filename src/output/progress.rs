use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Progress tracking for the three collection phases, drawn on stderr
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/3: Resolving workflows").to_string());
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, workflow_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Resolved {workflow_count} workflows ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 2/3: Fetching workflow runs").to_string());
        Self { pb }
    }

    pub fn finish_phase_2_start_phase_3(self) -> Self {
        self.pb
            .finish_with_message(bright_green("Phase 2/3: Fetched workflow runs ✓").to_string());
        let pb = create_spinner(bright_yellow("Phase 3/3: Analyzing runs").to_string());
        Self { pb }
    }

    pub fn finish_phase_3(self) {
        self.pb
            .finish_with_message(bright_green("Phase 3/3: Analysis complete ✓").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
