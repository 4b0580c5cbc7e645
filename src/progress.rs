use indicatif::{ProgressBar, ProgressStyle};

use crate::module_set::ModuleSet;
use crate::observer::Observer;
use crate::position::Position;

/// An [`Observer`] that renders the teacher's exact progress bar template
/// (`src/algorithm/progress.rs`'s `WfcProgress`), extended with the
/// backtrack-count suffix the teacher's backtracking variant also used.
/// Feature-gated behind `indicatif` since most hosts drive their own UI.
pub struct IndicatifObserver {
    bar: ProgressBar,
    backtrack_count: usize,
}

impl IndicatifObserver {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} cells (Backtracked: {msg})",
            )
            .unwrap()
            .progress_chars("##-"),
        );
        bar.set_message("0");
        Self { bar, backtrack_count: 0 }
    }

    pub fn record_backtrack(&mut self) {
        self.backtrack_count += 1;
        self.bar.set_message(self.backtrack_count.to_string());
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
        if self.backtrack_count > 0 {
            println!("Completed with {} backtracking attempts", self.backtrack_count);
        }
    }
}

impl Observer for IndicatifObserver {
    fn on_progress(&mut self, remaining: usize, total: usize) -> bool {
        self.bar.set_length(total as u64);
        self.bar.set_position((total - remaining) as u64);
        false
    }

    fn on_hit_range_limit(&mut self, position: Position, _modules: &ModuleSet) {
        self.bar
            .println(format!("hit range limit at {position:?}"));
    }
}
