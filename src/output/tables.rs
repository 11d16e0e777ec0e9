use std::time::Duration;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::{NOTHING, UTF8_FULL};
use comfy_table::{Cell, CellAlignment, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Borderless, unwrapped table. Cells may hold escape sequences that would throw off
/// border alignment, so those go in the last column.
pub fn create_plain_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled);
    table
}

pub fn header_cells(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn count_cell(count: usize) -> Cell {
    Cell::new(count).set_alignment(CellAlignment::Right)
}

/// Success rate with a mood emoji, banded red below 50%, yellow below 80%, green otherwise.
pub fn color_coded_success_cell(rate: f64) -> Cell {
    let (emoji, color) = if rate < 50.0 {
        ("🙀", TableColor::Red)
    } else if rate < 80.0 {
        ("🤨", TableColor::Yellow)
    } else {
        ("🥰", TableColor::Green)
    };
    Cell::new(format!("{emoji} {rate:.0}%")).fg(color)
}

pub fn duration_cell(duration: Option<Duration>) -> Cell {
    Cell::new(format_duration(duration))
}

/// Formats a duration rounded to whole seconds, e.g. `1h2m3s`; `N/A` when absent.
pub fn format_duration(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return "N/A".to_string();
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = duration.as_secs_f64().round() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
