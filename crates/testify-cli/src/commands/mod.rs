pub mod build;
pub mod init;
pub mod score;
pub mod take;
pub mod validate;

use comfy_table::{Cell, Table};

use testify_core::scoring::Results;

use crate::config::TestifyConfig;

/// Per-section and overall scores, marked against the configured goals.
pub(crate) fn summary_table(results: &Results, config: &TestifyConfig) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Section", "Score", "Percent", "Goal"]);

    let goal = |percent: f64, target: f64| {
        if percent >= target {
            format!("met ({target:.0}%)")
        } else {
            format!("below ({target:.0}%)")
        }
    };

    for section in &results.by_section {
        table.add_row(vec![
            Cell::new(&section.name),
            Cell::new(format!("{}/{}", section.correct, section.total)),
            Cell::new(format!("{:.1}%", section.percent())),
            Cell::new(goal(section.percent(), config.goal_per_section)),
        ]);
    }

    let overall = results.overall;
    table.add_row(vec![
        Cell::new("OVERALL"),
        Cell::new(format!("{}/{}", overall.correct, overall.total)),
        Cell::new(format!("{:.1}%", overall.percent())),
        Cell::new(goal(overall.percent(), config.goal_overall)),
    ]);

    table
}
