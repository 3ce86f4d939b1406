use std::fmt::Write;

use crate::catalog::Catalog;
use crate::models::Batch;
use crate::selection::{Availability, EditSession};

fn batch_line(batch: &Batch) -> String {
    let days = if batch.days.is_empty() {
        "days TBA".to_string()
    } else {
        batch.days.join(", ")
    };
    format!(
        "#{} {} ({} {}), {} on {}",
        batch.id, batch.name, batch.program, batch.level, batch.time, days
    )
}

pub fn build_report(catalog: &Catalog, session: &EditSession<'_>) -> String {
    let member = session.member();
    let mut output = String::new();

    let _ = writeln!(output, "# Enrollment Review");
    let _ = writeln!(output, "Member {} ({})", member.name, member.id);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Current Selection");

    if session.selection().is_empty() {
        let _ = writeln!(output, "No batches selected.");
    } else {
        for program in catalog.programs() {
            let selected: Vec<&Batch> = session
                .selection()
                .iter()
                .filter_map(|id| catalog.batch(id))
                .filter(|batch| batch.program == program)
                .collect();
            if selected.is_empty() {
                continue;
            }
            let _ = writeln!(output, "### {program}");
            for batch in selected {
                let _ = writeln!(output, "- {}", batch_line(batch));
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Conflicts");

    if session.report().is_clear() {
        let _ = writeln!(output, "No conflicts. Each program is held at a single level.");
    } else {
        for conflict in &session.report().conflicts {
            let _ = writeln!(
                output,
                "- {} [{}]: {}",
                conflict.program,
                conflict.levels.join(", "),
                conflict.message
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Other Batches");

    let others: Vec<(&Batch, Availability)> = session
        .availability()
        .into_iter()
        .filter(|(_, state)| *state != Availability::Selected)
        .collect();
    if others.is_empty() {
        let _ = writeln!(output, "Every batch in the catalog is already selected.");
    } else {
        for (batch, state) in others {
            let marker = match state {
                Availability::Disabled => " (unavailable: another level selected)",
                _ => "",
            };
            let _ = writeln!(output, "- {}{}", batch_line(batch), marker);
        }
    }

    let diff = session.changes();
    if !diff.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Pending Changes");
        for id in &diff.added {
            let _ = writeln!(output, "- add #{id}");
        }
        for id in &diff.removed {
            let _ = writeln!(output, "- remove #{id}");
        }
    }

    output
}
