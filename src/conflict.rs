use std::collections::HashMap;

use crate::models::{Batch, BatchId, Conflict, ConflictReport, LevelHierarchy};
use crate::selection::SelectionSet;

fn index_catalog(catalog: &[Batch]) -> HashMap<BatchId, &Batch> {
    let mut index = HashMap::with_capacity(catalog.len());
    for batch in catalog {
        index.entry(batch.id).or_insert(batch);
    }
    index
}

/// Distinct levels per program, in first-appearance order of both.
fn group_levels<'a>(
    index: &HashMap<BatchId, &'a Batch>,
    ids: impl Iterator<Item = BatchId>,
) -> Vec<(&'a str, Vec<&'a str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();

    for id in ids {
        let Some(&batch) = index.get(&id) else {
            continue;
        };
        match groups.iter_mut().find(|(program, _)| *program == batch.program) {
            Some((_, levels)) => {
                if !levels.contains(&batch.level.as_str()) {
                    levels.push(batch.level.as_str());
                }
            }
            None => groups.push((batch.program.as_str(), vec![batch.level.as_str()])),
        }
    }

    groups
}

pub fn validate(
    catalog: &[Batch],
    hierarchy: &LevelHierarchy,
    selection: &SelectionSet,
) -> ConflictReport {
    let index = index_catalog(catalog);
    let conflicts = group_levels(&index, selection.iter())
        .into_iter()
        .filter(|(program, levels)| levels.len() > 1 && hierarchy.contains(program))
        .map(|(program, levels)| {
            let mut levels: Vec<String> = levels.into_iter().map(str::to_string).collect();
            // Stable sort keeps appearance order for levels the hierarchy does not name.
            levels.sort_by_key(|level| hierarchy.rank(program, level).unwrap_or(usize::MAX));
            Conflict::new(program, levels)
        })
        .collect();

    ConflictReport { conflicts }
}

/// Whether adding `candidate` would leave its program with more than one level.
///
/// Batches already in the selection are never disabled, even when they sit in
/// a pre-existing conflict; that case is reported by [`validate`].
pub fn is_candidate_disabled(
    catalog: &[Batch],
    hierarchy: &LevelHierarchy,
    selection: &SelectionSet,
    candidate: BatchId,
) -> bool {
    if selection.contains(candidate) {
        return false;
    }

    let index = index_catalog(catalog);
    candidate_conflicts(&index, hierarchy, selection, candidate)
}

fn candidate_conflicts(
    index: &HashMap<BatchId, &Batch>,
    hierarchy: &LevelHierarchy,
    selection: &SelectionSet,
    candidate: BatchId,
) -> bool {
    let Some(batch) = index.get(&candidate) else {
        return false;
    };
    if !hierarchy.contains(&batch.program) {
        return false;
    }

    let hypothetical = selection.with(candidate);
    group_levels(index, hypothetical.iter())
        .into_iter()
        .find(|(program, _)| *program == batch.program)
        .is_some_and(|(_, levels)| levels.len() > 1)
}

/// Catalog-ordered ids of every unselected batch that would introduce a conflict.
pub fn disabled_candidates(
    catalog: &[Batch],
    hierarchy: &LevelHierarchy,
    selection: &SelectionSet,
) -> Vec<BatchId> {
    let index = index_catalog(catalog);
    let mut disabled = Vec::new();

    for batch in catalog {
        if selection.contains(batch.id) || disabled.contains(&batch.id) {
            continue;
        }
        if candidate_conflicts(&index, hierarchy, selection, batch.id) {
            disabled.push(batch.id);
        }
    }

    disabled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(id: BatchId, program: &str, level: &str) -> Batch {
        Batch {
            id,
            name: format!("{program} {level} {id}"),
            time: "17:00 - 18:00".to_string(),
            days: vec!["Mon".to_string(), "Wed".to_string()],
            program: program.to_string(),
            level: level.to_string(),
        }
    }

    fn sample_catalog() -> Vec<Batch> {
        vec![
            batch(1, "Yoga", "Beginner"),
            batch(2, "Yoga", "Advanced"),
            batch(3, "Yoga", "Beginner"),
            batch(4, "Chess", "Beginner"),
            batch(5, "Chess", "Intermediate"),
            batch(6, "Art", "Beginner"),
            batch(7, "Art", "Advanced"),
            batch(8, "Yoga", "Intermediate"),
        ]
    }

    fn sample_levels() -> LevelHierarchy {
        LevelHierarchy::new()
            .with_program("Yoga", ["Beginner", "Intermediate", "Advanced"])
            .with_program("Chess", ["Beginner", "Intermediate", "Advanced"])
    }

    fn select(ids: &[BatchId]) -> SelectionSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn distinct_programs_are_conflict_free() {
        let report = validate(&sample_catalog(), &sample_levels(), &select(&[1, 4, 6]));
        assert!(report.is_clear());
    }

    #[test]
    fn same_level_batches_are_compatible() {
        let report = validate(&sample_catalog(), &sample_levels(), &select(&[1, 3]));
        assert!(report.is_clear());
    }

    #[test]
    fn mixed_levels_in_one_program_conflict() {
        let report = validate(&sample_catalog(), &sample_levels(), &select(&[1, 2]));
        assert_eq!(report.conflicts.len(), 1);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.program, "Yoga");
        assert_eq!(conflict.levels, vec!["Beginner", "Advanced"]);
        assert!(conflict.message.contains("Yoga"));
        assert!(conflict.message.contains("Complete the current level"));
    }

    #[test]
    fn adjacent_levels_still_conflict() {
        let report = validate(&sample_catalog(), &sample_levels(), &select(&[1, 8]));
        assert_eq!(report.conflicts.len(), 1);
    }

    #[test]
    fn conflict_levels_follow_hierarchy_order() {
        let report = validate(&sample_catalog(), &sample_levels(), &select(&[2, 8, 1]));
        assert_eq!(
            report.conflicts[0].levels,
            vec!["Beginner", "Intermediate", "Advanced"]
        );
    }

    #[test]
    fn programs_without_hierarchy_are_exempt() {
        let report = validate(&sample_catalog(), &sample_levels(), &select(&[6, 7]));
        assert!(report.is_clear());
        assert!(!is_candidate_disabled(
            &sample_catalog(),
            &sample_levels(),
            &select(&[6]),
            7
        ));
    }

    #[test]
    fn conflicts_follow_first_appearance_of_program() {
        let report = validate(&sample_catalog(), &sample_levels(), &select(&[4, 1, 5, 2]));
        let programs: Vec<&str> = report.conflicts.iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["Chess", "Yoga"]);

        let report = validate(&sample_catalog(), &sample_levels(), &select(&[2, 5, 1, 4]));
        let programs: Vec<&str> = report.conflicts.iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["Yoga", "Chess"]);
    }

    #[test]
    fn candidates_that_would_mix_levels_are_disabled() {
        let catalog = sample_catalog();
        let levels = sample_levels();
        let selection = select(&[1]);
        assert!(is_candidate_disabled(&catalog, &levels, &selection, 2));
        assert!(!is_candidate_disabled(&catalog, &levels, &selection, 3));
        assert!(!is_candidate_disabled(&catalog, &levels, &selection, 4));
    }

    #[test]
    fn selected_batches_are_never_disabled() {
        let catalog = sample_catalog();
        let levels = sample_levels();
        let selection = select(&[1, 2]);
        assert!(!validate(&catalog, &levels, &selection).is_clear());
        assert!(!is_candidate_disabled(&catalog, &levels, &selection, 1));
        assert!(!is_candidate_disabled(&catalog, &levels, &selection, 2));
    }

    #[test]
    fn pre_existing_conflict_disables_further_program_batches() {
        let catalog = sample_catalog();
        let levels = sample_levels();
        assert!(is_candidate_disabled(&catalog, &levels, &select(&[1, 2]), 3));
    }

    #[test]
    fn validate_is_idempotent() {
        let catalog = sample_catalog();
        let levels = sample_levels();
        let selection = select(&[1, 2, 4, 5]);
        assert_eq!(
            validate(&catalog, &levels, &selection),
            validate(&catalog, &levels, &selection)
        );
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let catalog = sample_catalog();
        let levels = sample_levels();
        assert!(validate(&catalog, &levels, &select(&[1, 99, 3])).is_clear());
        let report = validate(&catalog, &levels, &select(&[99, 1, 2]));
        assert_eq!(report.conflicts.len(), 1);
        assert!(!is_candidate_disabled(&catalog, &levels, &select(&[1]), 99));
    }

    #[test]
    fn duplicate_catalog_ids_resolve_to_first_record() {
        let mut catalog = sample_catalog();
        catalog.push(batch(3, "Yoga", "Advanced"));
        assert!(validate(&catalog, &sample_levels(), &select(&[1, 3])).is_clear());
    }

    #[test]
    fn disabled_candidates_lists_catalog_order() {
        let disabled = disabled_candidates(&sample_catalog(), &sample_levels(), &select(&[1, 4]));
        assert_eq!(disabled, vec![2, 5, 8]);
    }
}
