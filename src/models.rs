use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type BatchId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: BatchId,
    pub name: String,
    pub time: String,
    pub days: Vec<String>,
    pub program: String,
    pub level: String,
}

/// Ordered level names per program, least to most advanced.
///
/// Programs missing from the map have no tracked hierarchy and are exempt
/// from the one-level-per-program rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelHierarchy {
    programs: HashMap<String, Vec<String>>,
}

impl LevelHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program<I, S>(mut self, program: &str, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.programs.insert(
            program.to_string(),
            levels.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn get(&self, program: &str) -> Option<&[String]> {
        self.programs.get(program).map(Vec::as_slice)
    }

    pub fn contains(&self, program: &str) -> bool {
        self.programs.contains_key(program)
    }

    pub fn rank(&self, program: &str, level: &str) -> Option<usize> {
        self.get(program)?.iter().position(|name| name == level)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Paused,
    Completed,
}

impl EnrollmentStatus {
    pub fn holds_seat(self) -> bool {
        matches!(self, EnrollmentStatus::Active | EnrollmentStatus::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub batch_id: BatchId,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

impl Member {
    /// Batches the member currently occupies a seat in.
    pub fn held_batches(&self) -> impl Iterator<Item = BatchId> + '_ {
        self.enrollments
            .iter()
            .filter(|enrollment| enrollment.status.holds_seat())
            .map(|enrollment| enrollment.batch_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub program: String,
    pub levels: Vec<String>,
    pub message: String,
}

impl Conflict {
    pub fn new(program: &str, levels: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            levels,
            message: format!(
                "Cannot select multiple levels of {program} at the same time. \
                 Complete the current level before advancing."
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn is_clear(&self) -> bool {
        self.conflicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_follows_hierarchy_order() {
        let levels =
            LevelHierarchy::new().with_program("Yoga", ["Beginner", "Intermediate", "Advanced"]);
        assert_eq!(levels.rank("Yoga", "Beginner"), Some(0));
        assert_eq!(levels.rank("Yoga", "Advanced"), Some(2));
        assert_eq!(levels.rank("Yoga", "Expert"), None);
        assert_eq!(levels.rank("Chess", "Beginner"), None);
    }

    #[test]
    fn completed_enrollments_do_not_hold_seats() {
        let member = Member {
            id: "m-1".to_string(),
            name: "Riya Shah".to_string(),
            enrollments: vec![
                Enrollment {
                    batch_id: 1,
                    status: EnrollmentStatus::Completed,
                },
                Enrollment {
                    batch_id: 2,
                    status: EnrollmentStatus::Active,
                },
                Enrollment {
                    batch_id: 3,
                    status: EnrollmentStatus::Paused,
                },
            ],
        };
        let held: Vec<BatchId> = member.held_batches().collect();
        assert_eq!(held, vec![2, 3]);
    }

    #[test]
    fn hierarchy_deserializes_from_plain_map() {
        let levels: LevelHierarchy =
            serde_json::from_str(r#"{"Chess": ["Beginner", "Advanced"]}"#).unwrap();
        assert!(levels.contains("Chess"));
        assert_eq!(levels.get("Chess").map(|l| l.len()), Some(2));
    }
}
