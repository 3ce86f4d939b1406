use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{Batch, BatchId, Enrollment, EnrollmentStatus, LevelHierarchy, Member};

pub const BATCHES_FILE: &str = "batches.csv";
pub const LEVELS_FILE: &str = "levels.json";
pub const MEMBERS_FILE: &str = "members.json";

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub batches: Vec<Batch>,
    pub levels: LevelHierarchy,
}

impl Catalog {
    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.iter().find(|batch| batch.id == id)
    }

    /// Program names in catalog order, without repeats.
    pub fn programs(&self) -> Vec<&str> {
        let mut programs: Vec<&str> = Vec::new();
        for batch in &self.batches {
            if !programs.contains(&batch.program.as_str()) {
                programs.push(batch.program.as_str());
            }
        }
        programs
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub catalog: Catalog,
    pub members: Vec<Member>,
}

impl DataSet {
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("batches.csv line {line}: `{field}` must not be blank")]
    MissingField { line: u64, field: &'static str },
    #[error("batches.csv line {line}: batch id {id} appears more than once")]
    DuplicateBatch { line: u64, id: BatchId },
}

#[derive(Debug, Serialize, Deserialize)]
struct BatchRow {
    id: BatchId,
    name: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    days: Option<String>,
    program: String,
    level: String,
}

impl BatchRow {
    fn into_batch(self, line: u64) -> Result<Batch, RecordError> {
        let required = |value: String, field: &'static str| {
            let value = value.trim().to_string();
            if value.is_empty() {
                Err(RecordError::MissingField { line, field })
            } else {
                Ok(value)
            }
        };

        Ok(Batch {
            id: self.id,
            name: required(self.name, "name")?,
            program: required(self.program, "program")?,
            level: required(self.level, "level")?,
            time: self.time.map(|t| t.trim().to_string()).unwrap_or_default(),
            days: self
                .days
                .unwrap_or_default()
                .split(';')
                .map(str::trim)
                .filter(|day| !day.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    fn from_batch(batch: &Batch) -> Self {
        Self {
            id: batch.id,
            name: batch.name.clone(),
            time: Some(batch.time.clone()),
            days: Some(batch.days.join(";")),
            program: batch.program.clone(),
            level: batch.level.clone(),
        }
    }
}

pub fn read_batches(csv_path: &Path) -> anyhow::Result<Vec<Batch>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("missing header row in {}", csv_path.display()))?
        .clone();
    let mut batches = Vec::new();
    let mut seen = HashSet::new();
    let mut record = csv::StringRecord::new();

    while reader
        .read_record(&mut record)
        .with_context(|| format!("malformed row in {}", csv_path.display()))?
    {
        // Line the record starts on; quoted fields may span several lines.
        let line = record.position().map_or(0, |position| position.line());
        let row: BatchRow = record
            .deserialize(Some(&headers))
            .with_context(|| format!("{} line {line}: malformed row", csv_path.display()))?;
        if !seen.insert(row.id) {
            return Err(RecordError::DuplicateBatch { line, id: row.id }.into());
        }
        batches.push(row.into_batch(line)?);
    }

    Ok(batches)
}

pub fn load_dir(dir: &Path) -> anyhow::Result<DataSet> {
    let batches = read_batches(&dir.join(BATCHES_FILE))?;

    let levels_path = dir.join(LEVELS_FILE);
    let levels: LevelHierarchy = serde_json::from_str(
        &fs::read_to_string(&levels_path)
            .with_context(|| format!("failed to read {}", levels_path.display()))?,
    )
    .with_context(|| format!("invalid level hierarchy in {}", levels_path.display()))?;

    let members_path = dir.join(MEMBERS_FILE);
    let members: Vec<Member> = serde_json::from_str(
        &fs::read_to_string(&members_path)
            .with_context(|| format!("failed to read {}", members_path.display()))?,
    )
    .with_context(|| format!("invalid members in {}", members_path.display()))?;

    let catalog = Catalog { batches, levels };
    for member in &members {
        for enrollment in &member.enrollments {
            if catalog.batch(enrollment.batch_id).is_none() {
                warn!(
                    member = %member.id,
                    batch = enrollment.batch_id,
                    "enrollment references a batch missing from the catalog"
                );
            }
        }
    }

    info!(
        batches = catalog.batches.len(),
        programs = catalog.levels.len(),
        members = members.len(),
        dir = %dir.display(),
        "loaded data set"
    );
    Ok(DataSet { catalog, members })
}

pub fn write_dir(data: &DataSet, dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let batches_path = dir.join(BATCHES_FILE);
    let mut writer = csv::Writer::from_path(&batches_path)
        .with_context(|| format!("failed to create {}", batches_path.display()))?;
    for batch in &data.catalog.batches {
        writer
            .serialize(BatchRow::from_batch(batch))
            .with_context(|| format!("failed to write {}", batches_path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", batches_path.display()))?;

    let levels_path = dir.join(LEVELS_FILE);
    fs::write(&levels_path, serde_json::to_string_pretty(&data.catalog.levels)?)
        .with_context(|| format!("failed to write {}", levels_path.display()))?;
    let members_path = dir.join(MEMBERS_FILE);
    fs::write(&members_path, serde_json::to_string_pretty(&data.members)?)
        .with_context(|| format!("failed to write {}", members_path.display()))?;

    Ok(())
}

/// Built-in mock data used when no data directory is configured.
pub fn seed() -> DataSet {
    let tiers = ["Beginner", "Intermediate", "Advanced"];
    let levels = LevelHierarchy::new()
        .with_program("Yoga", tiers)
        .with_program("Chess", tiers)
        .with_program("Music", tiers)
        .with_program("Coding", ["Beginner", "Advanced"]);

    let batches = vec![
        (101, "Sunrise Yoga", "06:30 - 07:30", "Mon;Wed;Fri", "Yoga", "Beginner"),
        (102, "Evening Yoga", "17:00 - 18:00", "Tue;Thu", "Yoga", "Beginner"),
        (103, "Power Yoga", "07:45 - 08:45", "Mon;Wed;Fri", "Yoga", "Advanced"),
        (104, "Flow Yoga", "18:15 - 19:15", "Tue;Thu", "Yoga", "Intermediate"),
        (201, "Chess Openings", "16:00 - 17:00", "Sat", "Chess", "Beginner"),
        (202, "Chess Tactics", "16:00 - 17:30", "Sun", "Chess", "Intermediate"),
        (203, "Chess Masterclass", "10:00 - 12:00", "Sat", "Chess", "Advanced"),
        (301, "Keyboard Basics", "15:00 - 16:00", "Wed", "Music", "Beginner"),
        (302, "Keyboard Ensemble", "15:00 - 16:30", "Fri", "Music", "Intermediate"),
        (401, "Sketching", "11:00 - 12:00", "Sun", "Art", "Beginner"),
        (402, "Studio Painting", "13:00 - 15:00", "Sun", "Art", "Advanced"),
        (501, "Scratch Games", "17:00 - 18:00", "Mon;Wed", "Coding", "Beginner"),
        (502, "Python Projects", "18:00 - 19:30", "Mon;Wed", "Coding", "Advanced"),
    ]
    .into_iter()
    .map(|(id, name, time, days, program, level)| Batch {
        id,
        name: name.to_string(),
        time: time.to_string(),
        days: days.split(';').map(str::to_string).collect(),
        program: program.to_string(),
        level: level.to_string(),
    })
    .collect();

    fn enroll(pairs: &[(BatchId, EnrollmentStatus)]) -> Vec<Enrollment> {
        pairs
            .iter()
            .map(|&(batch_id, status)| Enrollment { batch_id, status })
            .collect()
    }
    use EnrollmentStatus::{Active, Completed, Paused};

    let members = vec![
        Member {
            id: "S001".to_string(),
            name: "Aarav Mehta".to_string(),
            enrollments: enroll(&[(101, Active), (201, Active)]),
        },
        Member {
            id: "S002".to_string(),
            name: "Diya Kapoor".to_string(),
            enrollments: enroll(&[(101, Active), (103, Active), (301, Paused)]),
        },
        Member {
            id: "S003".to_string(),
            name: "Kabir Rao".to_string(),
            enrollments: enroll(&[(201, Completed), (202, Active), (401, Active), (402, Active)]),
        },
        Member {
            id: "S004".to_string(),
            name: "Ananya Iyer".to_string(),
            enrollments: enroll(&[(501, Active)]),
        },
    ];

    DataSet {
        catalog: Catalog { batches, levels },
        members,
    }
}
