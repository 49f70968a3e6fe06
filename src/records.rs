use indexmap::IndexMap;
use serde::Serialize;

/// Lowercased, trimmed form of a name column used for identity comparison.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Durable dedup key for one submission: the same logical form maps to the
/// same identity across repeated scans, regardless of name casing or
/// surrounding whitespace. Course keeps its original casing because it is
/// reused for display and paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordIdentity {
    pub period: String,
    pub course: String,
    pub first_name: String,
    pub last_name: String,
}

impl RecordIdentity {
    pub fn new(period: &str, course: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            period: period.trim().to_owned(),
            course: course.trim().to_owned(),
            first_name: normalize_name(first_name),
            last_name: normalize_name(last_name),
        }
    }
}

/// One qualifying row as observed during a scan. Names are kept as seen
/// (trimmed, original casing) for display and filename derivation.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateRecord {
    pub period: String,
    pub course: String,
    pub first_name: String,
    pub last_name: String,
}

impl CandidateRecord {
    pub fn new(period: &str, course: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            period: period.trim().to_owned(),
            course: course.trim().to_owned(),
            first_name: first_name.trim().to_owned(),
            last_name: last_name.trim().to_owned(),
        }
    }

    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity::new(&self.period, &self.course, &self.first_name, &self.last_name)
    }

    /// Key used to re-resolve this record against a live row index
    /// (no period: the index is always built within one period's view).
    pub fn row_key(&self) -> RowKey {
        (
            self.course.clone(),
            normalize_name(&self.first_name),
            normalize_name(&self.last_name),
        )
    }
}

/// `(course, first_name, last_name)` with names normalized.
pub type RowKey = (String, String, String);

/// The deduplicated set of discovered records awaiting download.
///
/// Re-inserting an identity overwrites the stored record (last scan wins)
/// while iteration keeps first-insertion order, so the download pass visits
/// periods in the order they were first seen.
#[derive(Debug, Default)]
pub struct WorkList {
    entries: IndexMap<RecordIdentity, CandidateRecord>,
}

impl WorkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: CandidateRecord) {
        self.entries.insert(record.identity(), record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.entries.values()
    }

    /// Groups records by period, preserving first-seen period order and
    /// per-period record order.
    pub fn by_period(&self) -> IndexMap<String, Vec<CandidateRecord>> {
        let mut groups: IndexMap<String, Vec<CandidateRecord>> = IndexMap::new();
        for record in self.entries.values() {
            groups
                .entry(record.period.clone())
                .or_default()
                .push(record.clone());
        }
        groups
    }
}

/// One unresolved problem from the download pass. Append-only, never
/// deduplicated; rendered verbatim into the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub period: String,
    pub course: String,
    pub student: String,
    pub reason: String,
}

impl FailureRecord {
    pub fn new(
        period: impl Into<String>,
        course: impl Into<String>,
        student: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            period: period.into(),
            course: course.into(),
            student: student.into(),
            reason: reason.into(),
        }
    }
}
