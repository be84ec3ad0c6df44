//! Per-job accumulator of task outputs.

use std::collections::BTreeMap;

use crate::types::{AuditResult, CodeInfo};

/// Reserved identifier of the structural code-info entry.
pub const CODE_INFO_KEY: &str = "info";

/// Reserved identifier of the content checksum entry.
pub const CHECKSUM_KEY: &str = "checksum";

/// Whether `id` names a reserved slot rather than a task report.
pub fn is_reserved_id(id: &str) -> bool {
    id == CODE_INFO_KEY || id == CHECKSUM_KEY
}

/// One value held by a [`ResultSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEntry {
    /// The structural summary of the package.
    CodeInfo(CodeInfo),
    /// The content checksum of the audited source.
    Checksum(String),
    /// One task's report.
    Report(AuditResult),
}

/// Report envelope fields a task may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnvelopeField {
    /// `title`
    Title,
    /// `content`
    Content,
    /// `version`
    Version,
    /// `visibility`
    Visibility,
    /// `source_url`
    SourceUrl,
    /// `source_type`
    SourceType,
}

/// Envelope values supplied by a task, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeOverrides {
    values: BTreeMap<EnvelopeField, String>,
}

impl EnvelopeOverrides {
    /// Create an empty override set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field.
    pub fn set(&mut self, field: EnvelopeField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Set one field, builder style.
    pub fn with(mut self, field: EnvelopeField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Value for a field, if this set overrides it.
    pub fn get(&self, field: EnvelopeField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Returns `true` when nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything a job's tasks produced, ready for report assembly.
///
/// The code-info and checksum entries live in dedicated slots so a report
/// can only ever see one of each. Reports and overrides are keyed by task
/// identifier in ordered maps: the order tasks finished in never leaks into
/// the rendered report.
///
/// # Examples
///
/// ```
/// use tide_audit::payload::{ResultEntry, ResultSet};
/// use tide_audit::types::{AuditResult, CodeInfo};
///
/// let mut results = ResultSet::new();
/// results.insert("info", ResultEntry::CodeInfo(CodeInfo::new("plugin")));
/// results.insert("checksum", ResultEntry::Checksum("abcdefg".into()));
/// results.insert("phpcs_wordpress", ResultEntry::Report(AuditResult::default()));
///
/// assert!(results.code_info().is_some());
/// assert_eq!(results.checksum(), Some("abcdefg"));
/// assert_eq!(results.reports().count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    code_info: Option<CodeInfo>,
    checksum: Option<String>,
    reports: BTreeMap<String, AuditResult>,
    overrides: BTreeMap<String, EnvelopeOverrides>,
}

impl ResultSet {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry under a task identifier.
    ///
    /// Code-info and checksum entries go to their reserved slots whatever
    /// the key; the replaced value, if any, is returned.
    pub fn insert(&mut self, task_id: impl Into<String>, entry: ResultEntry) -> Option<ResultEntry> {
        match entry {
            ResultEntry::CodeInfo(info) => self.set_code_info(info).map(ResultEntry::CodeInfo),
            ResultEntry::Checksum(checksum) => {
                self.set_checksum(checksum).map(ResultEntry::Checksum)
            },
            ResultEntry::Report(result) => self
                .insert_report(task_id, result)
                .map(ResultEntry::Report),
        }
    }

    /// Set the code-info entry.
    pub fn set_code_info(&mut self, info: CodeInfo) -> Option<CodeInfo> {
        self.code_info.replace(info)
    }

    /// Set the checksum entry.
    pub fn set_checksum(&mut self, checksum: impl Into<String>) -> Option<String> {
        self.checksum.replace(checksum.into())
    }

    /// Store a task report.
    ///
    /// Reports keyed by a reserved identifier ([`CODE_INFO_KEY`],
    /// [`CHECKSUM_KEY`]) are dropped and `None` is returned.
    pub fn insert_report(
        &mut self,
        task_id: impl Into<String>,
        result: AuditResult,
    ) -> Option<AuditResult> {
        let task_id = task_id.into();
        if is_reserved_id(&task_id) {
            tracing::warn!(task_id = %task_id, "Dropping report keyed by a reserved identifier");
            return None;
        }
        self.reports.insert(task_id, result)
    }

    /// Record envelope overrides supplied by a task. Empty sets are dropped.
    pub fn set_overrides(&mut self, task_id: impl Into<String>, overrides: EnvelopeOverrides) {
        let task_id = task_id.into();
        if overrides.is_empty() {
            self.overrides.remove(&task_id);
        } else {
            self.overrides.insert(task_id, overrides);
        }
    }

    /// The code-info entry.
    pub fn code_info(&self) -> Option<&CodeInfo> {
        self.code_info.as_ref()
    }

    /// The checksum entry.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// A single report by task identifier.
    pub fn report(&self, task_id: &str) -> Option<&AuditResult> {
        self.reports.get(task_id)
    }

    /// Reports in task-identifier order.
    pub fn reports(&self) -> impl Iterator<Item = (&str, &AuditResult)> {
        self.reports.iter().map(|(id, result)| (id.as_str(), result))
    }

    /// Returns `true` when at least one task report is present.
    pub fn has_reports(&self) -> bool {
        !self.reports.is_empty()
    }

    /// Override values for one field, in task-identifier order.
    pub fn overrides_for(&self, field: EnvelopeField) -> impl Iterator<Item = &str> {
        self.overrides
            .values()
            .filter_map(move |overrides| overrides.get(field))
    }
}
