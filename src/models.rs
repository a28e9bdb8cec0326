//! Normalized records shared by every collector and the report generator.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
};

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use crate::utils::time::TimeRange;

/// Kind of work activity an [Item] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemKind {
    Git,
    Meeting,
    Jira,
    Confluence,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Git,
        ItemKind::Meeting,
        ItemKind::Jira,
        ItemKind::Confluence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Git => "git",
            ItemKind::Meeting => "meeting",
            ItemKind::Jira => "jira",
            ItemKind::Confluence => "confluence",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetails {
    /// Last path segment of the repository, e.g. `api` for `/home/me/src/api`.
    pub repo: String,
    pub hash: String,
    pub author: String,
    pub email: String,
}

impl CommitDetails {
    /// First 7 characters of the hash, or the whole hash when it is shorter.
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeetingDetails {
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDetails {
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentDetails {
    pub author: Option<String>,
}

/// Source specific data carried alongside the common [Item] fields. The variant decides the
/// item's [ItemKind].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDetails {
    Git(CommitDetails),
    Meeting(MeetingDetails),
    Jira(TaskDetails),
    Confluence(DocumentDetails),
}

/// A single unit of work output produced by a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    /// When the item happened. Items are only ever ordered by this field.
    pub time: DateTime<FixedOffset>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub details: ItemDetails,
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self.details {
            ItemDetails::Git(_) => ItemKind::Git,
            ItemDetails::Meeting(_) => ItemKind::Meeting,
            ItemDetails::Jira(_) => ItemKind::Jira,
            ItemDetails::Confluence(_) => ItemKind::Confluence,
        }
    }
}

/// Sorts items most recent first. Order of items sharing a timestamp is unspecified.
pub fn sort_by_recency(items: &mut [Item]) {
    items.sort_unstable_by(|a, b| b.time.cmp(&a.time));
}

/// Groups items by their kind, each group sorted with [sort_by_recency].
pub fn group_by_kind<'a>(
    items: impl IntoIterator<Item = &'a Item>,
) -> BTreeMap<ItemKind, Vec<Item>> {
    let mut grouped = BTreeMap::<ItemKind, Vec<Item>>::new();
    for item in items {
        grouped.entry(item.kind()).or_default().push(item.clone());
    }
    for group in grouped.values_mut() {
        sort_by_recency(group);
    }
    grouped
}

pub fn count_by_kind(grouped: &BTreeMap<ItemKind, Vec<Item>>) -> BTreeMap<ItemKind, usize> {
    grouped
        .iter()
        .map(|(kind, items)| (*kind, items.len()))
        .collect()
}

/// Outcome of a single collector run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: String,
    pub success: bool,
    /// Present only when `success` is false.
    pub error: Option<String>,
}

impl SourceStatus {
    pub fn succeeded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Display) -> Self {
        let mut error = error.to_string();
        if error.is_empty() {
            error = "unknown error".into();
        }
        Self {
            name: name.into(),
            success: false,
            error: Some(error),
        }
    }
}

/// Everything the report generator needs for one run.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub date: DateTime<Tz>,
    pub start_time: DateTime<Tz>,
    pub end_time: DateTime<Tz>,
    pub items: Vec<Item>,
    pub items_by_type: BTreeMap<ItemKind, Vec<Item>>,
    pub stats: BTreeMap<ItemKind, usize>,
    pub source_status: BTreeMap<String, SourceStatus>,
}

impl ReportData {
    /// Flattens per-source results into a report for `range`. The nominal date is the start of
    /// the range.
    pub fn new(
        range: TimeRange,
        items_by_source: HashMap<String, Vec<Item>>,
        source_status: BTreeMap<String, SourceStatus>,
    ) -> Self {
        let items = items_by_source.into_values().flatten().collect::<Vec<_>>();
        let items_by_type = group_by_kind(&items);
        let stats = count_by_kind(&items_by_type);
        Self {
            date: range.start,
            start_time: range.start,
            end_time: range.end,
            items,
            items_by_type,
            stats,
            source_status,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.start_time.timezone()
    }
}
