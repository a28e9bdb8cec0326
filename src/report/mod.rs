//! Turns collected [ReportData] into a Markdown document, either through the built-in layout or
//! through a user template with `{{placeholder}}` tokens.

pub mod sections;

use std::{
    borrow::Cow,
    collections::BTreeMap,
    path::PathBuf,
    sync::LazyLock,
};

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::{
    models::{Item, ItemKind, ReportData, SourceStatus},
    utils::clock::{Clock, DefaultClock},
};

use sections::render_section;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"));

/// Where the report layout comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Builtin,
    Inline(String),
    /// Read on every generation. Falls back to [TemplateSource::Builtin] when unreadable.
    File(PathBuf),
}

pub struct Generator {
    template: TemplateSource,
    clock: Box<dyn Clock>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            template: TemplateSource::Builtin,
            clock: Box::new(DefaultClock),
        }
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: TemplateSource::Inline(template.into()),
            ..Self::new()
        }
    }

    pub fn with_template_path(path: impl Into<PathBuf>) -> Self {
        Self {
            template: TemplateSource::File(path.into()),
            ..Self::new()
        }
    }

    /// Replaces the clock used for the generation timestamp.
    pub fn with_clock(self, clock: impl Clock) -> Self {
        Self {
            clock: Box::new(clock),
            ..self
        }
    }

    #[cfg(test)]
    pub fn template(&self) -> &TemplateSource {
        &self.template
    }

    pub fn generate(&self, data: &ReportData) -> String {
        let tz = data.timezone();
        let context = RenderContext {
            date: data.date,
            items_by_type: &data.items_by_type,
            stats: &data.stats,
            source_status: build_source_status(&data.source_status),
            generated_at: self.clock.time().with_timezone(&tz),
            tz,
        };

        match self.load_template() {
            Some(template) => context.render_custom(&template),
            None => context.render_builtin(),
        }
    }

    fn load_template(&self) -> Option<Cow<'_, str>> {
        match &self.template {
            TemplateSource::Builtin => None,
            TemplateSource::Inline(template) => Some(Cow::Borrowed(template)),
            TemplateSource::File(path) => match std::fs::read_to_string(path) {
                Ok(template) => {
                    debug!("Using template {path:?}");
                    Some(Cow::Owned(template))
                }
                Err(e) => {
                    warn!("Failed to read template {path:?}, using the default layout: {e}");
                    None
                }
            },
        }
    }
}

/// Sources in alphabetical order, e.g. `✅ git | ❌ jira (API error)`.
pub fn build_source_status(status: &BTreeMap<String, SourceStatus>) -> String {
    status
        .values()
        .map(|s| match (&s.error, s.success) {
            (_, true) => format!("✅ {}", s.name),
            (Some(error), false) => format!("❌ {} ({error})", s.name),
            (None, false) => format!("❌ {}", s.name),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn long_date(date: &DateTime<Tz>) -> String {
    format!("{}年{}月{}日", date.year(), date.month(), date.day())
}

struct RenderContext<'a> {
    date: DateTime<Tz>,
    items_by_type: &'a BTreeMap<ItemKind, Vec<Item>>,
    stats: &'a BTreeMap<ItemKind, usize>,
    source_status: String,
    generated_at: DateTime<Tz>,
    tz: Tz,
}

impl RenderContext<'_> {
    fn count(&self, kind: ItemKind) -> usize {
        self.stats.get(&kind).copied().unwrap_or(0)
    }

    fn items(&self, kind: ItemKind) -> &[Item] {
        self.items_by_type
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn section(&self, kind: ItemKind) -> String {
        render_section(kind, self.items(kind), self.tz)
    }

    fn render_builtin(&self) -> String {
        let mut out = format!("# 日报 - {}\n\n", long_date(&self.date));

        out.push_str("## 📊 汇总统计\n\n");
        out.push_str(&format!("- Git 提交: {} 次\n", self.count(ItemKind::Git)));
        out.push_str(&format!("- 会议: {} 场\n", self.count(ItemKind::Meeting)));
        out.push_str(&format!("- Jira 任务: {} 个\n", self.count(ItemKind::Jira)));
        out.push_str(&format!(
            "- Confluence 文档: {} 篇\n\n",
            self.count(ItemKind::Confluence)
        ));

        for kind in ItemKind::ALL {
            if !self.items(kind).is_empty() {
                out.push_str(&self.section(kind));
            }
        }

        out.push_str(&format!(
            "\n---\n\n生成于: {}\n数据源状态: {}\n",
            self.generated_at.format(TIMESTAMP_FORMAT),
            self.source_status
        ));
        out
    }

    /// Single pass over the template, so text inserted for one placeholder is never treated as
    /// another placeholder. Unknown placeholders stay as they are.
    fn render_custom(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                self.placeholder(&caps[1])
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn placeholder(&self, name: &str) -> Option<String> {
        let value = match name {
            "date" => long_date(&self.date),
            "date_en" => self.date.format(ISO_DATE_FORMAT).to_string(),
            "generate_time" => self.generated_at.format(TIMESTAMP_FORMAT).to_string(),
            "source_status" => self.source_status.clone(),
            _ => {
                let (kind, suffix) = name.rsplit_once('_')?;
                let kind = ItemKind::ALL.into_iter().find(|v| v.as_str() == kind)?;
                match suffix {
                    "count" => self.count(kind).to_string(),
                    "section" => self.section(kind),
                    _ => return None,
                }
            }
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use anyhow::Result;
    use chrono::{FixedOffset, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        models::{CommitDetails, ItemDetails, TaskDetails},
        utils::{
            clock::FixedClock,
            time::{day_range, TimeRange},
        },
    };

    use super::*;

    fn range() -> TimeRange {
        day_range(
            &Utc.with_ymd_and_hms(2026, 2, 11, 6, 0, 0).unwrap(),
            chrono_tz::Asia::Shanghai,
        )
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 2, 11, 10, 30, 15).unwrap())
    }

    fn commit(title: &str, repo: &str, hour: u32) -> Item {
        Item {
            title: title.into(),
            time: FixedOffset::east_opt(8 * 3600)
                .unwrap()
                .with_ymd_and_hms(2026, 2, 11, hour, 0, 0)
                .unwrap(),
            link: Some(format!("/src/{repo}/commit/abcdef123456")),
            content: Some("John Doe <john@example.com>".into()),
            details: ItemDetails::Git(CommitDetails {
                repo: repo.into(),
                hash: "abcdef123456".into(),
                author: "John Doe".into(),
                email: "john@example.com".into(),
            }),
        }
    }

    fn data(items: Vec<Item>, status: Vec<SourceStatus>) -> ReportData {
        ReportData::new(
            range(),
            HashMap::from([("git".to_string(), items)]),
            status.into_iter().map(|s| (s.name.clone(), s)).collect(),
        )
    }

    #[test]
    fn builtin_layout_for_empty_report() {
        let report = Generator::new()
            .with_clock(clock())
            .generate(&data(vec![], vec![]));

        assert_eq!(
            report,
            "# 日报 - 2026年2月11日\n\n\
             ## 📊 汇总统计\n\n\
             - Git 提交: 0 次\n\
             - 会议: 0 场\n\
             - Jira 任务: 0 个\n\
             - Confluence 文档: 0 篇\n\n\
             \n---\n\n\
             生成于: 2026-02-11 18:30:15\n\
             数据源状态: \n"
        );
    }

    #[test]
    fn builtin_layout_with_items() {
        let items = vec![
            commit("older", "alpha", 9),
            commit("newer", "alpha", 11),
            commit("other", "beta", 10),
        ];
        let report = Generator::new().with_clock(clock()).generate(&data(
            items,
            vec![
                SourceStatus::succeeded("git"),
                SourceStatus::failed("jira", "API error"),
            ],
        ));

        assert!(report.contains("- Git 提交: 3 次\n"));
        assert!(report.contains(
            "## 💻 代码提交\n\n\
             ### alpha\n\n\
             - newer (11:00)\n  commit: abcdef1\n\
             - older (09:00)\n  commit: abcdef1\n\n\
             ### beta\n\n\
             - other (10:00)\n  commit: abcdef1\n\n"
        ));
        assert!(!report.contains("## 📅 会议"));
        assert!(!report.contains("## 🎯 Jira 任务"));
        assert!(report.ends_with("数据源状态: ✅ git | ❌ jira (API error)\n"));
    }

    #[test]
    fn builtin_sections_follow_fixed_order() {
        let mut task = commit("task", "x", 12);
        task.details = ItemDetails::Jira(TaskDetails {
            status: Some("Done".into()),
        });
        let report = Generator::new().generate(&data(vec![task, commit("c", "r", 9)], vec![]));

        let git = report.find("## 💻 代码提交").unwrap();
        let jira = report.find("## 🎯 Jira 任务").unwrap();
        assert!(git < jira);
        assert!(report.contains("- Jira 任务: 1 个\n"));
    }

    #[test]
    fn custom_template_date_and_count() {
        let items = vec![commit("a", "r", 9), commit("b", "r", 10), commit("c", "r", 11)];
        let report = Generator::with_template("{{date}} {{git_count}}").generate(&data(items, vec![]));
        assert_eq!(report, "2026年2月11日 3");
    }

    #[test]
    fn custom_template_all_placeholders() {
        let template = "{{date_en}}|{{generate_time}}|{{source_status}}|{{meeting_count}}|\
                        {{jira_count}}|{{confluence_count}}|{{meeting_section}}";
        let report = Generator::with_template(template)
            .with_clock(clock())
            .generate(&data(vec![], vec![SourceStatus::succeeded("git")]));
        assert_eq!(
            report,
            "2026-02-11|2026-02-11 18:30:15|✅ git|0|0|0|## 📅 会议\n\n"
        );
    }

    #[test]
    fn custom_template_keeps_unknown_placeholders() {
        let report = Generator::with_template("{{unknown}} {{git_total}} {{ date }} {{date_en}}")
            .generate(&data(vec![], vec![]));
        assert_eq!(report, "{{unknown}} {{git_total}} {{ date }} 2026-02-11");
    }

    #[test]
    fn custom_template_does_not_rescan_inserted_text() {
        let items = vec![commit("docs: explain {{date}} usage", "r", 9)];
        let report = Generator::with_template("{{git_section}}").generate(&data(items, vec![]));
        assert!(report.contains("- docs: explain {{date}} usage (09:00)"));
    }

    #[test]
    fn template_file_is_loaded() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.md");
        fs::write(&path, "# Report {{date_en}}\n{{git_count}} commits\n")?;

        let report =
            Generator::with_template_path(&path).generate(&data(vec![commit("a", "r", 9)], vec![]));

        assert_eq!(report, "# Report 2026-02-11\n1 commits\n");
        Ok(())
    }

    #[test]
    fn missing_template_file_falls_back_to_builtin() {
        let report = Generator::with_template_path("/nonexistent/report.md")
            .generate(&data(vec![], vec![]));
        assert!(report.starts_with("# 日报 - 2026年2月11日\n\n## 📊 汇总统计"));
    }

    #[test]
    fn source_status_is_sorted() {
        let status = [
            SourceStatus::failed("jira", "API error"),
            SourceStatus::succeeded("git"),
            SourceStatus::succeeded("confluence"),
        ]
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();

        assert_eq!(
            build_source_status(&status),
            "✅ confluence | ✅ git | ❌ jira (API error)"
        );
        assert_eq!(build_source_status(&BTreeMap::new()), "");
    }
}
