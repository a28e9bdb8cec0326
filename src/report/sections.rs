//! Markdown fragments for every item kind. Each renderer emits its heading even when `items` is
//! empty so custom templates keep their structure.

use std::collections::BTreeMap;

use chrono_tz::Tz;

use crate::models::{CommitDetails, Item, ItemDetails, ItemKind};

const CLOCK_FORMAT: &str = "%H:%M";

pub fn render_section(kind: ItemKind, items: &[Item], tz: Tz) -> String {
    match kind {
        ItemKind::Git => render_git(items, tz),
        ItemKind::Meeting => render_meetings(items, tz),
        ItemKind::Jira => render_tasks(items, tz),
        ItemKind::Confluence => render_documents(items, tz),
    }
}

fn clock(item: &Item, tz: Tz) -> String {
    item.time.with_timezone(&tz).format(CLOCK_FORMAT).to_string()
}

fn push_link(out: &mut String, item: &Item) {
    if let Some(link) = item.link.as_deref().filter(|v| !v.is_empty()) {
        out.push_str(&format!("- 链接: {link}\n"));
    }
}

/// Commits grouped under a heading per repository, repositories in alphabetical order.
fn render_git(items: &[Item], tz: Tz) -> String {
    let mut out = String::from("## 💻 代码提交\n\n");

    let mut by_repo = BTreeMap::<&str, Vec<(&Item, &CommitDetails)>>::new();
    for item in items {
        if let ItemDetails::Git(details) = &item.details {
            by_repo
                .entry(details.repo.as_str())
                .or_default()
                .push((item, details));
        }
    }

    for (repo, commits) in by_repo {
        out.push_str(&format!("### {repo}\n\n"));
        for (item, details) in commits {
            out.push_str(&format!("- {} ({})\n", item.title, clock(item, tz)));
            out.push_str(&format!("  commit: {}\n", details.short_hash()));
        }
        out.push('\n');
    }
    out
}

fn render_meetings(items: &[Item], tz: Tz) -> String {
    let mut out = String::from("## 📅 会议\n\n");
    for item in items {
        let attendees = match &item.details {
            ItemDetails::Meeting(details) if !details.attendees.is_empty() => {
                details.attendees.join(", ")
            }
            _ => item.content.clone().unwrap_or_default(),
        };
        out.push_str(&format!("### {} - {}\n", clock(item, tz), item.title));
        out.push_str(&format!("- 参会者: {attendees}\n"));
        push_link(&mut out, item);
        out.push('\n');
    }
    out
}

fn render_tasks(items: &[Item], tz: Tz) -> String {
    let mut out = String::from("## 🎯 Jira 任务\n\n");
    for item in items {
        out.push_str(&format!("### {}\n", item.title));
        if let ItemDetails::Jira(details) = &item.details {
            if let Some(status) = &details.status {
                out.push_str(&format!("- 状态: {status}\n"));
            }
        }
        out.push_str(&format!("- 更新时间: {}\n", clock(item, tz)));
        push_link(&mut out, item);
        out.push('\n');
    }
    out
}

fn render_documents(items: &[Item], tz: Tz) -> String {
    let mut out = String::from("## 📝 Confluence 文档\n\n");
    for item in items {
        let author = match &item.details {
            ItemDetails::Confluence(details) => details.author.clone(),
            _ => None,
        }
        .or_else(|| item.content.clone())
        .unwrap_or_default();
        out.push_str(&format!("### {}\n", item.title));
        out.push_str(&format!("- 作者: {author}\n"));
        out.push_str(&format!("- 更新时间: {}\n", clock(item, tz)));
        push_link(&mut out, item);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use crate::models::{DocumentDetails, MeetingDetails, TaskDetails};

    use super::*;

    fn item(title: &str, hour: u32, details: ItemDetails) -> Item {
        Item {
            title: title.into(),
            time: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2026, 2, 11, hour, 5, 0)
                .unwrap(),
            link: None,
            content: None,
            details,
        }
    }

    fn commit(title: &str, repo: &str, hash: &str) -> Item {
        item(
            title,
            2,
            ItemDetails::Git(CommitDetails {
                repo: repo.into(),
                hash: hash.into(),
                author: "John Doe".into(),
                email: "john@example.com".into(),
            }),
        )
    }

    #[test]
    fn git_groups_by_repository() {
        let items = vec![
            commit("second", "zeta", "1234567890"),
            commit("first", "alpha", "abcdef1234"),
        ];

        let rendered = render_section(ItemKind::Git, &items, chrono_tz::Asia::Shanghai);

        assert_eq!(
            rendered,
            "## 💻 代码提交\n\n\
             ### alpha\n\n\
             - first (10:05)\n  commit: abcdef1\n\n\
             ### zeta\n\n\
             - second (10:05)\n  commit: 1234567\n\n"
        );
    }

    #[test]
    fn empty_sections_keep_heading() {
        assert_eq!(
            render_section(ItemKind::Meeting, &[], chrono_tz::UTC),
            "## 📅 会议\n\n"
        );
    }

    #[test]
    fn meeting_layout() {
        let mut meeting = item(
            "Standup",
            9,
            ItemDetails::Meeting(MeetingDetails {
                attendees: vec!["Ann".into(), "Bob".into()],
            }),
        );
        meeting.link = Some("https://meet/1".into());

        let rendered = render_section(ItemKind::Meeting, &[meeting], chrono_tz::UTC);

        assert_eq!(
            rendered,
            "## 📅 会议\n\n### 09:05 - Standup\n- 参会者: Ann, Bob\n- 链接: https://meet/1\n\n"
        );
    }

    #[test]
    fn task_layout() {
        let task = item(
            "PROJ-1 Fix login",
            9,
            ItemDetails::Jira(TaskDetails {
                status: Some("Done".into()),
            }),
        );
        let no_status = item("PROJ-2", 8, ItemDetails::Jira(TaskDetails::default()));

        let rendered = render_section(ItemKind::Jira, &[task, no_status], chrono_tz::UTC);

        assert_eq!(
            rendered,
            "## 🎯 Jira 任务\n\n\
             ### PROJ-1 Fix login\n- 状态: Done\n- 更新时间: 09:05\n\n\
             ### PROJ-2\n- 更新时间: 08:05\n\n"
        );
    }

    #[test]
    fn document_author_falls_back_to_content() {
        let mut doc = item("Design", 9, ItemDetails::Confluence(DocumentDetails::default()));
        doc.content = Some("Ann".into());
        doc.link = Some("https://wiki/1".into());

        let rendered = render_section(ItemKind::Confluence, &[doc], chrono_tz::UTC);

        assert_eq!(
            rendered,
            "## 📝 Confluence 文档\n\n### Design\n- 作者: Ann\n- 更新时间: 09:05\n- 链接: https://wiki/1\n\n"
        );
    }
}
