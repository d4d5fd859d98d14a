//! Grouped-row contract shared by every domain table.
//!
//! Each remote row carries a JSON-encoded record payload plus the display
//! group it belongs to (`group_id`, `group_name`, `group_color`,
//! `is_expanded`). Loading a table turns its rows into ordered [`Group`]s:
//! rows whose payload does not parse are dropped, and a `(group_id, record
//! id)` pair seen earlier in the same load wins over later repeats.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::records::Record;

// ---------------------------------------------------------------------------
// Row and group types
// ---------------------------------------------------------------------------

/// Display metadata of a group, repeated on every row of the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_expanded")]
    pub is_expanded: bool,
}

fn default_expanded() -> bool {
    true
}

impl GroupMeta {
    /// An expanded group with no colour.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            is_expanded: true,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Group ids and names must be non-empty.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::Validation("Group id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("Group name must not be empty".into()));
        }
        Ok(())
    }
}

/// One persisted row, independent of the backend that stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRow {
    pub item_id: String,
    pub group: GroupMeta,
    pub position: i32,
    /// JSON-encoded record payload.
    pub item_data: String,
}

/// A named bucket of records in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group<T> {
    #[serde(flatten)]
    pub meta: GroupMeta,
    pub items: Vec<T>,
}

impl<T> Group<T> {
    pub fn empty(meta: GroupMeta) -> Self {
        Self {
            meta,
            items: Vec::new(),
        }
    }
}

/// Result of turning a table's rows into groups.
#[derive(Debug, Clone)]
pub struct Assembled<T> {
    pub groups: Vec<Group<T>>,
    /// Rows whose payload could not be decoded.
    pub dropped_malformed: usize,
    /// Rows repeating a `(group_id, record id)` already seen in this load.
    pub dropped_duplicates: usize,
}

// ---------------------------------------------------------------------------
// Load and encode
// ---------------------------------------------------------------------------

/// Decode, group and deduplicate rows.
///
/// Groups appear in the order their first row appears. Items inside a group
/// are ordered by `position`; ties keep row order. A payload without an `id`
/// takes the row's `item_id`; when both are empty the row counts as malformed.
pub fn assemble_groups<T: Record>(rows: Vec<StoredRow>) -> Assembled<T> {
    let mut groups: Vec<(GroupMeta, Vec<(i32, T)>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut dropped_malformed = 0;
    let mut dropped_duplicates = 0;

    for row in rows {
        let mut item: T = match serde_json::from_str(&row.item_data) {
            Ok(item) => item,
            Err(_) => {
                dropped_malformed += 1;
                continue;
            }
        };

        if item.id().is_empty() {
            if row.item_id.is_empty() {
                dropped_malformed += 1;
                continue;
            }
            item.set_id(row.item_id.clone());
        }

        if !seen.insert((row.group.id.clone(), item.id().to_string())) {
            dropped_duplicates += 1;
            continue;
        }

        let slot = *slots.entry(row.group.id.clone()).or_insert_with(|| {
            groups.push((row.group.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push((row.position, item));
    }

    let groups = groups
        .into_iter()
        .map(|(meta, mut items)| {
            items.sort_by_key(|(position, _)| *position);
            Group {
                meta,
                items: items.into_iter().map(|(_, item)| item).collect(),
            }
        })
        .collect();

    Assembled {
        groups,
        dropped_malformed,
        dropped_duplicates,
    }
}

/// Build the persisted row for `item` at `position` inside `group`.
pub fn encode_row<T: Record>(
    group: &GroupMeta,
    item: &T,
    position: usize,
) -> Result<StoredRow, CoreError> {
    let item_data = serde_json::to_string(item)
        .map_err(|e| CoreError::Internal(format!("Failed to encode {}: {e}", T::ENTITY)))?;
    Ok(StoredRow {
        item_id: item.id().to_string(),
        group: group.clone(),
        position: i32::try_from(position).unwrap_or(i32::MAX),
        item_data,
    })
}

// ---------------------------------------------------------------------------
// Group helpers
// ---------------------------------------------------------------------------

/// Generate a URL-safe group id from a display name.
///
/// Lowercases, replaces anything that is not ASCII alphanumeric with a hyphen,
/// collapses runs of hyphens and trims them from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_hyphen = true;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Calendar-month group used by the content calendar, e.g. `2026-10` /
/// `October 2026`.
pub fn month_group(date: NaiveDate) -> GroupMeta {
    GroupMeta::new(
        date.format("%Y-%m").to_string(),
        date.format("%B %Y").to_string(),
    )
}

/// Group named after `name`, falling back to `fallback` when the name has no
/// usable characters.
pub fn named_group(name: &str, fallback: &str) -> GroupMeta {
    let slug = slugify(name);
    if slug.is_empty() {
        GroupMeta::new(slugify(fallback), fallback)
    } else {
        GroupMeta::new(slug, name.trim())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::task::Task;

    fn row(group: &str, item_id: &str, position: i32, item_data: &str) -> StoredRow {
        StoredRow {
            item_id: item_id.to_string(),
            group: GroupMeta::new(group, group.to_uppercase()),
            position,
            item_data: item_data.to_string(),
        }
    }

    fn task_json(id: &str, title: &str) -> String {
        format!(r#"{{"id":"{id}","title":"{title}","status":"todo","priority":"medium"}}"#)
    }

    #[test]
    fn groups_rows_in_first_appearance_order() {
        let rows = vec![
            row("b", "1", 0, &task_json("1", "one")),
            row("a", "2", 0, &task_json("2", "two")),
            row("b", "3", 1, &task_json("3", "three")),
        ];
        let assembled = assemble_groups::<Task>(rows);
        let ids: Vec<_> = assembled.groups.iter().map(|g| g.meta.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(assembled.groups[0].items.len(), 2);
        assert_eq!(assembled.groups[1].items[0].title, "two");
    }

    #[test]
    fn orders_items_by_position() {
        let rows = vec![
            row("g", "1", 5, &task_json("1", "late")),
            row("g", "2", 1, &task_json("2", "early")),
        ];
        let assembled = assemble_groups::<Task>(rows);
        let titles: Vec<_> = assembled.groups[0]
            .items
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["early", "late"]);
    }

    #[test]
    fn drops_malformed_payloads() {
        let rows = vec![
            row("g", "1", 0, "{not json"),
            row("g", "2", 1, r#"{"id":"2"}"#),
            row("g", "3", 2, &task_json("3", "ok")),
        ];
        let assembled = assemble_groups::<Task>(rows);
        assert_eq!(assembled.dropped_malformed, 2);
        assert_eq!(assembled.groups[0].items.len(), 1);
    }

    #[test]
    fn first_row_wins_for_repeated_key() {
        let rows = vec![
            row("g", "1", 0, &task_json("1", "first")),
            row("g", "1", 1, &task_json("1", "second")),
        ];
        let assembled = assemble_groups::<Task>(rows);
        assert_eq!(assembled.dropped_duplicates, 1);
        assert_eq!(assembled.groups[0].items.len(), 1);
        assert_eq!(assembled.groups[0].items[0].title, "first");
    }

    #[test]
    fn same_record_id_in_different_groups_is_kept() {
        let rows = vec![
            row("a", "1", 0, &task_json("1", "in a")),
            row("b", "1", 0, &task_json("1", "in b")),
        ];
        let assembled = assemble_groups::<Task>(rows);
        assert_eq!(assembled.dropped_duplicates, 0);
        assert_eq!(assembled.groups.len(), 2);
    }

    #[test]
    fn payload_without_id_takes_row_item_id() {
        let rows = vec![row(
            "g",
            "row-7",
            0,
            r#"{"title":"no id","status":"todo","priority":"low"}"#,
        )];
        let assembled = assemble_groups::<Task>(rows);
        assert_eq!(assembled.groups[0].items[0].id, "row-7");
    }

    #[test]
    fn encode_row_round_trips_through_assemble() {
        let task = Task::new("Write brief");
        let group = GroupMeta::new("todo", "To do").with_color("#ff0000");
        let row = encode_row(&group, &task, 3).unwrap();
        assert_eq!(row.item_id, task.id);
        assert_eq!(row.position, 3);

        let assembled = assemble_groups::<Task>(vec![row]);
        assert_eq!(assembled.groups[0].meta, group);
        assert_eq!(assembled.groups[0].items[0], task);
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  Acme Dental -- Downtown! "), "acme-dental-downtown");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn month_group_formats_id_and_name() {
        let group = month_group(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(group.id, "2026-10");
        assert_eq!(group.name, "October 2026");
    }

    #[test]
    fn named_group_falls_back() {
        assert_eq!(named_group("Facebook Ads", "Other").id, "facebook-ads");
        let fallback = named_group("   ", "Other");
        assert_eq!(fallback.id, "other");
        assert_eq!(fallback.name, "Other");
    }

    #[test]
    fn group_meta_validation() {
        assert!(GroupMeta::new("a", "A").validate().is_ok());
        assert!(GroupMeta::new("", "A").validate().is_err());
        assert!(GroupMeta::new("a", " ").validate().is_err());
    }
}
