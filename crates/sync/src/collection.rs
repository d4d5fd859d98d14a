//! The in-memory copy of one domain table.
//!
//! Reads never touch the datastore. Mutations validate, update the local
//! groups under a write lock and queue the matching remote writes before
//! releasing it, so the queue sees writes in the same order as the local
//! groups do. Stored
//! `position` values are kept equal to each item's index in its group, so a
//! mutation that shifts items also queues updates for the shifted ones.

use std::sync::Arc;

use agency_core::error::CoreError;
use agency_core::grouping::{assemble_groups, encode_row, Group, GroupMeta};
use agency_core::records::{ensure_id, Record};
use agency_core::tables::DomainTable;
use agency_events::{EventBus, Notification};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::SyncError;
use crate::remote::{RemoteTable, WriteOp};
use crate::writer::{RetryPolicy, WriteQueue};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: DomainTable,
    pub groups: usize,
    pub items: usize,
    pub dropped_malformed: usize,
    pub dropped_duplicates: usize,
}

/// Where an item sits: its group and index within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub group: GroupMeta,
    pub index: usize,
}

/// An item together with its placement. Returned by `add` and `remove`, and
/// accepted by `restore` to put a removed item back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placed<T> {
    pub group: GroupMeta,
    pub index: usize,
    pub item: T,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

struct Inner<T> {
    remote: Arc<dyn RemoteTable>,
    writes: WriteQueue,
    bus: Arc<EventBus>,
    groups: RwLock<Vec<Group<T>>>,
}

/// Shared handle; clones see the same groups and write queue.
pub struct Collection<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Record> Collection<T> {
    /// Create an empty collection and spawn its write worker.
    pub fn new(remote: Arc<dyn RemoteTable>, bus: Arc<EventBus>, policy: RetryPolicy) -> Self {
        debug_assert_eq!(remote.table(), T::TABLE);
        let writes = WriteQueue::spawn(Arc::clone(&remote), Arc::clone(&bus), policy);
        Self {
            inner: Arc::new(Inner {
                remote,
                writes,
                bus,
                groups: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn table(&self) -> DomainTable {
        T::TABLE
    }

    // ---- loading ----

    /// Replace the local groups with the table's current rows.
    ///
    /// On failure the local groups are left untouched and a `load_failed`
    /// notification is published.
    pub async fn load(&self) -> Result<LoadReport, SyncError> {
        let rows = match self.inner.remote.fetch_all().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(table = %T::TABLE, error = %e, "Failed to load table");
                self.inner.bus.publish(Notification::load_failed(T::TABLE, &e));
                return Err(e);
            }
        };

        let assembled = assemble_groups::<T>(rows);
        if assembled.dropped_malformed > 0 || assembled.dropped_duplicates > 0 {
            tracing::warn!(
                table = %T::TABLE,
                malformed = assembled.dropped_malformed,
                duplicates = assembled.dropped_duplicates,
                "Skipped rows while loading"
            );
        }

        let report = LoadReport {
            table: T::TABLE,
            groups: assembled.groups.len(),
            items: assembled.groups.iter().map(|g| g.items.len()).sum(),
            dropped_malformed: assembled.dropped_malformed,
            dropped_duplicates: assembled.dropped_duplicates,
        };
        *self.inner.groups.write() = assembled.groups;

        tracing::debug!(
            table = %T::TABLE,
            groups = report.groups,
            items = report.items,
            "Loaded table"
        );
        Ok(report)
    }

    /// Wait for every queued write to be attempted.
    pub async fn flush(&self) {
        self.inner.writes.flush().await;
    }

    pub async fn ping(&self) -> Result<(), SyncError> {
        self.inner.remote.ping().await
    }

    // ---- reads ----

    /// Snapshot of all groups in display order.
    pub fn groups(&self) -> Vec<Group<T>> {
        self.inner.groups.read().clone()
    }

    pub fn group(&self, group_id: &str) -> Option<Group<T>> {
        self.inner
            .groups
            .read()
            .iter()
            .find(|g| g.meta.id == group_id)
            .cloned()
    }

    pub fn find(&self, group_id: &str, item_id: &str) -> Option<T> {
        self.inner
            .groups
            .read()
            .iter()
            .find(|g| g.meta.id == group_id)
            .and_then(|g| g.items.iter().find(|i| i.id() == item_id))
            .cloned()
    }

    /// First item, in display order, matching `predicate`.
    pub fn find_where<F>(&self, predicate: F) -> Option<Placed<T>>
    where
        F: Fn(&T) -> bool,
    {
        let groups = self.inner.groups.read();
        groups.iter().find_map(|g| {
            g.items
                .iter()
                .position(&predicate)
                .map(|index| Placed {
                    group: g.meta.clone(),
                    index,
                    item: g.items[index].clone(),
                })
        })
    }

    /// Every item, flattened in display order.
    pub fn items(&self) -> Vec<T> {
        self.inner
            .groups
            .read()
            .iter()
            .flat_map(|g| g.items.iter().cloned())
            .collect()
    }

    /// Total number of items across groups.
    pub fn len(&self) -> usize {
        self.inner.groups.read().iter().map(|g| g.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---- mutations ----

    /// Append `item` to `group`, creating the group when it does not exist.
    ///
    /// An existing group keeps its own metadata. A blank id is replaced with
    /// a fresh one; an id already present in the group is a conflict.
    pub fn add(&self, group: GroupMeta, mut item: T) -> Result<Placed<T>, CoreError> {
        group.validate()?;
        ensure_id(&mut item);
        item.validate()?;

        let mut groups = self.inner.groups.write();
        let slot = slot_or_create(&mut groups, &group);
        let target = &mut groups[slot];
        if target.items.iter().any(|i| i.id() == item.id()) {
            return Err(CoreError::Conflict(format!(
                "{} '{}' already exists in group '{}'",
                T::ENTITY,
                item.id(),
                target.meta.id
            )));
        }

        let index = target.items.len();
        let row = encode_row(&target.meta, &item, index)?;
        target.items.push(item.clone());
        let placed = Placed {
            group: target.meta.clone(),
            index,
            item,
        };
        self.inner.writes.submit(WriteOp::Insert(row));
        Ok(placed)
    }

    /// Replace the item with the same id in `group_id`, returning the
    /// previous value.
    pub fn update(&self, group_id: &str, item: T) -> Result<T, CoreError> {
        item.validate()?;

        let mut groups = self.inner.groups.write();
        let group = find_group_mut(&mut groups, group_id, item.id())?;
        let index = find_index::<T>(group, item.id())?;
        let row = encode_row(&group.meta, &item, index)?;
        let previous = std::mem::replace(&mut group.items[index], item);
        self.inner.writes.submit(WriteOp::Update {
            group_id: group_id.to_string(),
            item_id: row.item_id.clone(),
            row,
        });
        Ok(previous)
    }

    /// Remove an item, returning it with the placement it had.
    pub fn remove(&self, group_id: &str, item_id: &str) -> Result<Placed<T>, CoreError> {
        let mut groups = self.inner.groups.write();
        let group = find_group_mut(&mut groups, group_id, item_id)?;
        let index = find_index::<T>(group, item_id)?;
        let item = group.items.remove(index);
        let shifted = renumber(group, index, None)?;
        let meta = group.meta.clone();
        self.inner.writes.submit(WriteOp::Delete {
            group_id: group_id.to_string(),
            item_id: item_id.to_string(),
        });
        self.submit_all(shifted);
        Ok(Placed {
            group: meta,
            index,
            item,
        })
    }

    /// Put a removed item back at its former index, clamped to the group's
    /// current length. Recreates the group if it no longer exists.
    pub fn restore(&self, placed: Placed<T>) -> Result<Placement, CoreError> {
        let Placed { group, index, item } = placed;
        group.validate()?;

        let mut groups = self.inner.groups.write();
        let slot = slot_or_create(&mut groups, &group);
        let target = &mut groups[slot];
        if target.items.iter().any(|i| i.id() == item.id()) {
            return Err(CoreError::Conflict(format!(
                "{} '{}' is already present in group '{}'",
                T::ENTITY,
                item.id(),
                target.meta.id
            )));
        }

        let index = index.min(target.items.len());
        let row = encode_row(&target.meta, &item, index)?;
        target.items.insert(index, item);
        let shifted = renumber(target, index + 1, None)?;
        let placement = Placement {
            group: target.meta.clone(),
            index,
        };
        self.inner.writes.submit(WriteOp::Insert(row));
        self.submit_all(shifted);
        Ok(placement)
    }

    /// Move an item to `index` in `target` (created when missing), returning
    /// the placement it had before the move.
    pub fn move_item(
        &self,
        group_id: &str,
        item_id: &str,
        target: GroupMeta,
        index: usize,
    ) -> Result<Placement, CoreError> {
        target.validate()?;

        let mut groups = self.inner.groups.write();
        let source_slot = groups
            .iter()
            .position(|g| g.meta.id == group_id)
            .ok_or_else(|| CoreError::not_found(T::ENTITY, item_id))?;
        let from = find_index::<T>(&groups[source_slot], item_id)?;
        let original = Placement {
            group: groups[source_slot].meta.clone(),
            index: from,
        };

        let item = groups[source_slot].items.remove(from);
        let target_slot = slot_or_create(&mut groups, &target);
        let destination = &mut groups[target_slot];
        let to = index.min(destination.items.len());
        let row = encode_row(&destination.meta, &item, to)?;
        destination.items.insert(to, item);

        let mut ops = vec![WriteOp::Update {
            group_id: group_id.to_string(),
            item_id: item_id.to_string(),
            row,
        }];
        if target_slot == source_slot {
            ops.extend(renumber(&groups[target_slot], from.min(to), Some(item_id))?);
        } else {
            ops.extend(renumber(&groups[source_slot], from, None)?);
            ops.extend(renumber(&groups[target_slot], to + 1, None)?);
        }
        self.submit_all(ops);
        Ok(original)
    }

    /// Replace a group's metadata, returning the previous metadata.
    pub fn update_group(&self, meta: GroupMeta) -> Result<GroupMeta, CoreError> {
        meta.validate()?;

        let mut groups = self.inner.groups.write();
        let group = groups
            .iter_mut()
            .find(|g| g.meta.id == meta.id)
            .ok_or_else(|| CoreError::not_found("group", meta.id.clone()))?;
        let previous = std::mem::replace(&mut group.meta, meta.clone());
        self.inner.writes.submit(WriteOp::UpdateGroup(meta));
        Ok(previous)
    }

    fn submit_all(&self, ops: Vec<WriteOp>) {
        for op in ops {
            self.inner.writes.submit(op);
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn slot_or_create<T>(groups: &mut Vec<Group<T>>, meta: &GroupMeta) -> usize {
    match groups.iter().position(|g| g.meta.id == meta.id) {
        Some(slot) => slot,
        None => {
            groups.push(Group::empty(meta.clone()));
            groups.len() - 1
        }
    }
}

fn find_group_mut<'a, T: Record>(
    groups: &'a mut [Group<T>],
    group_id: &str,
    item_id: &str,
) -> Result<&'a mut Group<T>, CoreError> {
    groups
        .iter_mut()
        .find(|g| g.meta.id == group_id)
        .ok_or_else(|| CoreError::not_found(T::ENTITY, item_id))
}

fn find_index<T: Record>(group: &Group<T>, item_id: &str) -> Result<usize, CoreError> {
    group
        .items
        .iter()
        .position(|i| i.id() == item_id)
        .ok_or_else(|| CoreError::not_found(T::ENTITY, item_id))
}

/// Position updates for items from index `from` onward, skipping `skip`.
fn renumber<T: Record>(
    group: &Group<T>,
    from: usize,
    skip: Option<&str>,
) -> Result<Vec<WriteOp>, CoreError> {
    group
        .items
        .iter()
        .enumerate()
        .skip(from)
        .filter(|(_, item)| Some(item.id()) != skip)
        .map(|(index, item)| {
            let row = encode_row(&group.meta, item, index)?;
            Ok(WriteOp::Update {
                group_id: group.meta.id.clone(),
                item_id: row.item_id.clone(),
                row,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use agency_core::grouping::StoredRow;
    use agency_core::records::Task;
    use agency_events::NotificationKind;
    use assert_matches::assert_matches;

    use super::*;
    use crate::memory::MemoryTable;

    fn setup() -> (Arc<MemoryTable>, Collection<Task>, Arc<EventBus>) {
        let table = Arc::new(MemoryTable::new(DomainTable::Tasks));
        let bus = Arc::new(EventBus::default());
        let tasks = Collection::new(table.clone(), bus.clone(), RetryPolicy::no_retry());
        (table, tasks, bus)
    }

    fn todo() -> GroupMeta {
        GroupMeta::new("todo", "To do")
    }

    fn done() -> GroupMeta {
        GroupMeta::new("done", "Done")
    }

    fn titles(tasks: &Collection<Task>, group_id: &str) -> Vec<String> {
        tasks
            .group(group_id)
            .map(|g| g.items.into_iter().map(|t| t.title).collect())
            .unwrap_or_default()
    }

    /// Rows as the next load would see them: `(group, title, position)`.
    fn remote_rows(table: &MemoryTable) -> Vec<(String, String, i32)> {
        table
            .rows()
            .into_iter()
            .map(|row: StoredRow| {
                let task: Task = serde_json::from_str(&row.item_data).unwrap();
                (row.group.id, task.title, row.position)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // load
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn load_replaces_local_groups() {
        let (table, tasks, _) = setup();
        let task = Task::new("Seeded");
        table.push_row(encode_row(&todo(), &task, 0).unwrap());
        table.push_row(StoredRow {
            item_id: "bad".into(),
            group: todo(),
            position: 1,
            item_data: "{oops".into(),
        });

        let report = tasks.load().await.unwrap();

        assert_eq!(report.items, 1);
        assert_eq!(report.dropped_malformed, 1);
        assert_eq!(titles(&tasks, "todo"), vec!["Seeded"]);
    }

    #[tokio::test]
    async fn failed_load_keeps_state_and_notifies() {
        let (table, tasks, bus) = setup();
        let mut rx = bus.subscribe();
        tasks.add(todo(), Task::new("Local")).unwrap();
        tasks.flush().await;
        table.fail_next_fetches(1);

        assert_matches!(tasks.load().await, Err(SyncError::Unavailable(_)));

        assert_eq!(titles(&tasks, "todo"), vec!["Local"]);
        assert_eq!(rx.try_recv().unwrap().kind, NotificationKind::LoadFailed);
    }

    // -----------------------------------------------------------------------
    // add / update / remove
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_assigns_id_and_writes_row() {
        let (table, tasks, _) = setup();
        let mut task = Task::new("Draft captions");
        task.id = String::new();

        let placed = tasks.add(todo(), task).unwrap();
        tasks.flush().await;

        assert!(!placed.item.id.is_empty());
        assert_eq!(placed.index, 0);
        assert_eq!(
            remote_rows(&table),
            vec![("todo".into(), "Draft captions".into(), 0)]
        );
    }

    #[tokio::test]
    async fn add_into_existing_group_keeps_its_meta() {
        let (_, tasks, _) = setup();
        tasks.add(todo(), Task::new("One")).unwrap();
        let placed = tasks
            .add(GroupMeta::new("todo", "Renamed?"), Task::new("Two"))
            .unwrap();
        assert_eq!(placed.group.name, "To do");
        assert_eq!(placed.index, 1);
    }

    #[tokio::test]
    async fn add_rejects_duplicate_id_and_invalid_item() {
        let (_, tasks, _) = setup();
        let task = Task::new("One");
        tasks.add(todo(), task.clone()).unwrap();
        assert_matches!(tasks.add(todo(), task), Err(CoreError::Conflict(_)));
        assert_matches!(
            tasks.add(todo(), Task::new("  ")),
            Err(CoreError::Validation(_))
        );
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn update_returns_previous_value() {
        let (table, tasks, _) = setup();
        let placed = tasks.add(todo(), Task::new("Old")).unwrap();
        let mut changed = placed.item.clone();
        changed.title = "New".into();

        let previous = tasks.update("todo", changed).unwrap();
        tasks.flush().await;

        assert_eq!(previous.title, "Old");
        assert_eq!(titles(&tasks, "todo"), vec!["New"]);
        assert_eq!(remote_rows(&table), vec![("todo".into(), "New".into(), 0)]);
    }

    #[tokio::test]
    async fn update_unknown_item_is_not_found() {
        let (_, tasks, _) = setup();
        assert_matches!(
            tasks.update("todo", Task::new("Ghost")),
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn remove_then_restore_returns_item_to_its_slot() {
        let (table, tasks, _) = setup();
        tasks.add(todo(), Task::new("A")).unwrap();
        let b = tasks.add(todo(), Task::new("B")).unwrap();
        tasks.add(todo(), Task::new("C")).unwrap();

        let removed = tasks.remove("todo", &b.item.id).unwrap();
        assert_eq!(removed.index, 1);
        assert_eq!(titles(&tasks, "todo"), vec!["A", "C"]);

        tasks.restore(removed).unwrap();
        tasks.flush().await;

        assert_eq!(titles(&tasks, "todo"), vec!["A", "B", "C"]);
        let reloaded = tasks.load().await.unwrap();
        assert_eq!(reloaded.items, 3);
        assert_eq!(titles(&tasks, "todo"), vec!["A", "B", "C"]);
        assert_eq!(table.rows().len(), 3);
    }

    #[tokio::test]
    async fn append_after_remove_keeps_remote_order() {
        let (_, tasks, _) = setup();
        let a = tasks.add(todo(), Task::new("A")).unwrap();
        tasks.add(todo(), Task::new("B")).unwrap();
        tasks.remove("todo", &a.item.id).unwrap();
        tasks.add(todo(), Task::new("C")).unwrap();
        tasks.flush().await;

        tasks.load().await.unwrap();
        assert_eq!(titles(&tasks, "todo"), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn restore_into_vanished_group_recreates_it() {
        let (_, tasks, _) = setup();
        let placed = tasks.add(done(), Task::new("Only")).unwrap();
        let removed = tasks.remove("done", &placed.item.id).unwrap();
        let placement = tasks
            .restore(Placed {
                index: 7,
                ..removed
            })
            .unwrap();
        assert_eq!(placement.index, 0);
        assert_eq!(titles(&tasks, "done"), vec!["Only"]);
    }

    // -----------------------------------------------------------------------
    // move / group updates
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn move_between_groups_persists_new_order() {
        let (_, tasks, _) = setup();
        let a = tasks.add(todo(), Task::new("A")).unwrap();
        tasks.add(todo(), Task::new("B")).unwrap();
        tasks.add(done(), Task::new("X")).unwrap();

        let original = tasks.move_item("todo", &a.item.id, done(), 0).unwrap();
        tasks.flush().await;

        assert_eq!(original.group.id, "todo");
        assert_eq!(original.index, 0);
        tasks.load().await.unwrap();
        assert_eq!(titles(&tasks, "todo"), vec!["B"]);
        assert_eq!(titles(&tasks, "done"), vec!["A", "X"]);
    }

    #[tokio::test]
    async fn move_within_group_reorders() {
        let (_, tasks, _) = setup();
        let a = tasks.add(todo(), Task::new("A")).unwrap();
        tasks.add(todo(), Task::new("B")).unwrap();
        tasks.add(todo(), Task::new("C")).unwrap();

        tasks.move_item("todo", &a.item.id, todo(), 2).unwrap();
        tasks.flush().await;

        assert_eq!(titles(&tasks, "todo"), vec!["B", "C", "A"]);
        tasks.load().await.unwrap();
        assert_eq!(titles(&tasks, "todo"), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn update_group_rewrites_meta_everywhere() {
        let (table, tasks, _) = setup();
        tasks.add(todo(), Task::new("A")).unwrap();
        tasks.add(todo(), Task::new("B")).unwrap();

        let previous = tasks
            .update_group(GroupMeta::new("todo", "Backlog").with_color("#123456"))
            .unwrap();
        tasks.flush().await;

        assert_eq!(previous.name, "To do");
        assert!(table.rows().iter().all(|r| r.group.name == "Backlog"));
        assert_matches!(
            tasks.update_group(GroupMeta::new("nope", "Nope")),
            Err(CoreError::NotFound { .. })
        );
    }

    // -----------------------------------------------------------------------
    // write failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn failed_write_keeps_optimistic_value() {
        let (table, tasks, bus) = setup();
        let mut rx = bus.subscribe();
        table.fail_next_writes(1);

        tasks.add(todo(), Task::new("Optimistic")).unwrap();
        tasks.flush().await;

        assert_eq!(titles(&tasks, "todo"), vec!["Optimistic"]);
        assert!(table.rows().is_empty());
        assert_eq!(rx.try_recv().unwrap().kind, NotificationKind::WriteFailed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_updates_leave_remote_equal_to_local() {
        let (table, tasks, _) = setup();
        let placed = tasks.add(todo(), Task::new("Start")).unwrap();
        let id = placed.item.id.clone();

        for round in 0..200 {
            let barrier = std::sync::Barrier::new(2);
            std::thread::scope(|scope| {
                for writer in ["left", "right"] {
                    let (tasks, barrier, id) = (&tasks, &barrier, &id);
                    scope.spawn(move || {
                        let mut task = tasks.find("todo", id).unwrap();
                        task.title = format!("{writer} {round}");
                        barrier.wait();
                        tasks.update("todo", task).unwrap();
                    });
                }
            });
            tasks.flush().await;

            let remote: Vec<String> = remote_rows(&table).into_iter().map(|r| r.1).collect();
            assert_eq!(remote, titles(&tasks, "todo"), "round {round}");
        }
    }

    #[tokio::test]
    async fn find_where_searches_in_display_order() {
        let (_, tasks, _) = setup();
        tasks.add(todo(), Task::new("Alpha")).unwrap();
        tasks.add(done(), Task::new("Beta")).unwrap();

        let found = tasks.find_where(|t| t.title.starts_with('B')).unwrap();
        assert_eq!(found.group.id, "done");
        assert_eq!(found.index, 0);
        assert!(tasks.find_where(|t| t.title == "Gamma").is_none());
        assert_eq!(tasks.items().len(), 2);
    }
}
