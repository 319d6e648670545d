//! Board layout inside the loro document.
//!
//! The board is one list container, `tasks`, holding a map per task,
//! newest first. `author`, `stars`, `state` and `removed` are plain map
//! values; `title` is a nested text container, so title edits merge per
//! character while concurrent scalar writes resolve last-writer-wins.

use std::collections::HashSet;

use kanban_proto::ids::TaskId;
use kanban_proto::task::{Stars, TaskState};
use loro::{Container, LoroDoc, LoroError, LoroList, LoroMap, LoroText, LoroValue, ValueOrContainer};

use crate::model::{Task, TaskDraft, TaskList};
use crate::text::Splice;

const TASKS: &str = "tasks";

const ID: &str = "id";
const AUTHOR: &str = "author";
const STARS: &str = "stars";
const STATE: &str = "state";
const REMOVED: &str = "removed";
const TITLE: &str = "title";

fn task_list(doc: &LoroDoc) -> LoroList {
    doc.get_list(TASKS)
}

/// Every task map in sequence order.
fn task_maps(doc: &LoroDoc) -> Vec<LoroMap> {
    let mut maps = Vec::new();
    task_list(doc).for_each(|v| {
        if let ValueOrContainer::Container(Container::Map(map)) = v {
            maps.push(map);
        }
    });
    maps
}

fn value(map: &LoroMap, key: &str) -> Option<LoroValue> {
    match map.get(key)? {
        ValueOrContainer::Value(val) => Some(val),
        ValueOrContainer::Container(_) => None,
    }
}

fn string(map: &LoroMap, key: &str) -> Option<String> {
    value(map, key)?.as_string().map(|s| s.to_string())
}

fn title_text(map: &LoroMap) -> Option<LoroText> {
    match map.get(TITLE)? {
        ValueOrContainer::Container(Container::Text(text)) => Some(text),
        _ => None,
    }
}

/// Decodes one task map. `None` if a required field is missing or invalid.
fn read_task(map: &LoroMap) -> Option<Task> {
    let id = string(map, ID)?.parse::<TaskId>().ok()?;
    let stars = match value(map, STARS)? {
        LoroValue::I64(n) => u8::try_from(n).ok().and_then(|n| Stars::try_from(n).ok())?,
        _ => return None,
    };
    let removed = matches!(value(map, REMOVED), Some(LoroValue::Bool(true)));
    Some(Task {
        id,
        author: string(map, AUTHOR)?,
        title: title_text(map).map(|t| t.to_string()).unwrap_or_default(),
        state: TaskState::from_key(&string(map, STATE)?)?,
        stars,
        removed,
    })
}

/// Reads the whole board.
///
/// Entries that do not decode are skipped. If two entries carry the same
/// task id, the first in sequence order is kept.
pub(crate) fn snapshot(doc: &LoroDoc) -> TaskList {
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();
    for map in task_maps(doc) {
        let Some(task) = read_task(&map) else {
            tracing::warn!("skipping malformed task entry");
            continue;
        };
        if !seen.insert(task.id.clone()) {
            tracing::warn!(task = %task.id, "ignoring duplicate task id");
            continue;
        }
        tasks.push(task);
    }
    TaskList { tasks }
}

/// The map of the first task with `id`, with its decoded value.
pub(crate) fn find(doc: &LoroDoc, id: &TaskId) -> Option<(LoroMap, Task)> {
    task_maps(doc)
        .into_iter()
        .filter_map(|map| read_task(&map).map(|task| (map, task)))
        .find(|(_, task)| task.id == *id)
}

/// Writes a new task map at the head of the sequence, in `Backlog`.
pub(crate) fn insert_task(doc: &LoroDoc, id: &TaskId, draft: &TaskDraft) -> Result<(), LoroError> {
    let map = task_list(doc).insert_container(0, LoroMap::new())?;
    map.insert(ID, id.to_string())?;
    map.insert(AUTHOR, draft.author())?;
    map.insert(STARS, i64::from(draft.stars().get()))?;
    map.insert(STATE, TaskState::Backlog.key())?;
    map.insert(REMOVED, false)?;
    let title = map.insert_container(TITLE, LoroText::new())?;
    title.insert(0, draft.title())?;
    Ok(())
}

pub(crate) fn set_state(map: &LoroMap, state: TaskState) -> Result<(), LoroError> {
    map.insert(STATE, state.key())
}

/// Only ever writes `true`, so a concurrent merge can never bring a
/// removed task back.
pub(crate) fn mark_removed(map: &LoroMap) -> Result<(), LoroError> {
    map.insert(REMOVED, true)
}

/// Applies `splice` to the task's title text, clamped to its length.
///
/// Returns whether anything was written.
pub(crate) fn splice_title(map: &LoroMap, splice: &Splice) -> Result<bool, LoroError> {
    let Some(text) = title_text(map) else {
        return Ok(false);
    };
    let len = text.len_unicode();
    let start = splice.index.min(len);
    let delete = splice.delete.min(len - start);
    if delete > 0 {
        text.delete(start, delete)?;
    }
    if !splice.insert.is_empty() {
        text.insert(start, &splice.insert)?;
    }
    Ok(delete > 0 || !splice.insert.is_empty())
}
