//! Domain types for the todo list.
//!
//! Clients address todos by position, but positions shift whenever an earlier
//! todo is deleted. Internally every record therefore carries a stable
//! [`TodoId`] handed out by [`TodoState`]; an index from the URL is resolved
//! to an id under the store's write lock, and the mutation is applied by id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use todo_api_core::snapshot_store::{Revision, Snapshot};
use uuid::Uuid;

use crate::validation::{ValidationError, COMPLETED, DESCRIPTION, TASK};

/// Stable internal identifier for a todo
///
/// Ids grow monotonically, so ordering by id is insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TodoId(u64);

impl TodoId {
    /// Creates a `TodoId` from a raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a command with the outcome action that answers it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random `RequestId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single todo, held as the JSON value it is stored as
///
/// Records created through the API are objects with a valid `task`. Records
/// loaded from disk are kept exactly as found, including entries with no
/// `task`, members holding `null`, and entries that are not objects at all,
/// so that rewriting the file never drops anything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoRecord(Value);

impl TodoRecord {
    /// Creates a record with only a task
    #[must_use]
    pub fn new(task: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TASK.to_string(), Value::String(task.into()));
        Self(Value::Object(fields))
    }

    /// Wraps already validated members
    #[must_use]
    pub const fn from_fields(fields: Map<String, Value>) -> Self {
        Self(Value::Object(fields))
    }

    /// Sets `completed`
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        if let Value::Object(fields) = &mut self.0 {
            fields.insert(COMPLETED.to_string(), Value::Bool(completed));
        }
        self
    }

    /// The `task` member, if it is a string
    #[must_use]
    pub fn task(&self) -> Option<&str> {
        self.get(TASK).and_then(Value::as_str)
    }

    /// The `completed` member, if it is a boolean
    #[must_use]
    pub fn completed(&self) -> Option<bool> {
        self.get(COMPLETED).and_then(Value::as_bool)
    }

    /// The `description` member, if it is a string
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.get(DESCRIPTION).and_then(Value::as_str)
    }

    /// Any member, as stored
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The stored JSON value
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Merges a validated patch: fields present in the patch overwrite,
    /// everything else is left alone.
    ///
    /// A loaded entry that is not an object has no members to merge into and
    /// is replaced by the patched fields.
    pub fn apply(&mut self, patch: TodoPatch) {
        if !self.0.is_object() {
            tracing::warn!(previous = %self.0, "Replacing non-object todo on update");
            self.0 = Value::Object(Map::new());
        }
        let Value::Object(fields) = &mut self.0 else {
            return;
        };

        fields.extend(patch.extra);
        if let Some(task) = patch.task {
            fields.insert(TASK.to_string(), Value::String(task));
        }
        if let Some(completed) = patch.completed {
            fields.insert(COMPLETED.to_string(), Value::Bool(completed));
        }
        if let Some(description) = patch.description {
            fields.insert(DESCRIPTION.to_string(), Value::String(description));
        }
    }
}

/// A validated partial update
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TodoPatch {
    /// New task, if sent
    pub task: Option<String>,
    /// New completion flag, if sent
    pub completed: Option<bool>,
    /// New description, if sent
    pub description: Option<String>,
    /// Other members to merge in
    pub extra: Map<String, Value>,
}

/// Index from a `/todo/{index}` path
///
/// A numeric index that can never be in range (negative, or too large for
/// `usize`) is still a number: it resolves to "not found", not "invalid".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TodoIndex {
    /// Zero-based position
    At(usize),
    /// Numeric, but no collection can contain it
    OutOfRange,
}

impl TodoIndex {
    /// Position, if the index can address anything at all
    #[must_use]
    pub const fn position(self) -> Option<usize> {
        match self {
            Self::At(position) => Some(position),
            Self::OutOfRange => None,
        }
    }
}

impl fmt::Display for TodoIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(position) => write!(f, "{position}"),
            Self::OutOfRange => write!(f, "out-of-range"),
        }
    }
}

/// Path segment is not an integer
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("Invalid index")]
pub struct IndexError;

impl FromStr for TodoIndex {
    type Err = IndexError;

    /// Accepts an optional `+`/`-` sign followed by ASCII digits.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (negative, digits) = match raw.as_bytes().first() {
            Some(b'-') => (true, &raw[1..]),
            Some(b'+') => (false, &raw[1..]),
            _ => (false, raw),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IndexError);
        }

        if negative {
            // -0 is still zero
            return Ok(if digits.bytes().all(|b| b == b'0') {
                Self::At(0)
            } else {
                Self::OutOfRange
            });
        }

        Ok(digits.parse().map_or(Self::OutOfRange, Self::At))
    }
}

/// The todo collection
///
/// Iteration order is insertion order; position `i` is the `i`-th entry.
#[derive(Clone, Debug, Default)]
pub struct TodoState {
    todos: BTreeMap<TodoId, TodoRecord>,
    next_id: u64,
    revision: Revision,
}

impl TodoState {
    /// Creates an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection from loaded records, in order
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = TodoRecord>) -> Self {
        let mut state = Self::new();
        for record in records {
            state.insert(record);
        }
        state
    }

    /// Returns the number of todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.todos.len()
    }

    /// Revision of the latest mutation
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the todo at `index`
    #[must_use]
    pub fn get(&self, index: TodoIndex) -> Option<&TodoRecord> {
        self.todos.values().nth(index.position()?)
    }

    /// Whether `index` addresses an existing todo
    #[must_use]
    pub fn contains(&self, index: TodoIndex) -> bool {
        index.position().is_some_and(|position| position < self.todos.len())
    }

    /// Resolves `index` to the id of the todo currently at that position
    #[must_use]
    pub fn id_at(&self, index: TodoIndex) -> Option<TodoId> {
        self.resolve(index).map(|(id, _)| id)
    }

    /// Resolves `index` to the id and position of the todo currently there
    #[must_use]
    pub fn resolve(&self, index: TodoIndex) -> Option<(TodoId, usize)> {
        let position = index.position()?;
        self.todos.keys().nth(position).map(|id| (*id, position))
    }

    /// Current position of `id`
    #[must_use]
    pub fn position_of(&self, id: TodoId) -> Option<usize> {
        if !self.todos.contains_key(&id) {
            return None;
        }
        Some(self.todos.range(..id).count())
    }

    /// All todos, in order
    pub fn records(&self) -> impl Iterator<Item = &TodoRecord> {
        self.todos.values()
    }

    /// Appends a todo, returning its id and position
    pub fn append(&mut self, record: TodoRecord) -> (TodoId, usize) {
        let id = self.insert(record);
        self.bump();
        (id, self.todos.len() - 1)
    }

    /// Merges `patch` into the todo with `id`
    ///
    /// Returns `false` (and changes nothing) if there is no such todo.
    pub fn merge(&mut self, id: TodoId, patch: TodoPatch) -> bool {
        let Some(record) = self.todos.get_mut(&id) else {
            return false;
        };
        record.apply(patch);
        self.bump();
        true
    }

    /// Removes the todo with `id`; later todos move up one position
    pub fn remove(&mut self, id: TodoId) -> Option<TodoRecord> {
        let removed = self.todos.remove(&id)?;
        self.bump();
        Some(removed)
    }

    /// Serializes the whole collection, tagged with the current revision
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be serialized.
    pub fn snapshot(&self) -> Result<Snapshot, serde_json::Error> {
        let records: Vec<&TodoRecord> = self.todos.values().collect();
        let payload = serde_json::to_vec_pretty(&records)?;
        Ok(Snapshot::new(self.revision, payload))
    }

    fn insert(&mut self, record: TodoRecord) -> TodoId {
        let id = TodoId::new(self.next_id);
        self.next_id += 1;
        self.todos.insert(id, record);
        id
    }

    fn bump(&mut self) {
        self.revision = self.revision.next();
    }
}

/// Commands sent by the HTTP layer, and the outcomes that answer them
#[derive(Clone, Debug, PartialEq)]
pub enum TodoAction {
    // ========== Commands ==========
    /// Command: validate `fields` and append a new todo
    CreateTodo {
        /// Correlates the outcome
        request_id: RequestId,
        /// Parsed request body
        fields: Value,
    },

    /// Command: validate `fields` and merge them into the todo at `index`
    UpdateTodo {
        /// Correlates the outcome
        request_id: RequestId,
        /// Target position
        index: TodoIndex,
        /// Parsed request body
        fields: Value,
    },

    /// Command: remove the todo at `index`
    DeleteTodo {
        /// Correlates the outcome
        request_id: RequestId,
        /// Target position
        index: TodoIndex,
    },

    // ========== Outcomes ==========
    /// Outcome: todo appended and persisted
    TodoCreated {
        /// Command this answers
        request_id: RequestId,
        /// New todo
        id: TodoId,
        /// Its position
        index: usize,
    },

    /// Outcome: todo merged and persisted
    TodoUpdated {
        /// Command this answers
        request_id: RequestId,
        /// Updated todo
        id: TodoId,
        /// Its position
        index: usize,
    },

    /// Outcome: todo removed and persisted
    TodoDeleted {
        /// Command this answers
        request_id: RequestId,
        /// Removed todo
        id: TodoId,
        /// Position it was removed from
        index: usize,
    },

    /// Outcome: the body was rejected; nothing changed
    ValidationFailed {
        /// Command this answers
        request_id: RequestId,
        /// Why
        error: ValidationError,
    },

    /// Outcome: no todo at the requested position; nothing changed
    TodoNotFound {
        /// Command this answers
        request_id: RequestId,
        /// Requested position
        index: TodoIndex,
    },
}

impl TodoAction {
    /// Request id carried by every variant
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::CreateTodo { request_id, .. }
            | Self::UpdateTodo { request_id, .. }
            | Self::DeleteTodo { request_id, .. }
            | Self::TodoCreated { request_id, .. }
            | Self::TodoUpdated { request_id, .. }
            | Self::TodoDeleted { request_id, .. }
            | Self::ValidationFailed { request_id, .. }
            | Self::TodoNotFound { request_id, .. } => *request_id,
        }
    }

    /// Whether this is a command (as opposed to an outcome)
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::CreateTodo { .. } | Self::UpdateTodo { .. } | Self::DeleteTodo { .. }
        )
    }

    /// Whether this is the outcome answering `request_id`
    #[must_use]
    pub fn is_outcome_for(&self, request_id: RequestId) -> bool {
        !self.is_command() && self.request_id() == request_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn state_with(tasks: &[&str]) -> TodoState {
        TodoState::from_records(tasks.iter().map(|t| TodoRecord::new(*t)))
    }

    fn tasks(state: &TodoState) -> Vec<String> {
        state
            .records()
            .map(|r| r.task().unwrap().to_string())
            .collect()
    }

    #[test]
    fn index_parsing() {
        assert_eq!("0".parse::<TodoIndex>(), Ok(TodoIndex::At(0)));
        assert_eq!("+7".parse::<TodoIndex>(), Ok(TodoIndex::At(7)));
        assert_eq!("-0".parse::<TodoIndex>(), Ok(TodoIndex::At(0)));
        assert_eq!("007".parse::<TodoIndex>(), Ok(TodoIndex::At(7)));
        assert_eq!("-1".parse::<TodoIndex>(), Ok(TodoIndex::OutOfRange));
        assert_eq!(
            "99999999999999999999999999".parse::<TodoIndex>(),
            Ok(TodoIndex::OutOfRange)
        );
    }

    #[test]
    fn index_parsing_rejects_non_integers() {
        for raw in ["", "abc", "1.5", "-", "+", " 1", "1e3", "0x1", "--1"] {
            assert_eq!(raw.parse::<TodoIndex>(), Err(IndexError), "{raw:?}");
        }
    }

    #[test]
    fn records_keep_unknown_members() {
        let record: TodoRecord =
            serde_json::from_value(json!({"task": "a", "priority": 3})).unwrap();
        assert_eq!(record.get("priority"), Some(&json!(3)));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"task": "a", "priority": 3})
        );
    }

    #[test]
    fn apply_merges_present_fields_only() {
        let mut record: TodoRecord =
            serde_json::from_value(json!({"task": "Buy milk", "completed": false, "description": "2%"}))
                .unwrap();

        record.apply(TodoPatch {
            completed: Some(true),
            ..TodoPatch::default()
        });

        assert_eq!(record.task(), Some("Buy milk"));
        assert_eq!(record.completed(), Some(true));
        assert_eq!(record.description(), Some("2%"));
    }

    #[test]
    fn loaded_oddities_survive_a_round_trip() {
        let stored = json!([
            {"task": "a", "completed": null},
            {"title": "legacy"},
            {"task": 7, "description": ["x"]},
            "bare string",
            {"task": "b"}
        ]);
        let records: Vec<TodoRecord> = serde_json::from_value(stored.clone()).unwrap();

        let state = TodoState::from_records(records);
        let rewritten: Value = serde_json::from_slice(&state.snapshot().unwrap().payload).unwrap();

        assert_eq!(rewritten, stored);
        assert_eq!(state.get(TodoIndex::At(0)).unwrap().completed(), None);
        assert_eq!(state.get(TodoIndex::At(2)).unwrap().task(), None);
    }

    #[test]
    fn apply_keeps_nulls_and_unknown_members() {
        let mut record: TodoRecord =
            serde_json::from_value(json!({"task": "a", "completed": null, "due": "friday"})).unwrap();

        record.apply(TodoPatch {
            task: Some("b".to_string()),
            ..TodoPatch::default()
        });

        assert_eq!(
            record.as_value(),
            &json!({"task": "b", "completed": null, "due": "friday"})
        );
    }

    #[test]
    fn apply_replaces_non_object_entries() {
        let mut record: TodoRecord = serde_json::from_value(json!(42)).unwrap();

        record.apply(TodoPatch {
            completed: Some(true),
            ..TodoPatch::default()
        });

        assert_eq!(record.as_value(), &json!({"completed": true}));
    }

    #[test]
    fn positions_follow_insertion_order() {
        let state = state_with(&["a", "b", "c"]);
        assert_eq!(state.get(TodoIndex::At(1)).unwrap().task(), Some("b"));
        assert!(state.get(TodoIndex::At(3)).is_none());
        assert!(state.get(TodoIndex::OutOfRange).is_none());
    }

    #[test]
    fn contains_checks_bounds() {
        let state = state_with(&["a"]);
        assert!(state.contains(TodoIndex::At(0)));
        assert!(!state.contains(TodoIndex::At(1)));
        assert!(!state.contains(TodoIndex::OutOfRange));
    }

    #[test]
    fn remove_shifts_later_positions() {
        let mut state = state_with(&["a", "b", "c"]);
        let id = state.id_at(TodoIndex::At(1)).unwrap();

        state.remove(id).unwrap();

        assert_eq!(tasks(&state), vec!["a", "c"]);
        assert_eq!(state.get(TodoIndex::At(1)).unwrap().task(), Some("c"));
        assert_eq!(state.position_of(id), None);
    }

    #[test]
    fn mutations_bump_revision() {
        let mut state = TodoState::new();
        assert_eq!(state.revision(), Revision::new(0));

        let (id, index) = state.append(TodoRecord::new("a"));
        assert_eq!(index, 0);
        assert_eq!(state.revision(), Revision::new(1));

        assert!(state.merge(id, TodoPatch::default()));
        state.remove(id).unwrap();
        assert_eq!(state.revision(), Revision::new(3));

        // Nothing to change, nothing bumped
        assert!(!state.merge(id, TodoPatch::default()));
        assert_eq!(state.revision(), Revision::new(3));
    }

    #[test]
    fn snapshot_is_pretty_json_array() {
        let state = state_with(&["a"]);
        let snapshot = state.snapshot().unwrap();
        let text = String::from_utf8(snapshot.payload).unwrap();
        assert_eq!(text, "[\n  {\n    \"task\": \"a\"\n  }\n]");
    }

    #[test]
    fn outcome_matching() {
        let request_id = RequestId::new();
        let command = TodoAction::DeleteTodo {
            request_id,
            index: TodoIndex::At(0),
        };
        let outcome = TodoAction::TodoNotFound {
            request_id,
            index: TodoIndex::At(0),
        };

        assert!(!command.is_outcome_for(request_id));
        assert!(outcome.is_outcome_for(request_id));
        assert!(!outcome.is_outcome_for(RequestId::new()));
    }

    proptest! {
        #[test]
        fn remove_at_shifts_exactly_one(len in 1usize..20, pick in 0usize..20) {
            let pick = pick % len;
            let names: Vec<String> = (0..len).map(|i| format!("t{i}")).collect();
            let mut state = TodoState::from_records(names.iter().map(TodoRecord::new));

            let id = state.id_at(TodoIndex::At(pick)).unwrap();
            state.remove(id).unwrap();

            let mut expected = names.clone();
            expected.remove(pick);
            prop_assert_eq!(tasks(&state), expected);
        }

        #[test]
        fn position_of_matches_id_at(len in 0usize..20) {
            let state = TodoState::from_records((0..len).map(|i| TodoRecord::new(format!("t{i}"))));
            for i in 0..len {
                let id = state.id_at(TodoIndex::At(i)).unwrap();
                prop_assert_eq!(state.position_of(id), Some(i));
            }
        }
    }
}
