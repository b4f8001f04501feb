//! Request body validation.
//!
//! Both entry points take the parsed JSON body and either return the typed
//! value or the first rule it breaks. Field checks run in the order
//! task, completed, description. The `Display` text of [`ValidationError`] is
//! sent to clients as-is.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{TodoPatch, TodoRecord};

/// Longest accepted task, in characters, after trimming
pub const MAX_TASK_CHARS: usize = 500;

/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

pub(crate) const TASK: &str = "task";
pub(crate) const COMPLETED: &str = "completed";
pub(crate) const DESCRIPTION: &str = "description";

/// A rule the request body breaks
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Body is valid JSON but not an object
    #[error("Todo must be a JSON object")]
    NotAnObject,

    /// `task` missing on create
    #[error("Task field is required")]
    TaskRequired,

    /// `task` present but not a string
    #[error("Task must be a string")]
    TaskNotString,

    /// `task` is empty after trimming
    #[error("Task cannot be empty or whitespace")]
    TaskBlank,

    /// `task` exceeds [`MAX_TASK_CHARS`] after trimming
    #[error("Task is too long (maximum 500 characters)")]
    TaskTooLong,

    /// `completed` present but not a boolean
    #[error("Completed field must be a boolean (true/false)")]
    CompletedNotBoolean,

    /// `description` present but not a string
    #[error("Description must be a string")]
    DescriptionNotString,

    /// `description` exceeds [`MAX_DESCRIPTION_CHARS`]
    #[error("Description is too long (maximum 1000 characters)")]
    DescriptionTooLong,

    /// Update names none of the known fields
    #[error("At least one field must be provided for update")]
    NoFieldsToUpdate,
}

/// Validates the body of a create request
///
/// # Errors
///
/// Returns the first rule the body breaks.
pub fn validate_new(body: &Value) -> Result<TodoRecord, ValidationError> {
    let fields = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let task = fields
        .get(TASK)
        .ok_or(ValidationError::TaskRequired)
        .and_then(check_task)?;
    let completed = fields.get(COMPLETED).map(check_completed).transpose()?;
    let description = fields.get(DESCRIPTION).map(check_description).transpose()?;

    let mut record = unknown_members(fields);
    record.insert(TASK.to_string(), Value::String(task));
    if let Some(completed) = completed {
        record.insert(COMPLETED.to_string(), Value::Bool(completed));
    }
    if let Some(description) = description {
        record.insert(DESCRIPTION.to_string(), Value::String(description));
    }
    Ok(TodoRecord::from_fields(record))
}

/// Validates the body of an update request
///
/// # Errors
///
/// Returns the first rule the body breaks.
pub fn validate_patch(body: &Value) -> Result<TodoPatch, ValidationError> {
    let fields = body.as_object().ok_or(ValidationError::NotAnObject)?;

    if ![TASK, COMPLETED, DESCRIPTION]
        .iter()
        .any(|name| fields.contains_key(*name))
    {
        return Err(ValidationError::NoFieldsToUpdate);
    }

    Ok(TodoPatch {
        task: fields.get(TASK).map(check_task).transpose()?,
        completed: fields.get(COMPLETED).map(check_completed).transpose()?,
        description: fields.get(DESCRIPTION).map(check_description).transpose()?,
        extra: unknown_members(fields),
    })
}

fn check_task(value: &Value) -> Result<String, ValidationError> {
    let task = value.as_str().ok_or(ValidationError::TaskNotString)?;
    let trimmed = task.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::TaskBlank);
    }
    if trimmed.chars().count() > MAX_TASK_CHARS {
        return Err(ValidationError::TaskTooLong);
    }

    // Stored as sent; trimming only decides validity
    Ok(task.to_string())
}

fn check_completed(value: &Value) -> Result<bool, ValidationError> {
    value.as_bool().ok_or(ValidationError::CompletedNotBoolean)
}

fn check_description(value: &Value) -> Result<String, ValidationError> {
    let description = value.as_str().ok_or(ValidationError::DescriptionNotString)?;

    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooLong);
    }

    Ok(description.to_string())
}

fn unknown_members(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(name, _)| ![TASK, COMPLETED, DESCRIPTION].contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
