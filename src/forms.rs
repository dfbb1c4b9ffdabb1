//! Task form validation.
//!
//! Incoming text either becomes a validated value object or a map of
//! field name → error messages, accumulated in one pass. There is no
//! partially-valid state, and nothing is persisted on failure.

use crate::model::{split_tags, Priority, Task};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 2000;

/// Raw create/update payload. Every field arrives as text (or not at
/// all); validation maps it onto the domain types.
#[derive(Debug, Default, Deserialize)]
pub struct TaskForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub tags: Option<String>,
    pub color: Option<String>,
}

/// Field name → list of messages. BTreeMap keeps the response ordering
/// stable for clients and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.errors.get(name).map(Vec::as_slice)
    }
}

/// A form that survived validation. Only this type can touch a Task.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub color: Option<String>,
}

impl TaskForm {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidTask, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = self.title.as_deref().unwrap_or("").trim().to_string();
        if title.is_empty() {
            errors.add("title", "Title cannot be empty.");
        } else if title.chars().count() < TITLE_MIN {
            errors.add("title", "Title must be at least 3 characters long.");
        } else if title.chars().count() > TITLE_MAX {
            errors.add("title", "Title cannot exceed 255 characters.");
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        if let Some(d) = &description {
            if d.chars().count() > DESCRIPTION_MAX {
                errors.add("description", "Description cannot exceed 2000 characters.");
            }
        }

        // Absent/empty priority defaults to Medium; present-but-unknown
        // text is a field error, not a silent fallback.
        let priority = match self.priority.as_deref().map(str::trim) {
            None | Some("") => Priority::Medium,
            Some(raw) => match Priority::parse(raw) {
                Some(p) => p,
                None => {
                    errors.add("priority", "Priority must be one of: low, medium, high.");
                    Priority::Medium
                }
            },
        };

        let due_date = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_due_date(raw) {
                Some(due) => {
                    if due < now - Duration::days(365) {
                        errors.add("due_date", "Due date cannot be more than 1 year in the past.");
                    }
                    Some(due)
                }
                None => {
                    errors.add("due_date", "Enter a valid date and time.");
                    None
                }
            },
        };

        let tags = self.tags.as_deref().map(split_tags).unwrap_or_default();

        let color = self
            .color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if let Some(c) = &color {
            if !is_hex_color(c) {
                errors.add("color", "Color must be a hex code like #FF5733.");
            }
        }

        // Cross-field: a description that just repeats the title is noise.
        if !title.is_empty() {
            if let Some(d) = &description {
                if d.to_lowercase() == title.to_lowercase() {
                    errors.add("description", "Description should be different from the title.");
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidTask {
            title,
            description,
            priority,
            due_date,
            tags,
            color,
        })
    }
}

impl ValidTask {
    /// Build a fresh task owned by `owner`. New tasks always start
    /// incomplete.
    pub fn into_task(self, owner: Uuid, now: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            completed: false,
            priority: self.priority,
            due_date: self.due_date,
            tags: self.tags,
            color: self.color,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the mutable fields of an existing task. Ownership,
    /// completion state, and created_at are untouched.
    pub fn apply_to(self, task: &mut Task, now: DateTime<Utc>) {
        task.title = self.title;
        task.description = self.description;
        task.priority = self.priority;
        task.due_date = self.due_date;
        task.tags = self.tags;
        task.color = self.color;
        task.updated_at = now;
    }
}

/// Accept RFC 3339 first, then the HTML datetime-local shape
/// (YYYY-MM-DDTHH:MM, taken as UTC).
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .ok()
        .map(|naive| naive.and_utc())
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

// ── Tests ──────────────────────────────────────────────────────
