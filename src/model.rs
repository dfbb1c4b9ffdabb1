use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Entity types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Priority {
    /// Map incoming text to a priority. Unknown text is None — callers
    /// decide whether that means "default" or "field error".
    pub fn parse(value: &str) -> Option<Priority> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Display color for the priority badge. Never persisted.
    pub fn color(self) -> &'static str {
        match self {
            Priority::Low => "green",
            Priority::Medium => "yellow",
            Priority::High => "red",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A task — one to-do item, owned by exactly one user.
///
/// No serde field attributes here: the same struct is postcard-encoded
/// for storage, which needs every field present in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub color: Option<String>,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Overdue = has a due date in the past and is not completed.
    /// Completed tasks keep their due date but are never overdue.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.completed && due < now,
            None => false,
        }
    }

    /// Whole days until the due date. Negative when past due.
    pub fn days_until_due(&self, now: DateTime<Utc>) -> Option<i64> {
        self.due_date.map(|due| (due - now).num_days())
    }

    /// Due within `days` from now, not completed, not already overdue.
    pub fn is_due_soon(&self, now: DateTime<Utc>, days: i64) -> bool {
        if self.completed {
            return false;
        }
        match self.days_until_due(now) {
            Some(d) => (0..=days).contains(&d) && !self.is_overdue(now),
            None => false,
        }
    }

    /// Flip the completed flag. Returns the new value.
    /// Two calls return the task to its original state — flip, not set.
    pub fn toggle_completion(&mut self, now: DateTime<Utc>) -> bool {
        self.completed = !self.completed;
        self.updated_at = now;
        self.completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// ── Tag helpers ────────────────────────────────────────────────

/// Split a comma-separated tag string into trimmed, non-empty tags.
pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_task(now: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Buy milk".into(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            due_date: None,
            tags: Vec::new(),
            color: None,
            owner: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn priority_parse_is_case_insensitive() {
        assert_eq!(Priority::parse("high"), Some(Priority::High));
        assert_eq!(Priority::parse(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::parse("Medium"), Some(Priority::Medium));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(Priority::parse(""), None);
    }

    #[test]
    fn priority_ordering_and_colors() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::Low.color(), "green");
        assert_eq!(Priority::Medium.color(), "yellow");
        assert_eq!(Priority::High.color(), "red");
    }

    #[test]
    fn overdue_needs_past_due_date_and_incomplete() {
        let now = Utc::now();
        let mut task = sample_task(now);

        // No due date — never overdue
        assert!(!task.is_overdue(now));

        // Due yesterday, not completed — overdue
        task.due_date = Some(now - Duration::days(1));
        assert!(task.is_overdue(now));

        // Same task completed — no longer overdue, due date retained
        task.completed = true;
        assert!(!task.is_overdue(now));
        assert!(task.due_date.is_some());

        // Due tomorrow — not overdue
        task.completed = false;
        task.due_date = Some(now + Duration::days(1));
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn due_soon_window() {
        let now = Utc::now();
        let mut task = sample_task(now);

        task.due_date = Some(now + Duration::days(2));
        assert!(task.is_due_soon(now, 3));

        task.due_date = Some(now + Duration::days(10));
        assert!(!task.is_due_soon(now, 3));

        // Already overdue — not "due soon"
        task.due_date = Some(now - Duration::days(1));
        assert!(!task.is_due_soon(now, 3));

        // Completed — never due soon
        task.due_date = Some(now + Duration::days(1));
        task.completed = true;
        assert!(!task.is_due_soon(now, 3));
    }

    #[test]
    fn toggle_flips_both_ways() {
        let now = Utc::now();
        let mut task = sample_task(now);

        assert!(task.toggle_completion(now));
        assert!(task.completed);
        assert!(!task.toggle_completion(now));
        assert!(!task.completed);
    }

    #[test]
    fn toggle_refreshes_updated_at() {
        let created = Utc::now();
        let mut task = sample_task(created);

        let later = created + Duration::minutes(5);
        task.toggle_completion(later);
        assert_eq!(task.updated_at, later);
        assert_eq!(task.created_at, created);
    }

    #[test]
    fn split_tags_trims_and_drops_empties() {
        assert_eq!(
            split_tags("work, personal , urgent"),
            vec!["work", "personal", "urgent"],
        );
        assert_eq!(split_tags(""), Vec::<String>::new());
        assert_eq!(split_tags(" , ,,"), Vec::<String>::new());
        assert_eq!(split_tags("solo"), vec!["solo"]);
    }
}
