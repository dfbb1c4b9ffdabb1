//! Task list query pipeline: status filter, search, sort.
//!
//! Raw query strings are mapped to closed enums at the boundary.
//! Unrecognized values fall back to the documented defaults — free text
//! never reaches the filter pipeline. Input is always pre-scoped to one
//! owner's tasks; this module never sees another user's records.

use crate::model::{Priority, Task};
use serde::Deserialize;

/// Raw query parameters as they arrive on the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Active,
    Completed,
}

impl StatusFilter {
    fn parse(value: Option<&str>) -> StatusFilter {
        match value.map(str::trim) {
            Some("active") => StatusFilter::Active,
            Some("completed") => StatusFilter::Completed,
            _ => StatusFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// created_at descending — most recent first.
    Date,
    /// High → Medium → Low, ties by created_at descending.
    Priority,
    /// due_date ascending, tasks without one last.
    DueDate,
    /// Title ascending, ties by created_at descending.
    Title,
}

impl SortKey {
    fn parse(value: Option<&str>) -> SortKey {
        match value.map(str::trim) {
            Some("priority") => SortKey::Priority,
            Some("due_date") => SortKey::DueDate,
            Some("title") => SortKey::Title,
            _ => SortKey::Date,
        }
    }
}

/// A fully-resolved list query. Construction cannot fail: every
/// unrecognized parameter has already collapsed to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub sort: SortKey,
    pub priority: Option<Priority>,
}

impl TaskQuery {
    pub fn from_params(params: &ListParams) -> TaskQuery {
        // Whitespace-only search means no search.
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        // An unrecognized priority filter is ignored, not an error.
        let priority = params.priority.as_deref().and_then(Priority::parse);

        TaskQuery {
            status: StatusFilter::parse(params.status.as_deref()),
            search,
            sort: SortKey::parse(params.sort.as_deref()),
            priority,
        }
    }

    /// Filter and order one user's tasks. Read-only over the store;
    /// consumes the scanned vector and returns the view to render.
    pub fn apply(&self, mut tasks: Vec<Task>) -> Vec<Task> {
        tasks.retain(|t| self.matches(t));

        match self.sort {
            SortKey::Date => {
                tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            SortKey::Priority => {
                tasks.sort_by(|a, b| {
                    b.priority
                        .cmp(&a.priority)
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
            SortKey::DueDate => {
                tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
                    (Some(da), Some(db)) => da.cmp(&db).then(b.created_at.cmp(&a.created_at)),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => b.created_at.cmp(&a.created_at),
                });
            }
            SortKey::Title => {
                tasks.sort_by(|a, b| a.title.cmp(&b.title).then(b.created_at.cmp(&a.created_at)));
            }
        }

        tasks
    }

    fn matches(&self, task: &Task) -> bool {
        match self.status {
            StatusFilter::All => {}
            StatusFilter::Active => {
                if task.completed {
                    return false;
                }
            }
            StatusFilter::Completed => {
                if !task.completed {
                    return false;
                }
            }
        }

        if let Some(want) = self.priority {
            if task.priority != want {
                return false;
            }
        }

        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }

        true
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    fn task(title: &str, created_at: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            due_date: None,
            tags: Vec::new(),
            color: None,
            owner: Uuid::nil(),
            created_at,
            updated_at: created_at,
        }
    }

    fn query(params: ListParams) -> TaskQuery {
        TaskQuery::from_params(&params)
    }

    #[test]
    fn defaults_when_params_absent() {
        let q = query(ListParams::default());
        assert_eq!(q.status, StatusFilter::All);
        assert_eq!(q.sort, SortKey::Date);
        assert_eq!(q.search, None);
        assert_eq!(q.priority, None);
    }

    #[test]
    fn unrecognized_params_fall_back() {
        let q = query(ListParams {
            status: Some("overdue".into()),
            sort: Some("karma".into()),
            priority: Some("urgent".into()),
            search: Some("   ".into()),
        });
        assert_eq!(q.status, StatusFilter::All);
        assert_eq!(q.sort, SortKey::Date);
        assert_eq!(q.priority, None);
        assert_eq!(q.search, None); // whitespace-only means no search
    }

    #[test]
    fn active_filter_excludes_completed() {
        let now = Utc::now();
        let mut done = task("Done", now);
        done.completed = true;
        let open = task("Open", now);

        let q = query(ListParams {
            status: Some("active".into()),
            ..Default::default()
        });
        let view = q.apply(vec![done.clone(), open.clone()]);
        assert_eq!(view.len(), 1);
        assert!(view.iter().all(|t| !t.completed));

        let q = query(ListParams {
            status: Some("completed".into()),
            ..Default::default()
        });
        let view = q.apply(vec![done, open]);
        assert_eq!(view.len(), 1);
        assert!(view.iter().all(|t| t.completed));
    }

    #[test]
    fn search_matches_title_and_description_case_insensitive() {
        let now = Utc::now();
        let by_title = task("Buy FOO today", now);
        let mut by_description = task("Groceries", now);
        by_description.description = Some("don't forget the foo".into());
        let neither = task("Unrelated", now);

        let q = query(ListParams {
            search: Some("foo".into()),
            ..Default::default()
        });
        let view = q.apply(vec![by_title.clone(), by_description.clone(), neither]);

        let ids: Vec<Uuid> = view.iter().map(|t| t.id).collect();
        assert_eq!(view.len(), 2);
        assert!(ids.contains(&by_title.id));
        assert!(ids.contains(&by_description.id));
    }

    #[test]
    fn priority_filter_narrows() {
        let now = Utc::now();
        let mut high = task("High", now);
        high.priority = Priority::High;
        let medium = task("Medium", now);

        let q = query(ListParams {
            priority: Some("high".into()),
            ..Default::default()
        });
        let view = q.apply(vec![high.clone(), medium]);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, high.id);
    }

    #[test]
    fn date_sort_is_most_recent_first() {
        let now = Utc::now();
        let older = task("Older", now - Duration::hours(2));
        let newer = task("Newer", now);

        let q = query(ListParams::default());
        let view = q.apply(vec![older.clone(), newer.clone()]);
        assert_eq!(view[0].id, newer.id);
        assert_eq!(view[1].id, older.id);
    }

    #[test]
    fn priority_sort_high_medium_low() {
        let now = Utc::now();
        let mut low = task("Low", now);
        low.priority = Priority::Low;
        let mut high = task("High", now);
        high.priority = Priority::High;
        let mut medium = task("Medium", now);
        medium.priority = Priority::Medium;

        let q = query(ListParams {
            sort: Some("priority".into()),
            ..Default::default()
        });
        let view = q.apply(vec![low, high, medium]);
        let order: Vec<Priority> = view.iter().map(|t| t.priority).collect();
        assert_eq!(order, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn priority_sort_breaks_ties_by_recency() {
        let now = Utc::now();
        let mut older = task("Older", now - Duration::hours(1));
        older.priority = Priority::High;
        let mut newer = task("Newer", now);
        newer.priority = Priority::High;

        let q = query(ListParams {
            sort: Some("priority".into()),
            ..Default::default()
        });
        let view = q.apply(vec![older.clone(), newer.clone()]);
        assert_eq!(view[0].id, newer.id);
    }

    #[test]
    fn due_date_sort_puts_dateless_last() {
        let now = Utc::now();
        let mut due_tomorrow = task("Tomorrow", now);
        due_tomorrow.due_date = Some(now + Duration::days(1));
        let mut due_next_week = task("Next week", now);
        due_next_week.due_date = Some(now + Duration::days(7));
        let dateless = task("Someday", now);

        let q = query(ListParams {
            sort: Some("due_date".into()),
            ..Default::default()
        });
        let view = q.apply(vec![dateless.clone(), due_next_week.clone(), due_tomorrow.clone()]);
        assert_eq!(view[0].id, due_tomorrow.id);
        assert_eq!(view[1].id, due_next_week.id);
        assert_eq!(view[2].id, dateless.id);
    }

    #[test]
    fn title_sort_is_lexicographic() {
        let now = Utc::now();
        let b = task("bravo", now);
        let a = task("alpha", now);
        let c = task("charlie", now);

        let q = query(ListParams {
            sort: Some("title".into()),
            ..Default::default()
        });
        let view = q.apply(vec![b, c, a]);
        let titles: Vec<&str> = view.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn filters_and_sort_compose() {
        let now = Utc::now();
        let mut done_match = task("fix roof", now - Duration::hours(3));
        done_match.completed = true;
        let mut open_match_old = task("fix fence", now - Duration::hours(2));
        open_match_old.priority = Priority::Low;
        let mut open_match_new = task("fix gate", now);
        open_match_new.priority = Priority::High;
        let open_other = task("water plants", now);

        let q = query(ListParams {
            status: Some("active".into()),
            search: Some("FIX".into()),
            sort: Some("priority".into()),
            priority: None,
        });
        let view = q.apply(vec![
            done_match,
            open_match_old.clone(),
            open_match_new.clone(),
            open_other,
        ]);

        assert_eq!(view.len(), 2);
        assert_eq!(view[0].id, open_match_new.id);
        assert_eq!(view[1].id, open_match_old.id);
    }
}
