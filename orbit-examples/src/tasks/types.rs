//! Domain types for the task tracker

use nutype::nutype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a task, `task-` followed by a time-ordered UUID
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TaskId(String);

impl TaskId {
    /// Mints a fresh id
    pub fn generate() -> Self {
        Self::try_new(format!("task-{}", Uuid::now_v7().simple()))
            .expect("generated task ids are never empty")
    }
}

/// Name of a task as typed by the user
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        AsRef,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TaskName(String);

/// A task in the tracker's list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// What the task is
    pub name: TaskName,
}

impl Task {
    /// Creates a task with a freshly generated id
    pub fn new(name: TaskName) -> Self {
        Self {
            id: TaskId::generate(),
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();

        assert!(a.as_ref().starts_with("task-"));
        assert_ne!(a, b);
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(TaskName::try_new("   ").is_err());
        assert_eq!(TaskName::try_new("  write docs ").unwrap().as_ref(), "write docs");
    }

    proptest! {
        #[test]
        fn names_up_to_the_limit_are_accepted(name in "[a-z]{1,200}") {
            prop_assert!(TaskName::try_new(name).is_ok());
        }

        #[test]
        fn overlong_names_are_rejected(name in "[a-z]{201,260}") {
            prop_assert!(TaskName::try_new(name).is_err());
        }
    }
}
