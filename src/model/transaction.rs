//! Transaction records for logical writes
//!
//! One transaction per write operation, immutable once committed. Used for
//! audit and for downstream eventing.

use super::fragment::{Iri, Statement};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// What a write did to the affected statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    Inserted,
    Removed,
}

/// The audit record of one logical write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    id: Uuid,
    activity: Activity,
    statements: Vec<Statement>,
    committed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn inserted(statements: Vec<Statement>) -> Self {
        Self::commit(Activity::Inserted, statements)
    }

    pub fn removed(statements: Vec<Statement>) -> Self {
        Self::commit(Activity::Removed, statements)
    }

    fn commit(activity: Activity, statements: Vec<Statement>) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity,
            statements,
            committed_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    /// Distinct subjects touched by this write.
    pub fn affected_subjects(&self) -> BTreeSet<&Iri> {
        self.statements.iter().map(|s| &s.subject).collect()
    }
}
