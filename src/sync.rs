use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::err::Error;

/// Describes one soft-deleting join table. Column names are compile-time
/// constants, never request data, so interpolating them is safe.
#[derive(Debug, Clone, Copy)]
pub struct JoinTable {
    pub table: &'static str,
    pub parent_col: &'static str,
    pub child_col: &'static str,
}

pub const MEETING_PROFESSIONALS: JoinTable = JoinTable {
    table: "meeting_professionals",
    parent_col: "meeting_id",
    child_col: "professional_id",
};

pub const SUPPORT_PLAN_STUDENTS: JoinTable = JoinTable {
    table: "support_plan_students",
    parent_col: "support_plan_id",
    child_col: "student_id",
};

pub const ADEQUACY_STUDENTS: JoinTable = JoinTable {
    table: "adequacy_students",
    parent_col: "adequacy_id",
    child_col: "student_id",
};

pub const ADEQUACY_SUBJECTS: JoinTable = JoinTable {
    table: "adequacy_subjects",
    parent_col: "adequacy_id",
    child_col: "subject_id",
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_insert: Vec<i32>,
    pub to_restore: Vec<i32>,
    pub to_delete: Vec<i32>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_restore.is_empty() && self.to_delete.is_empty()
    }
}

/// Compute the reconciliation between existing join rows and the wanted
/// child set. `existing` pairs a child id with whether any row for it is
/// still active. Pure so the reconciliation rules are testable without a
/// database.
pub fn plan_sync(existing: &[(i32, bool)], wanted: &[i32]) -> SyncPlan {
    let wanted: BTreeSet<i32> = wanted.iter().copied().collect();

    let mut active = BTreeSet::new();
    let mut inactive = BTreeSet::new();
    for (child, is_active) in existing {
        if *is_active {
            active.insert(*child);
            inactive.remove(child);
        } else if !active.contains(child) {
            inactive.insert(*child);
        }
    }

    let mut plan = SyncPlan::default();
    for child in &active {
        if !wanted.contains(child) {
            plan.to_delete.push(*child);
        }
    }
    for child in &wanted {
        if active.contains(child) {
            continue;
        }
        if inactive.contains(child) {
            plan.to_restore.push(*child);
        } else {
            plan.to_insert.push(*child);
        }
    }
    plan
}

/// Reconcile a join table so exactly `wanted` associations are active for
/// `parent_id`. History is kept: unwanted rows are soft-deleted, previously
/// deleted rows are restored instead of re-inserted. At most one row per
/// (parent, child) pair is ever active.
pub async fn sync_children(
    pool: &PgPool,
    join: &JoinTable,
    parent_id: i32,
    wanted: &[i32],
) -> Result<SyncPlan, Error> {
    let rows: Vec<(i32, Option<DateTime<Utc>>)> = sqlx::query_as(&format!(
        "SELECT {child}, deleted_date FROM {table} WHERE {parent} = $1",
        child = join.child_col,
        table = join.table,
        parent = join.parent_col,
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await
    .map_err(Error::from)?;

    let existing: Vec<(i32, bool)> = rows
        .into_iter()
        .map(|(child, deleted)| (child, deleted.is_none()))
        .collect();
    let plan = plan_sync(&existing, wanted);

    for child in &plan.to_delete {
        sqlx::query(&format!(
            "UPDATE {table} SET deleted_date = NOW() \
             WHERE {parent} = $1 AND {child} = $2 AND deleted_date IS NULL",
            table = join.table,
            parent = join.parent_col,
            child = join.child_col,
        ))
        .bind(parent_id)
        .bind(*child)
        .execute(pool)
        .await
        .map_err(Error::from)?;
    }

    for child in &plan.to_restore {
        // Restore only the newest historical row for the pair.
        sqlx::query(&format!(
            "UPDATE {table} SET deleted_date = NULL WHERE id = \
             (SELECT id FROM {table} WHERE {parent} = $1 AND {child} = $2 \
              AND deleted_date IS NOT NULL ORDER BY id DESC LIMIT 1)",
            table = join.table,
            parent = join.parent_col,
            child = join.child_col,
        ))
        .bind(parent_id)
        .bind(*child)
        .execute(pool)
        .await
        .map_err(Error::from)?;
    }

    for child in &plan.to_insert {
        sqlx::query(&format!(
            "INSERT INTO {table} ({parent}, {child}) VALUES ($1, $2)",
            table = join.table,
            parent = join.parent_col,
            child = join.child_col,
        ))
        .bind(parent_id)
        .bind(*child)
        .execute(pool)
        .await
        .map_err(Error::from)?;
    }

    if !plan.is_empty() {
        log::debug!(
            "synced {}: parent={} +{} ~{} -{}",
            join.table,
            parent_id,
            plan.to_insert.len(),
            plan.to_restore.len(),
            plan.to_delete.len()
        );
    }
    Ok(plan)
}

/// Active child ids for a parent, for shaping responses.
pub async fn active_children(
    pool: &PgPool,
    join: &JoinTable,
    parent_id: i32,
) -> Result<Vec<i32>, Error> {
    let rows: Vec<(i32,)> = sqlx::query_as(&format!(
        "SELECT {child} FROM {table} WHERE {parent} = $1 AND deleted_date IS NULL \
         ORDER BY {child}",
        child = join.child_col,
        table = join.table,
        parent = join.parent_col,
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await
    .map_err(Error::from)?;
    Ok(rows.into_iter().map(|(child,)| child).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciles_to_exactly_the_wanted_set() {
        // Active {A=1, B=2, C=3}, wanted {B=2, D=4}.
        let existing = vec![(1, true), (2, true), (3, true)];
        let plan = plan_sync(&existing, &[2, 4]);

        assert_eq!(plan.to_delete, vec![1, 3]);
        assert_eq!(plan.to_insert, vec![4]);
        assert!(plan.to_restore.is_empty());
    }

    #[test]
    fn deleted_rows_are_restored_not_reinserted() {
        let existing = vec![(1, false), (2, true)];
        let plan = plan_sync(&existing, &[1, 2]);

        assert_eq!(plan.to_restore, vec![1]);
        assert!(plan.to_insert.is_empty());
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn rerunning_after_apply_is_idempotent() {
        // State after applying the first test's plan: B and D active,
        // A and C soft-deleted.
        let existing = vec![(1, false), (2, true), (3, false), (4, true)];
        let plan = plan_sync(&existing, &[2, 4]);
        assert!(plan.is_empty());
    }

    #[test]
    fn duplicate_wanted_ids_collapse() {
        let plan = plan_sync(&[], &[7, 7, 7]);
        assert_eq!(plan.to_insert, vec![7]);
    }

    #[test]
    fn historical_duplicates_keep_single_active_row() {
        // Two historical rows for child 5, one still active: nothing to do.
        let existing = vec![(5, false), (5, true)];
        let plan = plan_sync(&existing, &[5]);
        assert!(plan.is_empty());

        // Order reversed in the scan.
        let existing = vec![(5, true), (5, false)];
        let plan = plan_sync(&existing, &[5]);
        assert!(plan.is_empty());
    }

    #[test]
    fn empty_wanted_set_deletes_everything_active() {
        let existing = vec![(1, true), (2, false)];
        let plan = plan_sync(&existing, &[]);
        assert_eq!(plan.to_delete, vec![1]);
        assert!(plan.to_insert.is_empty() && plan.to_restore.is_empty());
    }
}
