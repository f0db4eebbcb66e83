//! # Organization Repository
//!
//! Tenant registration, stores, and role assignments.
//!
//! ## Registration Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │             register() — one transaction                                │
//! │                                                                         │
//! │  INSERT organization (UNIQUE subscription_id ← single-use guarantee)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT stores             (at least one, bounded by the plan)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT admin assignment   (the registering owner)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT — a replayed subscription_id aborts at step one with            │
//! │  SubscriptionAlreadyUsed; no orphan store or role is left behind.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Plan quotas are checked at the moment of creation only. Counting and
//! inserting happen inside one transaction so two racing invites cannot
//! both squeeze under the limit.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{is_unique_violation_on, DbError, DbResult};
use vendra_core::{
    CoreError, Organization, PlanPolicy, PlanTier, Role, RoleAssignment, Store, ValidationError,
};

/// Repository for organization, store, and role operations.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    pool: SqlitePool,
}

const ORG_COLUMNS: &str = "id, name, plan, subscription_id, created_at";
const STORE_COLUMNS: &str = "id, organization_id, name, created_at";
const ROLE_COLUMNS: &str = "id, organization_id, user_id, role, created_at";

impl OrganizationRepository {
    /// Creates a new OrganizationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrganizationRepository { pool }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a new organization from a verified subscription.
    ///
    /// Creates the organization, its initial stores (at least one), and the
    /// owner's admin assignment in one transaction. Exchanging the same
    /// subscription twice fails with [`CoreError::SubscriptionAlreadyUsed`]
    /// regardless of timing; the UNIQUE constraint arbitrates races.
    pub async fn register(
        &self,
        name: &str,
        plan: PlanTier,
        subscription_id: &str,
        store_names: &[String],
        owner_user_id: &str,
        policy: &PlanPolicy,
    ) -> DbResult<(Organization, Vec<Store>)> {
        if store_names.is_empty() {
            return Err(CoreError::from(ValidationError::Required {
                field: "stores".to_string(),
            })
            .into());
        }
        policy
            .check_store_limit(plan, store_names.len() as u32)
            .map_err(DbError::from)?;

        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            plan,
            subscription_id: subscription_id.to_string(),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let insert = sqlx::query(
            "INSERT INTO organizations (id, name, plan, subscription_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&org.id)
        .bind(&org.name)
        .bind(org.plan)
        .bind(&org.subscription_id)
        .bind(org.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            let err = DbError::from(err);
            if is_unique_violation_on(&err, "organizations") {
                return Err(CoreError::SubscriptionAlreadyUsed {
                    subscription_id: subscription_id.to_string(),
                }
                .into());
            }
            return Err(err);
        }

        let mut stores = Vec::with_capacity(store_names.len());
        for store_name in store_names {
            let store = Store {
                id: Uuid::new_v4().to_string(),
                organization_id: org.id.clone(),
                name: store_name.clone(),
                created_at: now,
            };

            sqlx::query(
                "INSERT INTO stores (id, organization_id, name, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&store.id)
            .bind(&store.organization_id)
            .bind(&store.name)
            .bind(store.created_at)
            .execute(&mut *tx)
            .await?;

            stores.push(store);
        }

        sqlx::query(
            "INSERT INTO role_assignments (id, organization_id, user_id, role, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&org.id)
        .bind(owner_user_id)
        .bind(Role::Admin)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            organization_id = %org.id,
            plan = ?plan,
            stores = stores.len(),
            "Organization registered"
        );

        Ok((org, stores))
    }

    /// Gets an organization by ID.
    pub async fn get_by_id(&self, organization_id: &str) -> DbResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?1"
        ))
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    /// Gets an organization by its external subscription reference.
    pub async fn get_by_subscription(&self, subscription_id: &str) -> DbResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE subscription_id = ?1"
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// Creates an additional store, subject to the organization's plan.
    ///
    /// The count and the insert share a transaction; two racing creates
    /// cannot both land under a Bounded limit.
    pub async fn create_store(
        &self,
        organization_id: &str,
        name: &str,
        policy: &PlanPolicy,
    ) -> DbResult<Store> {
        let mut tx = self.pool.begin().await?;

        let plan: PlanTier = sqlx::query_scalar("SELECT plan FROM organizations WHERE id = ?1")
            .bind(organization_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Organization", organization_id))?;

        let current: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stores WHERE organization_id = ?1")
                .bind(organization_id)
                .fetch_one(&mut *tx)
                .await?;

        policy
            .check_store_limit(plan, current as u32 + 1)
            .map_err(DbError::from)?;

        let store = Store {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO stores (id, organization_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&store.id)
        .bind(&store.organization_id)
        .bind(&store.name)
        .bind(store.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(organization_id = %organization_id, store_id = %store.id, "Store created");

        Ok(store)
    }

    /// Lists an organization's stores.
    pub async fn list_stores(&self, organization_id: &str) -> DbResult<Vec<Store>> {
        let stores = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE organization_id = ?1 ORDER BY created_at"
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Assigns a role to a user, subject to the organization's plan.
    ///
    /// A user holds a given role at most once per organization; repeating
    /// the assignment surfaces the UNIQUE violation.
    pub async fn assign_role(
        &self,
        organization_id: &str,
        user_id: &str,
        role: Role,
        policy: &PlanPolicy,
    ) -> DbResult<RoleAssignment> {
        let mut tx = self.pool.begin().await?;

        let plan: PlanTier = sqlx::query_scalar("SELECT plan FROM organizations WHERE id = ?1")
            .bind(organization_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Organization", organization_id))?;

        let current: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM role_assignments WHERE organization_id = ?1 AND role = ?2",
        )
        .bind(organization_id)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        policy
            .check_role_limit(plan, role, current as u32 + 1)
            .map_err(DbError::from)?;

        let assignment = RoleAssignment {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            user_id: user_id.to_string(),
            role,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO role_assignments (id, organization_id, user_id, role, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&assignment.id)
        .bind(&assignment.organization_id)
        .bind(&assignment.user_id)
        .bind(assignment.role)
        .bind(assignment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            organization_id = %organization_id,
            user_id = %user_id,
            role = ?role,
            "Role assigned"
        );

        Ok(assignment)
    }

    /// Lists role assignments for an organization.
    pub async fn list_roles(&self, organization_id: &str) -> DbResult<Vec<RoleAssignment>> {
        let roles = sqlx::query_as::<_, RoleAssignment>(&format!(
            "SELECT {ROLE_COLUMNS} FROM role_assignments \
             WHERE organization_id = ?1 ORDER BY created_at"
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }
}

// =============================================================================
// Integration Tests (in-memory SQLite)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_register_creates_org_store_and_admin() {
        let db = test_db().await;
        let orgs = db.organizations();
        let policy = PlanPolicy::standard();

        let (org, stores) = orgs
            .register(
                "Corner Shop",
                PlanTier::Starter,
                "sub_1",
                &names(&["Main Street"]),
                "user-1",
                &policy,
            )
            .await
            .unwrap();

        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].organization_id, org.id);

        let stores = orgs.list_stores(&org.id).await.unwrap();
        assert_eq!(stores.len(), 1);

        let roles = orgs.list_roles(&org.id).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role, Role::Admin);
        assert_eq!(roles[0].user_id, "user-1");

        let by_sub = orgs.get_by_subscription("sub_1").await.unwrap().unwrap();
        assert_eq!(by_sub.id, org.id);
    }

    #[tokio::test]
    async fn test_register_requires_a_store() {
        let db = test_db().await;

        let err = db
            .organizations()
            .register(
                "Shop",
                PlanTier::Starter,
                "sub_1",
                &[],
                "user-1",
                &PlanPolicy::standard(),
            )
            .await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_subscription_is_single_use() {
        let db = test_db().await;
        let orgs = db.organizations();
        let policy = PlanPolicy::standard();

        orgs.register(
            "First",
            PlanTier::Starter,
            "sub_1",
            &names(&["Store"]),
            "user-1",
            &policy,
        )
        .await
        .unwrap();

        let err = orgs
            .register(
                "Second",
                PlanTier::Growth,
                "sub_1",
                &names(&["Other Store"]),
                "user-2",
                &policy,
            )
            .await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::SubscriptionAlreadyUsed { .. }))
        ));

        // The failed registration left no orphan store behind.
        let first = orgs.get_by_subscription("sub_1").await.unwrap().unwrap();
        assert_eq!(first.name, "First");
        assert_eq!(orgs.list_stores(&first.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_limit_enforced() {
        let db = test_db().await;
        let orgs = db.organizations();
        let policy = PlanPolicy::standard();

        // Starter allows exactly one store, created at registration.
        let (org, _) = orgs
            .register(
                "Shop",
                PlanTier::Starter,
                "sub_1",
                &names(&["Only Store"]),
                "user-1",
                &policy,
            )
            .await
            .unwrap();

        let err = orgs.create_store(&org.id, "Second Store", &policy).await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::PlanLimitExceeded { .. }))
        ));

        // Two stores at registration cross the Starter limit before any
        // row is written.
        let err = orgs
            .register(
                "Greedy",
                PlanTier::Starter,
                "sub_9",
                &names(&["One", "Two"]),
                "user-9",
                &policy,
            )
            .await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::PlanLimitExceeded { .. }))
        ));
        assert!(orgs.get_by_subscription("sub_9").await.unwrap().is_none());

        // Growth allows five.
        let (growth, _) = orgs
            .register(
                "Chain",
                PlanTier::Growth,
                "sub_2",
                &names(&["Store 1"]),
                "user-2",
                &policy,
            )
            .await
            .unwrap();
        for n in 2..=5 {
            orgs.create_store(&growth.id, &format!("Store {n}"), &policy)
                .await
                .unwrap();
        }
        assert!(orgs.create_store(&growth.id, "Store 6", &policy).await.is_err());
    }

    #[tokio::test]
    async fn test_cashier_limit_third_ok_fourth_fails() {
        let db = test_db().await;
        let orgs = db.organizations();
        let policy = PlanPolicy::standard();

        let (org, _) = orgs
            .register(
                "Shop",
                PlanTier::Starter,
                "sub_1",
                &names(&["Store"]),
                "owner",
                &policy,
            )
            .await
            .unwrap();

        for n in 1..=3 {
            orgs.assign_role(&org.id, &format!("cashier-{n}"), Role::Cashier, &policy)
                .await
                .unwrap();
        }

        let err = orgs
            .assign_role(&org.id, "cashier-4", Role::Cashier, &policy)
            .await;
        match err {
            Err(DbError::Domain(CoreError::PlanLimitExceeded {
                boundary,
                limit,
                requested,
            })) => {
                assert_eq!(boundary, "role:cashier");
                assert_eq!(limit, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("expected PlanLimitExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_role_assignment_rejected() {
        let db = test_db().await;
        let orgs = db.organizations();
        let policy = PlanPolicy::standard();

        let (org, _) = orgs
            .register(
                "Shop",
                PlanTier::Growth,
                "sub_1",
                &names(&["Store"]),
                "owner",
                &policy,
            )
            .await
            .unwrap();

        orgs.assign_role(&org.id, "user-7", Role::Manager, &policy).await.unwrap();
        let err = orgs.assign_role(&org.id, "user-7", Role::Manager, &policy).await;
        assert!(matches!(err, Err(DbError::UniqueViolation { .. })));

        // The same user may hold a different role.
        assert!(orgs.assign_role(&org.id, "user-7", Role::Cashier, &policy).await.is_ok());
    }

    #[tokio::test]
    async fn test_downgrade_grandfathers_existing_entities() {
        let db = test_db().await;
        let orgs = db.organizations();
        let policy = PlanPolicy::standard();

        let (org, _) = orgs
            .register(
                "Chain",
                PlanTier::Growth,
                "sub_1",
                &names(&["Store 1"]),
                "owner",
                &policy,
            )
            .await
            .unwrap();
        orgs.create_store(&org.id, "Store 2", &policy).await.unwrap();

        // Simulate a downgrade to Starter (limit: 1 store).
        sqlx::query("UPDATE organizations SET plan = 'starter' WHERE id = ?1")
            .bind(&org.id)
            .execute(db.pool())
            .await
            .unwrap();

        // Existing stores remain; only NEW creations are blocked.
        assert_eq!(orgs.list_stores(&org.id).await.unwrap().len(), 2);
        assert!(orgs.create_store(&org.id, "Store 3", &policy).await.is_err());
    }
}
