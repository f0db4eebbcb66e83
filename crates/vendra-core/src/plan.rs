//! # Plan Policy
//!
//! Subscription-plan quota enforcement: stores per organization and users
//! per role. Pure comparisons against an explicit tier → limits table.
//!
//! ## Enforcement Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Limits are evaluated at the MOMENT OF CREATION only.                   │
//! │                                                                         │
//! │  register-organization ──► check_store_limit(plan, stores.len())        │
//! │  invite acceptance     ──► check_role_limit(plan, role, count + 1)      │
//! │                                                                         │
//! │  A plan downgrade does NOT retroactively revoke existing stores or      │
//! │  assignments; those are grandfathered.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table is injected at construction (not a module-level singleton) so
//! tests can swap in tight limits.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::{PlanTier, Role};

// =============================================================================
// Limits
// =============================================================================

/// A single quota boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// At most this many.
    Bounded(u32),
    /// No cap.
    Unbounded,
}

impl Limit {
    /// Whether `proposed` entities would fit under this limit.
    #[inline]
    pub fn allows(&self, proposed: u32) -> bool {
        match self {
            Limit::Bounded(max) => proposed <= *max,
            Limit::Unbounded => true,
        }
    }
}

/// Per-tier quota set.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub max_stores: Limit,
    pub max_admins: Limit,
    pub max_managers: Limit,
    pub max_cashiers: Limit,
}

impl PlanLimits {
    fn role_limit(&self, role: Role) -> Limit {
        match role {
            Role::Admin => self.max_admins,
            Role::Manager => self.max_managers,
            Role::Cashier => self.max_cashiers,
        }
    }
}

// =============================================================================
// Policy Engine
// =============================================================================

/// Evaluates proposed entity counts against the plan's quota table.
#[derive(Debug, Clone)]
pub struct PlanPolicy {
    table: HashMap<PlanTier, PlanLimits>,
}

impl PlanPolicy {
    /// Builds a policy from an explicit tier → limits table.
    pub fn new(table: HashMap<PlanTier, PlanLimits>) -> Self {
        PlanPolicy { table }
    }

    /// The shipped default table.
    pub fn standard() -> Self {
        let mut table = HashMap::new();
        table.insert(
            PlanTier::Starter,
            PlanLimits {
                max_stores: Limit::Bounded(1),
                max_admins: Limit::Bounded(1),
                max_managers: Limit::Bounded(1),
                max_cashiers: Limit::Bounded(3),
            },
        );
        table.insert(
            PlanTier::Growth,
            PlanLimits {
                max_stores: Limit::Bounded(5),
                max_admins: Limit::Bounded(3),
                max_managers: Limit::Bounded(5),
                max_cashiers: Limit::Bounded(15),
            },
        );
        table.insert(
            PlanTier::Premium,
            PlanLimits {
                max_stores: Limit::Unbounded,
                max_admins: Limit::Unbounded,
                max_managers: Limit::Unbounded,
                max_cashiers: Limit::Unbounded,
            },
        );
        PlanPolicy::new(table)
    }

    fn limits(&self, plan: PlanTier) -> CoreResult<&PlanLimits> {
        // Every tier must be present in an injected table; a missing entry
        // is a configuration defect, reported as a zero-quota boundary.
        self.table.get(&plan).ok_or(CoreError::PlanLimitExceeded {
            boundary: "plan".to_string(),
            limit: 0,
            requested: 0,
        })
    }

    /// Checks whether an organization on `plan` may hold `proposed` stores.
    pub fn check_store_limit(&self, plan: PlanTier, proposed: u32) -> CoreResult<()> {
        let limits = self.limits(plan)?;
        match limits.max_stores {
            Limit::Bounded(max) if proposed > max => Err(CoreError::PlanLimitExceeded {
                boundary: "stores".to_string(),
                limit: max,
                requested: proposed,
            }),
            _ => Ok(()),
        }
    }

    /// Checks whether an organization on `plan` may hold `proposed`
    /// assignments of `role`.
    pub fn check_role_limit(&self, plan: PlanTier, role: Role, proposed: u32) -> CoreResult<()> {
        let limits = self.limits(plan)?;
        match limits.role_limit(role) {
            Limit::Bounded(max) if proposed > max => Err(CoreError::PlanLimitExceeded {
                boundary: format!("role:{:?}", role).to_lowercase(),
                limit: max,
                requested: proposed,
            }),
            _ => Ok(()),
        }
    }
}

impl Default for PlanPolicy {
    fn default() -> Self {
        PlanPolicy::standard()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_store_boundary_is_exact() {
        let policy = PlanPolicy::standard();
        assert!(policy.check_store_limit(PlanTier::Starter, 1).is_ok());
        let err = policy.check_store_limit(PlanTier::Starter, 2).unwrap_err();
        match err {
            CoreError::PlanLimitExceeded {
                boundary,
                limit,
                requested,
            } => {
                assert_eq!(boundary, "stores");
                assert_eq!(limit, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cashier_boundary_third_ok_fourth_fails() {
        let policy = PlanPolicy::standard();
        assert!(policy
            .check_role_limit(PlanTier::Starter, Role::Cashier, 3)
            .is_ok());
        assert!(matches!(
            policy.check_role_limit(PlanTier::Starter, Role::Cashier, 4),
            Err(CoreError::PlanLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_premium_is_unbounded() {
        let policy = PlanPolicy::standard();
        assert!(policy.check_store_limit(PlanTier::Premium, 10_000).is_ok());
        assert!(policy
            .check_role_limit(PlanTier::Premium, Role::Cashier, 10_000)
            .is_ok());
    }

    #[test]
    fn test_injected_table_is_honored() {
        let mut table = HashMap::new();
        table.insert(
            PlanTier::Premium,
            PlanLimits {
                max_stores: Limit::Bounded(2),
                max_admins: Limit::Bounded(1),
                max_managers: Limit::Bounded(1),
                max_cashiers: Limit::Bounded(1),
            },
        );
        let policy = PlanPolicy::new(table);

        // The injected table overrides the shipped defaults entirely.
        assert!(policy.check_store_limit(PlanTier::Premium, 3).is_err());
        assert!(policy
            .check_role_limit(PlanTier::Premium, Role::Admin, 2)
            .is_err());
    }

    #[test]
    fn test_boundary_names_the_role() {
        let policy = PlanPolicy::standard();
        let err = policy
            .check_role_limit(PlanTier::Starter, Role::Cashier, 4)
            .unwrap_err();
        match err {
            CoreError::PlanLimitExceeded { boundary, .. } => assert_eq!(boundary, "role:cashier"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
