//! Status reconciliation policy.
//!
//! Maps a payments-provider subscription status to the internal target
//! status and the provisioning action that brings the hosting account in
//! line with it.
//!
//! | Payments status                  | Internal target | Provisioning action |
//! |----------------------------------|-----------------|---------------------|
//! | `active`                         | active          | reactivate          |
//! | `past_due`, `unpaid`             | suspended       | suspend             |
//! | `canceled`, `incomplete_expired` | canceled        | suspend             |
//! | anything else                    | no change       | none                |

use super::status::{ProvisioningStatus, SubscriptionStatus};

/// Action to take against the provisioning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningAction {
    Reactivate,
    Suspend,
}

impl ProvisioningAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningAction::Reactivate => "reactivate",
            ProvisioningAction::Suspend => "suspend",
        }
    }

    /// Whether the provisioning system is already in the state this action produces.
    pub fn is_satisfied_by(&self, current: ProvisioningStatus) -> bool {
        match self {
            ProvisioningAction::Reactivate => current == ProvisioningStatus::Active,
            ProvisioningAction::Suspend => matches!(
                current,
                ProvisioningStatus::Suspended | ProvisioningStatus::Canceled
            ),
        }
    }
}

/// The state a subscription should converge to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTarget {
    pub status: SubscriptionStatus,
    pub action: ProvisioningAction,
}

/// Resolves the reconciliation target for a payments-provider status.
///
/// Returns `None` for statuses that carry no policy (`trialing`,
/// `incomplete`, `paused`, ...). Callers log and exit without writing.
pub fn target_for_payments_status(status: &str) -> Option<StatusTarget> {
    let (status, action) = match status {
        "active" => (SubscriptionStatus::Active, ProvisioningAction::Reactivate),
        "past_due" | "unpaid" => (SubscriptionStatus::Suspended, ProvisioningAction::Suspend),
        "canceled" | "incomplete_expired" => {
            (SubscriptionStatus::Canceled, ProvisioningAction::Suspend)
        }
        _ => return None,
    };
    Some(StatusTarget { status, action })
}

/// The provisioning action needed to reach `target`, if any.
pub fn required_action(
    target: &StatusTarget,
    current: ProvisioningStatus,
) -> Option<ProvisioningAction> {
    if target.action.is_satisfied_by(current) {
        None
    } else {
        Some(target.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn active_maps_to_reactivate() {
        let target = target_for_payments_status("active").unwrap();
        assert_eq!(target.status, SubscriptionStatus::Active);
        assert_eq!(target.action, ProvisioningAction::Reactivate);
    }

    #[test]
    fn past_due_and_unpaid_map_to_suspend() {
        for status in ["past_due", "unpaid"] {
            let target = target_for_payments_status(status).unwrap();
            assert_eq!(target.status, SubscriptionStatus::Suspended);
            assert_eq!(target.action, ProvisioningAction::Suspend);
        }
    }

    #[test]
    fn canceled_and_incomplete_expired_map_to_canceled() {
        for status in ["canceled", "incomplete_expired"] {
            let target = target_for_payments_status(status).unwrap();
            assert_eq!(target.status, SubscriptionStatus::Canceled);
            assert_eq!(target.action, ProvisioningAction::Suspend);
        }
    }

    #[test]
    fn unlisted_statuses_have_no_target() {
        for status in ["trialing", "incomplete", "paused", ""] {
            assert!(target_for_payments_status(status).is_none());
        }
    }

    #[test]
    fn suspend_not_needed_when_already_suspended() {
        let target = target_for_payments_status("past_due").unwrap();
        assert_eq!(required_action(&target, ProvisioningStatus::Suspended), None);
        assert_eq!(
            required_action(&target, ProvisioningStatus::Active),
            Some(ProvisioningAction::Suspend)
        );
    }

    #[test]
    fn reactivate_needed_from_pending() {
        let target = target_for_payments_status("active").unwrap();
        assert_eq!(
            required_action(&target, ProvisioningStatus::Pending),
            Some(ProvisioningAction::Reactivate)
        );
    }

    proptest! {
        #[test]
        fn only_listed_statuses_produce_targets(status in "[a-z_]{0,20}") {
            let listed = ["active", "past_due", "unpaid", "canceled", "incomplete_expired"];
            prop_assert_eq!(
                target_for_payments_status(&status).is_some(),
                listed.contains(&status.as_str())
            );
        }

        #[test]
        fn required_action_is_target_action_or_none(
            status in prop::sample::select(vec!["active", "past_due", "unpaid", "canceled", "incomplete_expired"]),
            current in prop::sample::select(vec![
                ProvisioningStatus::Active,
                ProvisioningStatus::Suspended,
                ProvisioningStatus::Canceled,
                ProvisioningStatus::Pending,
            ]),
        ) {
            let target = target_for_payments_status(status).unwrap();
            match required_action(&target, current) {
                Some(action) => {
                    prop_assert_eq!(action, target.action);
                    prop_assert!(!action.is_satisfied_by(current));
                }
                None => prop_assert!(target.action.is_satisfied_by(current)),
            }
        }
    }
}
