//! Billing plan to provisioning plan mapping.

use serde::{Deserialize, Serialize};

/// Provider tag for the Stripe payments provider.
pub const STRIPE_PROVIDER: &str = "stripe";

/// Maps a billing-provider price/plan to a provisioning plan.
///
/// `(provider, external_plan_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMapping {
    pub provider: String,
    pub external_plan_id: String,
    pub provisioning_plan_id: String,
}

impl PlanMapping {
    pub fn new(
        provider: impl Into<String>,
        external_plan_id: impl Into<String>,
        provisioning_plan_id: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            external_plan_id: external_plan_id.into(),
            provisioning_plan_id: provisioning_plan_id.into(),
        }
    }
}
