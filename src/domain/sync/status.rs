//! Subscription status vocabularies of the internal store and the provisioning system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Suspended,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "suspended" => Some(SubscriptionStatus::Suspended),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription status as reported by the provisioning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStatus {
    Active,
    Suspended,
    Canceled,
    Pending,
}

impl ProvisioningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStatus::Active => "active",
            ProvisioningStatus::Suspended => "suspended",
            ProvisioningStatus::Canceled => "canceled",
            ProvisioningStatus::Pending => "pending",
        }
    }

    /// The internal status this provisioning status corresponds to.
    ///
    /// A pending subscription is not serving yet, so it counts as suspended.
    pub fn as_internal(&self) -> SubscriptionStatus {
        match self {
            ProvisioningStatus::Active => SubscriptionStatus::Active,
            ProvisioningStatus::Suspended | ProvisioningStatus::Pending => {
                SubscriptionStatus::Suspended
            }
            ProvisioningStatus::Canceled => SubscriptionStatus::Canceled,
        }
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
