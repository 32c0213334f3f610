//! The fixed plan catalogue for the evaluation program.
//!
//! Every sellable product corresponds to one of six funded-account plans, and
//! each plan is pinned to a pre-configured risk profile on the broker side.
//! The mapping is deliberately a closed set: a product name that does not
//! resolve to a known plan is an error the caller must surface, never a
//! silently invented plan.

use crate::error::{UnknownPlanError, UnknownProductError};

/// Account type used when applying a risk profile to a challenge account.
pub const ACCOUNT_TYPE_CHALLENGE: i64 = 0;

/// (plan label, broker risk profile id) pairs, smallest plan first.
pub const PLAN_PROFILES: [(&str, &str); 6] = [
    ("FX - 5K", "5631e4fb-aa99-404c-b45a-9dd7915de825"),
    ("FX - 10K", "b4495f41-6f09-4c3b-b34c-0bc8d85f2f8f"),
    ("FX - 25K", "581f1d7d-b5b5-4c0e-82cf-3f4fd9834bb3"),
    ("FX - 50K", "e762b216-e00a-4004-9c71-64019ff01997"),
    ("FX - 100K", "ad7a0f90-210b-4f78-82aa-eebe58401d28"),
    ("FX - 150K", "392705c5-8306-4e64-bd7a-4028b6ff40f1"),
];

/// Look up the broker risk profile for a plan label.
pub fn risk_profile_for_plan(plan: &str) -> Result<&'static str, UnknownPlanError> {
    PLAN_PROFILES
        .iter()
        .find(|(label, _)| *label == plan)
        .map(|(_, profile)| *profile)
        .ok_or_else(|| UnknownPlanError(plan.to_string()))
}

/// Map a checkout product name such as `"Trader 25K - Promo"` to its plan
/// label (`"FX - 25K"`). Only the six known sizes are accepted.
pub fn plan_from_product_name(product_name: &str) -> Result<&'static str, UnknownProductError> {
    let lead = product_name.split('-').next().unwrap_or_default().trim();
    let size = lead.strip_prefix("Trader ").map(str::trim);
    size.and_then(|size| {
        PLAN_PROFILES.iter().map(|(label, _)| *label).find(|label| label.ends_with(&format!("- {size}")))
    })
    .ok_or_else(|| UnknownProductError(product_name.to_string()))
}
