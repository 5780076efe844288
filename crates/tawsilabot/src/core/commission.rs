//! Distributor commission and balance arithmetic
//!
//! Each wilaya has a regional fulfillment partner (distributor) paid a
//! flat commission per order. Accounting reports deduct commissions from
//! the shipped+delivered order total to get the collectible amount, then
//! subtract the payments actually received. Overpayments are carried as
//! distributor credit (negative remaining balance).

/// Flat per-order commission (د.ج) by wilaya.
pub const DISTRIBUTOR_COMMISSIONS: &[(&str, f64)] = &[
    ("تمنراست", 300.0),
    ("أدرار", 300.0),
    ("رقان", 200.0),
    ("أولف", 200.0),
    ("عين صالح", 100.0),
];

/// Commission for a single order in the given wilaya (0 for unknown wilayas).
pub fn distributor_commission(wilaya: &str) -> f64 {
    DISTRIBUTOR_COMMISSIONS
        .iter()
        .find(|(name, _)| *name == wilaya)
        .map(|(_, amount)| *amount)
        .unwrap_or(0.0)
}

/// Amount collectible from one order after deducting the commission.
/// Clamped at zero — an order cheaper than the commission nets nothing.
pub fn collectible_amount(total_amount: f64, wilaya: &str) -> f64 {
    (total_amount - distributor_commission(wilaya)).max(0.0)
}

/// Remaining balance after payments received.
/// Deliberately NOT clamped: a negative value is distributor credit.
pub fn remaining_balance(total_collectible: f64, received: f64) -> f64 {
    total_collectible - received
}

/// Whether the distributor has prepaid beyond what is collectible.
pub fn has_credit_balance(remaining: f64) -> bool {
    remaining < 0.0
}

/// Credit amount (absolute value of a negative balance, 0 otherwise).
pub fn credit_amount(remaining: f64) -> f64 {
    if remaining < 0.0 {
        remaining.abs()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_lookup() {
        assert_eq!(distributor_commission("تمنراست"), 300.0);
        assert_eq!(distributor_commission("عين صالح"), 100.0);
        assert_eq!(distributor_commission("وهران"), 0.0); // not served
    }

    #[test]
    fn test_collectible_amount() {
        assert_eq!(collectible_amount(2500.0, "رقان"), 2300.0);
        // Commission larger than the order value nets zero, never negative
        assert_eq!(collectible_amount(150.0, "تمنراست"), 0.0);
        assert_eq!(collectible_amount(1000.0, "unknown"), 1000.0);
    }

    #[test]
    fn test_remaining_balance_states() {
        // Outstanding
        let remaining = remaining_balance(10_000.0, 4_000.0);
        assert_eq!(remaining, 6_000.0);
        assert!(!has_credit_balance(remaining));
        assert_eq!(credit_amount(remaining), 0.0);

        // Fully settled
        let settled = remaining_balance(10_000.0, 10_000.0);
        assert_eq!(settled, 0.0);
        assert!(!has_credit_balance(settled));

        // Overpaid → credit
        let credit = remaining_balance(10_000.0, 12_500.0);
        assert_eq!(credit, -2_500.0);
        assert!(has_credit_balance(credit));
        assert_eq!(credit_amount(credit), 2_500.0);
    }
}
