use crate::domain::subscription::SubscriptionRecord;
use serde::Serialize;

const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub yearly_total: f64,
    pub monthly_average: f64,
    pub daily_average: f64,
}

/// Aggregates already-normalized records. Periods are not re-validated here.
pub fn summarize(records: &[SubscriptionRecord]) -> CostSummary {
    let yearly_total = records.iter().map(SubscriptionRecord::yearly_cost).sum();
    let monthly_average: f64 = records.iter().map(SubscriptionRecord::monthly_cost).sum();

    CostSummary {
        yearly_total,
        monthly_average,
        daily_average: monthly_average / DAYS_PER_MONTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::BillingPeriod;

    fn sub(name: &str, price: f64, period: BillingPeriod) -> SubscriptionRecord {
        SubscriptionRecord {
            name: name.to_string(),
            price,
            period,
        }
    }

    fn round3(v: f64) -> f64 {
        (v * 1000.0).round() / 1000.0
    }

    #[test]
    fn empty_list_sums_to_zero() {
        assert_eq!(summarize(&[]), CostSummary::default());
    }

    #[test]
    fn two_monthly_subscriptions() {
        let s = summarize(&[
            sub("Netflix", 15.99, BillingPeriod::Monthly),
            sub("Spotify", 9.99, BillingPeriod::Monthly),
        ]);
        assert!((s.yearly_total - 311.76).abs() < 1e-9);
        assert!((s.monthly_average - 25.98).abs() < 1e-9);
        assert_eq!(round3(s.daily_average), 0.866);
    }

    #[test]
    fn single_yearly_subscription() {
        let s = summarize(&[sub("Duolingo", 83.99, BillingPeriod::Yearly)]);
        assert_eq!(s.yearly_total, 83.99);
        assert!((s.monthly_average - 6.999166666).abs() < 1e-6);
        assert!((s.daily_average - 83.99 / 12.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn mixed_periods() {
        let s = summarize(&[
            sub("Netflix", 10.0, BillingPeriod::Monthly),
            sub("Duolingo", 120.0, BillingPeriod::Yearly),
        ]);
        assert_eq!(s.yearly_total, 240.0);
        assert_eq!(s.monthly_average, 20.0);
    }
}
