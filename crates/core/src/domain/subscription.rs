use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Monthly,
    Yearly,
}

impl BillingPeriod {
    /// Maps a detected period string onto the schema.
    ///
    /// Returns `(period, recognized)`. Unrecognized values fall back to `Monthly`,
    /// which is the same default the extraction prompt asks the model to apply.
    pub fn normalize(raw: &str) -> (Self, bool) {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("monthly") {
            (Self::Monthly, true)
        } else if raw.eq_ignore_ascii_case("yearly") {
            (Self::Yearly, true)
        } else {
            (Self::Monthly, false)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub name: String,
    pub price: f64,
    pub period: BillingPeriod,
}

impl SubscriptionRecord {
    pub fn yearly_cost(&self) -> f64 {
        match self.period {
            BillingPeriod::Monthly => self.price * 12.0,
            BillingPeriod::Yearly => self.price,
        }
    }

    pub fn monthly_cost(&self) -> f64 {
        match self.period {
            BillingPeriod::Monthly => self.price,
            BillingPeriod::Yearly => self.price / 12.0,
        }
    }
}
