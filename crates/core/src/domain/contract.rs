use crate::domain::subscription::{BillingPeriod, SubscriptionRecord};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One array entry as the model emitted it. Every key is optional here so that a
/// missing or null key is a validation failure for that entry only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSubscriptionItem {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub period: Option<String>,
}

/// Validated output of one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub records: Vec<SubscriptionRecord>,
    /// Entries dropped because a key was missing, null, or of the wrong type.
    pub dropped: usize,
    /// Entries whose period was not `monthly`/`yearly` and was defaulted to monthly.
    pub coerced_periods: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl LlmSubscriptionItem {
    /// Returns the record and whether its period had to be coerced.
    pub fn validate_and_into_record(self) -> anyhow::Result<(SubscriptionRecord, bool)> {
        let name = self.name.context("missing key: name")?.trim().to_string();
        ensure!(!name.is_empty(), "name must be non-empty");

        let price = self.price.context("missing key: price")?;
        ensure!(price.is_finite(), "price must be finite");
        ensure!(price >= 0.0, "price must be non-negative (got {price})");
        ensure!((price * 12.0).is_finite(), "price out of range (got {price})");

        let raw_period = self.period.context("missing key: period")?;
        let (period, recognized) = BillingPeriod::normalize(&raw_period);

        Ok((SubscriptionRecord { name, price, period }, !recognized))
    }
}

/// Builds a fresh record list from the parsed array, counting what gets dropped.
/// Invalid entries are never repaired.
pub fn validate_entries(entries: Vec<Value>) -> Extraction {
    let mut out = Extraction {
        records: Vec::with_capacity(entries.len()),
        ..Default::default()
    };

    for (index, entry) in entries.into_iter().enumerate() {
        // Derived Deserialize would also accept a positional array.
        let validated = if entry.is_object() {
            serde_json::from_value::<LlmSubscriptionItem>(entry)
                .context("entry is not an object of the expected shape")
                .and_then(LlmSubscriptionItem::validate_and_into_record)
        } else {
            Err(anyhow::anyhow!("entry is not a JSON object"))
        };

        match validated {
            Ok((record, coerced)) => {
                if coerced {
                    out.coerced_periods += 1;
                }
                out.records.push(record);
            }
            Err(err) => {
                tracing::debug!(index, error = %err, "dropping invalid subscription entry");
                out.dropped += 1;
            }
        }
    }

    if out.dropped > 0 {
        tracing::warn!(dropped = out.dropped, kept = out.records.len(), "skipped invalid subscription entries");
    }
    if out.coerced_periods > 0 {
        tracing::warn!(
            coerced = out.coerced_periods,
            "unrecognized billing periods defaulted to monthly"
        );
    }

    out
}
