//! Public trader profiles attached to counterparties and takers.

use super::{lenient, Decimal};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile data published by the enrichment backend for one address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraderProfile {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub pseudonym: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub verified_badge: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub global_rank: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub global_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub global_pnl: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub total_trades: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TraderProfile {
    /// Name to show for the address: the chosen name, else the pseudonym.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.pseudonym.as_deref())
    }
}

/// Case-folded key used for every address lookup.
pub fn address_key(address: &str) -> String {
    address.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_tolerates_mistyped_fields() {
        let profile: TraderProfile = serde_json::from_value(json!({
            "pseudonym": "Quiet-Otter",
            "verified_badge": "true",
            "global_rank": "17",
            "global_pnl": "-120.5",
            "total_trades": {"nested": true},
            "bio": "hello"
        }))
        .unwrap();

        assert_eq!(profile.display_name(), Some("Quiet-Otter"));
        assert_eq!(profile.verified_badge, Some(true));
        assert_eq!(profile.global_rank, Some(17));
        assert_eq!(profile.total_trades, None);
        assert_eq!(profile.extra.get("bio"), Some(&json!("hello")));
    }

    #[test]
    fn test_address_key_folds_case() {
        assert_eq!(address_key(" 0xABcd "), "0xabcd");
    }
}
