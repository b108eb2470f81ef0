use serde::{Deserialize, Serialize};

/// Resource a meter measures. Decides which tariff path prices its readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeterType {
    Water,
    Energy,
    /// Any tag this build does not know about. Prices to zero.
    #[serde(other)]
    Unknown,
}

impl MeterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeterType::Water => "WATER",
            MeterType::Energy => "ENERGY",
            MeterType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub meter_type: MeterType,
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognised_tag_deserializes_to_unknown() {
        let t: MeterType = serde_json::from_str("\"GAS\"").unwrap();
        assert_eq!(t, MeterType::Unknown);

        let t: MeterType = serde_json::from_str("\"WATER\"").unwrap();
        assert_eq!(t, MeterType::Water);
    }
}
