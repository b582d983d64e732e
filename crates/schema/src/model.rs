//! Assessment data model: the validated shape of one startup assessment.
//!
//! Values are only ever built by the [`Validator`](crate::Validator). They
//! serialize back to the same JSON shape they were validated from.

use serde::{Serialize, Serializer};

/// A validated startup assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    /// Startup name as reported by the model.
    pub name: String,

    /// Brief summary (1-3 sentences). Never blank.
    pub summary: String,

    pub market: Market,

    pub product: Product,

    pub business_model: BusinessModel,

    pub team: Team,

    /// Key risks, in the order the model listed them.
    pub risks: Vec<String>,

    pub recommendation: Recommendation,

    /// Anything the model inferred rather than read from the input.
    pub assumptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Market {
    /// Market size estimate (e.g., "> $100M" or "unknown").
    pub size_estimate: String,
    pub top_markets: Vec<String>,
    pub competitors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub category: String,
    pub differentiation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessModel {
    pub revenue_streams: Vec<String>,
    pub monetization_risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub founders_count: FoundersCount,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
}

/// Number of founders, or the literal `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoundersCount {
    Count(i64),
    Unknown,
}

impl FoundersCount {
    /// The literal accepted in place of a number.
    pub const UNKNOWN: &'static str = "unknown";
}

impl Serialize for FoundersCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FoundersCount::Count(n) => serializer.serialize_i64(*n),
            FoundersCount::Unknown => serializer.serialize_str(Self::UNKNOWN),
        }
    }
}

impl std::fmt::Display for FoundersCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FoundersCount::Count(n) => write!(f, "{n}"),
            FoundersCount::Unknown => f.write_str(Self::UNKNOWN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub invest: Invest,
    pub rationale: String,
}

/// Investment recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Invest {
    Yes,
    No,
    Hold,
}

impl Invest {
    /// Accepted spellings, case-sensitive.
    pub const ALLOWED: [&'static str; 3] = ["yes", "no", "hold"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Invest::Yes),
            "no" => Some(Invest::No),
            "hold" => Some(Invest::Hold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Invest::Yes => "yes",
            Invest::No => "no",
            Invest::Hold => "hold",
        }
    }
}

impl std::fmt::Display for Invest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn founders_count_serializes_as_number_or_literal() {
        assert_eq!(serde_json::to_value(FoundersCount::Count(3)).unwrap(), 3);
        assert_eq!(
            serde_json::to_value(FoundersCount::Unknown).unwrap(),
            "unknown"
        );
    }

    #[test]
    fn invest_parse_is_case_sensitive() {
        assert_eq!(Invest::parse("hold"), Some(Invest::Hold));
        assert_eq!(Invest::parse("Hold"), None);
        assert_eq!(Invest::parse("maybe"), None);
        assert_eq!(serde_json::to_value(Invest::Yes).unwrap(), "yes");
    }
}
