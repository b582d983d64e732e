//! Assessment validator.
//!
//! Rules, checked in document order and aggregated:
//! 1. the root is an object carrying every scalar / object field;
//! 2. nested objects carry their scalar sub-fields;
//! 3. `team.founders_count` is an integer or `"unknown"`,
//!    `summary` is non-blank, `recommendation.invest` is `yes`/`no`/`hold`;
//! 4. list fields default to empty when absent but must hold strings when present.
//!
//! Keys the schema does not know about are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{
    Assessment, BusinessModel, FoundersCount, Invest, Market, Product, Recommendation, Team,
};

/// What to do with a `recommendation.invest` string outside `yes`/`no`/`hold`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestPolicy {
    /// Report a validation issue.
    #[default]
    Reject,
    /// Replace the value with `hold`.
    CoerceToHold,
}

/// The way a single field violates the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum Problem {
    Missing,
    WrongType { expected: &'static str },
    Empty,
    NotAllowed { value: String, allowed: Vec<String> },
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Problem::Missing => f.write_str("missing required field"),
            Problem::WrongType { expected } => write!(f, "expected {expected}"),
            Problem::Empty => f.write_str("must not be empty"),
            Problem::NotAllowed { value, allowed } => {
                write!(f, "\"{value}\" is not one of {}", allowed.join(", "))
            }
        }
    }
}

/// One violated field, addressed by a dotted path such as `market.top_markets[1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    #[serde(flatten)]
    pub problem: Problem,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

/// Every schema violation found in one candidate, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{} validation issue(s): {}", .issues.len(), join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    fn single(path: impl Into<String>, problem: Problem) -> Self {
        Self {
            issues: vec![FieldIssue {
                path: path.into(),
                problem,
            }],
        }
    }

    /// Whether any issue is reported at exactly `path`.
    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }

    /// The first violation found.
    pub fn first(&self) -> Option<&FieldIssue> {
        self.issues.first()
    }

    /// One `- path: problem` line per issue, for corrective prompts.
    pub fn bullet_list(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("- {issue}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate with the default policy (reject unknown `invest` values).
pub fn validate(candidate: &Value) -> Result<Assessment, ValidationError> {
    Validator::default().validate(candidate)
}

/// Schema validator, parameterized by the `invest` policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    invest_policy: InvestPolicy,
}

impl Validator {
    pub fn new(invest_policy: InvestPolicy) -> Self {
        Self { invest_policy }
    }

    pub fn invest_policy(&self) -> InvestPolicy {
        self.invest_policy
    }

    /// Check `candidate` against the assessment schema.
    pub fn validate(&self, candidate: &Value) -> Result<Assessment, ValidationError> {
        let Some(root) = candidate.as_object() else {
            return Err(ValidationError::single(
                "$",
                Problem::WrongType { expected: "object" },
            ));
        };

        let mut c = Collector::default();

        let name = c.string(root, "", "name");
        let summary = c.non_blank_string(root, "", "summary");
        let market = c.market(root);
        let product = c.product(root);
        let business_model = c.business_model(root);
        let team = c.team(root);
        let risks = c.string_list(root, "", "risks");
        let recommendation = c.recommendation(root, self.invest_policy);
        let assumptions = c.string_list(root, "", "assumptions");

        match (name, summary, market, product, business_model, team, recommendation) {
            (
                Some(name),
                Some(summary),
                Some(market),
                Some(product),
                Some(business_model),
                Some(team),
                Some(recommendation),
            ) if c.issues.is_empty() => Ok(Assessment {
                name,
                summary,
                market,
                product,
                business_model,
                team,
                risks,
                recommendation,
                assumptions,
            }),
            _ => Err(ValidationError { issues: c.issues }),
        }
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

#[derive(Default)]
struct Collector {
    issues: Vec<FieldIssue>,
}

impl Collector {
    fn push(&mut self, path: String, problem: Problem) {
        self.issues.push(FieldIssue { path, problem });
    }

    fn object<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        parent: &str,
        key: &str,
    ) -> Option<&'a Map<String, Value>> {
        match obj.get(key) {
            None => {
                self.push(join(parent, key), Problem::Missing);
                None
            }
            Some(Value::Object(inner)) => Some(inner),
            Some(_) => {
                self.push(join(parent, key), Problem::WrongType { expected: "object" });
                None
            }
        }
    }

    fn string(&mut self, obj: &Map<String, Value>, parent: &str, key: &str) -> Option<String> {
        match obj.get(key) {
            None => {
                self.push(join(parent, key), Problem::Missing);
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.push(join(parent, key), Problem::WrongType { expected: "string" });
                None
            }
        }
    }

    fn non_blank_string(
        &mut self,
        obj: &Map<String, Value>,
        parent: &str,
        key: &str,
    ) -> Option<String> {
        let value = self.string(obj, parent, key)?;
        if value.trim().is_empty() {
            self.push(join(parent, key), Problem::Empty);
            return None;
        }
        Some(value)
    }

    /// Absent lists are empty; present ones must be arrays of strings.
    fn string_list(&mut self, obj: &Map<String, Value>, parent: &str, key: &str) -> Vec<String> {
        let path = join(parent, key);
        let items = match obj.get(key) {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.push(path, Problem::WrongType { expected: "array of strings" });
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => out.push(s.clone()),
                _ => self.push(format!("{path}[{i}]"), Problem::WrongType { expected: "string" }),
            }
        }
        out
    }

    fn market(&mut self, root: &Map<String, Value>) -> Option<Market> {
        let obj = self.object(root, "", "market")?;
        let size_estimate = self.string(obj, "market", "size_estimate");
        let top_markets = self.string_list(obj, "market", "top_markets");
        let competitors = self.string_list(obj, "market", "competitors");
        Some(Market {
            size_estimate: size_estimate?,
            top_markets,
            competitors,
        })
    }

    fn product(&mut self, root: &Map<String, Value>) -> Option<Product> {
        let obj = self.object(root, "", "product")?;
        let category = self.string(obj, "product", "category");
        let differentiation = self.string(obj, "product", "differentiation");
        Some(Product {
            category: category?,
            differentiation: differentiation?,
        })
    }

    fn business_model(&mut self, root: &Map<String, Value>) -> Option<BusinessModel> {
        let obj = self.object(root, "", "business_model")?;
        Some(BusinessModel {
            revenue_streams: self.string_list(obj, "business_model", "revenue_streams"),
            monetization_risks: self.string_list(obj, "business_model", "monetization_risks"),
        })
    }

    fn team(&mut self, root: &Map<String, Value>) -> Option<Team> {
        let obj = self.object(root, "", "team")?;
        let founders_count = self.founders_count(obj);
        let strengths = self.string_list(obj, "team", "strengths");
        let gaps = self.string_list(obj, "team", "gaps");
        Some(Team {
            founders_count: founders_count?,
            strengths,
            gaps,
        })
    }

    fn founders_count(&mut self, team: &Map<String, Value>) -> Option<FoundersCount> {
        const EXPECTED: &str = "integer or \"unknown\"";
        let path = "team.founders_count".to_string();

        match team.get("founders_count") {
            None => {
                self.push(path, Problem::Missing);
                None
            }
            Some(Value::Number(n)) => {
                match n.as_i64() {
                    Some(count) => Some(FoundersCount::Count(count)),
                    None => {
                        self.push(path, Problem::WrongType { expected: EXPECTED });
                        None
                    }
                }
            }
            Some(Value::String(s)) if s == FoundersCount::UNKNOWN => Some(FoundersCount::Unknown),
            Some(Value::String(s)) => {
                self.push(
                    path,
                    Problem::NotAllowed {
                        value: s.clone(),
                        allowed: vec!["<integer>".into(), FoundersCount::UNKNOWN.into()],
                    },
                );
                None
            }
            Some(_) => {
                self.push(path, Problem::WrongType { expected: EXPECTED });
                None
            }
        }
    }

    fn recommendation(
        &mut self,
        root: &Map<String, Value>,
        policy: InvestPolicy,
    ) -> Option<Recommendation> {
        let obj = self.object(root, "", "recommendation")?;
        let invest = self.invest(obj, policy);
        let rationale = self.string(obj, "recommendation", "rationale");
        Some(Recommendation {
            invest: invest?,
            rationale: rationale?,
        })
    }

    fn invest(&mut self, obj: &Map<String, Value>, policy: InvestPolicy) -> Option<Invest> {
        let raw = self.string(obj, "recommendation", "invest")?;
        match (Invest::parse(&raw), policy) {
            (Some(invest), _) => Some(invest),
            (None, InvestPolicy::CoerceToHold) => Some(Invest::Hold),
            (None, InvestPolicy::Reject) => {
                self.push(
                    "recommendation.invest".into(),
                    Problem::NotAllowed {
                        value: raw,
                        allowed: Invest::ALLOWED.iter().map(|s| s.to_string()).collect(),
                    },
                );
                None
            }
        }
    }
}
