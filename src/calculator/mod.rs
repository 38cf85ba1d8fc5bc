//! Calculation engine
//!
//! Closed-form financial formulas with built-in judgment thresholds.
//! Everything here is pure: no I/O, no clock, no randomness.
//! LLM is NOT allowed here.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MentorError;
use crate::Result;

pub mod formulas;

pub use formulas::{
    break_even, runway, tam_sam_som, unit_economics, BreakEvenInputs, MarketSizeInputs,
    RunwayInputs, UnitEconomicsInputs,
};

/// Validated numeric inputs keyed by their camelCase names
pub type CalculationInputs = HashMap<String, f64>;

//
// ================= Kinds =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculationKind {
    UnitEconomics,
    TamSamSom,
    BreakEven,
    Runway,
}

impl CalculationKind {
    pub const ALL: [CalculationKind; 4] = [
        CalculationKind::UnitEconomics,
        CalculationKind::TamSamSom,
        CalculationKind::BreakEven,
        CalculationKind::Runway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationKind::UnitEconomics => "unit_economics",
            CalculationKind::TamSamSom => "tam_sam_som",
            CalculationKind::BreakEven => "break_even",
            CalculationKind::Runway => "runway",
        }
    }

    pub fn required_inputs(&self) -> &'static [&'static str] {
        match self {
            CalculationKind::UnitEconomics => &[
                "monthlyRevenuePerCustomer",
                "averageCustomerLifespanMonths",
                "customerAcquisitionCost",
            ],
            CalculationKind::TamSamSom => &[
                "totalAddressableMarket",
                "serviceableAddressableMarketPercent",
                "realisticMarketSharePercent",
            ],
            CalculationKind::BreakEven => {
                &["monthlyFixedCosts", "pricePerUnit", "variableCostPerUnit"]
            }
            CalculationKind::Runway => &["currentCash", "monthlyBurnRate"],
        }
    }

    /// Inputs that default to zero when absent
    pub fn optional_inputs(&self) -> &'static [&'static str] {
        match self {
            CalculationKind::UnitEconomics => &["monthlyVariableCostPerCustomer"],
            CalculationKind::Runway => &["monthlyRevenue"],
            CalculationKind::TamSamSom | CalculationKind::BreakEven => &[],
        }
    }

    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CalculationKind {
    type Err = MentorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                MentorError::validation(format!(
                    "Unknown calculation type: {}. Must be one of: {}",
                    s,
                    Self::valid_names()
                ))
            })
    }
}

//
// ================= Input Policy =================
//

/// Convert a loosely-typed JSON object into numeric inputs.
///
/// Every value must be a finite number; anything else is rejected with the
/// offending key named.
pub fn parse_inputs(raw: &serde_json::Map<String, Value>) -> Result<CalculationInputs> {
    raw.iter()
        .map(|(key, value)| {
            value
                .as_f64()
                .filter(|n| n.is_finite())
                .map(|n| (key.clone(), n))
                .ok_or_else(|| MentorError::validation(format!("Input \"{}\" must be a number", key)))
        })
        .collect()
}

/// A fully validated calculator request
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub kind: CalculationKind,
    pub inputs: CalculationInputs,
}

impl ToolInvocation {
    /// Check that every required input for `kind` is present and finite.
    pub fn new(kind: CalculationKind, inputs: CalculationInputs) -> Result<Self> {
        if let Some((key, _)) = inputs.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MentorError::validation(format!(
                "Input \"{}\" must be a number",
                key
            )));
        }

        let missing: Vec<&str> = kind
            .required_inputs()
            .iter()
            .copied()
            .filter(|name| !inputs.contains_key(*name))
            .collect();

        if !missing.is_empty() {
            return Err(MentorError::validation(format!(
                "Missing inputs for {}: {}",
                kind,
                missing.join(", ")
            )));
        }

        Ok(Self { kind, inputs })
    }

    /// Parse the calculator tool's JSON arguments:
    /// `{"calculation_type": "...", "inputs": {...}}`
    pub fn from_tool_input(input: &Value) -> Result<Self> {
        let kind = input
            .get("calculation_type")
            .and_then(Value::as_str)
            .ok_or_else(|| MentorError::validation("Expected 'calculation_type' string"))?
            .parse::<CalculationKind>()?;

        let raw = input
            .get("inputs")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                MentorError::validation("inputs must be an object with numeric values")
            })?;

        Self::new(kind, parse_inputs(raw)?)
    }

    fn value(&self, name: &str) -> f64 {
        self.inputs.get(name).copied().unwrap_or(0.0)
    }
}

//
// ================= Result =================
//

/// Named numeric outputs plus a human-readable assessment.
///
/// Serializes as a flat JSON object. Infinite values are written as the
/// strings `"Infinity"` / `"-Infinity"` since JSON has no literal for them.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    metrics: Vec<(&'static str, f64)>,
    rating: Option<&'static str>,
    assessment: String,
    error: Option<String>,
}

impl CalculationResult {
    pub(crate) fn new(
        metrics: Vec<(&'static str, f64)>,
        rating: &'static str,
        assessment: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            rating: Some(rating),
            assessment: assessment.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            metrics: Vec::new(),
            rating: None,
            assessment: "Calculation could not be performed.".to_string(),
            error: Some(message.into()),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    pub fn metrics(&self) -> &[(&'static str, f64)] {
        &self.metrics
    }

    pub fn rating(&self) -> Option<&'static str> {
        self.rating
    }

    pub fn assessment(&self) -> &str {
        &self.assessment
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl Serialize for CalculationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.metrics {
            if value.is_infinite() {
                let label = if *value > 0.0 { "Infinity" } else { "-Infinity" };
                map.serialize_entry(key, label)?;
            } else {
                map.serialize_entry(key, value)?;
            }
        }
        if let Some(rating) = self.rating {
            map.serialize_entry("rating", rating)?;
        }
        map.serialize_entry("assessment", &self.assessment)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

//
// ================= Dispatch =================
//

/// Run the formula selected by the invocation's kind.
pub fn calculate(invocation: &ToolInvocation) -> CalculationResult {
    match invocation.kind {
        CalculationKind::UnitEconomics => unit_economics(&UnitEconomicsInputs {
            monthly_revenue_per_customer: invocation.value("monthlyRevenuePerCustomer"),
            average_customer_lifespan_months: invocation.value("averageCustomerLifespanMonths"),
            customer_acquisition_cost: invocation.value("customerAcquisitionCost"),
            monthly_variable_cost_per_customer: invocation
                .value("monthlyVariableCostPerCustomer"),
        }),
        CalculationKind::TamSamSom => tam_sam_som(&MarketSizeInputs {
            total_addressable_market: invocation.value("totalAddressableMarket"),
            serviceable_percent: invocation.value("serviceableAddressableMarketPercent"),
            obtainable_percent: invocation.value("realisticMarketSharePercent"),
        }),
        CalculationKind::BreakEven => break_even(&BreakEvenInputs {
            monthly_fixed_costs: invocation.value("monthlyFixedCosts"),
            price_per_unit: invocation.value("pricePerUnit"),
            variable_cost_per_unit: invocation.value("variableCostPerUnit"),
        }),
        CalculationKind::Runway => runway(&RunwayInputs {
            current_cash: invocation.value("currentCash"),
            monthly_burn_rate: invocation.value("monthlyBurnRate"),
            monthly_revenue: invocation.value("monthlyRevenue"),
        }),
    }
}

/// String-keyed entry point. Unknown kinds and invalid inputs come back as
/// an error result instead of failing.
pub fn execute_calculation(kind: &str, inputs: &CalculationInputs) -> CalculationResult {
    let invocation = kind
        .parse::<CalculationKind>()
        .and_then(|kind| ToolInvocation::new(kind, inputs.clone()));

    match invocation {
        Ok(invocation) => calculate(&invocation),
        Err(MentorError::Validation(message)) => CalculationResult::error(message),
        Err(other) => CalculationResult::error(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(pairs: &[(&str, f64)]) -> CalculationInputs {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_kind_round_trips_names() {
        for kind in CalculationKind::ALL {
            assert_eq!(kind.as_str().parse::<CalculationKind>().unwrap(), kind);
        }
        assert!("npv".parse::<CalculationKind>().is_err());
    }

    #[test]
    fn test_unknown_kind_yields_error_result() {
        let result = execute_calculation("npv", &inputs(&[("rate", 0.1)]));
        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("Unknown calculation type: npv"));
        assert!(result.metrics().is_empty());
    }

    #[test]
    fn test_missing_required_input_is_named() {
        let result = execute_calculation(
            "break_even",
            &inputs(&[("monthlyFixedCosts", 1000.0), ("pricePerUnit", 50.0)]),
        );
        assert!(result.is_error());
        assert!(result.error_message().unwrap().contains("variableCostPerUnit"));
    }

    #[test]
    fn test_optional_inputs_default_to_zero() {
        let result = execute_calculation(
            "runway",
            &inputs(&[("currentCash", 120_000.0), ("monthlyBurnRate", 10_000.0)]),
        );
        assert!(!result.is_error());
        assert_eq!(result.get("netMonthlyBurn"), Some(10_000.0));
        assert_eq!(result.get("runwayMonths"), Some(12.0));
    }

    #[test]
    fn test_parse_inputs_rejects_non_numeric() {
        let raw = json!({"currentCash": "lots", "monthlyBurnRate": 5000});
        let err = parse_inputs(raw.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("\"currentCash\" must be a number"));
    }

    #[test]
    fn test_from_tool_input() {
        let invocation = ToolInvocation::from_tool_input(&json!({
            "calculation_type": "unit_economics",
            "inputs": {
                "monthlyRevenuePerCustomer": 100,
                "averageCustomerLifespanMonths": 24,
                "customerAcquisitionCost": 200
            }
        }))
        .unwrap();

        assert_eq!(invocation.kind, CalculationKind::UnitEconomics);
        let result = calculate(&invocation);
        assert_eq!(result.rating(), Some("healthy"));
    }

    #[test]
    fn test_from_tool_input_requires_object_inputs() {
        let err = ToolInvocation::from_tool_input(&json!({
            "calculation_type": "runway",
            "inputs": [1, 2, 3]
        }))
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_serializes_infinity_as_string() {
        let result = execute_calculation(
            "unit_economics",
            &inputs(&[
                ("monthlyRevenuePerCustomer", 50.0),
                ("averageCustomerLifespanMonths", 10.0),
                ("customerAcquisitionCost", 0.0),
            ]),
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["ltvCacRatio"], json!("Infinity"));
        assert_eq!(value["lifetimeValue"], json!(500.0));
        assert!(value.get("error").is_none());
        assert!(value["assessment"].is_string());
    }

    #[test]
    fn test_error_result_serialization() {
        let value = serde_json::to_value(CalculationResult::error("Unknown tool")).unwrap();
        assert_eq!(value["error"], json!("Unknown tool"));
        assert!(value["assessment"].is_string());
        assert!(value.get("rating").is_none());
    }
}
