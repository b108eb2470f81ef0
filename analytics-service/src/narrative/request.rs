use resource_client::domain::{Company, IndustryType, MeterType, Sensitivity};
use serde::{Deserialize, Serialize};

/// One narrative ask, carrying the figures its prompt quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "context", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NarrativeRequest {
    ResourceRisk {
        resource: MeterType,
        current: f64,
        average: f64,
        /// Signed period-over-period change in percent.
        trend: f64,
        is_anomaly: bool,
        prediction: f64,
    },
    CarbonAudit {
        total_tonnes: f64,
        intensity: f64,
        score: u8,
        #[serde(default)]
        target_pct: f64,
    },
    ClimateRisk {
        #[serde(default = "default_location")]
        location: String,
        temp_c: f64,
        hsi: f64,
        cooling_load_pct: f64,
    },
    ExecutiveSummary {
        total_cost: f64,
        total_carbon_tonnes: f64,
        efficiency_trend: String,
    },
}

fn default_location() -> String {
    "the facility".to_string()
}

/// Who the narrative is written for.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeProfile {
    pub industry: IndustryType,
    pub sensitivity: Sensitivity,
    pub currency: String,
}

impl NarrativeProfile {
    pub fn from_company(company: &Company) -> Self {
        Self {
            industry: company.industry,
            sensitivity: company.settings.ai_sensitivity,
            currency: company.settings.currency.clone(),
        }
    }

    pub fn system_instruction(&self) -> String {
        format!(
            "You are an industrial resource efficiency analyst for the {industry} sector.\n\
             Protect the operator's margins and keep them inside carbon compliance.\n\
             RULES:\n\
             1. Answer in pure JSON whenever JSON is requested.\n\
             2. Quote money in {currency}.\n\
             3. Cite the figures provided.\n\
             4. Be brief and executive in tone.\n\
             5. Alert sensitivity: {sensitivity}.",
            industry = self.industry.label(),
            currency = self.currency,
            sensitivity = self.sensitivity.as_str(),
        )
    }
}

impl Default for NarrativeProfile {
    fn default() -> Self {
        Self {
            industry: IndustryType::Factory,
            sensitivity: Sensitivity::Balanced,
            currency: "EGP".to_string(),
        }
    }
}

impl NarrativeRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            NarrativeRequest::ResourceRisk { .. } => "RESOURCE_RISK",
            NarrativeRequest::CarbonAudit { .. } => "CARBON_AUDIT",
            NarrativeRequest::ClimateRisk { .. } => "CLIMATE_RISK",
            NarrativeRequest::ExecutiveSummary { .. } => "EXECUTIVE_SUMMARY",
        }
    }

    pub fn prompt(&self, currency: &str) -> String {
        match self {
            NarrativeRequest::ResourceRisk {
                resource,
                current,
                average,
                trend,
                is_anomaly,
                prediction,
            } => format!(
                "DATA ({resource}):\n\
                 - Current usage: {current}\n\
                 - Historical average: {average:.1}\n\
                 - Trend: {sign}{trend:.1}%\n\
                 - Anomaly detected: {is_anomaly}\n\
                 - Predicted next period: {prediction:.1}\n\
                 TASK: Reply with a JSON object holding \"risk_level\" (LOW, MEDIUM or HIGH), \
                 \"financial_implication\" (one sentence on cost impact) and \
                 \"recommendation\" (one concrete operational action). Output raw JSON only.",
                resource = resource.as_str(),
                sign = if *trend > 0.0 { "+" } else { "" },
            ),
            NarrativeRequest::CarbonAudit {
                total_tonnes,
                intensity,
                score,
                target_pct,
            } => format!(
                "DATA:\n\
                 - Total emissions: {total_tonnes:.2} tCO2e\n\
                 - Carbon intensity: {intensity:.3} kg/unit\n\
                 - Efficiency score: {score}/100\n\
                 - Target reduction: {target_pct}%\n\
                 TASK: Write a two-sentence ESG report summary covering compliance status \
                 and export readiness under CBAM."
            ),
            NarrativeRequest::ClimateRisk {
                location,
                temp_c,
                hsi,
                cooling_load_pct,
            } => format!(
                "DATA:\n\
                 - Location: {location}\n\
                 - Temperature: {temp_c:.1}C\n\
                 - Heat stress index: {hsi:.1}\n\
                 - Cooling load increase: {cooling_load_pct}%\n\
                 TASK: Give HVAC or shift-planning advice that limits the cost of the \
                 {cooling_load_pct}% cooling load increase. At most 25 words."
            ),
            NarrativeRequest::ExecutiveSummary {
                total_cost,
                total_carbon_tonnes,
                efficiency_trend,
            } => format!(
                "Weekly board summary.\n\
                 - Total cost: {total_cost:.0} {currency}\n\
                 - Total carbon: {total_carbon_tonnes:.2} t\n\
                 - Efficiency trend: {efficiency_trend}\n\
                 TASK: Exactly two bullet points: financial health (risks and savings), \
                 then sustainability performance."
            ),
        }
    }

    /// Text served when the backend cannot answer.
    pub fn fallback(&self) -> &'static str {
        match self {
            NarrativeRequest::ResourceRisk { .. } => "Metrics recorded. AI Analysis queued.",
            NarrativeRequest::CarbonAudit { .. } => {
                "Carbon data synchronized with standard compliance protocols."
            }
            NarrativeRequest::ClimateRisk { .. } => {
                "Climate monitoring active. Adjust HVAC based on local temp."
            }
            NarrativeRequest::ExecutiveSummary { .. } => {
                "Weekly operations remain within budget. ESG targets are on track."
            }
        }
    }

    /// Resource-risk answers are JSON objects, possibly inside a markdown
    /// fence; everything else, and any answer that fails to parse, stays text.
    pub fn structured_result(&self, text: &str) -> serde_json::Value {
        if let NarrativeRequest::ResourceRisk { .. } = self {
            let stripped = text.replace("```json", "").replace("```", "");
            if let Ok(value @ serde_json::Value::Object(_)) =
                serde_json::from_str::<serde_json::Value>(stripped.trim())
            {
                return value;
            }
        }
        serde_json::Value::String(text.to_string())
    }
}
