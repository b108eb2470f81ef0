use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const TRIAL_LENGTH_DAYS: f64 = 14.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndustryType {
    Enterprise,
    RealEstate,
    Factory,
    Sme,
}

impl IndustryType {
    pub fn label(&self) -> &'static str {
        match self {
            IndustryType::Enterprise => "Enterprise",
            IndustryType::RealEstate => "Real Estate",
            IndustryType::Factory => "Factory",
            IndustryType::Sme => "SME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    Trial,
    Standard,
    Business,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AqiSensitivity {
    Low,
    High,
}

/// Anomaly detection sensitivity. Lower z-thresholds flag more readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensitivity {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Conservative => "CONSERVATIVE",
            Sensitivity::Balanced => "BALANCED",
            Sensitivity::Aggressive => "AGGRESSIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyTariffModel {
    Flat,
    Tiered,
}

/// Tariff and emission factors used to price a single reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffConfig {
    pub water_rate_per_unit: f64,
    pub energy_tariff_model: EnergyTariffModel,
    /// kgCO2e per kWh.
    pub carbon_factor_energy: f64,
    /// kgCO2e per m3.
    pub carbon_factor_water: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySettings {
    /// Flat water rate per m3.
    pub water_tariff: f64,
    pub energy_tariff_type: EnergyTariffModel,
    pub carbon_factor_energy: f64,
    pub carbon_factor_water: f64,
    /// Degrees C above which climate alerts fire.
    pub temp_threshold: f64,
    pub aqi_sensitivity: AqiSensitivity,
    pub ai_sensitivity: Sensitivity,
    pub reporting_email: String,
    pub currency: String,
    /// 0-6, Sunday first.
    pub weekly_report_day: u8,
}

impl CompanySettings {
    pub fn tariff(&self) -> TariffConfig {
        TariffConfig {
            water_rate_per_unit: self.water_tariff,
            energy_tariff_model: self.energy_tariff_type,
            carbon_factor_energy: self.carbon_factor_energy,
            carbon_factor_water: self.carbon_factor_water,
        }
    }
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            water_tariff: 25.5,
            energy_tariff_type: EnergyTariffModel::Tiered,
            carbon_factor_energy: 0.457,
            carbon_factor_water: 0.3,
            temp_threshold: 35.0,
            aqi_sensitivity: AqiSensitivity::High,
            ai_sensitivity: Sensitivity::Balanced,
            reporting_email: String::new(),
            currency: "EGP".to_string(),
            weekly_report_day: 2,
        }
    }
}

/// Partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub water_tariff: Option<f64>,
    pub energy_tariff_type: Option<EnergyTariffModel>,
    pub carbon_factor_energy: Option<f64>,
    pub carbon_factor_water: Option<f64>,
    pub temp_threshold: Option<f64>,
    pub aqi_sensitivity: Option<AqiSensitivity>,
    pub ai_sensitivity: Option<Sensitivity>,
    pub reporting_email: Option<String>,
    pub currency: Option<String>,
    pub weekly_report_day: Option<u8>,
}

impl SettingsUpdate {
    pub fn apply_to(&self, settings: &mut CompanySettings) {
        if let Some(v) = self.water_tariff {
            settings.water_tariff = v;
        }
        if let Some(v) = self.energy_tariff_type {
            settings.energy_tariff_type = v;
        }
        if let Some(v) = self.carbon_factor_energy {
            settings.carbon_factor_energy = v;
        }
        if let Some(v) = self.carbon_factor_water {
            settings.carbon_factor_water = v;
        }
        if let Some(v) = self.temp_threshold {
            settings.temp_threshold = v;
        }
        if let Some(v) = self.aqi_sensitivity {
            settings.aqi_sensitivity = v;
        }
        if let Some(v) = self.ai_sensitivity {
            settings.ai_sensitivity = v;
        }
        if let Some(v) = &self.reporting_email {
            settings.reporting_email = v.clone();
        }
        if let Some(v) = &self.currency {
            settings.currency = v.clone();
        }
        if let Some(v) = self.weekly_report_day {
            settings.weekly_report_day = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub industry: IndustryType,
    #[serde(with = "time::serde::rfc3339")]
    pub trial_start: OffsetDateTime,
    pub subscription_plan: SubscriptionPlan,
    pub settings: CompanySettings,
}

impl Company {
    /// Whole days of trial remaining, or -1 for companies on a paid plan.
    pub fn trial_days_left(&self, now: OffsetDateTime) -> i64 {
        if self.subscription_plan != SubscriptionPlan::Trial {
            return -1;
        }
        let days_passed = (now - self.trial_start).as_seconds_f64() / SECONDS_PER_DAY;
        (TRIAL_LENGTH_DAYS - days_passed).ceil().max(0.0) as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company_id: String,
    pub role: UserRole,
}
