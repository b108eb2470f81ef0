pub mod climate;
pub mod company;
pub mod meter;
pub mod reading;
pub mod report;

pub use climate::{current_snapshot, ClimateSnapshot, ClimateSource};
pub use company::{
    AqiSensitivity, Company, CompanySettings, EnergyTariffModel, IndustryType, Sensitivity,
    SettingsUpdate, SubscriptionPlan, TariffConfig, User, UserRole,
};
pub use meter::{Meter, MeterType};
pub use reading::{NewReading, Reading};
pub use report::{GeneratedReport, NewReport, ReportStatus, ReportType};
