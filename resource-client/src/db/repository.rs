use std::collections::HashSet;

use serde::{de::DeserializeOwned, Serialize};
use time::OffsetDateTime;

use super::{KeyValueStore, StoreError};
use crate::domain::{
    ClimateSnapshot, Company, GeneratedReport, IndustryType, Meter, MeterType, NewReport, Reading,
    ReportStatus, SettingsUpdate, SubscriptionPlan, User,
};

pub const KEY_COMPANY: &str = "company_v2";
pub const KEY_USER: &str = "user_v2";
pub const KEY_METERS: &str = "meters_v2";
pub const KEY_READINGS: &str = "readings_v2";
pub const KEY_REPORTS: &str = "reports_v2";
pub const KEY_CLIMATE: &str = "climate_v2";

/// Everything written to an empty store on first start.
#[derive(Debug, Clone)]
pub struct SeedData {
    pub company: Company,
    pub user: User,
    pub meters: Vec<Meter>,
    pub readings: Vec<Reading>,
    pub climate: Vec<ClimateSnapshot>,
}

/// Typed access to the JSON collections of a single company.
pub struct Repository<S> {
    store: S,
}

impl<S: KeyValueStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Writes `seed` when the store has never been initialised. Returns
    /// whether the full seed was applied.
    ///
    /// The company key marks a store as initialised and is written last, so
    /// a seed interrupted part way is applied again on the next start.
    /// Stores created before climate data existed get only the climate seed.
    pub fn init_with_seed(&mut self, seed: &SeedData) -> Result<bool, StoreError> {
        let mut seeded = false;
        if !self.store.contains(KEY_COMPANY)? {
            tracing::info!(company_id = %seed.company.id, "initialising resource store from seed");
            self.save(KEY_USER, &seed.user)?;
            self.save(KEY_METERS, &seed.meters)?;
            self.save(KEY_READINGS, &seed.readings)?;
            self.save(KEY_REPORTS, &Vec::<GeneratedReport>::new())?;
            self.save(KEY_CLIMATE, &seed.climate)?;
            self.save(KEY_COMPANY, &seed.company)?;
            seeded = true;
        }

        if !self.store.contains(KEY_CLIMATE)? {
            tracing::info!("climate collection missing, applying climate seed");
            self.save(KEY_CLIMATE, &seed.climate)?;
        }

        Ok(seeded)
    }

    pub fn company(&self) -> Result<Company, StoreError> {
        self.load(KEY_COMPANY)?
            .ok_or(StoreError::NotInitialized(KEY_COMPANY))
    }

    pub fn user(&self) -> Result<Option<User>, StoreError> {
        self.load(KEY_USER)
    }

    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<Company, StoreError> {
        self.modify_company(|c| update.apply_to(&mut c.settings))
    }

    pub fn set_plan(&mut self, plan: SubscriptionPlan) -> Result<Company, StoreError> {
        self.modify_company(|c| c.subscription_plan = plan)
    }

    pub fn update_profile(
        &mut self,
        name: String,
        industry: IndustryType,
    ) -> Result<Company, StoreError> {
        self.modify_company(|c| {
            c.name = name;
            c.industry = industry;
        })
    }

    pub fn trial_days_left(&self, now: OffsetDateTime) -> Result<i64, StoreError> {
        Ok(self.company()?.trial_days_left(now))
    }

    pub fn meters(&self, meter_type: Option<MeterType>) -> Result<Vec<Meter>, StoreError> {
        let meters: Vec<Meter> = self.load_vec(KEY_METERS)?;
        Ok(match meter_type {
            Some(t) => meters.into_iter().filter(|m| m.meter_type == t).collect(),
            None => meters,
        })
    }

    /// First meter of the given type; new manual readings are booked against it.
    pub fn meter_of_type(&self, meter_type: MeterType) -> Result<Option<Meter>, StoreError> {
        Ok(self.meters(Some(meter_type))?.into_iter().next())
    }

    /// Readings for every meter of `meter_type`, oldest first. Without a type
    /// filter the collection is returned in stored order.
    pub fn readings(&self, meter_type: Option<MeterType>) -> Result<Vec<Reading>, StoreError> {
        let readings: Vec<Reading> = self.load_vec(KEY_READINGS)?;
        let Some(t) = meter_type else {
            return Ok(readings);
        };

        let meter_ids: Vec<String> = self.meters(Some(t))?.into_iter().map(|m| m.id).collect();
        let mut filtered: Vec<Reading> = readings
            .into_iter()
            .filter(|r| meter_ids.contains(&r.meter_id))
            .collect();
        filtered.sort_by_key(|r| r.ts);
        Ok(filtered)
    }

    /// Returns false when a reading with the same id is already stored.
    pub fn add_reading(&mut self, reading: Reading) -> Result<bool, StoreError> {
        Ok(self.add_readings(vec![reading])? == 1)
    }

    /// Appends the readings whose id is not stored yet and returns how many
    /// were added. Later duplicates inside `batch` are dropped too.
    pub fn add_readings(&mut self, batch: Vec<Reading>) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mut readings: Vec<Reading> = self.load_vec(KEY_READINGS)?;
        let mut known: HashSet<String> = readings.iter().map(|r| r.id.clone()).collect();

        let before = readings.len();
        readings.extend(batch.into_iter().filter(|r| known.insert(r.id.clone())));
        let added = readings.len() - before;
        if added == 0 {
            return Ok(0);
        }

        self.save(KEY_READINGS, &readings)?;
        Ok(added)
    }

    pub fn climate_data(&self) -> Result<Vec<ClimateSnapshot>, StoreError> {
        self.load_vec(KEY_CLIMATE)
    }

    pub fn set_climate_data(&mut self, timeline: &[ClimateSnapshot]) -> Result<(), StoreError> {
        self.save(KEY_CLIMATE, timeline)
    }

    /// Reports, newest first.
    pub fn reports(&self) -> Result<Vec<GeneratedReport>, StoreError> {
        let mut reports: Vec<GeneratedReport> = self.load_vec(KEY_REPORTS)?;
        reports.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(reports)
    }

    pub fn add_report(
        &mut self,
        report: NewReport,
        now: OffsetDateTime,
    ) -> Result<GeneratedReport, StoreError> {
        let mut reports: Vec<GeneratedReport> = self.load_vec(KEY_REPORTS)?;
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        let generated = GeneratedReport {
            id: format!("rep_{millis}_{}", reports.len()),
            report_type: report.report_type,
            generated_at: now,
            title: report.title,
            summary: report.summary,
            risk_score: report.risk_score,
            status: ReportStatus::Ready,
        };
        reports.insert(0, generated.clone());
        self.save(KEY_REPORTS, &reports)?;
        Ok(generated)
    }

    fn modify_company<F>(&mut self, f: F) -> Result<Company, StoreError>
    where
        F: FnOnce(&mut Company),
    {
        let mut company = self.company()?;
        f(&mut company);
        self.save(KEY_COMPANY, &company)?;
        Ok(company)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn load_vec<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        Ok(self.load(key)?.unwrap_or_default())
    }

    fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw)
    }
}
