//! Time handling for model runs, forecast steps and stored timesteps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// Model run cycles. Declaration order is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cycle {
    /// 00Z run
    Z00,
    /// 06Z run
    Z06,
    /// 12Z run
    Z12,
    /// 18Z run
    Z18,
}

impl Cycle {
    pub fn from_hour(hour: u32) -> Option<Self> {
        match hour {
            0 => Some(Cycle::Z00),
            6 => Some(Cycle::Z06),
            12 => Some(Cycle::Z12),
            18 => Some(Cycle::Z18),
            _ => None,
        }
    }

    pub fn hour(&self) -> u32 {
        match self {
            Cycle::Z00 => 0,
            Cycle::Z06 => 6,
            Cycle::Z12 => 12,
            Cycle::Z18 => 18,
        }
    }

    /// All four daily cycles, earliest first.
    pub fn all() -> &'static [Cycle] {
        &[Cycle::Z00, Cycle::Z06, Cycle::Z12, Cycle::Z18]
    }

    /// Archive/file label, e.g. `"06z"`.
    pub fn label(&self) -> &'static str {
        match self {
            Cycle::Z00 => "00z",
            Cycle::Z06 => "06z",
            Cycle::Z12 => "12z",
            Cycle::Z18 => "18z",
        }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Cycle {
    type Err = FieldError;

    /// Accepts `"06z"`, `"06Z"` and bare `"06"`.
    fn from_str(s: &str) -> FieldResult<Self> {
        let digits = s.trim_end_matches(['z', 'Z']);
        if digits.len() != 2 {
            return Err(FieldError::InvalidCycle(s.to_string()));
        }
        digits
            .parse::<u32>()
            .ok()
            .and_then(Cycle::from_hour)
            .ok_or_else(|| FieldError::InvalidCycle(s.to_string()))
    }
}

fn cycle_instant(date: NaiveDate, cycle: Cycle) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
        + Duration::hours(cycle.hour() as i64)
}

/// A stored point in time: a calendar day plus one of the four cycles.
///
/// Two timesteps are equal exactly when they denote the same UTC instant;
/// `(date, cycle)` maps one-to-one onto that instant, so the derived
/// comparisons are instant comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestep {
    date: NaiveDate,
    cycle: Cycle,
}

impl Timestep {
    pub fn new(date: NaiveDate, cycle: Cycle) -> Self {
        Self { date, cycle }
    }

    /// Build from an absolute instant. Returns `None` unless the instant
    /// falls exactly on a 00/06/12/18 UTC boundary.
    pub fn from_instant(instant: DateTime<Utc>) -> Option<Self> {
        if instant.minute() != 0 || instant.second() != 0 || instant.nanosecond() != 0 {
            return None;
        }
        let cycle = Cycle::from_hour(instant.hour())?;
        Some(Self {
            date: instant.date_naive(),
            cycle,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn instant(&self) -> DateTime<Utc> {
        cycle_instant(self.date, self.cycle)
    }

    /// File stem used on disk, e.g. `20251028_00z`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.date.format("%Y%m%d"), self.cycle.label())
    }

    /// Parse a file stem produced by [`Timestep::file_stem`].
    pub fn parse_file_stem(stem: &str) -> FieldResult<Self> {
        let invalid = || FieldError::InvalidFileStem(stem.to_string());

        let (date_part, cycle_part) = stem.split_once('_').ok_or_else(invalid)?;
        if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").map_err(|_| invalid())?;
        if !cycle_part.ends_with(['z', 'Z']) {
            return Err(invalid());
        }
        let cycle = cycle_part.parse::<Cycle>().map_err(|_| invalid())?;

        Ok(Self { date, cycle })
    }
}

impl fmt::Display for Timestep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instant().format("%Y-%m-%dT%H:%MZ"))
    }
}

/// When a forecast was initialized. A run produces many forecast steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelRun {
    pub date: NaiveDate,
    pub cycle: Cycle,
}

impl ModelRun {
    pub fn new(date: NaiveDate, cycle: Cycle) -> Self {
        Self { date, cycle }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        cycle_instant(self.date, self.cycle)
    }

    /// The run's analysis (lead 0) as a stored timestep.
    pub fn analysis(&self) -> Timestep {
        Timestep::new(self.date, self.cycle)
    }

    pub fn step(&self, lead_hours: u32) -> ForecastStep {
        ForecastStep::new(*self, lead_hours)
    }

    /// Date as used in archive paths, e.g. `20250101`.
    pub fn date_label(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for ModelRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date_label(), self.cycle)
    }
}

/// A single lead time of a model run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastStep {
    pub run: ModelRun,
    pub lead_hours: u32,
}

impl ForecastStep {
    pub fn new(run: ModelRun, lead_hours: u32) -> Self {
        Self { run, lead_hours }
    }

    pub fn valid_time(&self) -> DateTime<Utc> {
        self.run.instant() + Duration::hours(self.lead_hours as i64)
    }

    /// The timestep this step lands on, or `None` when the valid time is not
    /// on a 6-hour boundary.
    pub fn target(&self) -> Option<Timestep> {
        Timestep::from_instant(self.valid_time())
    }

    pub fn is_analysis(&self) -> bool {
        self.lead_hours == 0
    }
}

impl fmt::Display for ForecastStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} +{}h", self.run, self.lead_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cycle_parse() {
        assert_eq!("06z".parse::<Cycle>().unwrap(), Cycle::Z06);
        assert_eq!("18Z".parse::<Cycle>().unwrap(), Cycle::Z18);
        assert_eq!("00".parse::<Cycle>().unwrap(), Cycle::Z00);
        assert!("03z".parse::<Cycle>().is_err());
        assert!("6z".parse::<Cycle>().is_err());
    }

    #[test]
    fn test_cycles_are_chronological() {
        let hours: Vec<u32> = Cycle::all().iter().map(Cycle::hour).collect();
        assert_eq!(hours, vec![0, 6, 12, 18]);
        assert!(Cycle::Z00 < Cycle::Z18);
    }

    #[test]
    fn test_timestep_file_stem_roundtrip() {
        let ts = Timestep::new(date(2025, 10, 28), Cycle::Z00);
        assert_eq!(ts.file_stem(), "20251028_00z");
        assert_eq!(Timestep::parse_file_stem("20251028_00z").unwrap(), ts);
    }

    #[test]
    fn test_timestep_rejects_bad_stems() {
        for stem in [
            "20251028",
            "20251028_03z",
            "2025102_00z",
            "20251328_00z",
            "20251028_00",
            "notes_00z",
            "20251028_00z_old",
        ] {
            assert!(Timestep::parse_file_stem(stem).is_err(), "{stem}");
        }
    }

    #[test]
    fn test_timestep_equality_is_by_instant() {
        let a = Timestep::new(date(2025, 1, 1), Cycle::Z18);
        let b = Timestep::from_instant(Utc.with_ymd_and_hms(2025, 1, 1, 18, 0, 0).unwrap()).unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_from_instant_requires_cycle_boundary() {
        assert!(Timestep::from_instant(Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap()).is_none());
        assert!(Timestep::from_instant(Utc.with_ymd_and_hms(2025, 1, 1, 6, 30, 0).unwrap()).is_none());
    }

    #[test]
    fn test_forecast_step_crosses_midnight() {
        let run = ModelRun::new(date(2025, 1, 1), Cycle::Z18);
        let target = run.step(12).target().unwrap();
        assert_eq!(target, Timestep::new(date(2025, 1, 2), Cycle::Z06));
    }

    #[test]
    fn test_forecast_step_off_boundary() {
        let run = ModelRun::new(date(2025, 1, 1), Cycle::Z00);
        assert!(run.step(3).target().is_none());
        assert!(run.step(0).is_analysis());
        assert_eq!(run.step(0).target(), Some(run.analysis()));
    }

    #[test]
    fn test_timestep_serializes() {
        let ts = Timestep::new(date(2025, 1, 1), Cycle::Z12);
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("Z12"));
    }
}
