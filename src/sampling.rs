//! Compression of an annual hourly load curve into a set of representative hours.
use crate::load::HOURS_PER_YEAR;
use crate::units::Dimensionless;
use anyhow::{Result, ensure};
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

/// Number of hours in a representative week
pub const HOURS_PER_WEEK: usize = 168;

/// Number of weeks the weights of the representative weeks should add up to
const WEEKS_PER_YEAR: u32 = 52;

/// Whether to sample representative weeks or model every hour of the year
#[derive(Debug, Clone, Copy, PartialEq, Default, DeserializeLabeledStringEnum)]
pub enum SamplingMode {
    /// Concatenate a set of representative weeks
    #[default]
    #[string = "representative"]
    Representative,
    /// Model all 8,760 hours
    #[string = "full"]
    Full,
}

/// A week-long window of the year standing in for a number of similar weeks
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepresentativeWeek {
    /// Label for the week (e.g. "summer_peak")
    pub name: String,
    /// Day of the year (zero-based) on which the window starts
    pub start_day: u32,
    /// Number of weeks of the year this window represents
    pub weight: u32,
}

impl RepresentativeWeek {
    fn new(name: &str, start_day: u32, weight: u32) -> Self {
        Self {
            name: name.into(),
            start_day,
            weight,
        }
    }
}

/// The default set of representative weeks
pub fn default_representative_weeks() -> Vec<RepresentativeWeek> {
    vec![
        RepresentativeWeek::new("spring_typical", 80, 10),
        RepresentativeWeek::new("summer_typical", 160, 8),
        RepresentativeWeek::new("summer_peak", 200, 4),
        RepresentativeWeek::new("fall_typical", 260, 10),
        RepresentativeWeek::new("winter_typical", 340, 12),
        RepresentativeWeek::new("winter_peak", 10, 8),
    ]
}

/// Check that a set of representative weeks is usable
pub fn check_representative_weeks(weeks: &[RepresentativeWeek]) -> Result<()> {
    ensure!(!weeks.is_empty(), "At least one representative week is required");

    for week in weeks {
        ensure!(
            week.start_day < 365,
            "Start day of representative week {} must be less than 365",
            week.name
        );
        ensure!(
            week.weight > 0,
            "Weight of representative week {} must be greater than zero",
            week.name
        );
    }

    let total_weight: u32 = weeks.iter().map(|week| week.weight).sum();
    if total_weight != WEEKS_PER_YEAR {
        warn!(
            "Representative week weights sum to {total_weight} rather than {WEEKS_PER_YEAR}; \
            annual totals are scaled by sample size only"
        );
    }

    Ok(())
}

/// A sample of hours from the year
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Index into the full year of each sampled hour
    pub hours: Vec<usize>,
    /// Multiplier converting a sum over sampled hours into an annual total
    pub scale: Dimensionless,
}

impl Sample {
    /// Number of sampled hours
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    /// Whether the sample contains no hours
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Hour of the day (0-23) of each sampled hour
    pub fn hour_of_day(&self) -> impl Iterator<Item = u32> + '_ {
        self.hours.iter().map(|hour| (hour % 24) as u32)
    }

    /// Pick out the sampled values from a full year of hourly values
    pub fn apply(&self, full_year: &[f64]) -> Vec<f64> {
        self.hours.iter().map(|&hour| full_year[hour]).collect()
    }
}

/// Repair an hourly series to exactly one year's length.
///
/// Short series are tiled and long series truncated. Either repair is logged as a warning, but is
/// not treated as an error.
pub fn to_full_year(hourly: &[f64]) -> Vec<f64> {
    if hourly.len() == HOURS_PER_YEAR {
        return hourly.to_vec();
    }

    if hourly.is_empty() {
        warn!("Load profile is empty; treating load as zero in every hour");
        return vec![0.0; HOURS_PER_YEAR];
    }

    warn!(
        "Load profile has {} hours rather than {HOURS_PER_YEAR}; it will be {}",
        hourly.len(),
        if hourly.len() < HOURS_PER_YEAR {
            "tiled"
        } else {
            "truncated"
        }
    );

    hourly.iter().copied().cycle().take(HOURS_PER_YEAR).collect()
}

/// Choose which hours of the year to model.
///
/// In representative mode, each week's window starts at its start day and wraps around to the
/// start of the year if it runs past the last hour.
pub fn sample_hours(mode: SamplingMode, weeks: &[RepresentativeWeek]) -> Sample {
    let hours: Vec<usize> = match mode {
        SamplingMode::Full => (0..HOURS_PER_YEAR).collect(),
        SamplingMode::Representative => weeks
            .iter()
            .flat_map(|week| {
                let start = week.start_day as usize * 24;
                (0..HOURS_PER_WEEK).map(move |offset| (start + offset) % HOURS_PER_YEAR)
            })
            .collect(),
    };

    let scale = Dimensionless(HOURS_PER_YEAR as f64 / hours.len() as f64);
    Sample { hours, scale }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_default_weeks_cover_year() {
        let weeks = default_representative_weeks();
        assert_eq!(weeks.iter().map(|w| w.weight).sum::<u32>(), WEEKS_PER_YEAR);
        assert!(check_representative_weeks(&weeks).is_ok());
    }

    #[test]
    fn test_sample_representative() {
        let sample = sample_hours(
            SamplingMode::Representative,
            &default_representative_weeks(),
        );
        assert_eq!(sample.len(), 1008);
        assert_approx_eq!(f64, sample.scale.value(), 8760.0 / 1008.0);
        assert_eq!(sample.hours[0], 80 * 24);
        assert_eq!(sample.hour_of_day().next(), Some(0));
    }

    #[test]
    fn test_sample_full() {
        let sample = sample_hours(SamplingMode::Full, &[]);
        assert_eq!(sample.len(), HOURS_PER_YEAR);
        assert_eq!(sample.scale, Dimensionless(1.0));
    }

    #[test]
    fn test_sample_wraps_past_end_of_year() {
        let weeks = [RepresentativeWeek::new("new_year", 364, 52)];
        let sample = sample_hours(SamplingMode::Representative, &weeks);
        assert_eq!(sample.hours[23], 8759);
        assert_eq!(sample.hours[24], 0);
        assert_eq!(sample.hours[HOURS_PER_WEEK - 1], 143);
    }

    #[test]
    fn test_to_full_year() {
        let full: Vec<f64> = (0..HOURS_PER_YEAR).map(|h| h as f64).collect();
        assert_eq!(to_full_year(&full), full);

        let tiled = to_full_year(&[1.0, 2.0]);
        assert_eq!(tiled.len(), HOURS_PER_YEAR);
        assert_eq!(&tiled[..4], &[1.0, 2.0, 1.0, 2.0]);

        let long = vec![3.0; HOURS_PER_YEAR + 10];
        assert_eq!(to_full_year(&long).len(), HOURS_PER_YEAR);

        assert_eq!(to_full_year(&[]), vec![0.0; HOURS_PER_YEAR]);
    }

    #[test]
    fn test_check_representative_weeks() {
        assert!(check_representative_weeks(&[]).is_err());
        assert!(check_representative_weeks(&[RepresentativeWeek::new("a", 365, 52)]).is_err());
        assert!(check_representative_weeks(&[RepresentativeWeek::new("a", 0, 0)]).is_err());
        // Weights not summing to 52 only gives a warning
        assert!(check_representative_weeks(&[RepresentativeWeek::new("a", 0, 1)]).is_ok());
    }

    #[test]
    fn test_apply_sample() {
        let full: Vec<f64> = (0..HOURS_PER_YEAR).map(|h| h as f64).collect();
        let sample = sample_hours(
            SamplingMode::Representative,
            &[RepresentativeWeek::new("a", 1, 52)],
        );
        let values = sample.apply(&full);
        assert_eq!(values[0], 24.0);
        assert_eq!(values.len(), HOURS_PER_WEEK);
    }
}
