//! Fixtures for tests
use crate::equipment::Catalog;
use crate::load::{HOURS_PER_YEAR, LoadProfile};
use crate::model::{Model, ModelParameters};
use crate::optimisation::coefficients::Coefficients;
use crate::scenario::Scenario;
use rstest::fixture;
use std::path::Path;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Model parameters with three planning years and a single representative week, to keep the
/// problems built in tests small
#[fixture]
pub fn model_parameters() -> ModelParameters {
    toml::from_str(
        r#"
        years = [2026, 2027, 2028]

        [grid]
        available_year = 2027

        [sampling]
        weeks = [{ name = "all_year", start_day = 0, weight = 52 }]
        "#,
    )
    .unwrap()
}

/// A load profile with a daily cycle between 80 and 100 MW
#[fixture]
pub fn load_profile() -> LoadProfile {
    LoadProfile::new(
        (0..HOURS_PER_YEAR)
            .map(|hour| if (8..20).contains(&(hour % 24)) { 100.0 } else { 80.0 })
            .collect(),
    )
}

#[fixture]
pub fn model(model_parameters: ModelParameters, load_profile: LoadProfile) -> Model {
    Model::new(
        Path::new("model"),
        model_parameters,
        load_profile,
        None,
        Catalog::default(),
    )
    .unwrap()
}

#[fixture]
pub fn coefficients(model: Model) -> Coefficients {
    Coefficients::build(&model, &Scenario::default()).unwrap()
}
