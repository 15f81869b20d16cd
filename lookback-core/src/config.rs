use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::analysis::{AnalysisConfig, LookbackRange};

#[derive(Debug, Deserialize)]
pub struct Analysis {
    pub tick_offset: Decimal,
    pub parallel: bool,
}

#[derive(Debug, Deserialize)]
pub struct Lookback {
    pub min: usize,
    pub max: usize,
    pub interval: usize,
}

#[derive(Debug, Deserialize)]
pub struct Input {
    pub skip_rows: usize,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub analysis: Analysis,
    pub lookback: Lookback,
    pub input: Input,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("analysis.tick_offset", "0.1")?
            .set_default("analysis.parallel", false)?
            .set_default("lookback.min", 150)?
            .set_default("lookback.max", 350)?
            .set_default("lookback.interval", 20)?
            .set_default("input.skip_rows", 0)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("LOOKBACK")
                    .separator("__")
                    .try_parsing(true),
            );

        let s = builder.build()?;
        s.try_deserialize()
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            tick_offset: self.analysis.tick_offset,
        }
    }

    pub fn lookback_range(&self) -> LookbackRange {
        LookbackRange {
            min: self.lookback.min,
            max: self.lookback.max,
            interval: self.lookback.interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // Only test in this crate that touches LOOKBACK__* variables
    #[test]
    fn test_environment_overrides_defaults() {
        std::env::remove_var("LOOKBACK__ANALYSIS__TICK_OFFSET");
        std::env::remove_var("LOOKBACK__LOOKBACK__MIN");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.analysis.tick_offset, Decimal::from_str("0.1").unwrap());
        assert_eq!(settings.lookback.min, 150);
        assert_eq!(settings.lookback_range().max, 350);

        std::env::set_var("LOOKBACK__ANALYSIS__TICK_OFFSET", "0.25");
        std::env::set_var("LOOKBACK__LOOKBACK__MIN", "40");
        let overridden = Settings::new();
        std::env::remove_var("LOOKBACK__ANALYSIS__TICK_OFFSET");
        std::env::remove_var("LOOKBACK__LOOKBACK__MIN");

        let settings = overridden.unwrap();
        assert_eq!(
            settings.analysis_config().tick_offset,
            Decimal::from_str("0.25").unwrap()
        );
        assert_eq!(settings.lookback_range().min, 40);
        assert_eq!(settings.lookback.interval, 20);
    }
}
