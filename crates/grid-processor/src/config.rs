//! Configuration for dataset loading.

use serde::{Deserialize, Serialize};

use storm_common::{StormError, StormResult};

/// Millimetres per inch.
pub const MM_PER_INCH: f32 = 25.4;

/// Default precipitation variable in each partition.
pub const DEFAULT_VARIABLE: &str = "APCP_surface";

/// Options for [`crate::load_and_clip`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Mask the dataset to the watershed boundary.
    pub clip: bool,
    /// Divide every value by `unit_divisor`.
    pub convert_units: bool,
    /// Divisor applied when converting (mm to inches).
    pub unit_divisor: f32,
    /// Variable read from every partition.
    pub variable: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            clip: false,
            convert_units: true,
            unit_divisor: MM_PER_INCH,
            variable: DEFAULT_VARIABLE.to_string(),
        }
    }
}

impl LoadOptions {
    /// Load options from environment variables.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(val) = std::env::var("CLIP_TO_WATERSHED") {
            options.clip = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("CONVERT_TO_INCHES") {
            options.convert_units = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("UNIT_DIVISOR") {
            if let Ok(divisor) = val.parse() {
                options.unit_divisor = divisor;
            }
        }

        if let Ok(val) = std::env::var("PRECIP_VARIABLE") {
            if !val.is_empty() {
                options.variable = val;
            }
        }

        options
    }

    /// Validate the options.
    pub fn validate(&self) -> StormResult<()> {
        if !self.unit_divisor.is_finite() || self.unit_divisor <= 0.0 {
            return Err(StormError::Config(format!(
                "unit_divisor must be a positive number, got {}",
                self.unit_divisor
            )));
        }

        if self.variable.trim().is_empty() {
            return Err(StormError::Config("variable must not be empty".to_string()));
        }

        Ok(())
    }

    /// Units label after loading.
    pub fn output_units(&self, source_units: &str) -> String {
        if self.convert_units {
            "in".to_string()
        } else {
            source_units.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = LoadOptions::default();
        assert!(!options.clip);
        assert!(options.convert_units);
        assert_eq!(options.unit_divisor, 25.4);
        assert_eq!(options.variable, "APCP_surface");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_divisor() {
        for divisor in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let options = LoadOptions {
                unit_divisor: divisor,
                ..Default::default()
            };
            assert!(options.validate().is_err(), "{divisor}");
        }
    }

    #[test]
    fn test_output_units() {
        let mut options = LoadOptions::default();
        assert_eq!(options.output_units("kg/m^2"), "in");
        options.convert_units = false;
        assert_eq!(options.output_units("kg/m^2"), "kg/m^2");
    }
}
