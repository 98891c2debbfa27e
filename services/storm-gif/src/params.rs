//! Job parameters as received from the plugin runner.

use serde::{Deserialize, Deserializer, Serialize};

use storm_common::{HourlyRange, StormError, StormResult};

/// Parameters for one storm animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginParams {
    /// Storm start date, `YYYY-MM-DD`.
    pub start_date: String,
    /// Number of hours to animate.
    #[serde(deserialize_with = "hours_from_int_or_string")]
    pub duration: i64,
    /// Base location of the hourly partitions.
    pub precip_source_location: String,
    /// GeoJSON watershed boundary, local or remote.
    pub watershed_file_location: String,
    /// Bucket receiving the GIF.
    pub output_bucket: String,
    /// Key prefix for the GIF inside `output_bucket`.
    #[serde(default)]
    pub gif_output_prefix: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

fn hours_from_int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(hours) => Ok(hours),
        IntOrString::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("duration '{}' is not an integer", s))),
    }
}

impl PluginParams {
    /// Parse and validate a JSON parameter object.
    pub fn from_json(json: &str) -> StormResult<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Check the fields that serde cannot.
    pub fn validate(&self) -> StormResult<()> {
        HourlyRange::parse(&self.start_date, self.duration)?;

        for (name, value) in [
            ("precip_source_location", &self.precip_source_location),
            ("watershed_file_location", &self.watershed_file_location),
            ("output_bucket", &self.output_bucket),
        ] {
            if value.trim().is_empty() {
                return Err(StormError::InvalidInput(format!("{} must not be empty", name)));
            }
        }

        if self.output_bucket.contains('/') {
            return Err(StormError::InvalidInput(format!(
                "output_bucket '{}' must be a bare bucket name",
                self.output_bucket
            )));
        }

        Ok(())
    }

    /// Base name shared by the local GIF and the uploaded object.
    pub fn output_name(&self) -> String {
        format!("storm-{}", self.start_date)
    }

    /// Object key of the uploaded GIF: `{prefix/}storm-{start}.gif`.
    pub fn object_name(&self) -> String {
        let file = format!("{}.gif", self.output_name());
        match self
            .gif_output_prefix
            .as_deref()
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
        {
            Some(prefix) => format!("{}/{}", prefix, file),
            None => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> serde_json::Value {
        json!({
            "start_date": "2009-09-20",
            "duration": 24,
            "precip_source_location": "s3://tempest/aorc/",
            "watershed_file_location": "s3://tempest/watersheds/kanawha.geojson",
            "output_bucket": "storm-gifs"
        })
    }

    #[test]
    fn test_parse_required_fields() {
        let params = PluginParams::from_json(&base().to_string()).unwrap();
        assert_eq!(params.duration, 24);
        assert_eq!(params.gif_output_prefix, None);
        assert_eq!(params.object_name(), "storm-2009-09-20.gif");
    }

    #[test]
    fn test_duration_as_string() {
        let mut value = base();
        value["duration"] = json!("72");
        let params = PluginParams::from_json(&value.to_string()).unwrap();
        assert_eq!(params.duration, 72);

        value["duration"] = json!("three days");
        let err = PluginParams::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, StormError::InvalidInput(_)));
    }

    #[test]
    fn test_missing_and_unknown_keys_rejected() {
        let mut missing = base();
        missing.as_object_mut().unwrap().remove("output_bucket");
        let err = PluginParams::from_json(&missing.to_string()).unwrap_err();
        assert!(matches!(err, StormError::InvalidInput(_)));

        let mut unknown = base();
        unknown["colormap"] = json!("viridis");
        let err = PluginParams::from_json(&unknown.to_string()).unwrap_err();
        assert!(matches!(err, StormError::InvalidInput(_)));
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut value = base();
        value["start_date"] = json!("09-20-2009");
        let err = PluginParams::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, StormError::InvalidInput(_)));
    }

    #[test]
    fn test_object_name_prefix() {
        let mut params = PluginParams::from_json(&base().to_string()).unwrap();

        params.gif_output_prefix = Some("kanawha/gifs/".to_string());
        assert_eq!(params.object_name(), "kanawha/gifs/storm-2009-09-20.gif");

        params.gif_output_prefix = Some("kanawha".to_string());
        assert_eq!(params.object_name(), "kanawha/storm-2009-09-20.gif");

        params.gif_output_prefix = Some(String::new());
        assert_eq!(params.object_name(), "storm-2009-09-20.gif");
    }
}
