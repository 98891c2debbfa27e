//! Remote location parsing.
//!
//! Inputs arrive either as `s3://bucket/key` URIs or in the GDAL virtual
//! file system form `/vsis3/bucket/key`. Anything else is a local path.

use std::fmt;

use storm_common::{StormError, StormResult};

const S3_SCHEME: &str = "s3://";
const VSIS3_PREFIX: &str = "/vsis3/";

/// A bucket and key inside object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    /// Key within the bucket, without a leading slash. May be empty or end
    /// with `/` when the location is a prefix.
    pub key: String,
}

impl ObjectLocation {
    /// Parse a remote location; `Ok(None)` for local paths.
    pub fn parse(location: &str) -> StormResult<Option<Self>> {
        let rest = if let Some(rest) = location.strip_prefix(S3_SCHEME) {
            rest
        } else if let Some(rest) = location.strip_prefix(VSIS3_PREFIX) {
            rest
        } else {
            return Ok(None);
        };

        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key.trim_start_matches('/')),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return Err(StormError::InvalidInput(format!(
                "location '{}' has no bucket",
                location
            )));
        }

        Ok(Some(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }))
    }

    /// Last path segment of the key, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.key.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", S3_SCHEME, self.bucket, self.key)
    }
}
