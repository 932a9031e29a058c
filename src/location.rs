//! Object locators: the `(bucket, key)` pair that names a stored object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stored object, identified by bucket and key.
///
/// Serialises with the field names used in job metadata files
/// (`S3Bucket` / `S3ObjectName`), so records written by other producers of
/// the same layout deserialise unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocator {
    #[serde(rename = "S3Bucket")]
    pub bucket: String,
    #[serde(rename = "S3ObjectName")]
    pub key: String,
}

impl ObjectLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The text after the last `.` of the key, or the whole key when it has no `.`.
    pub fn extension(&self) -> &str {
        self.key.rsplit('.').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectLocator {
    type Err = String;

    /// Parse `s3://bucket/key` or `bucket/key`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("s3://").unwrap_or(s);
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(ObjectLocator::new(bucket, key))
            }
            _ => Err(format!("expected s3://bucket/key, got '{s}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_with_s3_field_names() {
        let loc = ObjectLocator::new("tt-bucket", "input/doc.pdf");
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"S3Bucket": "tt-bucket", "S3ObjectName": "input/doc.pdf"})
        );
    }

    #[test]
    fn extension_is_last_dot_suffix() {
        assert_eq!(ObjectLocator::new("b", "scans/page.tar.png").extension(), "png");
        assert_eq!(ObjectLocator::new("b", "scans/noext").extension(), "scans/noext");
    }

    #[test]
    fn parse_and_display() {
        let loc: ObjectLocator = "s3://bucket/a/b.jpg".parse().unwrap();
        assert_eq!(loc, ObjectLocator::new("bucket", "a/b.jpg"));
        assert_eq!(loc.to_string(), "s3://bucket/a/b.jpg");

        let bare: ObjectLocator = "bucket/x.pdf".parse().unwrap();
        assert_eq!(bare.key, "x.pdf");

        assert!("s3://bucket".parse::<ObjectLocator>().is_err());
        assert!("s3:///key".parse::<ObjectLocator>().is_err());
    }
}
