//! Where the artifact goes: `gs://bucket/prefix`, `file:///dir`, or a plain directory.

use super::gcs::GcsStore;
use super::store::{LocalStore, ObjectStore};
use crate::utils::error::PublishError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Parsed publish destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Gcs { bucket: String, prefix: String },
    Local { root: PathBuf },
}

impl Destination {
    /// Object key for an artifact file name
    pub fn key(&self, name: &str) -> String {
        match self {
            Destination::Gcs { prefix, .. } if !prefix.is_empty() => format!("{}/{}", prefix, name),
            _ => name.to_string(),
        }
    }

    /// Open the store behind this destination
    ///
    /// # Errors
    /// * `PublishError::Unauthorized` - GCS destination without an access token
    pub fn open(
        &self,
        gcs_endpoint: &str,
        access_token: Option<&str>,
    ) -> Result<Box<dyn ObjectStore>, PublishError> {
        match self {
            Destination::Gcs { bucket, .. } => {
                let token = access_token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| PublishError::Unauthorized("No access token provided".to_string()))?;
                Ok(Box::new(GcsStore::new(gcs_endpoint, bucket.clone(), token)?))
            }
            Destination::Local { root } => Ok(Box::new(LocalStore::new(root.clone()))),
        }
    }
}

impl FromStr for Destination {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            return Err(PublishError::InvalidDestination("Destination is empty".to_string()));
        }

        if let Some(rest) = s.strip_prefix("gs://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(PublishError::InvalidDestination(format!("Missing bucket name: {}", s)));
            }
            return Ok(Destination::Gcs {
                bucket: bucket.to_string(),
                prefix: prefix.trim_matches('/').to_string(),
            });
        }

        if let Some(path) = s.strip_prefix("file://") {
            if path.is_empty() {
                return Err(PublishError::InvalidDestination(format!("Missing path: {}", s)));
            }
            return Ok(Destination::Local { root: PathBuf::from(path) });
        }

        if let Some((scheme, _)) = s.split_once("://") {
            return Err(PublishError::InvalidDestination(format!(
                "Unsupported scheme {}://",
                scheme
            )));
        }

        Ok(Destination::Local { root: PathBuf::from(s) })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Gcs { bucket, prefix } if prefix.is_empty() => write!(f, "gs://{}", bucket),
            Destination::Gcs { bucket, prefix } => write!(f, "gs://{}/{}", bucket, prefix),
            Destination::Local { root } => write!(f, "{}", root.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gcs() {
        let dest: Destination = "gs://public-data/hwsurvey/".parse().unwrap();

        assert_eq!(
            dest,
            Destination::Gcs {
                bucket: "public-data".to_string(),
                prefix: "hwsurvey".to_string()
            }
        );
        assert_eq!(dest.key("latest.json"), "hwsurvey/latest.json");
    }

    #[test]
    fn test_parse_gcs_without_prefix() {
        let dest: Destination = "gs://public-data".parse().unwrap();
        assert_eq!(dest.key("latest.json"), "latest.json");
        assert_eq!(dest.to_string(), "gs://public-data");
    }

    #[test]
    fn test_parse_local() {
        let dest: Destination = "file:///tmp/out".parse().unwrap();
        assert_eq!(dest, Destination::Local { root: PathBuf::from("/tmp/out") });

        let dest: Destination = "out/reports".parse().unwrap();
        assert_eq!(dest, Destination::Local { root: PathBuf::from("out/reports") });
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<Destination>().is_err());
        assert!("gs://".parse::<Destination>().is_err());
        assert!("s3://bucket/path".parse::<Destination>().is_err());
    }

    #[test]
    fn test_open_gcs_requires_token() {
        let dest: Destination = "gs://bucket/prefix".parse().unwrap();
        assert!(matches!(
            dest.open("https://storage.googleapis.com", None),
            Err(PublishError::Unauthorized(_))
        ));
    }
}
