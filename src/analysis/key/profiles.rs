//! Key profile registry
//!
//! Profiles are 12-value pitch-class weight curves (index 0 = tonic), one per
//! mode. Some families carry a third `other` curve for modal material that
//! is reported as minor.
//!
//! The built-in families are compiled in from `data/key_profiles.json`; an
//! alternative registry in the same format can be loaded at startup.

use crate::error::{EdmkeyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_PROFILES: &str = include_str!("../../../data/key_profiles.json");

/// Number of values in a profile curve
pub const CURVE_LENGTH: usize = 12;

/// One named template family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyProfile {
    #[serde(skip)]
    pub name: String,
    pub major: Vec<f32>,
    pub minor: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<Vec<f32>>,
}

impl KeyProfile {
    fn validate(&self) -> std::result::Result<(), String> {
        let curves = [Some(&self.major), Some(&self.minor), self.other.as_ref()];
        for (label, curve) in ["major", "minor", "other"].iter().zip(curves) {
            let Some(curve) = curve else { continue };
            if curve.len() != CURVE_LENGTH {
                return Err(format!(
                    "profile '{}': {} curve has {} values, expected {}",
                    self.name,
                    label,
                    curve.len(),
                    CURVE_LENGTH
                ));
            }
            if curve.iter().any(|v| !v.is_finite()) {
                return Err(format!(
                    "profile '{}': {} curve has non-finite values",
                    self.name, label
                ));
            }
        }
        Ok(())
    }
}

/// Read-only table of key profile families, keyed by name
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, KeyProfile>,
}

impl ProfileRegistry {
    /// The families shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_PROFILES)
    }

    /// Load a registry file (same format as the built-in table)
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EdmkeyError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|e| match e {
            EdmkeyError::ConfigError(reason) => {
                EdmkeyError::ConfigError(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut profiles: BTreeMap<String, KeyProfile> = serde_json::from_str(json)
            .map_err(|e| EdmkeyError::ConfigError(format!("invalid key profile table: {}", e)))?;

        for (name, profile) in profiles.iter_mut() {
            profile.name = name.clone();
            profile.validate().map_err(EdmkeyError::ConfigError)?;
        }
        if profiles.is_empty() {
            return Err(EdmkeyError::ConfigError(
                "key profile table is empty".to_string(),
            ));
        }

        Ok(Self { profiles })
    }

    /// Look up a family by name
    pub fn get(&self, name: &str) -> Result<&KeyProfile> {
        self.profiles
            .get(name)
            .ok_or_else(|| EdmkeyError::UnknownProfile {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Family names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_families() {
        let registry = ProfileRegistry::builtin().unwrap();
        assert_eq!(
            registry.names(),
            vec!["bmtg1", "bmtg2", "bmtg3", "edma", "edmm", "shaath", "temperley"]
        );

        let edma = registry.get("edma").unwrap();
        assert_eq!(edma.name, "edma");
        assert!(edma.other.is_none());
        assert!(registry.get("bmtg2").unwrap().other.is_some());
    }

    #[test]
    fn test_unknown_profile_lists_available() {
        let registry = ProfileRegistry::builtin().unwrap();
        match registry.get("krumhansl") {
            Err(EdmkeyError::UnknownProfile { name, available }) => {
                assert_eq!(name, "krumhansl");
                assert!(available.contains("temperley"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_curve_length_rejected() {
        let json = r#"{"short": {"major": [1, 2, 3], "minor": [1,1,1,1,1,1,1,1,1,1,1,1]}}"#;
        assert!(matches!(
            ProfileRegistry::from_json_str(json),
            Err(EdmkeyError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"flat": {{"major": [1,0,1,0,1,1,0,1,0,1,0,1], "minor": [1,0,1,1,0,1,0,1,1,0,1,0]}}}}"#
        )
        .unwrap();

        let registry = ProfileRegistry::from_path(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("flat").unwrap().major[2], 1.0);
    }

    #[test]
    fn test_missing_file() {
        let result = ProfileRegistry::from_path(Path::new("/nonexistent/profiles.json"));
        assert!(matches!(result, Err(EdmkeyError::FileNotFound(_))));
    }
}
