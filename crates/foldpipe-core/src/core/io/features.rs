use crate::core::models::features::FeatureBundle;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name of the serialized feature bundle inside a target directory.
pub const FEATURES_FILE: &str = "features.json";
/// Optional preprocessing metadata, consumed for logging only.
pub const PREPROCESSING_METADATA_FILE: &str = "preprocessing_metadata.json";

#[derive(Debug, Error)]
pub enum FeatureStoreError {
    #[error("feature bundle not found at '{path}'", path = path.display())]
    NotFound { path: PathBuf },

    #[error("failed to decode feature bundle '{path}': {source}", path = path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read feature bundle '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Loads serialized feature bundles from the per-target directory tree.
///
/// Targets are directories under the root; each holds a [`FEATURES_FILE`]
/// produced by the preprocessing stage.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    root: PathBuf,
}

impl FeatureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn features_path(&self, target: &str) -> PathBuf {
        self.root.join(target).join(FEATURES_FILE)
    }

    /// Loads the feature bundle for one target.
    ///
    /// Distinguishes an absent bundle from an unreadable or undecodable one
    /// so the caller can classify the failure.
    pub fn load(&self, target: &str) -> Result<FeatureBundle, FeatureStoreError> {
        let path = self.features_path(target);
        if !path.exists() {
            return Err(FeatureStoreError::NotFound { path });
        }
        let contents = fs::read_to_string(&path).map_err(|source| FeatureStoreError::Io {
            path: path.clone(),
            source,
        })?;
        let bundle = serde_json::from_str(&contents)
            .map_err(|source| FeatureStoreError::Decode { path, source })?;
        Ok(bundle)
    }

    /// Loads the optional preprocessing metadata for logging. Absence or a
    /// decode failure is not an error here.
    pub fn load_metadata(&self, target: &str) -> Option<serde_json::Value> {
        let path = self.root.join(target).join(PREPROCESSING_METADATA_FILE);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring undecodable preprocessing metadata.");
                None
            }
        }
    }

    /// Lists targets that have a feature bundle, sorted by name.
    pub fn discover_targets(&self) -> io::Result<Vec<String>> {
        let mut targets = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if entry.path().join(FEATURES_FILE).exists() {
                if let Ok(name) = entry.file_name().into_string() {
                    targets.push(name);
                }
            }
        }
        targets.sort();
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::features::FeatureValue;
    use std::fs::File;
    use std::io::Write;

    fn write_features(dir: &Path, target: &str, contents: &str) {
        let target_dir = dir.join(target);
        fs::create_dir_all(&target_dir).unwrap();
        let mut f = File::create(target_dir.join(FEATURES_FILE)).unwrap();
        write!(f, "{}", contents).unwrap();
    }

    #[test]
    fn load_returns_the_decoded_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        write_features(tmp.path(), "t1", r#"{"sequence": "GAV"}"#);

        let store = FeatureStore::new(tmp.path());
        let bundle = store.load("t1").unwrap();
        assert_eq!(
            bundle.get("sequence"),
            Some(&FeatureValue::Text("GAV".into()))
        );
    }

    #[test]
    fn missing_bundle_is_distinguished_from_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        write_features(tmp.path(), "bad", "{not json");

        let store = FeatureStore::new(tmp.path());
        assert!(matches!(
            store.load("absent"),
            Err(FeatureStoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.load("bad"),
            Err(FeatureStoreError::Decode { .. })
        ));
    }

    #[test]
    fn discover_targets_lists_only_directories_with_bundles() {
        let tmp = tempfile::tempdir().unwrap();
        write_features(tmp.path(), "beta", "{}");
        write_features(tmp.path(), "alpha", "{}");
        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        File::create(tmp.path().join("stray.json")).unwrap();

        let store = FeatureStore::new(tmp.path());
        assert_eq!(store.discover_targets().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn metadata_is_best_effort() {
        let tmp = tempfile::tempdir().unwrap();
        write_features(tmp.path(), "t1", "{}");
        let store = FeatureStore::new(tmp.path());
        assert!(store.load_metadata("t1").is_none());

        let mut f =
            File::create(tmp.path().join("t1").join(PREPROCESSING_METADATA_FILE)).unwrap();
        write!(f, r#"{{"msa_depth": 128}}"#).unwrap();
        let value = store.load_metadata("t1").unwrap();
        assert_eq!(value["msa_depth"], 128);
    }
}
