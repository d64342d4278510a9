use sha2::{Digest, Sha256};

use crate::capability::PluginCapabilities;
use crate::error::PluginError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Declared identity, capabilities and integrity proof for a plugin.
#[derive(Debug, Clone)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: PluginVersion,
    /// The host API version this plugin was built against.
    pub api_version: u32,
    /// SHA-256 of the plugin's code, hex-encoded, checked at load time.
    pub checksum: String,
    pub required_permissions: PluginCapabilities,
}

impl PluginManifest {
    /// Computes the hex SHA-256 digest of `bytes`, for comparison against
    /// [`PluginManifest::checksum`].
    pub fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Verifies that `bytes` hashes to this manifest's declared checksum.
    pub fn verify(&self, bytes: &[u8]) -> Result<(), PluginError> {
        let actual = Self::digest(bytes);
        if actual != self.checksum {
            return Err(PluginError::ChecksumMismatch {
                plugin: self.id.clone(),
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Verifies the host's API version is one this plugin declares support for.
    pub fn verify_api_version(&self, host_api_version: u32) -> Result<(), PluginError> {
        if self.api_version != host_api_version {
            return Err(PluginError::ApiVersionMismatch {
                plugin: self.id.clone(),
                plugin_api_version: self.api_version,
                host_api_version,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(checksum: &str) -> PluginManifest {
        PluginManifest {
            id: "analytics".into(),
            name: "Analytics".into(),
            version: PluginVersion { major: 1, minor: 0, patch: 0 },
            api_version: 1,
            checksum: checksum.to_string(),
            required_permissions: PluginCapabilities::EVENT_LISTENER,
        }
    }

    #[test]
    fn verify_accepts_matching_digest() {
        let bytes = b"plugin-code";
        let digest = PluginManifest::digest(bytes);
        assert!(manifest(&digest).verify(bytes).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_bytes() {
        let bytes = b"plugin-code";
        let digest = PluginManifest::digest(bytes);
        let result = manifest(&digest).verify(b"tampered-code");
        assert!(matches!(result, Err(PluginError::ChecksumMismatch { .. })));
    }

    #[test]
    fn api_version_mismatch_is_rejected() {
        let result = manifest("anything").verify_api_version(2);
        assert!(matches!(result, Err(PluginError::ApiVersionMismatch { .. })));
    }
}
