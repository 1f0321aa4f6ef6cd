//! Master key handling

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use tracing::info;
use zeroize::Zeroizing;

use super::error::CryptoError;

pub const KEY_LEN: usize = 32;

/// Argon2id cost: 19 MiB memory, 2 iterations, 1 lane
const KDF_MEMORY_KIB: u32 = 19_456;
const KDF_ITERATIONS: u32 = 2;
const KDF_PARALLELISM: u32 = 1;

/// 256-bit master key, wiped from memory on drop
#[derive(Clone)]
pub struct ProtectionKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl ProtectionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    /// Fresh random key from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(&mut *bytes);
        Self { bytes }
    }

    /// Derive a key from a password with Argon2id
    pub fn from_password(password: &str, salt: &[u8]) -> Result<Self, CryptoError> {
        let params = Params::new(
            KDF_MEMORY_KIB,
            KDF_ITERATIONS,
            KDF_PARALLELISM,
            Some(KEY_LEN),
        )
        .map_err(|_| CryptoError::KeyDerivation)?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut *bytes)
            .map_err(|_| CryptoError::KeyDerivation)?;

        Ok(Self { bytes })
    }

    /// Read the key file at `path`, creating it with a random key if missing
    pub fn load_or_create(path: &Path) -> Result<Self, CryptoError> {
        if path.exists() {
            let encoded = Zeroizing::new(std::fs::read_to_string(path)?);
            let decoded = Zeroizing::new(
                BASE64
                    .decode(encoded.trim())
                    .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
            );
            let bytes: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
                CryptoError::InvalidKey(format!(
                    "expected {} bytes, found {}",
                    KEY_LEN,
                    decoded.len()
                ))
            })?;
            return Ok(Self::from_bytes(bytes));
        }

        let key = Self::generate();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = Zeroizing::new(BASE64.encode(key.as_bytes()));
        let mut file = create_private(path)?;
        file.write_all(encoded.as_bytes())?;
        file.sync_all()?;

        info!("Created new protection key at {:?}", path);
        Ok(key)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for ProtectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProtectionKey(..)")
    }
}

/// New file readable only by the owner, failing if it already exists
fn create_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_derivation_is_deterministic() {
        let a = ProtectionKey::from_password("hunter2", b"ferrykit-salt-01").unwrap();
        let b = ProtectionKey::from_password("hunter2", b"ferrykit-salt-01").unwrap();
        let c = ProtectionKey::from_password("hunter3", b"ferrykit-salt-01").unwrap();

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_short_salt_rejected() {
        assert!(matches!(
            ProtectionKey::from_password("pw", b"abc"),
            Err(CryptoError::KeyDerivation)
        ));
    }

    #[test]
    fn test_load_or_create_persists() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("keys").join("protection.key");

        let created = ProtectionKey::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = ProtectionKey::load_or_create(&path).unwrap();
        assert_eq!(created.as_bytes(), loaded.as_bytes());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_never_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("protection.key");

        let file = create_private(&path).unwrap();
        let mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);

        // an existing file is never truncated or reused
        assert_eq!(
            create_private(&path).unwrap_err().kind(),
            std::io::ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn test_bad_key_file_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("protection.key");
        std::fs::write(&path, BASE64.encode([1u8; 16])).unwrap();

        assert!(matches!(
            ProtectionKey::load_or_create(&path),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let key = ProtectionKey::generate();
        assert_eq!(format!("{:?}", key), "ProtectionKey(..)");
    }
}
