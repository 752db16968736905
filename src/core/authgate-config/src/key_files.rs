//! On-disk mirror of the signing keypair.
//!
//! Some deployments want the keys as files next to the service (for a reverse
//! proxy or a sidecar that verifies tokens). The database stays the source of
//! truth; the files are written once, right after setup succeeds.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use authgate_crypto::KeyPair;

/// File name of the mirrored private key.
pub const PRIVATE_KEY_FILE: &str = "jwtRS256.key";

/// File name of the mirrored public key.
pub const PUBLIC_KEY_FILE: &str = "jwtRS256.key.pub";

const PRIVATE_KEY_MODE: u32 = 0o600;
const PUBLIC_KEY_MODE: u32 = 0o644;

/// Location of the mirrored key files.
#[derive(Debug, Clone)]
pub struct KeyFiles {
    dir: PathBuf,
}

impl KeyFiles {
    /// Mirrors keys into `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the private key file.
    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file.
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Writes both keys: private owner-only, public world-readable.
    pub fn write(&self, pair: &KeyPair) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        write_with_mode(
            &self.private_key_path(),
            pair.private_key_pem(),
            PRIVATE_KEY_MODE,
        )?;
        write_with_mode(
            &self.public_key_path(),
            pair.public_key_pem(),
            PUBLIC_KEY_MODE,
        )?;
        Ok(())
    }

    /// Reads the mirrored public key, if the file exists.
    pub fn read_public_key(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(self.public_key_path()) {
            Ok(pem) => Ok(Some(pem)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
fn write_with_mode(path: &Path, contents: &str, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    // `mode` only applies when the file is created.
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_with_mode(path: &Path, contents: &str, _mode: u32) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
