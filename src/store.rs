//! token.json persistence.

use std::io::Write;
use std::path::Path;

use crate::credential::Credential;
use crate::error::{AuthError, Result};

/// Load a cached credential. Missing, unreadable or undecodable files all
/// count as "no credential".
pub fn load(path: &Path) -> Option<Credential> {
    if !path.exists() {
        return None;
    }
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot read token file: {}", e);
            return None;
        }
    };
    match Credential::from_json(&data) {
        Ok(cred) => Some(cred),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable token file: {}", e);
            None
        }
    }
}

/// Write the credential atomically: temp file in the same directory, then
/// rename over the target.
pub fn save(path: &Path, credential: &Credential) -> Result<()> {
    let json = credential.to_json()?;
    write_atomic(path, json.as_bytes()).map_err(|source| AuthError::Persist {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
