//! On-disk bundle format and atomic save/load.
//!
//! File layout:
//!
//! ```text
//! whcap-bundle <version> <payload-bytes> <sha256-hex>\n
//! <JSON payload>
//! ```
//!
//! `save` writes to a uniquely named temp file next to the destination,
//! fsyncs it, renames it into place and fsyncs the directory, so readers see
//! either the previous bundle or the new one. `load` checks the header, length and checksum before parsing and
//! validates the parsed bundle as a whole; it never returns a partial bundle.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::artifact::bundle::{ArtifactBundle, FORMAT_VERSION};
use crate::error::{PipelineError, PipelineResult};

const MAGIC: &str = "whcap-bundle";

pub fn save(bundle: &ArtifactBundle, path: &Path) -> PipelineResult<()> {
    let (staged, bytes) = stage(bundle, path)?;
    staged
        .persist(path)
        .map_err(|e| PipelineError::io(format!("renaming bundle into {}", path.display()), e.error))?;
    sync_parent(path)?;

    tracing::info!(
        path = %path.display(),
        bytes,
        features = bundle.schema_fingerprint.len(),
        "bundle saved"
    );
    Ok(())
}

/// Writes the encoded bundle to a fresh, fsynced temp file next to `path`.
///
/// The temp name is unique per call, so concurrent saves never share one. It
/// is deleted when dropped unless `persist` renames it first.
fn stage(bundle: &ArtifactBundle, path: &Path) -> PipelineResult<(NamedTempFile, usize)> {
    let payload = serde_json::to_vec(bundle)
        .map_err(|e| PipelineError::internal(format!("Failed to serialize bundle: {e}")))?;
    let header = format!(
        "{MAGIC} {} {} {}\n",
        bundle.format_version,
        payload.len(),
        sha256_hex(&payload)
    );

    let dir = parent_dir(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    let ctx = || format!("writing temp file for {}", path.display());
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| PipelineError::io(ctx(), e))?;

    let file = tmp.as_file_mut();
    file.write_all(header.as_bytes()).map_err(|e| PipelineError::io(ctx(), e))?;
    file.write_all(&payload).map_err(|e| PipelineError::io(ctx(), e))?;
    file.sync_all().map_err(|e| PipelineError::io(ctx(), e))?;
    Ok((tmp, header.len() + payload.len()))
}

/// Sibling directory of `path`, so the final rename never crosses filesystems.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Makes the rename itself durable.
#[cfg(unix)]
fn sync_parent(path: &Path) -> PipelineResult<()> {
    let dir = parent_dir(path);
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| PipelineError::io(format!("syncing directory {}", dir.display()), e))
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> PipelineResult<()> {
    Ok(())
}

pub fn load(path: &Path) -> PipelineResult<ArtifactBundle> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PipelineError::ArtifactNotFound(path.display().to_string()));
        }
        Err(e) => return Err(PipelineError::io(format!("reading {}", path.display()), e)),
    };

    let bundle = decode(&bytes).map_err(|msg| PipelineError::corrupt(format!("{}: {msg}", path.display())))?;

    tracing::info!(
        path = %path.display(),
        model = bundle.model.kind().display_name(),
        features = bundle.schema_fingerprint.len(),
        created_at = %bundle.created_at,
        "bundle loaded"
    );
    Ok(bundle)
}

fn decode(bytes: &[u8]) -> Result<ArtifactBundle, String> {
    let newline = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or("missing header line")?;
    let header = std::str::from_utf8(&bytes[..newline]).map_err(|_| "header is not UTF-8")?;
    let payload = &bytes[newline + 1..];

    let fields: Vec<&str> = header.split(' ').collect();
    let [magic, version, length, checksum] = fields.as_slice() else {
        return Err(format!("malformed header `{header}`"));
    };
    if *magic != MAGIC {
        return Err(format!("unknown format `{magic}`"));
    }
    let version: u32 = version.parse().map_err(|_| format!("bad version `{version}`"))?;
    if version != FORMAT_VERSION {
        return Err(format!("unsupported format version {version} (expected {FORMAT_VERSION})"));
    }
    let length: usize = length.parse().map_err(|_| format!("bad payload length `{length}`"))?;
    if payload.len() != length {
        return Err(format!("payload is {} bytes, header says {length}", payload.len()));
    }
    if sha256_hex(payload) != *checksum {
        return Err("checksum mismatch".into());
    }

    let bundle: ArtifactBundle =
        serde_json::from_slice(payload).map_err(|e| format!("undeserializable payload: {e}"))?;
    if bundle.format_version != version {
        return Err(format!(
            "payload version {} disagrees with header version {version}",
            bundle.format_version
        ));
    }
    bundle.check_consistency()?;
    Ok(bundle)
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn round_trip_preserves_the_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        let bundle = testutil::bundle();

        save(&bundle, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn save_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        let bundle = testutil::bundle();

        save(&bundle, &path).unwrap();
        save(&bundle, &path).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn interrupted_save_keeps_the_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        let first = testutil::bundle();
        save(&first, &path).unwrap();

        let mut second = first.clone();
        second.metrics.mape += 1.0;
        let (staged, _) = stage(&second, &path).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        assert_eq!(load(&path).unwrap(), first);

        // Dropped before the rename, as when the process dies mid-save.
        drop(staged);
        assert_eq!(load(&path).unwrap(), first);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("model.whcap")]);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        let err = save(&testutil::bundle(), &path).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }), "{err}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn concurrent_saves_use_distinct_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        let bundle = testutil::bundle();

        let (a, _) = stage(&bundle, &path).unwrap();
        let (b, _) = stage(&bundle, &path).unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().parent(), Some(dir.path()));
        drop((a, b));

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| save(&bundle, &path).unwrap());
            }
        });
        assert_eq!(load(&path).unwrap(), bundle);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.whcap")).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactNotFound(_)));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        save(&testutil::bundle(), &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(load(&path), Err(PipelineError::ArtifactCorrupt(_))));

        fs::write(&path, b"").unwrap();
        assert!(matches!(load(&path), Err(PipelineError::ArtifactCorrupt(_))));
    }

    #[test]
    fn tampered_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        save(&testutil::bundle(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let tampered = text.replacen("zone=E", "zone=X", 1);
        assert_ne!(text, tampered);
        fs::write(&path, tampered).unwrap();
        assert!(matches!(load(&path), Err(PipelineError::ArtifactCorrupt(_))));
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        save(&testutil::bundle(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let bumped = text.replacen(&format!("{MAGIC} {FORMAT_VERSION} "), &format!("{MAGIC} 99 "), 1);
        fs::write(&path, bumped).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported format version 99"), "{err}");
    }

    #[test]
    fn consistent_checksum_with_inconsistent_content_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.whcap");
        let mut bundle = testutil::bundle();
        bundle.schema_fingerprint.reverse();
        // Bypasses `ArtifactBundle::new`, which would refuse this bundle.
        save(&bundle, &path).unwrap();
        assert!(matches!(load(&path), Err(PipelineError::ArtifactCorrupt(_))));
    }
}
