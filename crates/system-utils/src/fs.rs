use std::io;
use std::path::{Path, PathBuf};

/// Hidden sibling of `target` with the same extension, unique per call.
///
/// Keeping the extension matters for writers that pick an encoder from it.
pub fn staging_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "staged".to_string());
    let id = uuid::Uuid::new_v4().simple().to_string();
    let name = match target.extension() {
        Some(ext) => format!(".{stem}.{id}.{}", ext.to_string_lossy()),
        None => format!(".{stem}.{id}"),
    };
    match target.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Lets `write` produce the file at a staging path, then renames it over `target`.
/// Readers of `target` see either the old file or the complete new one.
pub fn write_atomic_with<F, E>(target: &Path, write: F) -> Result<(), E>
where
    F: FnOnce(&Path) -> Result<(), E>,
    E: From<io::Error>,
{
    let staging = staging_path(target);
    if let Err(err) = write(&staging) {
        let _ = std::fs::remove_file(&staging);
        return Err(err);
    }
    if let Err(err) = std::fs::rename(&staging, target) {
        let _ = std::fs::remove_file(&staging);
        return Err(err.into());
    }
    Ok(())
}

pub fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    write_atomic_with(target, |staging| std::fs::write(staging, contents))
}

/// Copies `source` over `target` through a staging file.
pub fn publish_copy(source: &Path, target: &Path) -> io::Result<()> {
    write_atomic_with(target, |staging| std::fs::copy(source, staging).map(|_| ()))
}
