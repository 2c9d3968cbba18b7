//! Uploaded images.
//!
//! The upload directory is the source of truth: listing always re-reads it.
//! A small metadata index (original name, content type, upload time) is kept
//! beside it and merged into [`ImageStore::details`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{PocketError, PocketResult};
use crate::persistence::{Persistence, load_or_empty, write_atomic};

/// Upload directory, relative to the static root.
pub const UPLOAD_SUBDIR: &str = "picture/upload";

/// URL prefix uploaded files are served under.
pub const PUBLIC_PREFIX: &str = "/picture/upload";

/// Public URL path of a stored image.
pub fn public_path(filename: &str) -> String {
    format!("{PUBLIC_PREFIX}/{filename}")
}

/// Index entry written when an image is uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub filename: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// A file in the upload directory, with index metadata when there is any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDetails {
    pub filename: String,
    pub path: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

pub struct ImageStore {
    dir: PathBuf,
    index: Vec<ImageMeta>,
    persistence: Box<dyn Persistence<ImageMeta>>,
}

impl ImageStore {
    /// Open the store, creating the upload directory if needed.
    ///
    /// Index entries whose file has gone missing are dropped.
    pub fn open(
        dir: impl Into<PathBuf>,
        persistence: impl Persistence<ImageMeta> + 'static,
    ) -> PocketResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let index = load_or_empty::<ImageMeta>(&persistence).items;

        let mut store = ImageStore {
            dir,
            index,
            persistence: Box::new(persistence),
        };
        store.prune_index();
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` under a `<unix-millis><ext>` name and record it in the index.
    pub fn upload(
        &mut self,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> PocketResult<ImageMeta> {
        let now = Utc::now();
        let filename = self.unused_name(now.timestamp_millis(), &extension_of(original_name));

        write_atomic(&self.dir.join(&filename), bytes)?;

        let meta = ImageMeta {
            filename,
            original_name: original_name.to_string(),
            content_type: content_type.map(str::to_string),
            size: bytes.len() as u64,
            uploaded_at: now,
        };

        info!(filename = %meta.filename, size = meta.size, "Stored upload");

        self.index.push(meta.clone());
        self.save_index();
        Ok(meta)
    }

    /// Public paths of every stored image, sorted by filename.
    pub fn list(&self) -> PocketResult<Vec<String>> {
        Ok(self
            .filenames()?
            .iter()
            .map(|name| public_path(name))
            .collect())
    }

    pub fn details(&self) -> PocketResult<Vec<ImageDetails>> {
        self.filenames()?
            .into_iter()
            .map(|filename| {
                let size = std::fs::metadata(self.dir.join(&filename))?.len();
                let meta = self.index.iter().find(|m| m.filename == filename);

                Ok(ImageDetails {
                    path: public_path(&filename),
                    size,
                    original_name: meta.map(|m| m.original_name.clone()),
                    content_type: meta.and_then(|m| m.content_type.clone()),
                    uploaded_at: meta
                        .map(|m| m.uploaded_at)
                        .or_else(|| uploaded_at_from_name(&filename)),
                    filename,
                })
            })
            .collect()
    }

    /// Remove a stored image. A missing file is `NotFound`, other failures are IO errors.
    pub fn delete(&mut self, filename: &str) -> PocketResult<()> {
        validate_filename(filename)?;

        match std::fs::remove_file(self.dir.join(filename)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PocketError::NotFound(format!("Image not found: {filename}")));
            }
            Err(e) => return Err(e.into()),
        }

        let before = self.index.len();
        self.index.retain(|m| m.filename != filename);
        if self.index.len() != before {
            self.save_index();
        }

        info!(filename, "Deleted image");
        Ok(())
    }

    fn filenames(&self) -> PocketResult<Vec<String>> {
        let mut names = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // Skip in-flight uploads and anything else hidden
            let name = entry.file_name();
            if let Some(name) = name.to_str().filter(|n| !n.starts_with('.')) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn unused_name(&self, mut millis: i64, ext: &str) -> String {
        loop {
            let name = format!("{millis}{ext}");
            if !self.dir.join(&name).exists() {
                return name;
            }
            millis += 1;
        }
    }

    fn prune_index(&mut self) {
        let dir = &self.dir;
        let before = self.index.len();
        self.index.retain(|meta| dir.join(&meta.filename).is_file());

        let pruned = before - self.index.len();
        if pruned > 0 {
            info!(pruned, "Dropped index entries for images that no longer exist");
            self.save_index();
        }
    }

    fn save_index(&self) {
        if let Err(e) = self.persistence.save(&self.index, None) {
            error!(
                location = %self.persistence.location(),
                error = %e,
                "Could not write image index"
            );
        }
    }
}

/// Extension of an uploaded file's name, with the leading dot.
///
/// Kept as given, unless it holds a backslash or a control character: the
/// stored name must stay one that [`validate_filename`] accepts.
fn extension_of(original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let usable = !ext.is_empty() && !ext.contains('\\') && !ext.chars().any(char::is_control);
    if usable { format!(".{ext}") } else { String::new() }
}

/// Names come straight from the URL, so reject anything that could leave the upload directory.
fn validate_filename(filename: &str) -> PocketResult<()> {
    let bad = filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0']);

    if bad {
        return Err(PocketError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Generated names start with the upload time in milliseconds.
fn uploaded_at_from_name(filename: &str) -> Option<DateTime<Utc>> {
    let digits: String = filename.chars().take_while(|c| c.is_ascii_digit()).collect();
    let millis = digits.parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{JsonFile, MemoryPersistence, write_atomic};

    // Drop a file into the upload directory without going through the index
    fn write_image(dir: &Path, filename: &str, bytes: &[u8]) -> PocketResult<()> {
        write_atomic(&dir.join(filename), bytes)
    }

    fn open(dir: &Path) -> ImageStore {
        ImageStore::open(dir.join("upload"), JsonFile::new(dir.join("images.json"))).unwrap()
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("cat.png"), ".png");
        assert_eq!(extension_of("archive.tar.GZ"), ".GZ");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("photo.jpg-large"), ".jpg-large");
        assert_eq!(extension_of("backup.tar_gz"), ".tar_gz");
        assert_eq!(extension_of("фото.јпг"), ".јпг");
        assert_eq!(extension_of("weird.p n g"), ".p n g");
        assert_eq!(extension_of("dir/cat.webp"), ".webp");
        assert_eq!(extension_of("cat.a\\b"), "");
        assert_eq!(extension_of("cat.a\tb"), "");
    }

    #[test]
    fn test_unusual_extensions_stay_deletable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let meta = store.upload("screenshot.jpg-large", None, b"x").unwrap();
        assert!(meta.filename.ends_with(".jpg-large"), "{}", meta.filename);

        store.delete(&meta.filename).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_upload_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let meta = store.upload("cat.png", None, b"x").unwrap();

        let names: Vec<String> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![meta.filename]);
    }

    #[test]
    fn test_upload_generates_timestamp_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let meta = store.upload("cat.png", Some("image/png"), b"png bytes").unwrap();

        let stem = meta.filename.strip_suffix(".png").unwrap();
        assert!(stem.chars().all(|c| c.is_ascii_digit()), "{}", meta.filename);
        assert_eq!(meta.size, 9);
        assert_eq!(
            std::fs::read(store.dir().join(&meta.filename)).unwrap(),
            b"png bytes"
        );
        assert_eq!(store.list().unwrap(), vec![public_path(&meta.filename)]);
    }

    #[test]
    fn test_uploads_in_same_millisecond_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let first = store.upload("a.jpg", None, b"1").unwrap();
        let second = store.upload("b.jpg", None, b"2").unwrap();

        assert_ne!(first.filename, second.filename);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_list_is_sorted_and_skips_hidden_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        write_image(store.dir(), "200.png", b"b").unwrap();
        write_image(store.dir(), "100.png", b"a").unwrap();
        std::fs::write(store.dir().join(".100.png.tmp"), b"partial").unwrap();
        std::fs::create_dir(store.dir().join("thumbs")).unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec!["/picture/upload/100.png", "/picture/upload/200.png"]
        );
    }

    #[test]
    fn test_list_fails_when_directory_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        std::fs::remove_dir(store.dir()).unwrap();

        assert!(matches!(store.list(), Err(PocketError::Io(_))));
    }

    #[test]
    fn test_delete_removes_file_and_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let meta = store.upload("cat.png", Some("image/png"), b"x").unwrap();

        store.delete(&meta.filename).unwrap();

        assert!(store.list().unwrap().is_empty());
        let reopened = open(dir.path());
        assert!(reopened.index.is_empty());
    }

    #[test]
    fn test_delete_distinguishes_missing_and_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        assert!(matches!(
            store.delete("123.png"),
            Err(PocketError::NotFound(_))
        ));
        for name in ["../images.json", "..", "", "a/b.png", ".hidden"] {
            assert!(
                matches!(store.delete(name), Err(PocketError::InvalidFilename(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_details_merge_index_and_untracked_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let meta = store.upload("holiday.jpg", Some("image/jpeg"), b"jpeg").unwrap();
        write_image(store.dir(), "manual.gif", b"gif!!").unwrap();

        let details = store.details().unwrap();

        let uploaded = details.iter().find(|d| d.filename == meta.filename).unwrap();
        assert_eq!(uploaded.original_name.as_deref(), Some("holiday.jpg"));
        assert_eq!(uploaded.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(uploaded.uploaded_at, Some(meta.uploaded_at));

        let manual = details.iter().find(|d| d.filename == "manual.gif").unwrap();
        assert_eq!(manual.size, 5);
        assert_eq!(manual.original_name, None);
        assert_eq!(manual.uploaded_at, None);
    }

    #[test]
    fn test_index_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let meta = open(dir.path()).upload("cat.png", None, b"x").unwrap();

        let reopened = open(dir.path());

        assert_eq!(reopened.index, vec![meta]);
    }

    #[test]
    fn test_reopen_drops_entries_for_files_removed_outside_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let kept = store.upload("a.png", None, b"a").unwrap();
        let gone = store.upload("b.png", None, b"b").unwrap();
        std::fs::remove_file(store.dir().join(&gone.filename)).unwrap();

        let reopened = open(dir.path());
        assert_eq!(reopened.index, vec![kept.clone()]);

        let saved = JsonFile::<ImageMeta>::new(dir.path().join("images.json"))
            .load()
            .unwrap();
        assert_eq!(saved.items, vec![kept]);
    }

    #[test]
    fn test_failed_index_save_still_stores_file() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = MemoryPersistence::<ImageMeta>::new();
        persistence.set_fail_saves(true);
        let mut store = ImageStore::open(dir.path().join("upload"), persistence.clone()).unwrap();

        let meta = store.upload("cat.png", None, b"x").unwrap();

        assert_eq!(store.list().unwrap(), vec![public_path(&meta.filename)]);
        assert!(persistence.snapshot().items.is_empty());
    }
}
