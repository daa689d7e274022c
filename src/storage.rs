//! Report persistence: naming conventions, the local report store, and the
//! precondition protocol for remote uploads.
//!
//! ## Two storage shapes
//!
//! - **Stored records** are full round-trip JSON: every field of the
//!   [`SiteRecord`], attachment payloads included (as base64 via the codec on
//!   [`Attachment`](crate::types::Attachment)). These live in a flat reports
//!   directory, one file per save, named
//!   `<project>_<site>_<timestamp>.json`.
//! - **Bundles** (see [`crate::bundle`]) are archival and live at a
//!   deterministic path derived from project and site name:
//!   `<base_folder>/<slug(project)>/<slug(site)>.json`.
//!
//! ## Lost-update protection
//!
//! Writing a bundle to a shared destination is two round-trips: read the
//! current version token, then write with that token as a precondition. A
//! concurrent writer between the two surfaces as [`StorageError::Conflict`]
//! carrying the token found on disk — never a silent overwrite. Locally the
//! token is the SHA-256 of the existing file bytes; a remote collaborator
//! (e.g. a Git content API) substitutes its own blob identifier, but the
//! protocol shape is identical.

use crate::photos::content_hash;
use crate::types::SiteRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fallback slug components when a name is blank.
const PROJECT_FALLBACK: &str = "project";
const SITE_FALLBACK: &str = "site";

/// Default base folder for derived bundle paths.
pub const DEFAULT_BASE_FOLDER: &str = "reports";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("destination {path} changed since it was read (version token {existing_token})")]
    Conflict {
        path: PathBuf,
        existing_token: String,
    },
    #[error("repository identifier '{0}' must look like 'owner/repo'")]
    MalformedRepo(String),
}

/// Normalize a name into a path-safe slug.
///
/// Lowercase, with every run of non-alphanumeric characters collapsed to a
/// single dash and leading/trailing dashes trimmed. A value that slugs to
/// nothing falls back to the supplied token.
///
/// # Examples
/// ```
/// # use flowsite::storage::slugify;
/// assert_eq!(slugify("My Awesome Project", "project"), "my-awesome-project");
/// assert_eq!(slugify("MH-27 / River Road", "site"), "mh-27-river-road");
/// assert_eq!(slugify("   ", "Default"), "default");
/// ```
pub fn slugify(value: &str, fallback: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        fallback.to_lowercase()
    } else {
        slug
    }
}

/// Deterministic bundle path for a site within a project.
pub fn site_storage_path(site: &SiteRecord, base_folder: &str) -> String {
    let folder = base_folder.trim().trim_matches('/');
    let folder = if folder.is_empty() {
        DEFAULT_BASE_FOLDER
    } else {
        folder
    };
    let project_slug = slugify(&site.project_name, PROJECT_FALLBACK);
    let site_slug = slugify(&site.site_name, SITE_FALLBACK);
    format!("{folder}/{project_slug}/{site_slug}.json")
}

/// Validate an `owner/repo` identifier before any storage round-trip.
pub fn parse_repo_full_name(full_name: &str) -> Result<(&str, &str), StorageError> {
    match full_name.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => Ok((owner, repo)),
        _ => Err(StorageError::MalformedRepo(full_name.to_string())),
    }
}

/// A stored record as returned by [`ReportStore::load_all`].
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub filename: String,
    pub path: PathBuf,
    pub site: SiteRecord,
}

impl StoredReport {
    /// One-line human summary: `Project - Site (date)`.
    pub fn summary(&self) -> String {
        let project = non_blank(&self.site.project_name, "Unknown Project");
        let site = non_blank(&self.site.site_name, "Unknown Site");
        let date = non_blank(&self.site.install_date, "Unknown Date");
        format!("{project} - {site} ({date})")
    }
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Outcome of a precondition-checked write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub path: PathBuf,
    /// Token of the content just written; the precondition for the next write.
    pub version_token: String,
    pub created: bool,
}

/// Flat-directory JSON store for site records.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save a record as a new timestamped file, returning its filename.
    pub fn save(&self, site: &SiteRecord) -> Result<String, StorageError> {
        fs::create_dir_all(&self.root)?;
        let project = filename_component(&site.project_name);
        let name = filename_component(&site.site_name);
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{project}_{name}_{stamp}.json");
        let json = serde_json::to_string_pretty(site)?;
        fs::write(self.root.join(&filename), json)?;
        Ok(filename)
    }

    /// Load every stored record, newest filename first.
    ///
    /// Files that fail to parse are skipped and reported in the returned
    /// warning list — one corrupt file never hides the rest.
    pub fn load_all(&self) -> Result<(Vec<StoredReport>, Vec<String>), StorageError> {
        let mut reports = Vec::new();
        let mut warnings = Vec::new();
        if !self.root.exists() {
            return Ok((reports, warnings));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .collect();
        paths.sort();
        paths.reverse();

        for path in paths {
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            match fs::read_to_string(&path)
                .map_err(StorageError::from)
                .and_then(|text| Ok(serde_json::from_str::<SiteRecord>(&text)?))
            {
                Ok(site) => reports.push(StoredReport {
                    filename,
                    path,
                    site,
                }),
                Err(err) => warnings.push(format!("Could not load {filename}: {err}")),
            }
        }
        Ok((reports, warnings))
    }

    /// Delete a stored record by filename. Returns whether a file was removed.
    pub fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.root.join(filename);
        if path.exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Version token of the file at `relative_path`, if it exists.
    ///
    /// Absent means "create"; present means "update with this token as the
    /// precondition".
    pub fn read_version_token(&self, relative_path: &str) -> Result<Option<String>, StorageError> {
        let path = self.root.join(relative_path);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(content_hash(&bytes))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Write content at `relative_path` only if the destination still matches
    /// `expected_token` (`None` = must not exist yet).
    ///
    /// A token mismatch means another writer got in between the read and this
    /// write; the conflict is surfaced with the token found so the caller can
    /// re-read and retry.
    pub fn write_with_precondition(
        &self,
        relative_path: &str,
        content: &[u8],
        expected_token: Option<&str>,
    ) -> Result<WriteReceipt, StorageError> {
        let path = self.root.join(relative_path);
        let current = self.read_version_token(relative_path)?;

        match (&current, expected_token) {
            (None, None) => {}
            (Some(cur), Some(expected)) if cur == expected => {}
            (Some(cur), _) => {
                return Err(StorageError::Conflict {
                    path,
                    existing_token: cur.clone(),
                });
            }
            (None, Some(_)) => {
                return Err(StorageError::Conflict {
                    path,
                    existing_token: String::new(),
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(WriteReceipt {
            path,
            version_token: content_hash(content),
            created: current.is_none(),
        })
    }
}

/// Sanitize a name for use inside a stored-record filename.
fn filename_component(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let joined = cleaned
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let result: String = joined.chars().take(50).collect();
    if result.is_empty() {
        "unknown".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(project: &str, name: &str) -> SiteRecord {
        let mut s = SiteRecord::default();
        s.project_name = project.into();
        s.site_name = name.into();
        s
    }

    // =========================================================================
    // Slugs and paths
    // =========================================================================

    #[test]
    fn slugify_normalizes_text() {
        assert_eq!(slugify("My Awesome Project", "x"), "my-awesome-project");
        assert_eq!(slugify("MH-27 / River Road", "x"), "mh-27-river-road");
        assert_eq!(slugify("--already--slugged--", "x"), "already-slugged");
    }

    #[test]
    fn slugify_blank_falls_back_lowercased() {
        assert_eq!(slugify("   ", "Default"), "default");
        assert_eq!(slugify("///", "Project"), "project");
    }

    #[test]
    fn storage_path_follows_convention() {
        let s = site("Stage 2", "MH-05");
        assert_eq!(site_storage_path(&s, "reports"), "reports/stage-2/mh-05.json");
    }

    #[test]
    fn storage_path_defaults_blank_base_folder() {
        let s = site("Stage 2", "MH-05");
        assert_eq!(site_storage_path(&s, "  "), "reports/stage-2/mh-05.json");
        assert_eq!(
            site_storage_path(&s, "/archive/"),
            "archive/stage-2/mh-05.json"
        );
    }

    #[test]
    fn repo_name_requires_owner_and_repo() {
        assert!(parse_repo_full_name("owner/repo").is_ok());
        assert!(matches!(
            parse_repo_full_name("just-a-name"),
            Err(StorageError::MalformedRepo(_))
        ));
        assert!(parse_repo_full_name("/repo").is_err());
        assert!(parse_repo_full_name("owner/").is_err());
    }

    // =========================================================================
    // ReportStore save / load / delete
    // =========================================================================

    #[test]
    fn save_then_load_roundtrips_the_record() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(tmp.path());
        let mut s = site("Northside", "MH-27");
        s.pipe_diameter_mm = 300.0;

        let filename = store.save(&s).unwrap();
        assert!(filename.starts_with("Northside_MH_27_"));

        let (reports, warnings) = store.load_all().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].site.pipe_diameter_mm, 300.0);
        assert_eq!(reports[0].filename, filename);
    }

    #[test]
    fn corrupt_file_is_skipped_with_warning() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(tmp.path());
        store.save(&site("P", "S")).unwrap();
        std::fs::write(tmp.path().join("zz_broken.json"), "{ not json").unwrap();

        let (reports, warnings) = store.load_all().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("zz_broken.json"));
    }

    #[test]
    fn delete_removes_only_the_named_file() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(tmp.path());
        let filename = store.save(&site("P", "S")).unwrap();

        assert!(store.delete(&filename).unwrap());
        assert!(!store.delete(&filename).unwrap());
        let (reports, _) = store.load_all().unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn summary_defaults_unknown_parts() {
        let report = StoredReport {
            filename: "x.json".into(),
            path: "x.json".into(),
            site: SiteRecord::default(),
        };
        assert_eq!(report.summary(), "Unknown Project - Unknown Site (Unknown Date)");
    }

    // =========================================================================
    // Precondition protocol
    // =========================================================================

    #[test]
    fn create_requires_absent_destination() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(tmp.path());

        let receipt = store
            .write_with_precondition("reports/p/s.json", b"v1", None)
            .unwrap();
        assert!(receipt.created);
        assert_eq!(receipt.version_token, content_hash(b"v1"));
    }

    #[test]
    fn update_with_matching_token_succeeds() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(tmp.path());
        let first = store
            .write_with_precondition("b.json", b"v1", None)
            .unwrap();

        let second = store
            .write_with_precondition("b.json", b"v2", Some(&first.version_token))
            .unwrap();
        assert!(!second.created);
        assert_eq!(
            store.read_version_token("b.json").unwrap().unwrap(),
            second.version_token
        );
    }

    #[test]
    fn concurrent_change_surfaces_as_conflict() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(tmp.path());
        let receipt = store
            .write_with_precondition("b.json", b"v1", None)
            .unwrap();

        // Another writer sneaks in between read and write.
        std::fs::write(tmp.path().join("b.json"), b"intruder").unwrap();

        let err = store
            .write_with_precondition("b.json", b"v2", Some(&receipt.version_token))
            .unwrap_err();
        match err {
            StorageError::Conflict { existing_token, .. } => {
                assert_eq!(existing_token, content_hash(b"intruder"));
            }
            other => panic!("expected conflict, got {other}"),
        }
    }

    #[test]
    fn create_over_existing_file_is_a_conflict() {
        let tmp = TempDir::new().unwrap();
        let store = ReportStore::new(tmp.path());
        store
            .write_with_precondition("b.json", b"v1", None)
            .unwrap();

        assert!(matches!(
            store.write_with_precondition("b.json", b"v2", None),
            Err(StorageError::Conflict { .. })
        ));
    }

    // =========================================================================
    // Filename sanitization
    // =========================================================================

    #[test]
    fn filename_component_replaces_separators() {
        assert_eq!(filename_component("MH-27 / River Road"), "MH_27_River_Road");
        assert_eq!(filename_component("  "), "unknown");
    }

    #[test]
    fn filename_component_caps_length() {
        let long = "x".repeat(120);
        assert_eq!(filename_component(&long).len(), 50);
    }
}
