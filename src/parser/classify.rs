//! Selection of the configuration files in a directory.

use crate::config::ScanOptions;
use crate::diagnostics::Diagnostic;
use crate::error::{Result, ResultExt};
use crate::parser::Dialect;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A configuration file selected for loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File name relative to the loaded directory
    pub name: String,
    /// Syntax of the file
    pub dialect: Dialect,
    /// Whether the file follows the override naming convention
    pub is_override: bool,
}

impl ConfigFile {
    /// Classify a file name; `None` if it is not a configuration file.
    #[must_use]
    pub fn from_name(dir: &Path, name: &str) -> Option<Self> {
        if is_ignored_file(name) {
            return None;
        }
        let dialect = Dialect::from_file_name(name)?;
        let stem = dialect.strip_suffix(name);
        Some(Self {
            path: dir.join(name),
            name: name.to_string(),
            dialect,
            is_override: stem == "override" || stem.ends_with("_override"),
        })
    }
}

/// The files of a directory in processing order.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    /// Primary files sorted by name, then override files sorted by name
    pub files: Vec<ConfigFile>,
    /// Directory entries that could not be inspected
    pub diagnostics: Vec<Diagnostic>,
}

/// List the configuration files of `dir`.
///
/// Subdirectories are not entered. Entries that cannot be inspected become
/// error diagnostics without a position.
///
/// # Errors
///
/// Returns an error if `dir` does not exist, is not a directory, or cannot be
/// listed.
pub fn classify_directory(dir: &Path, options: &ScanOptions) -> Result<Classified> {
    let metadata = match std::fs::metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(crate::err!(DirectoryNotFound {
                path: dir.to_path_buf(),
            }));
        }
        Err(e) => return Err(e).with_path(dir),
    };
    if !metadata.is_dir() {
        return Err(crate::err!(NotADirectory {
            path: dir.to_path_buf(),
        }));
    }

    let mut classified = Classified::default();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                if e.depth() == 0 {
                    let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                    return Err(std::io::Error::from(e)).with_path(path);
                }
                let name = e
                    .path()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if !name.is_empty() && ConfigFile::from_name(dir, &name).is_none() {
                    tracing::debug!(name = %name, error = %e, "Skipping unreadable non-configuration entry");
                    continue;
                }
                tracing::warn!(error = %e, "Failed to read directory entry");
                classified.diagnostics.push(
                    Diagnostic::error("Failed to read file")
                        .with_detail(format!("The directory entry \"{name}\" could not be read: {e}.")),
                );
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::debug!(path = %entry.path().display(), reason = "non UTF-8 name", "Skipping path");
            continue;
        };

        let Some(file) = ConfigFile::from_name(dir, name) else {
            continue;
        };

        if is_excluded(name, &options.exclude_patterns) {
            tracing::debug!(path = %entry.path().display(), reason = "matches exclude pattern", "Skipping path");
            continue;
        }

        classified.files.push(file);
    }

    classified
        .files
        .sort_by(|a, b| (a.is_override, &a.name).cmp(&(b.is_override, &b.name)));

    tracing::debug!(
        dir = %dir.display(),
        files = classified.files.len(),
        overrides = classified.files.iter().filter(|f| f.is_override).count(),
        "Classified directory"
    );

    Ok(classified)
}

/// Editor backups, lock files and hidden files are never configuration.
fn is_ignored_file(name: &str) -> bool {
    name.starts_with('.')
        || name.ends_with('~')
        || (name.len() > 1 && name.starts_with('#') && name.ends_with('#'))
}

fn is_excluded(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(name))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_case::test_case;

    #[test_case(".terraform.lock.hcl" ; "hidden")]
    #[test_case(".main.tf" ; "hidden tf")]
    #[test_case("main.tf~" ; "backup")]
    #[test_case("#main.tf#" ; "emacs autosave")]
    fn test_ignored_files(name: &str) {
        assert!(is_ignored_file(name));
        assert!(ConfigFile::from_name(Path::new("."), name).is_none());
    }

    #[test_case("override.tf", true ; "plain override")]
    #[test_case("main_override.tf", true ; "suffixed override")]
    #[test_case("override.tf.json", true ; "json override")]
    #[test_case("overrides.tf", false ; "similar name")]
    #[test_case("my-override.tf", false ; "dash is not the convention")]
    fn test_override_convention(name: &str, expected: bool) {
        let file = ConfigFile::from_name(Path::new("."), name).unwrap();
        assert_eq!(file.is_override, expected);
    }

    #[test]
    fn test_classify_orders_primaries_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "z_override.tf",
            "variables.tf",
            "main.tf.json",
            "override.tf",
            "README.md",
            ".hidden.tf",
            "a.tf",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("modules.tf")).unwrap();

        let classified = classify_directory(dir.path(), &ScanOptions::default()).unwrap();
        let names: Vec<&str> = classified.files.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["a.tf", "main.tf.json", "variables.tf", "override.tf", "z_override.tf"]
        );
        assert!(classified.diagnostics.is_empty());
    }

    #[test]
    fn test_classify_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.tf"), "").unwrap();
        fs::write(dir.path().join("generated_providers.tf"), "").unwrap();

        let options = ScanOptions {
            exclude_patterns: vec!["generated_*".to_string()],
            ..ScanOptions::default()
        };
        let classified = classify_directory(dir.path(), &options).unwrap();
        assert_eq!(classified.files.len(), 1);
        assert_eq!(classified.files[0].name, "main.tf");
    }

    #[test]
    fn test_classify_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let error = classify_directory(&missing, &ScanOptions::default()).unwrap_err();
        assert!(matches!(
            error,
            crate::error::TfInspectError::DirectoryNotFound { .. }
        ));
    }

    #[test]
    fn test_classify_file_instead_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.tf");
        fs::write(&file, "").unwrap();

        let error = classify_directory(&file, &ScanOptions::default()).unwrap_err();
        assert!(matches!(
            error,
            crate::error::TfInspectError::NotADirectory { .. }
        ));
    }
}
