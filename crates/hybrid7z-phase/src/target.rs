//! Archive targets and the values derived from them.
//!
//! # Design
//! - A `Target` is immutable once built; derived paths are pure functions.
//! - Target specs use the `source|destination|password` shape; only `source` is required.

use std::path::{self, Path, PathBuf};

use tracing::{info, warn};

/// Token replaced by the target password inside the password parameter template.
pub const PASSWORD_TOKEN: &str = "{Password}";

/// Extension of archives produced for targets without an explicit destination.
pub const ARCHIVE_EXTENSION: &str = "7z";

/// One directory compressed into one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    source: PathBuf,
    include_root: bool,
    destination: Option<PathBuf>,
    password: Option<String>,
}

impl Target {
    /// Build a target; trailing separators are dropped from `source`.
    #[must_use]
    pub fn new(
        source: impl Into<PathBuf>,
        include_root: bool,
        destination: Option<PathBuf>,
        password: Option<String>,
    ) -> Self {
        Self {
            source: trim_trailing_separators(source.into()),
            include_root,
            destination,
            password,
        }
    }

    /// Absolute source directory.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Whether the archive records the target directory itself as its root.
    #[must_use]
    pub const fn include_root(&self) -> bool {
        self.include_root
    }

    /// Password for the archive, if any.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Final component of the source path.
    #[must_use]
    pub fn name(&self) -> String {
        self.source.file_name().map_or_else(
            || self.source.to_string_lossy().into_owned(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    /// Directory containing the source.
    #[must_use]
    pub fn parent(&self) -> &Path {
        self.source.parent().unwrap_or(&self.source)
    }

    /// Working directory of archiver invocations; controls the paths stored in the archive.
    #[must_use]
    pub fn working_directory(&self) -> &Path {
        if self.include_root {
            self.parent()
        } else {
            &self.source
        }
    }

    /// Archive path: the explicit destination (relative ones resolve against the
    /// source's parent), else `<parent>/<name>.7z`.
    #[must_use]
    pub fn destination(&self) -> PathBuf {
        match &self.destination {
            Some(explicit) if explicit.is_absolute() => explicit.clone(),
            Some(relative) => self.parent().join(relative),
            None => self
                .parent()
                .join(format!("{}.{ARCHIVE_EXTENSION}", self.name())),
        }
    }

    /// Password argument rendered from `template`, or `None` without a password.
    #[must_use]
    pub fn password_argument(&self, template: &str) -> Option<String> {
        let password = self.password.as_deref()?;
        if template.trim().is_empty() {
            return None;
        }
        Some(template.replace(PASSWORD_TOKEN, password))
    }
}

/// Parsed `source|destination|password` entry from the command line or a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// Source path as written.
    pub source: String,
    /// Explicit destination, when the entry carries a non-empty one.
    pub destination: Option<String>,
    /// Archive password, when the entry carries a non-empty one.
    pub password: Option<String>,
}

impl TargetSpec {
    /// Split an entry on `|` into at most three fields.
    #[must_use]
    pub fn parse(entry: &str) -> Self {
        let mut fields = entry.splitn(3, '|');
        let source = fields.next().unwrap_or_default().trim().to_string();
        let destination = fields
            .next()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let password = fields
            .next()
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self {
            source,
            destination,
            password,
        }
    }

    /// Turn the entry into a [`Target`] when its source is an existing directory.
    ///
    /// Files and missing entries are reported and rejected.
    #[must_use]
    pub fn resolve(self, include_root: bool) -> Option<Target> {
        let source = Path::new(&self.source);
        if source.is_dir() {
            let absolute = path::absolute(source).unwrap_or_else(|_| source.to_path_buf());
            info!(path = %absolute.display(), "found source directory");
            return Some(Target::new(
                absolute,
                include_root,
                self.destination.map(PathBuf::from),
                self.password,
            ));
        }
        if source.is_file() {
            warn!(path = %self.source, "files are not supported (only directories are supported)");
        } else {
            warn!(path = %self.source, "filesystem entry does not exist");
        }
        None
    }
}

/// Parse and resolve every entry, keeping input order and skipping blank lines.
#[must_use]
pub fn resolve_targets<I, S>(entries: I, include_root: bool) -> Vec<Target>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter(|entry| !entry.as_ref().trim().is_empty())
        .filter_map(|entry| TargetSpec::parse(entry.as_ref()).resolve(include_root))
        .collect()
}

fn trim_trailing_separators(path: PathBuf) -> PathBuf {
    let text = path.to_string_lossy();
    let trimmed = text.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() || trimmed.len() == text.len() {
        return path;
    }
    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn spec_parses_optional_fields() {
        let full = TargetSpec::parse("/data/photos|/backup/photos.7z|s3cr|t");
        assert_eq!(full.source, "/data/photos");
        assert_eq!(full.destination.as_deref(), Some("/backup/photos.7z"));
        assert_eq!(full.password.as_deref(), Some("s3cr|t"));

        let bare = TargetSpec::parse("/data/photos");
        assert!(bare.destination.is_none());
        assert!(bare.password.is_none());

        let empty_destination = TargetSpec::parse("/data/photos||pw");
        assert!(empty_destination.destination.is_none());
        assert_eq!(empty_destination.password.as_deref(), Some("pw"));
    }

    #[test]
    fn destination_defaults_next_to_source() {
        let target = Target::new("/data/photos/", false, None, None);
        assert_eq!(target.source(), Path::new("/data/photos"));
        assert_eq!(target.name(), "photos");
        assert_eq!(target.destination(), PathBuf::from("/data/photos.7z"));
        assert_eq!(target.working_directory(), Path::new("/data/photos"));
    }

    #[test]
    fn include_root_moves_working_directory_to_parent() {
        let target = Target::new("/data/photos", true, None, None);
        assert_eq!(target.working_directory(), Path::new("/data"));
    }

    #[test]
    fn relative_destination_resolves_against_parent() {
        let target = Target::new("/data/photos", false, Some(PathBuf::from("out/p.7z")), None);
        assert_eq!(target.destination(), PathBuf::from("/data/out/p.7z"));

        let absolute = Target::new("/data/photos", false, Some(PathBuf::from("/x/p.7z")), None);
        assert_eq!(absolute.destination(), PathBuf::from("/x/p.7z"));
    }

    #[test]
    fn password_argument_substitutes_token() {
        let with = Target::new("/data/photos", false, None, Some("hunter2".to_string()));
        assert_eq!(
            with.password_argument("-p{Password}").as_deref(),
            Some("-phunter2")
        );
        assert!(with.password_argument("").is_none());

        let without = Target::new("/data/photos", false, None, None);
        assert!(without.password_argument("-p{Password}").is_none());
    }

    #[test]
    fn resolve_targets_skips_files_and_missing_entries() -> TestResult<()> {
        let temp = TempDir::new()?;
        let directory = temp.path().join("album");
        fs::create_dir_all(&directory)?;
        let file = temp.path().join("note.txt");
        fs::write(&file, b"x")?;

        let entries = vec![
            format!("{}|{}|pw", directory.display(), "album-out.7z"),
            file.display().to_string(),
            temp.path().join("missing").display().to_string(),
            "   ".to_string(),
        ];
        let targets = resolve_targets(entries, false);

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name(), "album");
        assert_eq!(targets[0].password(), Some("pw"));
        assert_eq!(targets[0].destination(), temp.path().join("album-out.7z"));
        Ok(())
    }
}
