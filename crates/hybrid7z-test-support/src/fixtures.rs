//! Directory tree and filter file fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Create `files` (relative paths) under `root`, each containing its own path.
///
/// # Errors
///
/// Returns an error if a folder or file cannot be created.
pub fn write_tree(root: &Path, files: &[&str]) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("create {}", root.display()))?;
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, file.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}

/// Write `<folder>/<phase>.txt` with one pattern per line.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_filter_file(folder: &Path, phase: &str, patterns: &[&str]) -> Result<PathBuf> {
    fs::create_dir_all(folder).with_context(|| format!("create {}", folder.display()))?;
    let path = folder.join(format!("{phase}.txt"));
    let mut contents = patterns.join("\n");
    contents.push('\n');
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Names of the files directly inside `folder`, sorted.
///
/// # Errors
///
/// Returns an error if the folder cannot be read.
pub fn file_names(folder: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("read {}", folder.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Minimal configuration document with the given phases, archiver and parameters.
#[must_use]
pub fn config_document(
    executable: &Path,
    global_parameters: &str,
    phases: &[(&str, bool)],
) -> String {
    let names = phases
        .iter()
        .map(|(name, _)| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let parallel = phases
        .iter()
        .map(|(name, parallel)| format!("{name} = {parallel}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "[archiver]\nexecutable = {executable:?}\nparameters = {global_parameters:?}\n\
         password_parameter = \"-p{{Password}}\"\nlog_folder = \"logs\"\n\n\
         [phase]\nphase_list = [{names}]\n\n[phase.parallel]\n{parallel}\n\n\
         [misc]\ninclude_root_folder = false\ndelete_archived_path = false\ndelete_filter_cache = true\n",
        executable = executable.display().to_string(),
    )
}
