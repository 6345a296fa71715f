//! Scripted stand-in for the archiver executable.
//!
//! The script is run through `/bin/sh`, so it never needs the executable bit. Each call
//! appends `<working directory>|<arguments>` to a call log and appends one byte to the
//! archive named after `--`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Shell used to run the fake archiver script.
pub const SHELL: &str = "/bin/sh";

/// Behaviour of the fake archiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeArchiverBehaviour {
    /// Lines written to standard output.
    pub stdout: Vec<String>,
    /// Lines written to standard error.
    pub stderr: Vec<String>,
    /// Exit code.
    pub exit_code: i32,
}

/// A fake archiver script installed in a folder.
#[derive(Debug, Clone)]
pub struct FakeArchiver {
    script: PathBuf,
    calls: PathBuf,
}

impl FakeArchiver {
    /// Install the script into `folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn install(folder: &Path, behaviour: &FakeArchiverBehaviour) -> Result<Self> {
        fs::create_dir_all(folder).with_context(|| format!("create {}", folder.display()))?;
        let script = folder.join("fake-7z.sh");
        let calls = folder.join("fake-7z.calls");
        fs::write(&script, render_script(&calls, behaviour))
            .with_context(|| format!("write {}", script.display()))?;
        Ok(Self { script, calls })
    }

    /// Executable to configure as the archiver.
    #[must_use]
    pub fn executable(&self) -> PathBuf {
        PathBuf::from(SHELL)
    }

    /// Script path; must be the first archiver argument.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Recorded calls as `<working directory>|<arguments>` lines, in call order.
    ///
    /// # Errors
    ///
    /// Returns an error if the call log exists but cannot be read.
    pub fn calls(&self) -> Result<Vec<String>> {
        if !self.calls.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.calls)
            .with_context(|| format!("read {}", self.calls.display()))?;
        Ok(text.lines().map(str::to_string).collect())
    }
}

fn render_script(calls: &Path, behaviour: &FakeArchiverBehaviour) -> String {
    let mut script = String::from("#!/bin/sh\n");
    script.push_str(&format!(
        "printf '%s|%s\\n' \"$PWD\" \"$*\" >> {}\n",
        quote(&calls.display().to_string())
    ));
    script.push_str(
        "dest=\"\"\nseen=0\nfor arg in \"$@\"; do\n  \
         if [ \"$seen\" = 1 ]; then dest=\"$arg\"; break; fi\n  \
         if [ \"$arg\" = \"--\" ]; then seen=1; fi\ndone\n\
         if [ -n \"$dest\" ]; then printf 'x' >> \"$dest\"; fi\n",
    );
    for line in &behaviour.stdout {
        script.push_str(&format!("printf '%s\\n' {}\n", quote(line)));
    }
    for line in &behaviour.stderr {
        script.push_str(&format!("printf '%s\\n' {} >&2\n", quote(line)));
    }
    script.push_str(&format!("exit {}\n", behaviour.exit_code));
    script
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
