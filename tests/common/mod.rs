use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory holding a config file and fake helper scripts.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Where the fake chooser stores the candidate stream it was fed
    pub fn chooser_input(&self) -> PathBuf {
        self.path().join("chooser-input")
    }

    /// Where the fake clipboard and typing helpers store the payload
    pub fn delivered(&self) -> PathBuf {
        self.path().join("delivered")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    /// Write an executable `/bin/sh` script.
    pub fn write_script(&self, name: &str, body: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms)?;
        }

        Ok(path)
    }

    /// A chooser that records its stdin, prints `answer` and exits with `status`.
    pub fn chooser(&self, name: &str, answer: &str, status: i32) -> Result<PathBuf> {
        self.write_script(
            name,
            &format!(
                "cat > '{}'\nprintf '%s' '{}'\nexit {}",
                self.chooser_input().display(),
                answer,
                status
            ),
        )
    }

    /// Write a config whose commands all point at scripts in this directory.
    pub fn write_config(&self, dmenu: &Path, extra: &str) -> Result<PathBuf> {
        let clipboard = self.write_script(
            "clipboard",
            &format!("cat > '{}'", self.delivered().display()),
        )?;
        let typer = self.write_script(
            "typer",
            &format!("printf '%s' \"$1\" > '{}'", self.delivered().display()),
        )?;

        let config = format!(
            r#"{extra}

[commands]
dmenu = "'{}'"
rofi = "'{}' --rofi"
clipboard = "'{}'"
typer = "'{}'"
"#,
            dmenu.display(),
            dmenu.display(),
            clipboard.display(),
            typer.display()
        );
        fs::write(self.config_path(), config)?;
        Ok(self.config_path())
    }
}
