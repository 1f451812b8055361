use anyhow::{Context, Result};
use home::home_dir;
use std::fs::read_dir;
use std::io;
use std::path::PathBuf;

/// Name of the storage file in the home directory.
pub const DEFAULT_DB_FILE: &str = ".ripple.txt";
pub const DEFAULT_EDITOR: &str = "vim";

/// Where entries live and how to edit them. Built once at startup and handed to the commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The storage file, read and written by every command.
    pub db_file: PathBuf,
    /// Directory of extra entry files, only read by `list`.
    pub source_dir: Option<PathBuf>,
    /// Editor command line for `edit`.
    pub editor: String,
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// - `RIPPLE_DB`: storage file, `~/.ripple.txt` by default
    /// - `RIPPLE_DIR`: directory of extra entry files
    /// - `EDITOR`: editor command, `vim` by default
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from the variables returned by `lookup`. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let db_file = match var("RIPPLE_DB") {
            Some(path) => PathBuf::from(path),
            None => home_dir()
                .context("Cannot determine the home directory, set RIPPLE_DB")?
                .join(DEFAULT_DB_FILE),
        };

        Ok(Config {
            db_file,
            source_dir: var("RIPPLE_DIR").map(PathBuf::from),
            editor: var("EDITOR").unwrap_or_else(|| DEFAULT_EDITOR.to_string()),
        })
    }

    /// Return the files to read when listing: the regular files of `source_dir` sorted by name,
    /// then `db_file`. A missing `source_dir` contributes nothing.
    pub fn read_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = vec![];

        if let Some(dir) = &self.source_dir {
            let files = match read_dir(dir) {
                Ok(files) => files,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("{} does not exist, no extra files", dir.display());
                    return Ok(vec![self.db_file.clone()]);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Cannot read {}", dir.display()))
                }
            };

            for file in files {
                let file = file?;
                if file.file_type()?.is_file() && file.path() != self.db_file {
                    paths.push(file.path());
                }
            }
            paths.sort();
        }

        paths.push(self.db_file.clone());
        Ok(paths)
    }
}
