use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::backend::interface::Result;
use crate::core::Goal;

/// User preferences that live next to, but never inside, the ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub goal: Goal
}

pub struct PreferenceStore {
    path: PathBuf
}

impl PreferenceStore {
    pub fn new(path: impl AsRef<Path>) -> PreferenceStore {
        PreferenceStore { path: path.as_ref().to_path_buf() }
    }

    pub fn read(&self) -> Result<Preferences> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(err) => Err(err.into())
        }
    }

    pub fn save(&self, preferences: &Preferences) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(preferences)?;
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new(".")
        };
        let mut temp = NamedTempFile::new_in(directory)?;
        temp.write_all(&bytes)?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}
