//! Filesystem repository for the trained model artifact.
//!
//! Writes go to a temporary file in the target directory which is synced and
//! then renamed over the final path, so a reader sees either the old artifact
//! or the new one, never a partial file.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::common::config::AppCfg;
use crate::common::error::PropvalResult;

use super::artifact::{self, ArtifactError};
use super::domain::{ModelArtifact, ModelRepo};

/// Artifact stored at `<model_dir>/<model_name>`.
pub struct FsModelRepo {
    dir: PathBuf,
    file_name: String,
}

impl FsModelRepo {
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    pub fn from_cfg(cfg: &AppCfg) -> Self {
        Self::new(&cfg.model_dir, &cfg.model_name)
    }

    fn artifact_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl ModelRepo for FsModelRepo {
    fn put_model(&self, model: &ModelArtifact) -> PropvalResult<PathBuf> {
        let bytes = artifact::encode(model)?;
        fs::create_dir_all(&self.dir).map_err(ArtifactError::Io)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(ArtifactError::Io)?;
        tmp.write_all(&bytes).map_err(ArtifactError::Io)?;
        tmp.as_file().sync_all().map_err(ArtifactError::Io)?;

        let path = self.artifact_path();
        tmp.persist(&path).map_err(|err| ArtifactError::Io(err.error))?;
        Ok(path)
    }

    fn get_model(&self) -> PropvalResult<ModelArtifact> {
        let bytes = fs::read(self.artifact_path()).map_err(ArtifactError::Io)?;
        Ok(artifact::decode(&bytes)?)
    }

    fn location(&self) -> PathBuf {
        self.artifact_path()
    }
}
