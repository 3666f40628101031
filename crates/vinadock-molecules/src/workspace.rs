//! Per-job working directories.
//!
//! Every job gets `<work_root>/<job-id>/` with fixed file names inside it, so
//! two submissions never share inputs or outputs and a stale output from an
//! earlier run can never be read back as the current one.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use vinadock_common::{Result, VinadockError};

use crate::request::DockingRequest;

pub const RECEPTOR_FILE: &str = "receptor.pdbqt";
pub const LIGAND_FILE: &str = "ligand.pdbqt";
pub const OUTPUT_FILE: &str = "docked_output.pdbqt";
pub const LOG_FILE: &str = "vina_log.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobWorkspace {
    dir: PathBuf,
}

impl JobWorkspace {
    /// Create a fresh, empty directory named `name` under `root`.
    pub async fn create<P: AsRef<Path>>(root: P, name: &str) -> Result<Self> {
        let dir = root.as_ref().join(name);
        if fs::try_exists(&dir).await? {
            return Err(VinadockError::Workspace(format!(
                "job directory already exists: {}",
                dir.display()
            )));
        }
        fs::create_dir_all(&dir).await?;
        debug!("Created job workspace {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn receptor_path(&self) -> PathBuf {
        self.dir.join(RECEPTOR_FILE)
    }

    pub fn ligand_path(&self) -> PathBuf {
        self.dir.join(LIGAND_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(OUTPUT_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub async fn write_inputs(&self, request: &DockingRequest) -> Result<()> {
        fs::write(self.receptor_path(), &request.receptor.content).await?;
        fs::write(self.ligand_path(), &request.ligand.content).await?;
        Ok(())
    }

    pub async fn read_log(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.log_path()).await?)
    }

    pub async fn read_output(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.output_path()).await?)
    }

    pub async fn has_outputs(&self) -> bool {
        let out = fs::try_exists(self.output_path()).await.unwrap_or(false);
        let log = fs::try_exists(self.log_path()).await.unwrap_or(false);
        out && log
    }

    pub async fn remove(&self) -> Result<()> {
        fs::remove_dir_all(&self.dir).await?;
        debug!("Removed job workspace {:?}", self.dir);
        Ok(())
    }
}
