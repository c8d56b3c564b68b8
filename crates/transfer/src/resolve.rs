//! Destination resolution: decides how the target file is opened.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use crate::TransferError;
use crate::validation::validate_destination_path;

/// Where the first transferred byte lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// After the existing content.
    Append,
    /// At offset 0. Existing bytes are overwritten; any stale tail is cut
    /// once the transfer completes.
    Overwrite,
}

/// How an existing or missing destination is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenPlan {
    /// File exists and the caller asked to append.
    OpenReadWrite,
    /// File exists and will be overwritten from the start.
    OpenWrite,
    /// File is missing: create parent directories, then the file.
    CreateThenOpenWrite,
}

impl OpenPlan {
    pub fn policy(self) -> WritePolicy {
        match self {
            Self::OpenReadWrite => WritePolicy::Append,
            Self::OpenWrite | Self::CreateThenOpenWrite => WritePolicy::Overwrite,
        }
    }
}

/// Maps destination state to an open plan.
pub fn plan_open(exists: bool, append: bool) -> OpenPlan {
    match (exists, append) {
        (true, true) => OpenPlan::OpenReadWrite,
        (true, false) => OpenPlan::OpenWrite,
        (false, _) => OpenPlan::CreateThenOpenWrite,
    }
}

/// A resolved, opened destination file positioned for the first write.
#[derive(Debug)]
pub struct DestinationTarget {
    path: PathBuf,
    plan: OpenPlan,
    existing_len: u64,
    file: File,
}

impl DestinationTarget {
    /// Absolute destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn plan(&self) -> OpenPlan {
        self.plan
    }

    pub fn policy(&self) -> WritePolicy {
        self.plan.policy()
    }

    /// Whether the file was present before resolution.
    pub fn existed(&self) -> bool {
        !matches!(self.plan, OpenPlan::CreateThenOpenWrite)
    }

    /// Length of the file when it was opened.
    pub fn existing_len(&self) -> u64 {
        self.existing_len
    }

    /// Offset of the first transferred byte.
    pub fn start_offset(&self) -> u64 {
        match self.policy() {
            WritePolicy::Append => self.existing_len,
            WritePolicy::Overwrite => 0,
        }
    }

    /// The writable stream.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Flushes written data and, when overwriting, cuts content left past the
    /// last byte written.
    pub(crate) async fn finish(&mut self, written: u64) -> Result<(), TransferError> {
        self.file.flush().await?;
        if self.policy() == WritePolicy::Overwrite {
            let len = self.file.metadata().await?.len();
            if len > written {
                self.file.set_len(written).await?;
                debug!(path = %self.path.display(), from = len, to = written, "trimmed stale tail");
            }
        }
        Ok(())
    }
}

/// Anchors a relative path at the current directory. Symlinks and `..` are
/// left as given.
fn absolute_path(path: &Path) -> Result<PathBuf, TransferError> {
    std::path::absolute(path).map_err(|e| TransferError::path(path, e))
}

/// Resolves `path` into an opened destination.
///
/// May create the parent directory and an empty file even when the
/// transfer that follows fails.
pub async fn resolve(path: &Path, append: bool) -> Result<DestinationTarget, TransferError> {
    validate_destination_path(path)?;
    let absolute = absolute_path(path)?;
    let path = absolute.as_path();

    let exists = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            return Err(TransferError::path(
                path,
                io::Error::new(io::ErrorKind::IsADirectory, "destination is a directory"),
            ));
        }
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(TransferError::path(path, e)),
    };

    let plan = plan_open(exists, append);
    let (file, existing_len) = match plan {
        OpenPlan::OpenReadWrite => {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .await
                .map_err(|e| TransferError::path(path, e))?;
            let end = file
                .seek(SeekFrom::End(0))
                .await
                .map_err(|e| TransferError::path(path, e))?;
            (file, end)
        }
        OpenPlan::OpenWrite => {
            let file = OpenOptions::new()
                .write(true)
                .truncate(false)
                .open(path)
                .await
                .map_err(|e| TransferError::path(path, e))?;
            let len = file
                .metadata()
                .await
                .map_err(|e| TransferError::path(path, e))?
                .len();
            (file, len)
        }
        OpenPlan::CreateThenOpenWrite => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| TransferError::path(parent, e))?;
            }
            // A same-name file created after the existence check is opened, not replaced.
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .await
                .map_err(|e| TransferError::path(path, e))?;
            (file, 0)
        }
    };

    debug!(path = %path.display(), ?plan, existing_len, "destination resolved");

    Ok(DestinationTarget {
        path: absolute,
        plan,
        existing_len,
        file,
    })
}
