//! CSV log file on the flash filesystem

use crate::error::StorageError;
use crate::storage::log_sink::{LogContents, LogStore};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

pub const MOUNT_POINT: &str = "/spiffs";

pub struct FileLogStore {
    path: PathBuf,
}

impl FileLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LogStore for FileLogStore {
    type Reader = File;

    fn append(&mut self, line: &str) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn open(&self) -> Result<Option<LogContents<File>>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();
        Ok(Some(LogContents { reader: file, len }))
    }
}

/// Register the default SPIFFS partition under `MOUNT_POINT`, formatting it
/// on first boot.
#[cfg(target_os = "espidf")]
pub fn mount_spiffs() -> Result<(), StorageError> {
    use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};
    use log::info;

    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };

    esp!(unsafe { esp_vfs_spiffs_register(&conf) })
        .map_err(|e| StorageError::Mount(format!("{:?}", e)))?;
    info!("🗄️ SPIFFS mounted at {}", MOUNT_POINT);
    Ok(())
}
