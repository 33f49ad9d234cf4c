use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;

/// Хранилище ключ-значение для истории.
pub trait Storage {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    fn delete(&self, key: &str) -> StorageResult<()>;
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("access storage file: {0}")]
    Io(#[from] io::Error),
}

/// Хранит каждый ключ в отдельном файле `<key>.json` в указанной директории.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }

        debug!("Читаем {:?}", path);
        Ok(Some(fs::read_to_string(path)?))
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path(key);
        debug!("Записываем {:?}", path);
        fs::write(path, value)?;

        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
pub use memory::MemoryStorage;
