//! Database handle - high-level access to a VSS directory tree.
//!
//! The database maps physical names to on-disk paths, loads record files,
//! and caches item-file instances by physical name. The cache is the single
//! source of truth: two lookups of the same physical name share one
//! instance, so memoized revisions and directory state are shared too.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::ini::SimpleIni;
use crate::encoding::{Encoding, UnsupportedEncoding};
use crate::item::{FileItemFile, ProjectEntryFlags, ProjectItemFile, VssProject};
use crate::names::NameFile;
use crate::record::{ItemRecord, ParseRecord, PhysicalName, RecordError, RecordFile, VssName};

/// Result type for database operations.
pub type VssResult<T> = Result<T, VssError>;

/// Database errors.
#[derive(Debug, Error)]
pub enum VssError {
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encoding(#[from] UnsupportedEncoding),

    #[error("version {version} outside known range {first}..={last}")]
    VersionOutOfRange { version: i32, first: i32, last: i32 },

    #[error("bad database: {0}")]
    BadDatabase(String),
}

impl VssError {
    /// check if this error indicates a missing on-disk file, which is often
    /// recoverable (purged items, pruned branch parents)
    pub fn is_not_found(&self) -> bool {
        matches!(self, VssError::FileNotFound { .. })
    }
}

/// Database configuration options.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Root directory holding srcsafe.ini.
    pub path: PathBuf,
    /// Code page all strings are decoded with.
    pub encoding: Encoding,
    /// Accept records with bad CRCs, logging a warning.
    pub lenient_crc: bool,
    /// Skip unrecognized records and revision actions instead of failing.
    pub ignore_unknown: bool,
    /// Physical name of the root project item file.
    pub root_project_file: PhysicalName,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            encoding: Encoding::default(),
            lenient_crc: false,
            ignore_unknown: false,
            root_project_file: PhysicalName::new(Database::ROOT_PROJECT_FILE),
        }
    }
}

impl DatabaseConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the database encoding.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set lenient CRC handling.
    pub fn lenient_crc(mut self, value: bool) -> Self {
        self.lenient_crc = value;
        self
    }

    /// Set whether unknown records are skipped.
    pub fn ignore_unknown(mut self, value: bool) -> Self {
        self.ignore_unknown = value;
        self
    }

    /// Set the root project item file.
    pub fn root_project_file(mut self, physical: PhysicalName) -> Self {
        self.root_project_file = physical;
        self
    }
}

#[derive(Debug)]
enum NameFileState {
    Unloaded,
    Missing,
    Loaded(Arc<NameFile>),
}

/// An opened VSS database.
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    data_path: PathBuf,
    file_items: RwLock<HashMap<String, Arc<FileItemFile>>>,
    project_items: RwLock<HashMap<String, Arc<ProjectItemFile>>>,
    name_file: RwLock<NameFileState>,
}

impl Database {
    /// Display name of the root project.
    pub const ROOT_PROJECT_NAME: &'static str = "$";
    /// Default physical name of the root project item file.
    pub const ROOT_PROJECT_FILE: &'static str = "AAAAAAAA";
    /// Separator in project paths.
    pub const PROJECT_SEPARATOR: char = '/';
    /// The overflow-names file under the data directory.
    pub const NAMES_FILE: &'static str = "names.dat";

    /// Open a database at the given root directory with default options.
    pub fn open(path: impl AsRef<Path>) -> VssResult<Self> {
        Self::open_with_config(DatabaseConfig::new(path.as_ref()))
    }

    /// Open a database with custom configuration. Reads `srcsafe.ini` to
    /// learn the data directory.
    pub fn open_with_config(config: DatabaseConfig) -> VssResult<Self> {
        let ini_path = config.path.join("srcsafe.ini");
        let ini = SimpleIni::load(&ini_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VssError::FileNotFound { path: ini_path }
            } else {
                VssError::Io(e)
            }
        })?;
        let data_path = config.path.join(ini.get("Data_Path", "data"));
        debug!(path = %config.path.display(), data = %data_path.display(), "opened database");

        Ok(Self {
            config,
            data_path,
            file_items: RwLock::new(HashMap::new()),
            project_items: RwLock::new(HashMap::new()),
            name_file: RwLock::new(NameFileState::Unloaded),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn encoding(&self) -> Encoding {
        self.config.encoding
    }

    /// On-disk path of a physical-name-addressed file. Most files live in a
    /// single-letter bucket directory named after their first character.
    pub fn data_path(&self, physical_name: &str, bucket: bool) -> PathBuf {
        if bucket {
            if let Some(first) = physical_name.chars().next() {
                return self
                    .data_path
                    .join(first.to_ascii_lowercase().to_string())
                    .join(physical_name);
            }
        }
        self.data_path.join(physical_name)
    }

    /// Read a whole data file into memory.
    pub fn open_data_file(&self, physical_name: &str, bucket: bool) -> VssResult<Vec<u8>> {
        let path = self.data_path(physical_name, bucket);
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VssError::FileNotFound { path }
            } else {
                VssError::Io(e)
            }
        })
    }

    /// Load a record file without item-file interpretation (project data
    /// files, names file).
    pub fn open_plain_record_file<R: ParseRecord>(
        &self,
        physical_name: &str,
        bucket: bool,
    ) -> VssResult<RecordFile<R>> {
        let data = self.open_data_file(physical_name, bucket)?;
        Ok(RecordFile::from_bytes(
            physical_name,
            self.data_path(physical_name, bucket),
            data,
            self.config.encoding,
            self.config.lenient_crc,
        ))
    }

    fn load_item_record_file(&self, physical_name: &str) -> VssResult<RecordFile<ItemRecord>> {
        self.open_plain_record_file(physical_name, true)
    }

    /// Open (or fetch from cache) a file item file.
    pub fn open_file_item(&self, physical_name: &PhysicalName) -> VssResult<Arc<FileItemFile>> {
        if let Some(item) = self.file_items.read().get(physical_name.as_str()) {
            return Ok(Arc::clone(item));
        }
        let file = self.load_item_record_file(physical_name.as_str())?;
        let item = Arc::new(FileItemFile::new(file, self.config.ignore_unknown)?);
        self.file_items
            .write()
            .insert(physical_name.as_str().to_string(), Arc::clone(&item));
        Ok(item)
    }

    /// Open (or fetch from cache) a project item file.
    pub fn open_project_item(
        &self,
        physical_name: &PhysicalName,
    ) -> VssResult<Arc<ProjectItemFile>> {
        if let Some(item) = self.project_items.read().get(physical_name.as_str()) {
            return Ok(Arc::clone(item));
        }
        let file = self.load_item_record_file(physical_name.as_str())?;
        let item = Arc::new(ProjectItemFile::new(file, self.config.ignore_unknown)?);
        self.project_items
            .write()
            .insert(physical_name.as_str().to_string(), Arc::clone(&item));
        Ok(item)
    }

    /// The overflow-names file, loaded on first use. A database without one
    /// simply resolves every name to its short form.
    pub fn name_file(&self) -> Option<Arc<NameFile>> {
        if let NameFileState::Loaded(names) = &*self.name_file.read() {
            return Some(Arc::clone(names));
        }
        if matches!(&*self.name_file.read(), NameFileState::Missing) {
            return None;
        }

        let loaded = self
            .open_plain_record_file(Self::NAMES_FILE, false)
            .and_then(|file| NameFile::new(file).map_err(VssError::from));
        match loaded {
            Ok(names) => {
                let names = Arc::new(names);
                *self.name_file.write() = NameFileState::Loaded(Arc::clone(&names));
                Some(names)
            }
            Err(e) => {
                warn!("names file unavailable: {e}");
                *self.name_file.write() = NameFileState::Missing;
                None
            }
        }
    }

    /// The authoritative display name for an embedded name, decoded.
    pub fn long_name(&self, name: &VssName) -> String {
        let bytes = if name.name_file_offset == 0 {
            name.short_name.clone()
        } else {
            match self.name_file() {
                Some(names) => names.get_long_name(name),
                None => name.short_name.clone(),
            }
        };
        self.config.encoding.decode(&bytes)
    }

    /// Open the root project, optionally building the whole logical tree.
    pub fn open_root_project(&self, recursive: bool) -> VssResult<VssProject> {
        VssProject::open(
            self,
            self.config.root_project_file.clone(),
            Self::ROOT_PROJECT_NAME.to_string(),
            ProjectEntryFlags::default(),
            recursive,
        )
    }
}
