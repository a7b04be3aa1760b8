use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Component, Path, PathBuf},
};
use tracing::debug;

/// Filesystem handle the chunker writes through.
pub trait BatchFs: Send + Sync {
    /// Create (or truncate) `name` and return a writable byte stream.
    fn open(&self, name: &str) -> io::Result<Box<dyn Write + Send>>;

    /// Location under which `name` can be retrieved later.
    fn url(&self, name: &str) -> io::Result<String>;
}

/// Where chunk files go: a root directory (plain path or `file://` URL) and
/// a prefix prepended to every file name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub root: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            prefix: None,
        }
    }
}

impl StorageConfig {
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// The prefix must stay below the storage root.
    pub fn check_prefix(&self) -> io::Result<()> {
        relative_name(self.prefix()).map(|_| ())
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(self.root.strip_prefix("file://").unwrap_or(&self.root))
    }

    /// Acquire a handle on the storage root, creating it if needed.
    pub fn fs(&self) -> io::Result<LocalFs> {
        LocalFs::open(self.root_path())
    }
}

/// Local directory storage.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        let root = fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> io::Result<PathBuf> {
        Ok(self.root.join(relative_name(name)?))
    }
}

fn relative_name(name: &str) -> io::Result<&Path> {
    let path = Path::new(name);
    match path
        .components()
        .find(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        None => Ok(path),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{name}' escapes the storage root"),
        )),
    }
}

impl BatchFs for LocalFs {
    fn open(&self, name: &str) -> io::Result<Box<dyn Write + Send>> {
        let path = self.path(name)?;
        // prefixes may contain directory separators
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("Opening chunk file {}", path.display());
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }

    fn url(&self, name: &str) -> io::Result<String> {
        Ok(format!("file://{}", self.path(name)?.display()))
    }
}
