use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Blocking fetcher for files in a rule bundle, addressed relative to the bundle root.
pub trait RuleSource: Send + Sync {
    fn fetch(&self, path: &str) -> Result<String, SourceError>;

    /// Human-readable location used in logs.
    fn location(&self) -> String;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unable to load {resource} ({status}).")]
    Status { resource: String, status: u16 },
    #[error("Unable to load {resource} ({message}).")]
    Transport { resource: String, message: String },
    #[error("Unable to load {resource} ({source}).")]
    Io {
        resource: String,
        #[source]
        source: io::Error,
    },
    #[error("Rule bundle path {0} escapes the bundle root.")]
    InvalidPath(String),
}

/// Fetches bundle files over HTTP(S).
pub struct HttpSource {
    base: String,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSource")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl RuleSource for HttpSource {
    fn fetch(&self, path: &str) -> Result<String, SourceError> {
        let url = self.url(path);
        match self.agent.get(&url).call() {
            Ok(response) => response.into_string().map_err(|source| SourceError::Io {
                resource: path.to_string(),
                source,
            }),
            Err(ureq::Error::Status(status, _)) => Err(SourceError::Status {
                resource: path.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => Err(SourceError::Transport {
                resource: path.to_string(),
                message: transport.to_string(),
            }),
        }
    }

    fn location(&self) -> String {
        self.base.clone()
    }
}

/// Reads bundle files from a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SourceError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl RuleSource for DirectorySource {
    fn fetch(&self, path: &str) -> Result<String, SourceError> {
        let file = self.resolve(path)?;
        std::fs::read_to_string(&file).map_err(|source| SourceError::Io {
            resource: path.to_string(),
            source,
        })
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
