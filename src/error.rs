use std::path::PathBuf;

/// All errors produced by a migration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not a git repository: {0}")]
    NotARepo(String),

    #[error("already locked: {0}")]
    AlreadyLocked(String),

    #[error("destination already has history: {0}")]
    RepoExists(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("lock failed: {0}")]
    Lock(String),

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("git error: {0}")]
    Git(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn not_a_repo(msg: impl Into<String>) -> Self {
        Self::NotARepo(msg.into())
    }

    pub fn already_locked(msg: impl Into<String>) -> Self {
        Self::AlreadyLocked(msg.into())
    }

    pub fn repo_exists(msg: impl Into<String>) -> Self {
        Self::RepoExists(msg.into())
    }

    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists(path.into().display().to_string())
    }

    pub fn branch_exists(name: impl Into<String>) -> Self {
        Self::BranchExists(name.into())
    }

    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn git(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Git(Box::new(err))
    }

    pub fn git_msg(msg: impl Into<String>) -> Self {
        Self::Git(msg.into().into())
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.into().display(), err),
        ))
    }

    /// `true` for the informational "hook already installed" signal.
    pub fn is_already_locked(&self) -> bool {
        matches!(self, Self::AlreadyLocked(_))
    }

    /// HTTP status of a hosting API failure, if this is one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Self::git(err)
    }
}
