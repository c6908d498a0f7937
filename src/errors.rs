use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error kinds callers map to a status at the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unknown,
    BadInput,
    Forbidden,
    ServerConfig,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status for this kind.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::BadInput => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::Unknown | ErrorKind::ServerConfig | ErrorKind::Internal => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("[{module}] Not found: {message}")]
    NotFound { module: String, message: String },

    #[error("[{module}] Unknown error: {message}")]
    Unknown {
        module: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("[{module}] Bad input: {message}")]
    BadInput { module: String, message: String },

    #[error("[{module}] Forbidden: {message}")]
    Forbidden { module: String, message: String },

    #[error("[{module}] Server configuration error: {message}")]
    ServerConfig { module: String, message: String },

    #[error("[{module}] {message}")]
    Internal { module: String, message: String, data: Vec<String> },
}

impl StoreError {
    pub fn not_found(module: &str, message: impl Into<String>) -> Self {
        StoreError::NotFound { module: module.to_string(), message: message.into() }
    }

    pub fn unknown(module: &str, message: impl Into<String>) -> Self {
        StoreError::Unknown { module: module.to_string(), message: message.into(), source: None }
    }

    pub fn unknown_with(
        module: &str,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        StoreError::Unknown {
            module: module.to_string(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn bad_input(module: &str, message: impl Into<String>) -> Self {
        StoreError::BadInput { module: module.to_string(), message: message.into() }
    }

    pub fn forbidden(module: &str, message: impl Into<String>) -> Self {
        StoreError::Forbidden { module: module.to_string(), message: message.into() }
    }

    pub fn server_config(module: &str, message: impl Into<String>) -> Self {
        StoreError::ServerConfig { module: module.to_string(), message: message.into() }
    }

    pub fn internal(module: &str, message: impl Into<String>, data: Vec<String>) -> Self {
        StoreError::Internal { module: module.to_string(), message: message.into(), data }
    }

    /// Wraps a raw driver fault as `Unknown`, keeping the original cause.
    pub fn from_driver(module: &str, err: DriverError) -> Self {
        let message = err.to_string();
        Self::unknown_with(module, message, err)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Unknown { .. } => ErrorKind::Unknown,
            StoreError::BadInput { .. } => ErrorKind::BadInput,
            StoreError::Forbidden { .. } => ErrorKind::Forbidden,
            StoreError::ServerConfig { .. } => ErrorKind::ServerConfig,
            StoreError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    pub fn module(&self) -> &str {
        match self {
            StoreError::NotFound { module, .. }
            | StoreError::Unknown { module, .. }
            | StoreError::BadInput { module, .. }
            | StoreError::Forbidden { module, .. }
            | StoreError::ServerConfig { module, .. }
            | StoreError::Internal { module, .. } => module,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StoreError::NotFound { message, .. }
            | StoreError::Unknown { message, .. }
            | StoreError::BadInput { message, .. }
            | StoreError::Forbidden { message, .. }
            | StoreError::ServerConfig { message, .. }
            | StoreError::Internal { message, .. } => message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Raw faults surfaced by a store driver, before classification.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("client is closed")]
    Closed,
}
