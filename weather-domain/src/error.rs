use thiserror::Error;

/// Failure raised by an injected collaborator.
///
/// Callers rarely match on the exact variant; they ask for the
/// [`ErrorClass`] and route on that. Classification is ordered by
/// specificity: connectivity first, protocol second, everything else
/// lands in the generic class.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote host could not be reached at all.
    #[error("host not reachable: {host}")]
    Connectivity { host: String },

    /// The host answered, but with a protocol-level failure.
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// Anything else: permission denials, decode failures, missing data.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    pub fn connectivity(host: impl Into<String>) -> Self {
        Self::Connectivity { host: host.into() }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(anyhow::anyhow!(message.into()))
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderError::Connectivity { .. } => ErrorClass::Connectivity,
            ProviderError::Http { .. } => ErrorClass::Protocol,
            ProviderError::Other(_) => ErrorClass::Generic,
        }
    }
}

/// The three failure classes the screen routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Connectivity,
    Protocol,
    Generic,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Connectivity => "connectivity",
            ErrorClass::Protocol => "protocol",
            ErrorClass::Generic => "generic",
        }
    }

    pub const fn all() -> &'static [ErrorClass] {
        &[
            ErrorClass::Connectivity,
            ErrorClass::Protocol,
            ErrorClass::Generic,
        ]
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
