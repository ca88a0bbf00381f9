use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinderError {
    #[error("malformed date token: {0}")]
    MalformedDateToken(String),
    #[error("no relevant intervals for the requested window")]
    NoRelevantIntervals,
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderWarnCode {
    W001MalformedDate,
    W002InvalidDescriptor,
    W003UnreadableDir,
    W004RemoteFailed,
    W005InstallFailed,
    W006GenericDrs,
    W007DataGaps,
    W008ManifestLine,
    W009IgnoredFlag,
}

impl FinderWarnCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::W001MalformedDate => "W001_MALFORMED_DATE_TOKEN",
            Self::W002InvalidDescriptor => "W002_INVALID_DESCRIPTOR",
            Self::W003UnreadableDir => "W003_UNREADABLE_DIR",
            Self::W004RemoteFailed => "W004_REMOTE_SEARCH_FAILED",
            Self::W005InstallFailed => "W005_REMOTE_INSTALL_FAILED",
            Self::W006GenericDrs => "W006_GENERIC_DRS",
            Self::W007DataGaps => "W007_DATA_GAPS",
            Self::W008ManifestLine => "W008_MANIFEST_LINE",
            Self::W009IgnoredFlag => "W009_IGNORED_FLAG",
        }
    }
}
