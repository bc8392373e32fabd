use thiserror::Error;

/// Errors surfaced by snapshot save/load. Everything else on the public
/// surface is an ordinary return value: a full cache is `set` returning
/// `false`, a missing key is `None`.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem or stream error from save/load.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink rejected an item during save.
    #[error("snapshot encode failed: {0}")]
    Encode(#[source] bincode::Error),

    /// The source produced an undecodable record during load.
    #[error("snapshot decode failed: {0}")]
    Decode(#[source] bincode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
