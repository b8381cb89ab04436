use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Every failure kind the core pipeline can produce.
///
/// Fatal kinds (`DeviceOpen`, `FilterInstall`, `TokenizerEmpty`) are meant
/// to unwind all the way to `main` and end the process with a nonzero
/// exit code. The rest are recoverable: the packet loop logs them and
/// moves on to the next packet.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open capture device: {0}")]
    DeviceOpen(String),

    #[error("failed to install capture filter: {0}")]
    FilterInstall(String),

    #[error("packet matches neither side of the configured port: src={src_port} dst={dst_port}")]
    UnexpectedPorts { src_port: u16, dst_port: u16 },

    #[error("frame carve incomplete, buffer retained")]
    CarveIncomplete,

    #[error("flow desynchronized, state reset")]
    Desync,

    #[error("tokenizer called on empty input")]
    TokenizerEmpty,

    #[error("sink unavailable, record dropped: {0}")]
    SinkUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fatal kinds should terminate the process; everything else is
    /// handled inline by the packet loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DeviceOpen(_) | Error::FilterInstall(_) | Error::TokenizerEmpty
        )
    }
}
