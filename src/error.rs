pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("kernel build failed for `{kernel}`:\n{log}")]
    KernelBuild { kernel: String, log: String },

    #[error("kernel `{kernel}` not found in compiled program")]
    KernelNotFound { kernel: String },

    #[error("device error: {0}")]
    Device(String),

    #[error("{function}: {message}")]
    ShapeMismatch { function: String, message: String },

    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("device context not initialized")]
    NotInitialized,

    #[error("already initialized")]
    AlreadyInitialized,

    #[cfg(feature = "telemetry")]
    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kernel_build<S: Into<String>, L: Into<String>>(kernel: S, log: L) -> Self {
        Error::KernelBuild {
            kernel: kernel.into(),
            log: log.into(),
        }
    }

    pub fn kernel_not_found<S: Into<String>>(kernel: S) -> Self {
        Error::KernelNotFound {
            kernel: kernel.into(),
        }
    }

    pub fn device<S: Into<String>>(msg: S) -> Self {
        Error::Device(msg.into())
    }

    pub fn shape_mismatch<F: Into<String>, S: Into<String>>(function: F, msg: S) -> Self {
        Error::ShapeMismatch {
            function: function.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_argument<F: Into<String>, S: Into<String>>(function: F, msg: S) -> Self {
        Error::InvalidArgument {
            function: function.into(),
            message: msg.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    #[cfg(feature = "telemetry")]
    pub fn telemetry<S: Into<String>>(msg: S) -> Self {
        Error::Telemetry(msg.into())
    }

    /// Build log carried by a [`Error::KernelBuild`], if any.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            Error::KernelBuild { log, .. } => Some(log),
            _ => None,
        }
    }
}

#[cfg(feature = "opencl")]
impl From<ocl::Error> for Error {
    fn from(e: ocl::Error) -> Self {
        Error::Device(e.to_string())
    }
}
