//! Error taxonomy for the engine.
//!
//! Errors fall into three groups:
//!
//! - **Fatal**: [`ContextError`] and [`ShaderError`]. They abort the scene. The
//!   controller tears itself down before handing one back.
//! - **Degraded**: [`LoadError`] and [`MediaError`] for textures. They are logged
//!   and the texture keeps showing its placeholder.
//! - **Contract violations**: [`ContractViolation`]. A call was made with a handle
//!   that does not exist yet. These point at lifecycle-ordering bugs in a scene.

use crate::gpu::ShaderStage;

/// The graphics context could not be acquired.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no suitable graphics adapter: {0}")]
    Adapter(String),
    #[error("failed to create drawing surface: {0}")]
    Surface(String),
    #[error("failed to acquire device: {0}")]
    Device(String),
    #[error("graphics context unavailable: {0}")]
    Unavailable(String),
}

/// A byte fetch through an [`AssetSource`](crate::resources::AssetSource) failed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read '{locator}'")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no asset named '{0}'")]
    NotFound(String),
    #[error("'{0}' is not valid UTF-8")]
    Utf8(String),
    #[cfg(feature = "http")]
    #[error("request for '{locator}' failed")]
    Http {
        locator: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("asset source closed before '{0}' was delivered")]
    Cancelled(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("could not fetch sources of shader '{name}'")]
    Fetch {
        name: String,
        #[source]
        source: LoadError,
    },
    #[error("{stage:?} stage of shader '{name}' failed to compile:\n{diagnostic}")]
    Compile {
        name: String,
        stage: ShaderStage,
        diagnostic: String,
    },
    #[error("shader '{name}' failed to link:\n{diagnostic}")]
    Link { name: String, diagnostic: String },
    #[error("shaders still pending after timeout: {pending:?}")]
    Timeout { pending: Vec<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("could not decode image")]
    Decode(#[from] image::ImageError),
    #[error("unsupported video container: {0}")]
    UnsupportedVideo(String),
    #[error("video has no frames")]
    Empty,
}

/// An operation was invoked before the handle it needs was created.
#[derive(Debug, thiserror::Error)]
pub enum ContractViolation {
    #[error("{operation}('{name}') called without a linked program")]
    MissingProgram {
        operation: &'static str,
        name: String,
    },
    #[error("mesh '{0}' has no vertex array; buffers were not materialized")]
    MissingVertexArray(String),
    #[error("no {kind} named '{name}'")]
    UnknownEntry { kind: &'static str, name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error("could not present frame: {0}")]
    Present(String),
}

/// Everything a [`SceneController`](crate::flow::SceneController) can fail with.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("draw '{draw}' references unknown {kind} '{name}'")]
    UnresolvedName {
        draw: String,
        kind: &'static str,
        name: String,
    },
    #[error("draw id '{0}' declared more than once")]
    DuplicateDraw(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config")]
    Parse(#[from] toml::de::Error),
}
