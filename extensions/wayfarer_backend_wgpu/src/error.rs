//! Backend creation errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

pub type Result<T> = std::result::Result<T, BackendError>;
