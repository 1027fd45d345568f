use cardio_common::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("config error: {0}")]
    Config(String),

    #[error("upload error: {0}")]
    Upload(String),
}
