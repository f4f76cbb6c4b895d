use thiserror::Error;

/// A notifier backend rejected or never received a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    #[error("request to {backend} failed: {message}")]
    Request { backend: String, message: String },

    #[error("{backend} answered with status {status}")]
    Status { backend: String, status: u16 },

    #[error("could not encode {backend} payload: {message}")]
    Encode { backend: String, message: String },
}
