use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("dataset unavailable from {source_ref}: {reason}")]
    DataUnavailable { source_ref: String, reason: String },

    #[error("none of the name fields {candidates:?} exist in the dataset")]
    MissingNameField { candidates: Vec<String> },

    #[error("unsupported geometry format: {0}")]
    UnsupportedFormat(String),

    #[error("buffer distance {buffer_km} km is not an allowed value ({min}..={max} step {step})")]
    InvalidBuffer { buffer_km: u32, min: u32, max: u32, step: u32 },
}
