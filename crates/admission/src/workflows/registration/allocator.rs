use super::domain::RegistrationNumber;

/// Highest sequence a four-digit registration number can carry.
pub const MAX_SEQUENCE: u32 = 9999;

/// Produces the next registration number for a given year.
///
/// Implementations must make the increment-and-read atomic: two concurrent
/// callers may never receive the same number for the same year, and numbers
/// are never reused even when a draft is later abandoned.
pub trait RegistrationNumberAllocator: Send + Sync {
    fn next(&self, year: i32) -> Result<RegistrationNumber, AllocatorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    #[error("registration sequence exhausted for {year}")]
    Exhausted { year: i32 },
    #[error("registration counter unavailable: {0}")]
    Unavailable(String),
}
