//! Failure classification for ZMS calls.
//!
//! Only the structured status code is inspected: 404 means the entity is
//! absent, everything else (other codes, transport and decode failures) is an
//! opaque failure that must reach the caller unchanged.

use zmsync_client::{ClientError, ClientResult};

/// Category of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Other,
}

pub fn classify(err: &ClientError) -> ErrorClass {
    match err.code() {
        Some(404) => ErrorClass::NotFound,
        _ => ErrorClass::Other,
    }
}

/// Outcome of a read where absence is a legitimate answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

/// Fold a 404 into [`Lookup::Absent`]; pass every other failure through.
pub fn lookup<T>(result: ClientResult<T>) -> Result<Lookup<T>, ClientError> {
    match result {
        Ok(value) => Ok(Lookup::Found(value)),
        Err(err) => match classify(&err) {
            ErrorClass::NotFound => Ok(Lookup::Absent),
            ErrorClass::Other => Err(err),
        },
    }
}
