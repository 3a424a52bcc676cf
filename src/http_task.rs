//! HTTP task execution
//!
//! Turns a [`RequestDescription`] into a [`NormalizedResponse`], keeping
//! remote HTTP errors (recovered, with the real status) apart from transport
//! failures (propagated so the workflow engine can retry).

pub mod executor;
pub mod request;
pub mod response;

pub use executor::{HttpTaskExecutor, DEFAULT_MAX_IN_MEMORY_SIZE};
pub use request::RequestDescription;
pub use response::{NormalizedResponse, RemoteHttpError, ResponseBody};
