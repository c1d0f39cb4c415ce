pub mod catalog;
pub mod engine;
pub mod envelope;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod query;
pub mod redact;
pub mod request;
pub mod store;

pub use catalog::{describe, MetadataDescriptor, MetadataType, RequestedType};
pub use engine::TuningEngine;
pub use envelope::{EnvelopeData, FanOutBuilder, ResultEnvelope, Status};
pub use error::{ErrorKind, TuningError, TuningResult};
pub use query::{ColumnName, Statement};
pub use request::TuningRequest;
pub use store::{DataStore, QueryMode, QueryOutcome, Row};
