//! Transport boundary between the aggregation store and the remote service.

pub mod api;
pub mod remote;

pub use api::ApiClient;
pub use remote::{RemoteDataSource, StatementFile, UploadOutcome};
