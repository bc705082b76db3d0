//! Talking to the search backend
//!
//! ```text
//! QueryExecutor::execute ──► raw JSON ──► mapper::map_response ──► Vec<EventRecord>
//! ```

pub mod executor;
pub mod mapper;

pub use executor::QueryExecutor;
pub use mapper::map_response;
