//! Request translation for the Supagate server
//!
//! Every `/v1` operation is handled by one of the services below. A service
//! validates the request, builds the SQL or PostgREST call it maps to, and runs
//! it through a [`Backend`]. Services hold no state of their own.

// Declare submodules
pub mod client;
pub mod edge_function;
pub mod error;
pub mod policy;
pub mod response;
pub mod schema;
pub mod specification;
pub mod storage;
pub mod table;

// Re-export commonly used types for convenience
pub use client::{Backend, Filter, FilterOperator, SelectRequest, SupabaseClient};
pub use edge_function::{EdgeFunctionResponse, EdgeFunctionService};
pub use error::{ApiError, ErrorResponse};
pub use policy::PolicyService;
pub use response::{ImplementationNeeded, MutationResponse};
pub use schema::SchemaService;
pub use specification::{OperationSpec, Specification};
pub use storage::StorageService;
pub use table::{AlterTableResponse, ListingStrategy, TableService, TypesResponse};
