pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod sql;
pub mod typescript;

pub use error::{GatewayError, Result, RpcError};
pub use logging::{CorrelationId, LogConfig, LogContext, LogFormat, init_logging, init_server_logging};
pub use model::{
    BucketOperation, BucketPolicy, DatabaseColumn, EdgeFunction, ForeignKey, ForeignKeyReference,
    PolicyCommand, RlsPolicy, SchemaData, SchemaRow, StorageBucket, TableSchema,
    group_schema_rows,
};
pub use naming::snake_to_pascal;
pub use sql::{is_read_only, qualified_name, quote_ident, quote_literal, schema_or_default};
pub use typescript::{ColumnInfo, TableInfo, render_interfaces, render_stub_interfaces, ts_type_for};
