use super::*;

// Schema utility helpers are split by concern for easier maintenance.
include!("schema_utils/naming_and_sql.rs");
include!("schema_utils/ddl_schema.rs");
include!("schema_utils/json_schema.rs");
