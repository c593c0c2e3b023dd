// Keep app-open concerns split by responsibility to keep API evolution manageable.
include!("app_open/types_and_tx.rs");
include!("app_open/constructors_and_retry.rs");
include!("app_open/open_collections.rs");
include!("app_open/schema_rest.rs");
include!("app_open/transactions.rs");
