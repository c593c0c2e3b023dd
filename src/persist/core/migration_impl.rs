use super::*;

// Keep migration implementation split by concern to keep versioning logic maintainable.
include!("migration_impl/step_builder_and_debug.rs");
include!("migration_impl/plan_basics_and_validation.rs");
include!("migration_impl/plan_execution.rs");
