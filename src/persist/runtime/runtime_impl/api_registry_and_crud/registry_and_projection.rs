// Runtime registry/projection internals are split by concern.

include!("registry_and_projection/deterministic_registry.rs");
include!("registry_and_projection/migration_registry.rs");
include!("registry_and_projection/runtime_closure_and_projection.rs");
