use super::*;

// Heterogeneous collection internals are split by concern for maintainability.
include!("hetero_vec_impl/basics_and_registration.rs");
include!("hetero_vec_impl/collection_mutations.rs");
include!("hetero_vec_impl/runtime_ops.rs");
include!("hetero_vec_impl/snapshot_restore.rs");
