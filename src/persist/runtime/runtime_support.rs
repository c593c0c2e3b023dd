// Runtime support layer keeps non-core impl helpers outside `runtime.rs`.

include!("support/helpers.rs");
include!("support/worker.rs");
include!("support/compat.rs");
