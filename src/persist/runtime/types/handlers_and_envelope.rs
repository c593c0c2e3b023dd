// Types for message handling and side effects in the runtime.

include!("handlers_and_envelope/handler_types.rs");
include!("handlers_and_envelope/envelope_and_side_effects.rs");
include!("handlers_and_envelope/payload_schema.rs");
