/*!
 * Monitoring
 * Structured tracing for pipe operations
 */

mod tracer;

pub use tracer::{init_tracing, span_operation, OperationSpan};
