pub mod types;
pub mod text;
pub mod metadata;
pub mod sections;
pub mod redact; // Outbound PHI scrubbing
pub mod simplify;
pub mod summary; // Optional language-model provider
pub mod fallback;
pub mod annotate;
pub mod assemble;
pub mod processor;
pub mod phi_audit;

pub use processor::ReportProcessor;
pub use types::*;
