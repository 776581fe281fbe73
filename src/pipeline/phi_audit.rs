// PHI audit: static tests that scan every Rust source file for tracing calls
// that would write report text or patient identifiers into the logs.
