//! Session helpers

/// @req:partial NFR:sample-feature/perf.login-latency
pub fn warm_cache() {}

// @req FR:sample-feature/auth.nonexistent
pub fn unknown() {}

/* @req FR:sample-feature/auth.nonexistent, FR:Sample/bad */
pub fn also_unknown() {}
