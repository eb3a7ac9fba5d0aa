//! reqtrace-core - Core library for requirements traceability
//!
//! This crate provides the building blocks for:
//! - Parsing requirement identifiers (`FR:auth.login`, `FR:my-feature/auth.login`)
//! - Extracting requirement definitions from `<root>/<scope>/spec.md` documents
//! - Extracting `@req` annotations from comments in source and test files
//! - Computing a coverage report over definitions, annotations and tasks
//!
//! # Features
//!
//! - `walk` - Enable [`WalkSources`] and [`scan_directory`] for gitignore-aware directory walking (brings in `ignore` and `globset`)
//! - `parallel` - Enable parallel extraction (brings in `rayon`)
//!
//! # Declaring requirements
//!
//! Requirements are markdown bullets in a `spec.md` file. The directory the
//! file lives in is the scope of every requirement it declares:
//!
//! ```markdown
//! - **FR:auth.session**: Sessions MUST expire after 90 minutes
//!   - **FR:auth.session.expiry**: [deferred] Configurable expiry
//! ```
//!
//! # Annotating code
//!
//! ```rust
//! // @req FR:my-feature/auth.session
//! // @req:partial FR:my-feature/auth.session.expiry
//! ```
//!
//! # Computing coverage
//!
//! ```
//! use reqtrace_core::{Annotations, CoverageReport, MemorySources, SpecParser};
//! use std::path::Path;
//!
//! let definitions = SpecParser::parse_content(
//!     "- **FR:auth.session**: Sessions MUST expire\n",
//!     "my-feature",
//!     Path::new("specs/my-feature/spec.md"),
//! );
//!
//! let annotations = Annotations::extract(
//!     MemorySources::new()
//!         .add("src/session.rs", "// @req FR:my-feature/auth.session")
//!         .add_test("tests/session.rs", "// @req FR:my-feature/auth.session"),
//! )
//! .unwrap();
//!
//! let report = CoverageReport::compute(&definitions, &annotations.annotations, &[]);
//! assert_eq!(report.summary.test_coverage, 100);
//! ```

mod coverage;
mod lexer;
pub mod req_id;
mod sources;
mod spec;
mod task;

pub use coverage::{
    CoverageReport, CoverageStatus, CoverageSummary, DuplicateDefinition, OrphanedAnnotation,
    RequirementCoverage,
};
pub use lexer::{Annotations, RequirementAnnotation};
pub use req_id::{RequirementId, RequirementType};
pub use sources::{MemorySources, PathSources, ScanOptions, Sources, is_test_path};
pub use spec::{LifecycleState, RequirementDefinition, SPEC_FILE_NAME, SpecParser};
pub use task::TaskReference;

#[cfg(feature = "walk")]
pub use sources::{WalkSources, scan_directory};
