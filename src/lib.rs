//! `toe`: generates test stubs for Go interfaces.
//!
//! - The loader reads a package directory with `goparser` and resolves
//!   interface method sets, embeds and generic instantiations included.
//! - The synthesizer turns the resolved interface into a syntax tree of
//!   call records, canned results and override hooks.
//! - The printer lays the tree out the way gofmt would.

pub mod config;
pub mod error;
pub mod goast;
pub mod imports;
pub mod loader;
pub mod model;
pub mod module;
pub mod naming;
pub mod orchestrator;
pub mod printer;
pub mod render;
pub mod resolver;
pub mod synth;

// Re-exports for convenience
pub use config::{FileConfig, Overrides, Settings};
pub use error::{Error, Phase, Result, StubError};
pub use naming::ResultNaming;
pub use orchestrator::{generate, write_stub, GenerateRequest, GeneratedStub};
