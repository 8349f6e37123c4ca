pub mod config;
pub mod errors;
pub mod generator;
pub mod init;
pub mod interpreter;
pub mod rewrite;
pub mod state;

// Re-export main types
pub use errors::EngineError;
pub use generator::{AsyncGenerator, FrameOracle, Generator, GeneratorImage, GeneratorState, Resume, Snapshot};
pub use interpreter::{ExcVal, Val};
pub use rewrite::{normalize, NormalizedProgram};

// Re-export init API for convenience
pub use init::{initialize, InitBuilder, InitOptions};
