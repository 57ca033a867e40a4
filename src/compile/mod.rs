// src/compile/mod.rs

pub mod backend;
pub mod build_info;
pub mod simple;

pub use backend::{EmitOutput, EmittedFile, Program, ProgramBuilder};
pub use build_info::BuildInfo;
pub use simple::SimpleProgramBuilder;
