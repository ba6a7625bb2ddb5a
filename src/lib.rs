pub mod cli;
pub mod core;
pub mod embedding;
pub mod llm;
pub mod planner;
pub mod rag;
pub mod search;
pub mod server;
pub mod state;
pub mod vector_math;
