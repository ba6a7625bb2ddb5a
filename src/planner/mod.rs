//! Date planning: prompts, seeding and the retrieval-augmentation loop.

pub mod orchestrator;
pub mod prompts;
pub mod seed;
pub mod types;

pub use orchestrator::{DatingPlanner, PlannerOptions};
pub use seed::{seed_knowledge_base, SeedReport};
pub use types::{AgentStatus, PlanningResult, SourceDocument};
