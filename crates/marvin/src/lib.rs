// crates/marvin/src/lib.rs

pub mod api;
pub mod auth;
pub mod classifier;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod metrics;
pub mod prompts;
pub mod retrieval;
pub mod server;
pub mod shared_state;
pub mod store;
pub mod telemetry;
pub mod utils;

// Public API exports
pub use config::{BackendMode, Config};
pub use server::{build_router, run_server};
pub use shared_state::AppState;

pub use auth::{Authenticator, StaticTokenAuthenticator, SupabaseAuthenticator};
pub use classifier::{detect_consciousness_level, extract_insights, ConsciousnessLevel, Insights};
pub use completion::{CompletionBackend, CompletionOptions, OpenAiClient};
pub use conversation::{assemble_conversation, ChatEntry};
pub use store::{InMemoryStore, SessionStore, SupabaseStore};
