pub mod core;
pub mod graph;
pub mod llm;
pub mod rag;
pub mod schema;
pub mod server;
pub mod state;
