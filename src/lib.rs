pub mod analyzer;
pub mod api;
pub mod client;
pub mod config;
pub mod corpus;
pub mod indexer;
pub mod query_engine;
pub mod view;
