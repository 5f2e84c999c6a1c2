// Library exports for the joint-action search engine
// This allows the match runner, replay tool and tuning utilities to share the core logic

pub mod action;
pub mod arena;
pub mod assembler;
pub mod candidate;
pub mod config;
pub mod debug_logger;
pub mod engine;
pub mod error;
pub mod eval;
pub mod generator;
pub mod model;
pub mod pathfinding;
pub mod policy;
pub mod profiler;
pub mod replay;
pub mod rollout;
pub mod search;
pub mod types;
pub mod world;
