// Answer generation module
// Single-turn chat completion against a hosted service

pub mod cohere;

pub use cohere::CohereClient;
