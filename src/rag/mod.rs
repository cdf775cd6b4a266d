// src/rag/mod.rs
// Retrieval-augmented query stack: embeddings, brute-force index,
// generation collaborator, and the query/report service on top.
pub mod embed;
pub mod generate;
pub mod index;
pub mod service;
