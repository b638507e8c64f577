//! Подготовка текста сценария к озвучиванию

pub mod chunker;

pub use chunker::{chunk_script, normalize_script, split_sentences};
