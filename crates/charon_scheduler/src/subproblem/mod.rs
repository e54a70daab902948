pub mod extractor;
pub mod merge;
