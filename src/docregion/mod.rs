pub mod cache;
pub mod extractor;
pub mod matchers;
