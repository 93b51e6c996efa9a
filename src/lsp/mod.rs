pub mod backend;
pub mod document;
pub mod intellisense;
