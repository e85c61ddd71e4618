pub mod assign;
pub mod extract;
pub mod merge;
