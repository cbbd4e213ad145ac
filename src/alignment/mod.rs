pub mod decision;
pub mod lexical;
pub(crate) mod prepared;
pub mod report;
pub(crate) mod scoring;
pub(crate) mod search;
pub mod timestamp;
