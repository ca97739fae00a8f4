pub mod doc_ops;
pub mod entries;
