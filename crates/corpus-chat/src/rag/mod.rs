pub mod query_rewriter;
pub mod retriever;

pub use query_rewriter::QueryRewriter;
pub use retriever::Retriever;
