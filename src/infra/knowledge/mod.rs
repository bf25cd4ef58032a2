// Adapters for the KnowledgeSource port. The site serves the documents as
// static assets, so they can be read straight from disk or fetched over HTTP.

pub mod file_source;
pub mod http_source;

pub use file_source::FileKnowledgeSource;
pub use http_source::HttpKnowledgeSource;
