pub mod client_builder;
pub mod sse_parser;
