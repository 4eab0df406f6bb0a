mod catalog;
mod definitions;
mod dispatcher;
mod service;

pub use catalog::{Catalog, CatalogService, Movie, Review, Screening, Theater};
pub use definitions::{format_tools_for_llm, review_tool_definition, KnownFunction};
pub use dispatcher::Dispatcher;
pub use service::MovieService;
