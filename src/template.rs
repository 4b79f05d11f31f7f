#[path = "template/types.rs"]
mod types;

#[path = "template/processor.rs"]
mod processor;

#[path = "template/library.rs"]
mod library;

pub use library::TemplateLibrary;
pub use processor::TemplateProcessor;
pub use types::{
    ContextSpec, Extras, HttpMethod, HttpRequest, ParsedResponse, RequestSpec, ResponseSpec,
    Template,
};
