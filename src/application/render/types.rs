use thiserror::Error;

/// A heading encountered during the AST walk, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingAnchor {
    pub level: u8,
    pub slug: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    pub headings: Vec<HeadingAnchor>,
    pub contains_code: bool,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("highlighting `{language}` failed: {message}")]
    Highlighting { language: String, message: String },
    #[error("html post-processing failed: {message}")]
    Postprocess { message: String },
}
