//! Body rendering seam.
//!
//! Converting body markup into display markup is not the engine's concern;
//! the `body` column is produced through this trait so an application can
//! plug in its own renderer (Markdown, Textile, anything).

/// Renders raw body text into the form stored in the `body` column.
pub trait BodyRenderer {
    fn render(&self, raw: &str) -> String;
}

/// Stores body text unchanged. The default when no renderer is wired in.
pub struct PassthroughRenderer;

impl BodyRenderer for PassthroughRenderer {
    fn render(&self, raw: &str) -> String {
        raw.to_string()
    }
}
