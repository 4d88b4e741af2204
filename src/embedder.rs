//! Embedder contracts consumed by the query engine and ingestion pipeline.
//!
//! Concrete providers (remote APIs, local models, image encoders) live outside
//! this crate; the core only depends on these traits. Implementations must be
//! thread-safe and hold no process-wide state beyond client configuration.

use crate::Result;

/// Produces a fixed-length embedding for a text input.
pub trait Embedder: Send + Sync {
    /// Embeds the given text, or fails with an `embedder_error`.
    fn embed(&self, text: &str) -> Result<Vec<f64>>;

    /// Opaque identifier for this embedder (recorded as the model tag on
    /// persisted embeddings).
    fn name(&self) -> &str;

    /// Capability inspection: returns the multimodal extension when this
    /// embedder also supports image input. The default advertises none.
    fn as_multimodal(&self) -> Option<&dyn MultimodalEmbedder> {
        None
    }
}

/// Extension for embedders that map text and images into the same vector
/// space.
pub trait MultimodalEmbedder: Embedder {
    /// Embeds the image at the given path, or fails with an `embedder_error`.
    fn embed_image(&self, image_path: &str) -> Result<Vec<f64>>;

    /// The embedding dimension this embedder produces.
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TextOnly;

    impl Embedder for TextOnly {
        fn embed(&self, text: &str) -> Result<Vec<f64>> {
            Ok(vec![text.len() as f64])
        }

        fn name(&self) -> &str {
            "text-only"
        }
    }

    struct Clip;

    impl Embedder for Clip {
        fn embed(&self, _text: &str) -> Result<Vec<f64>> {
            Ok(vec![1.0, 0.0])
        }

        fn name(&self) -> &str {
            "clip"
        }

        fn as_multimodal(&self) -> Option<&dyn MultimodalEmbedder> {
            Some(self)
        }
    }

    impl MultimodalEmbedder for Clip {
        fn embed_image(&self, _image_path: &str) -> Result<Vec<f64>> {
            Ok(vec![0.0, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_default_capability_is_text_only() {
        assert!(TextOnly.as_multimodal().is_none());
    }

    #[test]
    fn test_multimodal_capability_advertised() {
        let clip = Clip;
        let mm = clip.as_multimodal().expect("clip supports images");
        assert_eq!(mm.dimensions(), 2);
        assert_eq!(mm.embed_image("photo.jpg").unwrap(), vec![0.0, 1.0]);
    }
}
