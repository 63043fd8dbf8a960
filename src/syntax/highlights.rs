//! Capture spans produced by highlight queries

/// A named span over the source text, in byte offsets.
///
/// Captures may overlap, nest, or repeat with identical bounds; none of that is
/// normalized away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Dot-namespaced token class (e.g. "keyword.return")
    pub name: String,
    /// Start byte (inclusive)
    pub start: usize,
    /// End byte (exclusive)
    pub end: usize,
}

impl Capture {
    pub fn new(name: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Whether the span covers no text
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// CSS class for this capture: dots become dashes
    pub fn class_name(&self) -> String {
        class_name_for(&self.name)
    }

    /// Captures named `_...` are private helpers of a query and never render.
    pub fn is_hidden(&self) -> bool {
        self.name.is_empty() || self.name.starts_with('_')
    }
}

/// CSS class for a capture name (e.g. "keyword.return" -> "keyword-return")
pub fn class_name_for(name: &str) -> String {
    name.replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name() {
        assert_eq!(Capture::new("keyword", 0, 3).class_name(), "keyword");
        assert_eq!(
            Capture::new("punctuation.bracket.round", 0, 1).class_name(),
            "punctuation-bracket-round"
        );
    }

    #[test]
    fn test_hidden_and_empty() {
        assert!(Capture::new("_name", 0, 1).is_hidden());
        assert!(!Capture::new("variable", 0, 1).is_hidden());
        assert!(Capture::new("variable", 2, 2).is_empty());
        assert!(!Capture::new("variable", 2, 3).is_empty());
    }
}
