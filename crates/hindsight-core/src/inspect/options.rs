//! Inspection options.

/// Caller-supplied knobs for one `inspect`/`describe` call
///
/// The struct is hashed into the engine's memo key, so two calls share a
/// cached result only when every option matches.
///
/// ## Example
///
/// ```rust
/// use hindsight_core::inspect::InspectOptions;
///
/// let options = InspectOptions {
///     detailed: true,
///     limit: 10,
///     ..InspectOptions::default()
/// };
/// assert_eq!(options.max_text_length, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InspectOptions
{
    /// Expand collections and nested objects instead of a one-line summary.
    pub detailed: bool,
    /// Cap on displayed string characters (and on text-mode collections).
    pub max_text_length: usize,
    /// First item of the pagination window.
    pub current: usize,
    /// Number of items in the window; `0` means "to the end".
    pub limit: usize,
    /// Print the map pointer next to each object address.
    pub include_map_address: bool,
    /// Attach the function's source text to function results.
    pub include_source_text: bool,
    /// How many levels of children are themselves decoded detailed.
    pub depth: u32,
    /// Set on options derived for child values.
    pub nested: bool,
}

impl Default for InspectOptions
{
    fn default() -> Self
    {
        Self {
            detailed: false,
            max_text_length: 100,
            current: 0,
            limit: 0,
            include_map_address: false,
            include_source_text: false,
            depth: 0,
            nested: false,
        }
    }
}

impl InspectOptions
{
    /// Options for a child value: a fresh window, detailed only while depth remains.
    #[must_use]
    pub fn child(&self) -> Self
    {
        Self {
            detailed: self.depth > 0,
            max_text_length: self.max_text_length,
            current: 0,
            limit: self.limit,
            include_map_address: false,
            include_source_text: false,
            depth: self.depth.saturating_sub(1),
            nested: true,
        }
    }

    /// The same options reduced to a one-line summary.
    #[must_use]
    pub fn summary(&self) -> Self
    {
        Self {
            detailed: false,
            depth: 0,
            ..self.child()
        }
    }

    /// Options as used by text rendering: unbounded windows are capped at
    /// `max_text_length` items.
    #[must_use]
    pub fn for_text(&self) -> Self
    {
        let mut options = self.clone();
        if options.limit == 0 {
            options.limit = options.max_text_length;
        }
        options
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_child_defaults_to_summary()
    {
        let parent = InspectOptions {
            detailed: true,
            current: 5,
            limit: 3,
            include_map_address: true,
            ..InspectOptions::default()
        };
        let child = parent.child();
        assert!(!child.detailed);
        assert_eq!(child.current, 0);
        assert_eq!(child.limit, 3);
        assert!(!child.include_map_address);
        assert!(child.nested);
    }

    #[test]
    fn test_depth_expands_children()
    {
        let parent = InspectOptions {
            detailed: true,
            depth: 2,
            ..InspectOptions::default()
        };
        let child = parent.child();
        assert!(child.detailed);
        assert_eq!(child.depth, 1);
        assert!(child.child().detailed);
        assert!(!child.child().child().detailed);
    }

    #[test]
    fn test_text_caps_unbounded_window()
    {
        let options = InspectOptions::default().for_text();
        assert_eq!(options.limit, 100);
        let bounded = InspectOptions {
            limit: 7,
            ..InspectOptions::default()
        };
        assert_eq!(bounded.for_text().limit, 7);
    }
}
