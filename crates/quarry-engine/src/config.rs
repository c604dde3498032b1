//! Compiler configuration.

/// Compiler configuration.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// The reserved element that stores discriminators.
    pub discriminator_element: String,

    /// Maximum expression nesting accepted before compilation is refused.
    pub max_depth: usize,

    /// Whether synthesized patterns let `.` match line terminators (the `s` option).
    pub dot_matches_newline: bool,

    /// Whether every assembled filter is logged at INFO level.
    pub log_compiled_queries: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            discriminator_element: "_t".to_string(),
            max_depth: 256,
            dot_matches_newline: true,
            log_compiled_queries: false,
        }
    }
}

impl CompilerConfig {
    /// Sets the discriminator element name.
    #[must_use]
    pub fn with_discriminator_element(mut self, name: impl Into<String>) -> Self {
        self.discriminator_element = name.into();
        self
    }

    /// Sets the maximum expression depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Disables the `s` option on synthesized patterns.
    #[must_use]
    pub fn without_dot_matches_newline(mut self) -> Self {
        self.dot_matches_newline = false;
        self
    }

    /// Enables logging of every compiled filter.
    #[must_use]
    pub fn with_compile_logging(mut self) -> Self {
        self.log_compiled_queries = true;
        self
    }

    /// Returns the option letters every synthesized pattern carries.
    #[must_use]
    pub(crate) fn base_regex_options(&self) -> &'static str {
        if self.dot_matches_newline { "s" } else { "" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let config = CompilerConfig::default()
            .with_discriminator_element("kind")
            .with_max_depth(16)
            .with_compile_logging();
        assert_eq!(config.discriminator_element, "kind");
        assert_eq!(config.max_depth, 16);
        assert!(config.log_compiled_queries);
        assert_eq!(config.base_regex_options(), "s");
        assert_eq!(
            config.without_dot_matches_newline().base_regex_options(),
            ""
        );
    }
}
