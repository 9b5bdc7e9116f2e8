//! Interpreter and console configuration

/// Nested user-function calls allowed before a line fails with a stack
/// overflow error
pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;

/// Largest call depth a configuration accepts
pub const MAX_CALL_DEPTH_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_call_depth: usize,
    /// Colour console output
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            color: true,
        }
    }
}

impl Config {
    /// Depths above [`MAX_CALL_DEPTH_LIMIT`] are clamped to it
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth.min(MAX_CALL_DEPTH_LIMIT);
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_depth_is_clamped() {
        assert_eq!(Config::default().with_max_call_depth(64).max_call_depth, 64);
        assert_eq!(
            Config::default().with_max_call_depth(100_000).max_call_depth,
            MAX_CALL_DEPTH_LIMIT
        );
    }
}
