use std::fmt;

/// Build facts embedded by `build.rs`; `unknown` when the build script could
/// not determine them.
#[derive(Debug, Clone, Copy)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

impl BuildMetadata {
    /// Label/value pairs in display order.
    pub fn fields(&self) -> [(&'static str, String); 5] {
        [
            ("Build hash", format!("{} ({})", self.git_hash, self.git_status)),
            ("Built at", self.timestamp.to_string()),
            ("Target", self.target.to_string()),
            ("Profile", self.profile.to_string()),
            ("Rustc", self.rustc.to_string()),
        ]
    }
}

impl fmt::Display for BuildMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.git_hash)
    }
}

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("WARDROBE_BUDGET_BUILD_HASH").unwrap_or("unknown"),
        git_status: option_env!("WARDROBE_BUDGET_BUILD_STATUS").unwrap_or("unknown"),
        timestamp: option_env!("WARDROBE_BUDGET_BUILD_TIMESTAMP").unwrap_or("unknown"),
        target: option_env!("WARDROBE_BUDGET_BUILD_TARGET").unwrap_or("unknown"),
        profile: option_env!("WARDROBE_BUDGET_BUILD_PROFILE").unwrap_or("unknown"),
        rustc: option_env!("WARDROBE_BUDGET_BUILD_RUSTC").unwrap_or("unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_comes_from_the_package() {
        let meta = current();
        assert_eq!(meta.version, env!("CARGO_PKG_VERSION"));
        assert!(meta.to_string().starts_with(meta.version));
        assert_eq!(meta.fields()[0].0, "Build hash");
    }
}
