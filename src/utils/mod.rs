pub mod build_info;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Default directive applied on top of `RUST_LOG`.
const DEFAULT_DIRECTIVE: &str = "wardrobe_budget=info";

/// Initializes the global tracing subscriber. Logs go to stderr so script
/// output on stdout stays machine-readable.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = DEFAULT_DIRECTIVE.parse() {
            filter = filter.add_directive(directive);
        }

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}
