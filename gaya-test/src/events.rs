use std::fmt::Display;

use tracing_subscriber::{
    Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Type of event to trace.
#[derive(Clone, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum TraceEvent {
    /// Traces listing of the fixture directory.
    #[clap(name = "discovery")]
    Discovery,
    /// Traces classification of fixtures by their first line.
    #[clap(name = "expectation")]
    Expectation,
    /// Traces runs of the executable under test.
    #[clap(name = "execution")]
    Execution,
    /// Traces scheduling of fixtures.
    #[clap(name = "runner")]
    Runner,
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Expectation => write!(f, "expectation"),
            Self::Execution => write!(f, "execution"),
            Self::Runner => write!(f, "runner"),
        }
    }
}

/// Installs a stderr logger. `verbose` raises the default level from WARN to INFO;
/// each enabled event additionally gets DEBUG output.
pub(crate) fn init_tracing(enabled_events: &[TraceEvent], verbose: bool) {
    let filter = compose_filter(enabled_events, verbose);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_filter(filter);

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        // Something went wrong; proceed on anyway but complain audibly.
        eprintln!("warning: failed to initialize tracing.");
    }
}

fn compose_filter(enabled_events: &[TraceEvent], verbose: bool) -> Targets {
    let default_level = if verbose {
        tracing_subscriber::filter::LevelFilter::INFO
    } else {
        tracing_subscriber::filter::LevelFilter::WARN
    };

    let filter = Targets::new().with_default(default_level);

    filter.with_targets(
        enabled_events
            .iter()
            .map(|event| (event.to_string(), tracing::Level::DEBUG)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn enabled_events_get_debug_output() {
        let filter = compose_filter(&[TraceEvent::Execution], false);

        assert!(filter.would_enable("execution", &Level::DEBUG));
        assert!(!filter.would_enable("discovery", &Level::DEBUG));
        assert!(filter.would_enable("discovery", &Level::WARN));
        assert!(!filter.would_enable("discovery", &Level::INFO));
    }

    #[test]
    fn verbose_raises_default_level() {
        let filter = compose_filter(&[], true);

        assert!(filter.would_enable("runner", &Level::INFO));
        assert!(!filter.would_enable("runner", &Level::DEBUG));
    }
}
