use std::cell::Cell;

use log::{trace, SetLoggerError};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use crate::config::PARALLEL;

thread_local! {
    /// Nesting depth of the active tracers on this thread
    static TRACE_DEPTH: Cell<usize> = Cell::new(0);
}

/// Span of trace output, closed when dropped
pub struct Tracer {
    title: String,
    depth: Option<usize>,
}

impl Tracer {
    /// Open a span
    pub fn new<S: Into<String>>(title: S) -> Self {
        let title = title.into();

        // interleaved workers make the nesting meaningless
        let depth = if *PARALLEL {
            None
        } else {
            let level = TRACE_DEPTH.with(|depth| depth.replace(depth.get() + 1));
            trace!("{}-> {}", "  ".repeat(level), title);
            Some(level)
        };
        Self { title, depth }
    }

    pub fn log(&self, event: &str) {
        match &self.depth {
            None => trace!("[{}] {}", self.title, event),
            Some(level) => trace!("{}   {}", "  ".repeat(*level), event),
        }
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        let Self { title, depth } = self;
        if let Some(level) = depth {
            trace!("{}<- {}", "  ".repeat(*level), title);
            TRACE_DEPTH.with(|depth| depth.set(*level));
        }
    }
}

/// `-v` count to log level, info when absent
fn level(verbosity: usize) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the terminal logger, once per process
pub fn setup(verbosity: usize) -> Result<(), SetLoggerError> {
    TermLogger::init(
        level(verbosity),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level(0), LevelFilter::Info);
        assert_eq!(level(1), LevelFilter::Debug);
        assert_eq!(level(5), LevelFilter::Trace);
    }

    #[test]
    fn tracers_restore_the_depth() {
        {
            let outer = Tracer::new("outer");
            let inner = Tracer::new("inner");
            inner.log("event");
            drop(inner);
            outer.log("event");
        }
        assert_eq!(TRACE_DEPTH.with(Cell::get), 0);
    }
}
