//! Logging facilities.
//!
//! Every message is prefixed with `[time LEVEL name]` taken from the logging context, which can be any value
//! with `time() -> f64` and `name() -> &str` methods.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde_json::json;

use crate::event::{Event, EventData};

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_with_context {
    ($level:expr, $label:expr, $color:ident, $ctx:expr, $($arg:tt)+) => (
        log::log!(
            target: $ctx.name(),
            $level,
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::log::get_colored($label, $crate::colored::Color::$color),
            $ctx.name(),
            format_args!($($arg)+)
        )
    );
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use wfsim_core::log_info;
///
/// struct Component {
///     time: f64,
/// }
///
/// impl Component {
///     fn time(&self) -> f64 {
///         self.time
///     }
///
///     fn name(&self) -> &str {
///         "comp"
///     }
///
///     fn start(&self, tasks: usize) {
///         log_info!(self, "started with {} tasks", tasks);
///     }
/// }
///
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
///
/// Component { time: 0. }.start(3);
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $msg:expr) => (
        $crate::__log_with_context!(log::Level::Info, "INFO ", Green, $ctx, "{}", $msg)
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::__log_with_context!(log::Level::Info, "INFO ", Green, $ctx, $format, $($arg)+)
    );
}

/// Logs a message at the debug level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $msg:expr) => (
        $crate::__log_with_context!(log::Level::Debug, "DEBUG", Blue, $ctx, "{}", $msg)
    );
    ($ctx:expr, $format:expr, $($arg:tt)+) => (
        $crate::__log_with_context!(log::Level::Debug, "DEBUG", Blue, $ctx, $format, $($arg)+)
    );
}

/// Reports an event rejected by the engine.
pub(crate) fn log_incorrect_event<T: EventData>(event: &Event<T>, msg: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] Incorrect event ({}): {}",
        event.time,
        get_colored("ERROR", Color::Red),
        msg,
        json!({"id": event.id, "data": event.data})
    );
}
