use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

thread_local! {
    static THREAD_LOG_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

tokio::task_local! {
    /// Task-local logging scope. A migration run is executed inside `LOG_CONTEXT.scope(..)` so
    /// that the prefix survives `.await` points that hop between worker threads.
    pub static LOG_CONTEXT: RefCell<Option<String>>;
}

/// Log sink implemented by the host platform.
///
/// Every record emitted through the `log` facade inside the exporter is forwarded here once
/// [`set_logger`] has been called.
///
/// # Examples
///
/// ```rust
/// use exporter::primitives::logger::{LogLevel, Logger};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## kotlin
///
/// ```kotlin
/// class Slf4jBridge : Logger {
///     private val log = LoggerFactory.getLogger("markdown-migration")
///     override fun log(level: LogLevel, message: String) = when (level) {
///         LogLevel.ERROR -> log.error(message)
///         LogLevel.WARN -> log.warn(message)
///         LogLevel.INFO -> log.info(message)
///         else -> log.debug(message)
///     }
/// }
///
/// setLogger(Slf4jBridge()) // once, when the plugin is enabled
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one formatted record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of a migration run.
    Info,
    /// A recoverable problem, e.g. a failed upload attempt.
    Warn,
    /// A failure that ends a chunk or a run.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Bridges the `log` facade to the host [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        // debug and trace noise from dependencies is not forwarded
        metadata.level() <= log::Level::Info || metadata.target().starts_with("exporter")
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        match LOGGER_INSTANCE.get() {
            Some(logger) => logger.log(record.level().into(), record.args().to_string()),
            None => eprintln!("Logger not set: {}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Installs the host log sink. Only the first call has an effect.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    static FORWARDER: ForeignLogger = ForeignLogger;

    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if log::set_logger(&FORWARDER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

/// Logs a trace-level message prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::trace!("{} {}", ctx, format_args!($($arg)*)),
            None => log::trace!($($arg)*),
        }
    };
}

/// Logs a debug-level message prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::debug!("{} {}", ctx, format_args!($($arg)*)),
            None => log::debug!($($arg)*),
        }
    };
}

/// Logs an info-level message prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::info!("{} {}", ctx, format_args!($($arg)*)),
            None => log::info!($($arg)*),
        }
    };
}

/// Logs a warning prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::warn!("{} {}", ctx, format_args!($($arg)*)),
            None => log::warn!($($arg)*),
        }
    };
}

/// Logs an error prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::error!("{} {}", ctx, format_args!($($arg)*)),
            None => log::error!($($arg)*),
        }
    };
}

#[derive(Clone, Copy)]
enum Storage {
    Task,
    Thread,
}

/// Scope guard that sets the log prefix until it is dropped.
///
/// Scopes nest: dropping an inner guard restores the outer prefix.
///
/// ```rust
/// use exporter::primitives::logger::{get_context, LogContext};
///
/// {
///     let _ctx = LogContext::new("Uploader");
///     assert_eq!(get_context().as_deref(), Some("[Exporter][Uploader]"));
/// }
/// assert_eq!(get_context(), None);
/// ```
pub struct LogContext {
    previous: Option<String>,
    storage: Storage,
}

impl LogContext {
    /// Opens a scope named after `module`.
    #[must_use]
    pub fn new(module: &str) -> Self {
        let prefix = Some(format!("[Exporter][{module}]"));

        let swap = |slot: &RefCell<Option<String>>| slot.replace(prefix.clone());
        match LOG_CONTEXT.try_with(swap) {
            Ok(previous) => Self {
                previous,
                storage: Storage::Task,
            },
            Err(_) => Self {
                previous: THREAD_LOG_CONTEXT.with(swap),
                storage: Storage::Thread,
            },
        }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        let restore = |slot: &RefCell<Option<String>>| {
            slot.borrow_mut().clone_from(&self.previous);
        };
        match self.storage {
            Storage::Task => {
                let _ = LOG_CONTEXT.try_with(restore);
            }
            Storage::Thread => THREAD_LOG_CONTEXT.with(restore),
        }
    }
}

/// Returns the active log prefix, preferring the task-local scope.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT
        .try_with(|ctx| ctx.borrow().clone())
        .unwrap_or_else(|_| THREAD_LOG_CONTEXT.with(|ctx| ctx.borrow().clone()))
}
