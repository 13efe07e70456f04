//! Initialises the tracing subscribers for console and rolling file output.
//!
//! To get started, see [`Tracing`].
use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::rolling::InitError;
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt};

pub use self::output::{ConsoleOutput, FileOutput, LevelSource, LogFormat, RotationPeriod};

pub mod output;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender { source: InitError },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: SetGlobalDefaultError },
}

/// The outputs of a service, installed process wide by [`Tracing::init`].
///
/// ```
/// use kkp_telemetry::tracing::{Error, TelemetryOptions, Tracing};
///
/// fn main() -> Result<(), Error> {
///     let _tracing = Tracing::from_options("kkp-api", &TelemetryOptions::default()).init()?;
///
///     tracing::info!("log a message");
///     Ok(())
/// }
/// ```
///
/// ## Environment Variables and CLI Arguments
///
/// - `CONSOLE_LOG_DISABLED` (`--console-log-disabled`): Disables console logs.
/// - `CONSOLE_LOG_FORMAT` (`--console-log-format`): `plain` (default) or `json`.
/// - `CONSOLE_LOG_LEVEL`: Filter directives of the console logs, INFO by default.
/// - `FILE_LOG_DIRECTORY` (`--file-log-directory`): Enables JSON file logs in this directory.
/// - `FILE_LOG_ROTATION_PERIOD` (`--file-log-rotation-period`): How often files are rolled over.
/// - `FILE_LOG_MAX_FILES` (`--file-log-max-files`): Keep at most this many files.
/// - `FILE_LOG_LEVEL`: Filter directives of the file logs, INFO by default.
#[derive(Debug)]
pub struct Tracing {
    service_name: &'static str,
    console: Option<ConsoleOutput>,
    file: Option<FileOutput>,
}

impl Tracing {
    pub const CONSOLE_LOG_LEVEL: LevelSource =
        LevelSource::new("CONSOLE_LOG_LEVEL", LevelFilter::INFO);
    pub const FILE_LOG_LEVEL: LevelSource = LevelSource::new("FILE_LOG_LEVEL", LevelFilter::INFO);
    pub const FILE_LOG_SUFFIX: &str = "tracing-rs.json";

    /// A service without any output. Events are dropped until outputs are added.
    pub fn new(service_name: &'static str) -> Self {
        Self {
            service_name,
            console: None,
            file: None,
        }
    }

    pub fn with_console(mut self, console: impl Into<Option<ConsoleOutput>>) -> Self {
        self.console = console.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<Option<FileOutput>>) -> Self {
        self.file = file.into();
        self
    }

    /// Configures the outputs selected on the command line.
    pub fn from_options(service_name: &'static str, options: &TelemetryOptions) -> Self {
        let console = (!options.console_log_disabled).then_some(ConsoleOutput {
            level: Self::CONSOLE_LOG_LEVEL,
            format: options.console_log_format,
        });
        let file = options.file_log_directory.as_ref().map(|directory| FileOutput {
            level: Self::FILE_LOG_LEVEL,
            directory: directory.clone(),
            rotation: options.file_log_rotation_period.unwrap_or_default(),
            suffix: Self::FILE_LOG_SUFFIX.to_owned(),
            max_files: options.file_log_max_files,
        });

        Self::new(service_name).with_console(console).with_file(file)
    }

    /// Installs the configured outputs as the global default subscriber.
    ///
    /// Nothing is installed when no output is configured.
    pub fn init(self) -> Result<Self> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        if let Some(console) = &self.console {
            let filter = console.level.env_filter();
            layers.push(match console.format {
                LogFormat::Plain => tracing_subscriber::fmt::layer().with_filter(filter).boxed(),
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_filter(filter)
                    .boxed(),
            });
        }

        if let Some(file) = &self.file {
            let appender = file
                .appender(self.service_name)
                .context(InitRollingFileAppenderSnafu)?;
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(appender)
                    .with_filter(file.level.env_filter())
                    .boxed(),
            );
        }

        if !layers.is_empty() {
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        Ok(self)
    }
}

/// Telemetry arguments, meant to be flattened into the arguments of a binary.
#[derive(clap::Args, Clone, Debug, Default, Eq, PartialEq)]
pub struct TelemetryOptions {
    /// Disable console logs.
    #[arg(long, env)]
    pub console_log_disabled: bool,

    /// Format of the console logs.
    #[arg(long, env, value_name = "FORMAT", default_value_t)]
    pub console_log_format: LogFormat,

    /// Enable logging to files located in the specified DIRECTORY.
    #[arg(long, env, value_name = "DIRECTORY", group = "file_log")]
    pub file_log_directory: Option<PathBuf>,

    /// Time PERIOD after which log files are rolled over.
    #[arg(long, env, value_name = "PERIOD", requires = "file_log")]
    pub file_log_rotation_period: Option<RotationPeriod>,

    /// Maximum NUMBER of rotated log files to keep.
    #[arg(long, env, value_name = "NUMBER", requires = "file_log")]
    pub file_log_max_files: Option<usize>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        telemetry: TelemetryOptions,
    }

    #[test]
    fn default_options_log_to_console() {
        let tracing = Tracing::from_options("kkp-test", &TelemetryOptions::default());

        assert_eq!(
            tracing.console,
            Some(ConsoleOutput {
                level: Tracing::CONSOLE_LOG_LEVEL,
                format: LogFormat::Plain,
            })
        );
        assert_eq!(tracing.file, None);
    }

    #[test]
    fn file_options() {
        let tracing = Tracing::from_options("kkp-test", &TelemetryOptions {
            console_log_disabled: true,
            file_log_directory: Some(PathBuf::from("/var/log/kkp")),
            file_log_rotation_period: Some(RotationPeriod::Daily),
            file_log_max_files: Some(7),
            ..TelemetryOptions::default()
        });

        assert_eq!(tracing.console, None);
        assert_eq!(
            tracing.file,
            Some(FileOutput {
                level: Tracing::FILE_LOG_LEVEL,
                directory: PathBuf::from("/var/log/kkp"),
                rotation: RotationPeriod::Daily,
                suffix: Tracing::FILE_LOG_SUFFIX.to_owned(),
                max_files: Some(7),
            })
        );
    }

    #[test]
    fn parses_cli_arguments() {
        let cli = Cli::try_parse_from([
            "kkp-api",
            "--console-log-format",
            "json",
            "--file-log-directory",
            "/tmp/logs",
            "--file-log-rotation-period",
            "hourly",
        ])
        .expect("arguments are valid");

        assert_eq!(cli.telemetry, TelemetryOptions {
            console_log_disabled: false,
            console_log_format: LogFormat::Json,
            file_log_directory: Some(PathBuf::from("/tmp/logs")),
            file_log_rotation_period: Some(RotationPeriod::Hourly),
            file_log_max_files: None,
        });

        Cli::try_parse_from(["kkp-api", "--file-log-max-files", "3"])
            .expect_err("file options require a log directory");
    }

    #[test]
    fn init_without_outputs_installs_nothing() {
        Tracing::new("kkp-test").init().expect("nothing to install");
    }

    #[test]
    fn init_with_file_output() {
        let directory = tempfile::tempdir().expect("temporary directory");
        let tracing = Tracing::new("kkp-test").with_file(FileOutput {
            level: LevelSource::new("KKP_TEST_FILE_LOG_LEVEL", LevelFilter::DEBUG),
            directory: directory.path().to_owned(),
            rotation: RotationPeriod::Never,
            suffix: Tracing::FILE_LOG_SUFFIX.to_owned(),
            max_files: None,
        });

        tracing.init().expect("file subscriber is installed");
    }
}
