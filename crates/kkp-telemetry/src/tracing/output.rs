//! The outputs a [`Tracing`](super::Tracing) instance can write events to.
use std::path::PathBuf;

use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Where the level filter of an output comes from: the directives in an environment variable,
/// falling back to a default level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LevelSource {
    pub env_var: &'static str,
    pub default_level: LevelFilter,
}

impl LevelSource {
    pub const fn new(env_var: &'static str, default_level: LevelFilter) -> Self {
        Self {
            env_var,
            default_level,
        }
    }

    /// Invalid directives in the environment variable are ignored.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_env_var(self.env_var)
            .with_default_directive(self.default_level.into())
            .from_env_lossy()
    }
}

/// Format of the console output. Files are always written as JSON.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsoleOutput {
    pub level: LevelSource,
    pub format: LogFormat,
}

/// Rolling JSON log files named `<service name>.<rotation date>.<suffix>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileOutput {
    pub level: LevelSource,
    pub directory: PathBuf,
    pub rotation: RotationPeriod,
    pub suffix: String,

    /// Older files are removed on rotation. `None` keeps all files.
    pub max_files: Option<usize>,
}

impl FileOutput {
    pub(super) fn appender(&self, service_name: &str) -> Result<RollingFileAppender, InitError> {
        let builder = RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(service_name)
            .filename_suffix(&self.suffix);

        match self.max_files {
            Some(max_files) => builder.max_log_files(max_files),
            None => builder,
        }
        .build(&self.directory)
    }
}

/// Supported periods after which log files are rolled over.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,

    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(period: RotationPeriod) -> Self {
        match period {
            RotationPeriod::Minutely => Self::MINUTELY,
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("minutely", RotationPeriod::Minutely, Rotation::MINUTELY)]
    #[case("daily", RotationPeriod::Daily, Rotation::DAILY)]
    #[case("never", RotationPeriod::Never, Rotation::NEVER)]
    fn rotation_periods(
        #[case] input: &str,
        #[case] period: RotationPeriod,
        #[case] rotation: Rotation,
    ) {
        assert_eq!(RotationPeriod::from_str(input), Ok(period));
        assert_eq!(Rotation::from(period), rotation);
        assert_eq!(period.to_string(), input);
    }

    #[test]
    fn appender_writes_into_directory() {
        let directory = tempfile::tempdir().expect("temporary directory");
        let output = FileOutput {
            level: LevelSource::new("KKP_TEST_FILE_LOG_LEVEL", LevelFilter::DEBUG),
            directory: directory.path().to_owned(),
            rotation: RotationPeriod::Never,
            suffix: "log.json".to_owned(),
            max_files: Some(3),
        };

        output.appender("kkp-test").expect("appender is created");
    }

    #[test]
    fn appender_needs_a_directory() {
        let file = tempfile::NamedTempFile::new().expect("temporary file");
        let output = FileOutput {
            level: LevelSource::new("KKP_TEST_FILE_LOG_LEVEL", LevelFilter::INFO),
            directory: file.path().join("logs"),
            rotation: RotationPeriod::Daily,
            suffix: "log.json".to_owned(),
            max_files: None,
        };

        output
            .appender("kkp-test")
            .expect_err("a file is not a directory");
    }
}
