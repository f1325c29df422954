use std::{
    borrow::Cow,
    io::{BufRead, BufReader, Result},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    sync::LazyLock,
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::Local;
use colored::{control::ShouldColorize, ColoredString, Colorize};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use log::{Level, LevelFilter, Record};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{
                roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
            },
            RollingFileAppender,
        },
    },
    config::{Appender, Root},
    encode::{pattern::PatternEncoder, Encode, Write},
    Config, Logger as L4RSLogger,
};
use nu_ansi_term::Color;
use private::Private;
use rand::Rng;
use relkit_utils::constants::LOG_DIR_SUFFIX;

use crate::signal_handler::{add_pid, remove_pid};

mod private {
    pub trait Private {}
}

impl Private for Command {}

static MULTI_PROGRESS: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);

const HEADER_SEPARATOR: &str = "=>";

/// Sets up `log` for the binary.
///
/// Records go to stderr and, when a log directory is
/// available, to a size-rotated `relkit.log`.
#[derive(Debug, Clone)]
pub struct Logger {
    quiet_modules: Vec<(String, LevelFilter)>,
    level: LevelFilter,
    log_dir: Option<PathBuf>,
}

impl Logger {
    const LOG_FILENAME: &'static str = "relkit.log";
    const ARCHIVE_PATTERN: &'static str = "relkit.{}.log";
    const ROLL_SIZE: u64 = 10 * 1024;
    const ARCHIVE_COUNT: u32 = 4;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Modules whose records at or above the paired
    /// level are kept off the console.
    pub fn filter_modules<I, S>(&mut self, modules: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, LevelFilter)>,
        S: Into<String>,
    {
        self.quiet_modules = modules
            .into_iter()
            .map(|(module, level)| (module.into(), level))
            .collect();
        self
    }

    pub const fn filter_level(&mut self, level: LevelFilter) -> &mut Self {
        self.level = level;
        self
    }

    /// Overrides `~/.cache/relkit` as the log file location.
    pub fn log_out_dir<P>(&mut self, dir: Option<P>) -> &mut Self
    where
        P: AsRef<Path>,
    {
        self.log_dir = dir.map(|dir| dir.as_ref().to_path_buf());
        self
    }

    /// Installs the logger.
    ///
    /// # Panics
    /// Will panic if a logger was already installed.
    pub fn init(&self) {
        let console = ConsoleAppender::builder()
            .encoder(Box::new(ConsoleEncoder {
                quiet_modules: self.quiet_modules.clone(),
            }))
            .target(Target::Stderr)
            .build();

        let mut config =
            Config::builder().appender(Appender::builder().build("console", Box::new(console)));
        let mut root = Root::builder().appender("console");

        if let Some(dir) = self
            .log_dir
            .clone()
            .or_else(|| relkit_utils::home_dir().map(|home| home.join(LOG_DIR_SUFFIX)))
        {
            match Self::file_appender(&dir) {
                Ok(file) => {
                    config = config.appender(Appender::builder().build("file", Box::new(file)));
                    root = root.appender("file");
                }
                Err(e) => eprintln!("Unable to log to {}:\n{e}", dir.display()),
            }
        }

        let config = config
            .build(root.build(self.level))
            .expect("Logger config should build");

        LogWrapper::new(Self::multi_progress(), L4RSLogger::new(config))
            .try_init()
            .expect("Logger should only be initialized once");
    }

    fn file_appender(dir: &Path) -> anyhow::Result<RollingFileAppender> {
        let roller = FixedWindowRoller::builder().build(
            &dir.join(Self::ARCHIVE_PATTERN).to_string_lossy(),
            Self::ARCHIVE_COUNT,
        )?;

        Ok(RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} - {l} - {m}{n}")))
            .build(
                dir.join(Self::LOG_FILENAME),
                Box::new(CompoundPolicy::new(
                    Box::new(SizeTrigger::new(Self::ROLL_SIZE)),
                    Box::new(roller),
                )),
            )?)
    }

    /// The progress area shared by spinners, download
    /// bars and log output.
    pub fn multi_progress() -> MultiProgress {
        MULTI_PROGRESS.clone()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            quiet_modules: Vec::new(),
            level: LevelFilter::Info,
            log_dir: None,
        }
    }
}

fn colored_level(level: Level) -> ColoredString {
    let name = level.as_str();
    match level {
        Level::Error => name.red(),
        Level::Warn => name.yellow(),
        Level::Info => name.green(),
        Level::Debug => name.blue(),
        Level::Trace => name.cyan(),
    }
}

#[derive(Debug)]
struct ConsoleEncoder {
    quiet_modules: Vec<(String, LevelFilter)>,
}

impl ConsoleEncoder {
    fn is_quiet(&self, record: &Record) -> bool {
        record.module_path().is_some_and(|path| {
            self.quiet_modules
                .iter()
                .any(|(module, level)| path.contains(module.as_str()) && *level <= record.level())
        })
    }
}

impl Encode for ConsoleEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        if self.is_quiet(record) {
            return Ok(());
        }

        let level = colored_level(record.level());
        let label = match log::max_level() {
            LevelFilter::Off => return Ok(()),
            LevelFilter::Error | LevelFilter::Warn | LevelFilter::Info => format!("{level:5}"),
            LevelFilter::Debug => format!("{level:>5}"),
            LevelFilter::Trace => format!(
                "{level:5} {module}:{line}",
                module = record.module_path().unwrap_or_default().bright_yellow(),
                line = record
                    .line()
                    .map(|line| line.to_string())
                    .unwrap_or_default()
                    .bright_green(),
            ),
        };

        writeln!(w, "{} {}", header(&label), record.args())?;
        Ok(())
    }
}

/// Prefix shared by log records and forwarded command
/// output. Debug and trace runs get a timestamp.
fn header(label: &str) -> String {
    let sep = HEADER_SEPARATOR.bold();
    match log::max_level() {
        LevelFilter::Off => String::new(),
        LevelFilter::Error | LevelFilter::Warn | LevelFilter::Info => format!("{label} {sep}"),
        LevelFilter::Debug | LevelFilter::Trace => format!(
            "[{time} {label}] {sep}",
            time = Local::now().format("%H:%M:%S"),
        ),
    }
}

/// A random color from the readable part of the
/// 256 color ANSI palette.
#[must_use]
pub fn gen_random_ansi_color() -> u8 {
    // Blue1 (21) through Cornsilk1 (230)
    rand::rng().random_range(21..=230)
}

pub fn color_str<T>(text: T, ansi_color: u8) -> String
where
    T: AsRef<str>,
{
    let text = text.as_ref();
    if ShouldColorize::from_env().should_colorize() {
        Color::Fixed(ansi_color).paint(text).to_string()
    } else {
        text.to_string()
    }
}

pub trait CommandLogging: Private {
    /// Runs the command with a spinner showing `message`,
    /// printing every line of its stdout and stderr behind
    /// a colored `header`.
    ///
    /// Returns the exit status once the process finishes.
    ///
    /// # Errors
    /// Will error if the process can't be spawned or waited on.
    fn message_status<S, D>(self, header: S, message: D) -> Result<ExitStatus>
    where
        S: AsRef<str>,
        D: Into<Cow<'static, str>>;
}

impl CommandLogging for Command {
    fn message_status<S, D>(self, header: S, message: D) -> Result<ExitStatus>
    where
        S: AsRef<str>,
        D: Into<Cow<'static, str>>,
    {
        run_with_output(
            self,
            color_str(header, gen_random_ansi_color()),
            message.into(),
        )
    }
}

fn run_with_output(
    mut command: Command,
    header: String,
    message: Cow<'static, str>,
) -> Result<ExitStatus> {
    let (reader, writer) = os_pipe::pipe()?;
    command
        .stdout(writer.try_clone()?)
        .stderr(writer)
        .stdin(Stdio::null());

    let mut child = command.spawn()?;
    let pid = child.id();
    add_pid(pid);

    let spinner = Logger::multi_progress().add(ProgressBar::new_spinner().with_message(message));
    spinner.enable_steady_tick(Duration::from_millis(100));

    // The command holds the pipe's write ends, the reader
    // only sees EOF once they are all closed.
    drop(command);

    let forwarder = forward_lines(reader, header);
    let status = child.wait();
    remove_pid(pid);

    let _ = forwarder.join();
    spinner.finish();
    Logger::multi_progress().remove(&spinner);

    status
}

fn forward_lines(reader: os_pipe::PipeReader, prefix: String) -> JoinHandle<()> {
    thread::spawn(move || {
        let progress = Logger::multi_progress();
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            let text = format!("{} {line}", header(&prefix));
            if progress.is_hidden() || progress.println(&text).is_err() {
                eprintln!("{text}");
            }
        }
    })
}
