use std::{
    env,
    ffi::OsStr,
    fmt::Debug,
    io::Result,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use process_control::{ChildExt, Control};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Iterates over stdout followed by stderr.
    ///
    /// Tools don't agree on where they print their version.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().chain(self.stderr.lines())
    }
}

/// Attempt to resolve `binary_name` on the given search path,
/// falling back to the `PATH` of the current process.
///
/// Returns `None` if no executable by that name exists.
pub fn resolve_binary<T, P>(binary_name: T, search_path: Option<P>) -> Option<PathBuf>
where
    T: AsRef<OsStr>,
    P: AsRef<OsStr>,
{
    let binary_name = binary_name.as_ref();
    let cwd = env::current_dir().unwrap_or_default();

    let resolved = match search_path {
        Some(search_path) => which::which_in(binary_name, Some(search_path), cwd),
        None => which::which_in(binary_name, env::var_os("PATH"), cwd),
    };

    match resolved {
        Ok(full_path) => {
            log::trace!("Using {:?} as {:?}", full_path, binary_name);
            Some(full_path)
        }
        Err(error) => {
            log::trace!("Unable to find {:?} in PATH, {:?}", binary_name, error);
            None
        }
    }
}

/// Creates a new `Command` pointing at `full_path` with
/// stdout/stderr captured and stdin closed so the process
/// can't wait on input.
fn create_command(full_path: &Path) -> Command {
    log::trace!("Creating Command for binary {}", full_path.display());

    let mut cmd = Command::new(full_path);
    cmd.stderr(Stdio::piped())
        .stdout(Stdio::piped())
        .stdin(Stdio::null());
    cmd
}

/// Execute a command and return the output on stdout and stderr if successful.
///
/// Returns `Ok(None)` when the process ran but exited
/// unsuccessfully or hit the time limit.
///
/// # Errors
/// Will error if the process couldn't be spawned at all,
/// e.g. when the binary isn't executable.
pub fn exec_cmd<U>(
    full_path: &Path,
    args: &[U],
    time_limit: Duration,
) -> Result<Option<CommandOutput>>
where
    U: AsRef<OsStr> + Debug,
{
    log::trace!("Executing command {} with args {:?}", full_path.display(), args);
    let mut cmd = create_command(full_path);
    cmd.args(args);
    exec_timeout(&mut cmd, time_limit)
}

fn exec_timeout(cmd: &mut Command, time_limit: Duration) -> Result<Option<CommandOutput>> {
    let start = Instant::now();
    let process = cmd.spawn().inspect_err(|error| {
        log::trace!("Unable to run {:?}, {:?}", cmd.get_program(), error);
    })?;

    match process
        .controlled_with_output()
        .time_limit(time_limit)
        .terminate_for_timeout()
        .wait()?
    {
        Some(output) => {
            let stdout_string = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr_string = String::from_utf8_lossy(&output.stderr).into_owned();

            log::trace!(
                "stdout: {:?}, stderr: {:?}, exit code: \"{:?}\", took {:?}",
                stdout_string,
                stderr_string,
                output.status.code(),
                start.elapsed()
            );

            if !output.status.success() {
                return Ok(None);
            }

            Ok(Some(CommandOutput {
                stdout: stdout_string,
                stderr: stderr_string,
            }))
        }
        None => {
            log::warn!("Executing command {:?} timed out.", cmd.get_program());
            Ok(None)
        }
    }
}

#[cfg(all(test, unix))]
mod test {
    use std::{fs, os::unix::fs::PermissionsExt, path::Path, time::Duration};

    use tempfile::TempDir;

    use super::{exec_cmd, resolve_binary};

    fn write_script(dir: &Path, name: &str, body: &str, mode: u32) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn resolves_in_search_path() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "fake-tool", "echo hi", 0o755);

        let found = resolve_binary("fake-tool", Some(dir.path())).unwrap();
        assert_eq!(found, dir.path().join("fake-tool"));
    }

    #[test]
    fn missing_binary_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_binary("fake-tool", Some(dir.path())).is_none());
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "fake-tool", "echo out; echo err 1>&2", 0o755);

        let output = exec_cmd(
            &dir.path().join("fake-tool"),
            &["version"],
            Duration::from_secs(5),
        )
        .unwrap()
        .unwrap();
        assert_eq!(output.lines().collect::<Vec<_>>(), vec!["out", "err"]);
    }

    #[test]
    fn failing_command_is_none() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "fake-tool", "exit 3", 0o755);

        let output = exec_cmd(
            &dir.path().join("fake-tool"),
            &["version"],
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(output.is_none());
    }

    #[test]
    fn non_executable_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "fake-tool", "echo hi", 0o644);

        assert!(exec_cmd(
            &dir.path().join("fake-tool"),
            &["version"],
            Duration::from_secs(5),
        )
        .is_err());
    }
}
