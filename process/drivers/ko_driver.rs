use std::{
    io::{ErrorKind, Write},
    process::{Command, Stdio},
};

use colored::Colorize;
use comlexr::cmd;
use log::{debug, info, trace};
use miette::{bail, miette, Context, IntoDiagnostic, Result};
use relkit_utils::constants::{KOCACHE, KO_DOCKER_REPO, LDFLAGS};

use super::{
    opts::{ImageBuildOpts, RegistryLoginOpts},
    ImageDriver, ToolDriver,
};
use crate::{logging::CommandLogging, tools::Tool};

#[derive(Debug)]
pub struct KoDriver;

impl ToolDriver for KoDriver {
    const TOOL: Tool = Tool::Ko;
}

impl ImageDriver for KoDriver {
    fn build_command(opts: &ImageBuildOpts) -> Command {
        let mut command = cmd!(
            &*opts.binary,
            "build",
            if opts.bare => "--bare",
            if opts.local => "--local",
            format!("--platform={}", opts.platform),
            for opts.tags.iter().flat_map(|tag| ["-t", &**tag]),
            &*opts.import_path,
        );

        command.env(KOCACHE, &*opts.cache_dir);
        if let Some(ldflags) = opts.ldflags.as_deref() {
            command.env(LDFLAGS, ldflags);
        }
        if let Some(repo) = opts.docker_repo.as_deref() {
            command.env(KO_DOCKER_REPO, repo);
        }
        command
    }

    fn build(opts: &ImageBuildOpts) -> Result<()> {
        trace!("KoDriver::build({opts:#?})");

        std::fs::create_dir_all(&opts.cache_dir)
            .into_diagnostic()
            .wrap_err_with(|| {
                format!("Failed to create ko cache dir {}", opts.cache_dir.display())
            })?;

        let target = if opts.local {
            "local daemon".to_string()
        } else {
            opts.docker_repo.as_deref().unwrap_or_default().to_string()
        };

        let command = Self::build_command(opts);
        trace!("{command:?}");
        let status = command
            .message_status("ko build", format!("Building images for {target}"))
            .into_diagnostic()?;

        if status.success() {
            info!("Successfully built images for {}", target.bold().green());
        } else {
            bail!("Failed to build images for {}", target.bold().red());
        }
        Ok(())
    }

    fn login(opts: &RegistryLoginOpts) -> Result<()> {
        trace!("KoDriver::login()");

        let mut command = cmd!(
            &*opts.binary,
            "login",
            &*opts.registry,
            "-u",
            &*opts.username,
            "--password-stdin",
        );
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        trace!("{command:?}");
        let mut child = command.spawn().into_diagnostic()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| miette!("Unable to open pipe to stdin"))?;

        // ko may exit before reading, its stderr says why.
        match write!(stdin, "{}", opts.password.value()) {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => {
                return Err(e).into_diagnostic().wrap_err("Failed to pass password to ko");
            }
            _ => drop(stdin),
        }

        let output = child.wait_with_output().into_diagnostic()?;

        if !output.status.success() {
            let err_out = String::from_utf8_lossy(&output.stderr);
            bail!("Failed to login for ko:\n{}", err_out.trim());
        }
        debug!("Logged into {}", opts.registry);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{borrow::Cow, ffi::OsStr, fs, path::Path};

    use relkit_utils::{
        constants::{KOCACHE, KO_DOCKER_REPO, LDFLAGS},
        secret::SecretValue,
    };
    use tempfile::TempDir;

    use super::KoDriver;
    use crate::drivers::{
        opts::{ImageBuildOpts, RegistryLoginOpts},
        ImageDriver,
    };

    fn args(opts: &ImageBuildOpts) -> Vec<String> {
        KoDriver::build_command(opts)
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    fn env<'a>(command: &'a std::process::Command, key: &str) -> Option<&'a OsStr> {
        command
            .get_envs()
            .find_map(|(k, v)| (k == key).then_some(v).flatten())
    }

    #[test]
    fn local_build() {
        let opts = ImageBuildOpts::builder()
            .binary(Path::new("/opt/bin/ko"))
            .local(true)
            .ldflags("-X pkg.gitVersion=v1")
            .build();

        assert_eq!(
            args(&opts),
            ["build", "--bare", "--local", "--platform=linux/amd64", "."]
        );

        let command = KoDriver::build_command(&opts);
        assert_eq!(command.get_program(), "/opt/bin/ko");
        assert_eq!(env(&command, KOCACHE), Some(OsStr::new("/tmp/ko")));
        assert_eq!(
            env(&command, LDFLAGS),
            Some(OsStr::new("-X pkg.gitVersion=v1"))
        );
        assert_eq!(env(&command, KO_DOCKER_REPO), None);
    }

    #[test]
    fn push_build() {
        let opts = ImageBuildOpts::builder()
            .binary(Path::new("ko"))
            .tags(vec![Cow::from("latest"), Cow::from("v1.2.3")])
            .docker_repo("ghcr.io/acme/app")
            .build();

        assert_eq!(
            args(&opts),
            [
                "build",
                "--bare",
                "--platform=linux/amd64",
                "-t",
                "latest",
                "-t",
                "v1.2.3",
                "."
            ]
        );

        let command = KoDriver::build_command(&opts);
        assert_eq!(
            env(&command, KO_DOCKER_REPO),
            Some(OsStr::new("ghcr.io/acme/app"))
        );
        assert_eq!(env(&command, LDFLAGS), None);
    }

    #[cfg(unix)]
    fn fake_ko(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let ko = dir.join("ko");
        fs::write(&ko, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&ko, fs::Permissions::from_mode(0o755)).unwrap();
        ko
    }

    #[cfg(unix)]
    fn login_with(ko: &Path, password: &str) -> miette::Result<()> {
        let password = SecretValue::from(password);
        KoDriver::login(
            &RegistryLoginOpts::builder()
                .binary(ko)
                .registry("ghcr.io")
                .username("octocat")
                .password(&password)
                .build(),
        )
    }

    #[cfg(unix)]
    #[test]
    fn login_passes_password_on_stdin() {
        let dir = TempDir::new().unwrap();
        let args_file = dir.path().join("args");
        let script = format!(
            "echo \"$@\" > {}\n[ \"$(cat)\" = ghp_secret ] || {{ echo denied >&2; exit 1; }}",
            args_file.display()
        );
        let ko = fake_ko(dir.path(), &script);

        login_with(&ko, "ghp_secret").unwrap();
        assert_eq!(
            fs::read_to_string(&args_file).unwrap().trim(),
            "login ghcr.io -u octocat --password-stdin"
        );

        let err = login_with(&ko, "wrong").unwrap_err();
        assert!(err.to_string().contains("denied"));
    }

    #[cfg(unix)]
    #[test]
    fn login_reports_stderr_when_stdin_is_closed() {
        let dir = TempDir::new().unwrap();
        let ko = fake_ko(dir.path(), "exec 0<&-; echo 'unauthorized: bad registry' >&2; exit 1");

        let err = login_with(&ko, &"x".repeat(1 << 20)).unwrap_err();
        assert!(err.to_string().contains("unauthorized: bad registry"));
    }

    #[test]
    fn custom_cache_and_platform() {
        let opts = ImageBuildOpts::builder()
            .binary(Path::new("ko"))
            .bare(false)
            .platform("linux/arm64")
            .cache_dir(Path::new("/var/cache/ko"))
            .import_path("./cmd/server")
            .build();

        assert_eq!(
            args(&opts),
            ["build", "--platform=linux/arm64", "./cmd/server"]
        );
        assert_eq!(
            env(&KoDriver::build_command(&opts), KOCACHE),
            Some(OsStr::new("/var/cache/ko"))
        );
    }
}
