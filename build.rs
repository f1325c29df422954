use std::{fs::File, io::Write, process::Command};

use shadow_rs::SdResult;

fn main() -> SdResult<()> {
    shadow_rs::new_hook(hook)
}

fn hook(mut file: &File) -> SdResult<()> {
    writeln!(
        file,
        "pub const RELKIT_COMMIT_HASH: &str = \"{}\";",
        git_output(&["rev-parse", "HEAD"])
    )?;
    writeln!(
        file,
        "pub const RELKIT_COMMIT_HASH_SHORT: &str = \"{}\";",
        git_output(&["rev-parse", "--short", "HEAD"])
    )?;
    Ok(())
}

fn git_output(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|out| out.trim().to_string())
        .unwrap_or_default()
}
