//! Process helpers for spawning alert hooks.
//!
//! Child processes spawned here never pop up a console window on Windows and
//! shell command lines go through the platform shell (`sh -c` / `cmd /C`).

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Program and leading arguments of the platform shell.
pub fn shell_program() -> (&'static str, &'static str) {
    if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

/// Join a command template and trailing arguments into one shell line.
///
/// Empty arguments are skipped so a template never ends with a dangling space.
pub fn command_line<I, S>(template: &str, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = template.trim().to_string();
    for arg in args {
        let arg = arg.as_ref();
        if arg.is_empty() {
            continue;
        }
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Create a `tokio::process::Command` that runs `line` through the platform shell.
#[cfg(feature = "tokio")]
pub fn tokio_shell_command(line: &str) -> tokio::process::Command {
    let (program, flag) = shell_program();
    let mut cmd = tokio::process::Command::new(program);
    cmd.arg(flag).arg(line);
    cmd.no_window();
    cmd
}
