//! Process helpers for media tool subprocesses (ffmpeg, ffprobe).
//!
//! Every helper drains stdout and stderr to EOF before waiting on the child,
//! so a chatty tool can never block on a full pipe. Commands are killed
//! when their `Child` is dropped before it was waited on.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Build a command for a media tool.
///
/// stdin is closed, stdout/stderr are piped, `LC_ALL=C` keeps number
/// formatting stable, and on Windows no console window is opened. The
/// process is killed if its `Child` is dropped while still running.
pub fn media_command<I, S>(program: impl AsRef<OsStr>, args: I, working_dir: Option<&Path>) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

/// Read `reader` to EOF, handing every line (without terminator) to `on_line`.
///
/// Returns the number of lines read. Invalid UTF-8 is replaced lossily.
pub async fn for_each_line<R, F>(reader: R, mut on_line: F) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\n', '\r']));
        count += 1;
    }
    Ok(count)
}

/// Drain both pipes of `child` line by line, then wait for it to exit.
pub async fn wait_streaming<FO, FE>(
    mut child: Child,
    on_stdout: FO,
    on_stderr: FE,
) -> std::io::Result<ExitStatus>
where
    FO: FnMut(&str),
    FE: FnMut(&str),
{
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let drain_stdout = async move {
        match stdout {
            Some(out) => for_each_line(out, on_stdout).await,
            None => Ok(0),
        }
    };
    let drain_stderr = async move {
        match stderr {
            Some(err) => for_each_line(err, on_stderr).await,
            None => Ok(0),
        }
    };
    if let Err(e) = tokio::try_join!(drain_stdout, drain_stderr) {
        // Kill and reap before reporting the read failure.
        let _ = child.kill().await;
        return Err(e);
    }

    child.wait().await
}

/// Buffered output of a process whose pipes were fully drained.
#[derive(Debug)]
pub struct DrainedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl DrainedOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Spawn `command`, collect both pipes to EOF, then wait for exit.
pub async fn run_drained(command: &mut Command) -> std::io::Result<DrainedOutput> {
    let mut child = command.spawn()?;
    let (stdout, stderr) = tokio::try_join!(
        read_all(child.stdout.take()),
        read_all(child.stderr.take())
    )?;
    let status = child.wait().await?;
    Ok(DrainedOutput {
        status,
        stdout,
        stderr,
    })
}
