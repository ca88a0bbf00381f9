use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before UNIX_EPOCH")?
        .as_secs())
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = reader {
            let _ = r.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run `cmd`, optionally feeding `input` on stdin and killing it after
/// `timeout_secs`. Output pipes are drained concurrently so a chatty child
/// cannot block on a full pipe.
pub fn run_command(
    cmd: &mut Command,
    input: Option<&[u8]>,
    timeout_secs: Option<u64>,
) -> Result<Output> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    let mut child = cmd.spawn()?;

    if let Some(bytes) = input
        && let Some(mut stdin) = child.stdin.take()
    {
        stdin.write_all(bytes)?;
    }

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if let Some(limit) = timeout_secs
            && started.elapsed() >= Duration::from_secs(limit)
        {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!("command timed out after {}s", limit);
        }
        thread::sleep(Duration::from_millis(50));
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn run_command_feeds_stdin_and_captures_stdout() {
        let out = run_command(Command::new("cat").arg("-"), Some(b"hello\n"), Some(5))
            .expect("run cat");
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout), "hello\n");
    }

    #[cfg(unix)]
    #[test]
    fn run_command_times_out() {
        let err = run_command(Command::new("sleep").arg("5"), None, Some(1))
            .expect_err("should time out");
        assert!(err.to_string().contains("timed out"));
    }
}
