use crate::error::FinderError;
use crate::finder::config::SyndaConfig;
use crate::finder::source::RemoteIndex;
use crate::finder::util::run_command;
use crate::synda::records::{RemoteRecord, parse_search_output};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyndaClient {
    bin: PathBuf,
    data_root: PathBuf,
    retries: usize,
    install_timeout_secs: Option<u64>,
}

fn resolve_synda_bin(configured: Option<&str>) -> Result<PathBuf, FinderError> {
    if let Some(bin) = configured {
        let path = Path::new(bin);
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(FinderError::CollaboratorUnavailable(format!(
            "synda binary does not exist: {}",
            path.display()
        )));
    }
    which::which("synda").map_err(|_| {
        FinderError::CollaboratorUnavailable(
            "synda binary not found; set DATAFINDER_SYNDA_BIN or put synda on PATH".to_string(),
        )
    })
}

pub fn synda_available(cfg: &SyndaConfig) -> Option<PathBuf> {
    resolve_synda_bin(cfg.bin.as_deref()).ok()
}

impl SyndaClient {
    pub fn from_config(cfg: &SyndaConfig) -> Result<Self, FinderError> {
        let bin = resolve_synda_bin(cfg.bin.as_deref())?;
        Ok(Self {
            bin,
            data_root: cfg.data_root.clone(),
            retries: cfg.retries,
            install_timeout_secs: cfg.install_timeout_secs,
        })
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn run(&self, args: &[&str], input: Option<&[u8]>, timeout_secs: Option<u64>) -> Result<Output> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args);
        run_command(&mut cmd, input, timeout_secs)
            .with_context(|| format!("failed to run `{} {}`", self.bin.display(), args.join(" ")))
    }

    fn run_retry(&self, args: &[&str], input: Option<&[u8]>, timeout_secs: Option<u64>) -> Result<Output> {
        let mut last_out: Option<Output> = None;

        for attempt in 0..=self.retries {
            let out = self.run(args, input, timeout_secs)?;
            if out.status.success() {
                return Ok(out);
            }
            last_out = Some(out);
            if attempt < self.retries {
                let delay_ms = 250 * (attempt + 1) as u64;
                thread::sleep(Duration::from_millis(delay_ms));
            }
        }

        let Some(out) = last_out else {
            anyhow::bail!(
                "command failed after retries without output: synda {}",
                args.join(" ")
            );
        };
        anyhow::bail!(
            "command failed after retries: synda {}\nstdout: {}\nstderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        )
    }
}

impl RemoteIndex for SyndaClient {
    fn search_remote(&self, model_data: &str, variable: &str) -> Result<Vec<RemoteRecord>> {
        let mut args = vec!["search", "-f"];
        args.extend(model_data.split_whitespace());
        args.push(variable);
        let out = self.run_retry(&args, None, None)?;
        Ok(parse_search_output(&String::from_utf8_lossy(&out.stdout)))
    }

    fn install_remote(&self, file_id: &str) -> Result<()> {
        // synda asks for confirmation on stdin before queueing the download.
        self.run_retry(&["install", file_id], Some(b"\n"), self.install_timeout_secs)?;
        Ok(())
    }

    fn install_path(&self, record: &RemoteRecord, variable: &str) -> Option<String> {
        record
            .local_path(&self.data_root, variable)
            .map(|p| p.to_string_lossy().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configured_binary_is_unavailable() {
        let err = resolve_synda_bin(Some("/definitely/not/here/synda")).expect_err("missing");
        assert!(matches!(err, FinderError::CollaboratorUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn search_and_install_go_through_the_binary() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let log = tmp.path().join("calls.log");
        let bin = tmp.path().join("synda");
        let script = format!(
            "#!/usr/bin/env bash\nprintf '%s\\n' \"$*\" >> '{}'\nif [[ \"$1\" == search ]]; then\n  echo 'done 1.0 MB cmip5.output1.I.M.historical.mon.atmos.Amon.r1i1p1.v1.tas_Amon_M_historical_r1i1p1_199001-199912.nc'\nfi\ncat > /dev/null\n",
            log.display()
        );
        fs::write(&bin, script).expect("write fake synda");
        let mut perms = fs::metadata(&bin).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&bin, perms).expect("chmod");

        let client = SyndaClient::from_config(&SyndaConfig {
            bin: Some(bin.to_string_lossy().to_string()),
            data_root: tmp.path().join("sdt"),
            retries: 0,
            install_timeout_secs: Some(5),
        })
        .expect("client");

        let records = client
            .search_remote("CMIP5 M Amon historical r1i1p1", "tas")
            .expect("search");
        assert_eq!(records.len(), 1);
        let path = client.install_path(&records[0], "tas").expect("path");
        assert!(path.ends_with("/v1/tas/tas_Amon_M_historical_r1i1p1_199001-199912.nc"));

        client.install_remote(&records[0].file_id).expect("install");
        let calls = fs::read_to_string(&log).expect("log");
        assert!(calls.contains("search -f CMIP5 M Amon historical r1i1p1 tas"));
        assert!(calls.contains("install cmip5.output1.I.M.historical"));
    }
}
