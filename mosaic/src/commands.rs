use std::process::Stdio;

use anyhow::{Result, anyhow};
use colored::{Color, Colorize};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{debug, info};

use crate::utils;

pub struct CommandOutput {
    pub success: bool,
    pub status_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn sanitise_stdout(&self) -> String {
        utils::string_or_empty_from_u8(&self.stdout).trim().to_string()
    }

    pub fn sanitise_stderr(&self) -> String {
        utils::string_or_empty_from_u8(&self.stderr).trim().to_string()
    }
}

/// Builder for the external processes we drive: docker, docker-compose and the graph CLI.
/// By default a non-zero exit is turned into an error.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    cmd: Option<String>,
    args: Vec<String>,
    cwd: Option<String>,
    throw_on_failure: bool,
    display_command: bool,
    color: Option<Color>,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuilder {
    pub fn new() -> Self {
        CommandBuilder {
            cmd: None,
            args: Vec::new(),
            cwd: None,
            throw_on_failure: true,
            display_command: true,
            color: None,
        }
    }

    pub fn color(&mut self, what: Color) -> &mut Self {
        self.color = Some(what);
        self
    }

    pub fn ignore_failures(&mut self) -> &mut Self {
        self.throw_on_failure = false;
        self
    }

    pub fn silent(&mut self) -> &mut Self {
        self.display_command = false;
        self
    }

    pub fn cmd(&mut self, cmd: &str, args: &[&str]) -> &mut Self {
        self.cmd = Some(cmd.to_string());
        self.args = args.iter().map(|x| x.to_string()).collect();
        self
    }

    pub fn more_args<S: AsRef<str>>(&mut self, args: &[S]) -> &mut Self {
        self.args
            .extend(args.iter().map(|x| x.as_ref().to_string()));
        self
    }

    pub fn cwd(&mut self, cwd: &str) -> &mut Self {
        self.cwd = Some(cwd.to_string());
        self
    }

    pub fn describe_command(&self) -> Result<String> {
        let cmd_name = self.cmd.as_ref().ok_or(anyhow!("No command specified"))?;
        let cwd_str = self.cwd.as_deref().unwrap_or("");
        Ok(format!("[{cwd_str}]$ {cmd_name} {}", self.args.join(" ")))
    }

    /// Common bits of starting a new process.
    fn make_command(&self) -> Result<Command> {
        let cmd_name = self.cmd.as_ref().ok_or(anyhow!("No command specified"))?;
        let mut cmd = Command::new(cmd_name);
        if self.display_command {
            info!("{}", self.describe_command()?);
        } else {
            debug!("{}", self.describe_command()?);
        }
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        Ok(cmd)
    }

    /// Run to completion and capture stdout/stderr.
    pub async fn run_for_output(&self) -> Result<CommandOutput> {
        let mut cmd = self.make_command()?;
        let out = cmd.output().await?;
        let result_code = out.status.code().unwrap_or(-1);
        if self.throw_on_failure && !out.status.success() {
            let output = &utils::string_or_empty_from_u8(&out.stdout);
            let error = &utils::string_or_empty_from_u8(&out.stderr);
            return Err(anyhow!(
                "Command failed - {result_code}\n{}\n{output}\n{error}",
                self.describe_command()?
            ));
        }
        Ok(CommandOutput {
            success: out.status.success(),
            status_code: result_code,
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }

    /// Run to completion, echoing output lines as they arrive rather than capturing them.
    pub async fn run_logged(&self) -> Result<CommandOutput> {
        let mut cmd = self.make_command()?;
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        let mut child = cmd.spawn()?;
        let output = child
            .stdout
            .take()
            .ok_or(anyhow!("Cannot get process output"))?;
        let err = child
            .stderr
            .take()
            .ok_or(anyhow!("Cannot get process error"))?;
        let color = self.color;
        let out_task = tokio::spawn(async move {
            let mut out_reader = BufReader::new(output).lines();
            while let Some(line) = out_reader.next_line().await.unwrap_or(None) {
                echo_line('>', &line, color);
            }
        });
        let err_task = tokio::spawn(async move {
            let mut err_reader = BufReader::new(err).lines();
            while let Some(line) = err_reader.next_line().await.unwrap_or(None) {
                echo_line('!', &line, color);
            }
        });
        let result = child.wait().await?;
        let _ = futures::future::join(out_task, err_task).await;
        let code = result.code().unwrap_or(-1);
        if self.throw_on_failure && !result.success() {
            return Err(anyhow!(
                "Command failed - {code}: {}",
                self.describe_command()?
            ));
        }
        Ok(CommandOutput {
            success: result.success(),
            status_code: code,
            stdout: vec![],
            stderr: vec![],
        })
    }

    /// Hand the terminal over to the child; used for `attach` and `logs -f`.
    pub async fn run_interactive(&self) -> Result<i32> {
        let mut cmd = self.make_command()?;
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        let status = cmd.spawn()?.wait().await?;
        let code = status.code().unwrap_or(-1);
        if self.throw_on_failure && !status.success() {
            return Err(anyhow!("Command failed - {code}"));
        }
        Ok(code)
    }
}

fn echo_line(marker: char, line: &str, color: Option<Color>) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }
    let real_line = format!("{marker}{trimmed}");
    match color {
        Some(color) => println!("{}", real_line.color(color)),
        None => println!("{real_line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe() {
        let mut cmd = CommandBuilder::new();
        cmd.cmd("docker", &["stop"])
            .more_args(&["mosaic_ropsten"])
            .cwd("/tmp");
        assert_eq!(
            cmd.describe_command().unwrap(),
            "[/tmp]$ docker stop mosaic_ropsten"
        );
        assert!(CommandBuilder::new().describe_command().is_err());
    }

    #[tokio::test]
    async fn failures() {
        let out = CommandBuilder::new()
            .silent()
            .cmd("sh", &["-c", "echo hello; exit 3"])
            .ignore_failures()
            .run_for_output()
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.status_code, 3);
        assert_eq!(out.sanitise_stdout(), "hello");
        assert!(out.sanitise_stderr().is_empty());

        let err = CommandBuilder::new()
            .silent()
            .cmd("sh", &["-c", "exit 1"])
            .run_for_output()
            .await;
        assert!(err.is_err());
    }
}
