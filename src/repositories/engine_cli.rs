use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::{stream, StreamExt};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::errors::engine::EngineError;
use crate::models::build::BuildOptions;
use crate::models::engine::{
    CacheRecord, ContainerRecord, EngineVersion, EngineInfo, HistoryRecord, ImageRecord,
    NetworkRecord, VolumeRecord,
};
use crate::models::image::ImageDeleteItem;
use crate::models::version::ComponentVersion;
use crate::parsers;
use crate::repositories::engine_client::{BodyInput, ByteStream, EngineClient, LineStream};

/// Invokes the engine CLI (container lifecycle) and the build CLI (cache
/// management) as subprocesses. One subprocess per call, no pooling, no
/// retries.
#[derive(Debug, Clone)]
pub struct EngineCli {
    config: EngineConfig,
}

impl EngineCli {
    pub fn new(config: EngineConfig) -> Self {
        EngineCli { config }
    }

    async fn engine_output(&self, args: &[&str]) -> Result<Vec<u8>, EngineError> {
        run_output(&self.config.engine_binary, args).await
    }

    async fn engine_text(&self, args: &[&str]) -> Result<String, EngineError> {
        let output = self.engine_output(args).await?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    async fn build_output(&self, args: &[&str]) -> Result<Vec<u8>, EngineError> {
        run_output(&self.config.build_binary, args).await
    }

    fn spawn_engine(&self, args: &[String], stdin: Stdio) -> Result<(Child, String), EngineError> {
        let command = display_command(&self.config.engine_binary, args);
        info!(command = %command, "spawning");
        let child = Command::new(&self.config.engine_binary)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::SpawnFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;
        Ok((child, command))
    }

    async fn inspect_blob(&self, args: &[&str]) -> Result<Value, EngineError> {
        let command = display_command(&self.config.engine_binary, args);
        let output = self.engine_output(args).await?;
        parsers::parse_inspect_json(&output)
            .map_err(|e| unparsable(&command, e))?
            .ok_or_else(|| EngineError::NotFound {
                message: format!("no such object: {}", args.last().unwrap_or(&"")),
            })
    }

    async fn probe_component(&self, tool: &str) -> Option<ComponentVersion> {
        let banner = match run_output(tool, &["--version"]).await {
            Ok(output) => String::from_utf8_lossy(&output).into_owned(),
            Err(e) => {
                debug!(tool, error = %e, "component version probe failed");
                return None;
            }
        };
        let parsed = match tool {
            "runc" => parsers::parse_runtime_banner(&banner),
            "tini" => parsers::parse_init_banner(&banner),
            _ => parsers::parse_module_banner(tool, &banner),
        };
        match parsed {
            Ok((version, commit)) => Some(ComponentVersion::new(tool, version, commit)),
            Err(e) => {
                debug!(tool, error = %e, "component banner not understood");
                None
            }
        }
    }
}

#[async_trait]
impl EngineClient for EngineCli {
    async fn engine_version(&self) -> Result<String, EngineError> {
        let banner = self.engine_text(&["--version"]).await?;
        parsers::parse_engine_banner(&banner)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &["--version"]), e))
    }

    async fn client_version(&self) -> Result<EngineVersion, EngineError> {
        let args = ["version", "--format", "{{json .}}"];
        let output = self.engine_output(&args).await?;
        serde_json::from_slice(&output)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &args), e))
    }

    async fn component_versions(&self) -> Result<Vec<ComponentVersion>, EngineError> {
        let mut components = vec![ComponentVersion::new(
            "nerdctl",
            self.engine_version().await?,
            None,
        )];
        for tool in ["containerd", "buildkitd", "runc", "tini"] {
            if let Some(component) = self.probe_component(tool).await {
                components.push(component);
            }
        }
        Ok(components)
    }

    async fn system_info(&self) -> Result<EngineInfo, EngineError> {
        let args = ["info", "--format", "{{json .}}"];
        let output = self.engine_output(&args).await?;
        serde_json::from_slice(&output)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &args), e))
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>, EngineError> {
        let args = ["images", "--digests", "--format", "{{json .}}"];
        let text = self.engine_text(&args).await?;
        parsers::json_lines(&text)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &args), e))
    }

    async fn inspect_image(&self, name: &str) -> Result<Value, EngineError> {
        self.inspect_blob(&["image", "inspect", "--mode=dockercompat", name])
            .await
    }

    async fn image_history(&self, name: &str) -> Result<Vec<HistoryRecord>, EngineError> {
        let args = ["history", "--format", "{{json .}}", name];
        let text = self.engine_text(&args).await?;
        parsers::json_lines(&text)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &args), e))
    }

    async fn tag_image(&self, name: &str, target: &str) -> Result<(), EngineError> {
        self.engine_output(&["tag", name, target]).await?;
        Ok(())
    }

    async fn remove_image(&self, name: &str) -> Result<Vec<ImageDeleteItem>, EngineError> {
        let text = self.engine_text(&["rmi", name]).await?;
        Ok(parsers::parse_removal_lines(&text))
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>, EngineError> {
        let mut args = vec!["ps"];
        if all {
            args.push("-a");
        }
        args.extend(["--format", "{{json .}}"]);
        let text = self.engine_text(&args).await?;
        parsers::json_lines(&text)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &args), e))
    }

    async fn inspect_container(&self, name: &str) -> Result<Value, EngineError> {
        self.inspect_blob(&["container", "inspect", "--mode=dockercompat", name])
            .await
    }

    async fn container_logs(
        &self,
        name: &str,
        tail: Option<String>,
    ) -> Result<Vec<String>, EngineError> {
        let mut args = vec!["logs".to_string()];
        if let Some(tail) = tail.filter(|t| t != "all") {
            args.push("--tail".to_string());
            args.push(tail);
        }
        args.push(name.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let text = self.engine_text(&args).await?;
        Ok(text.lines().map(str::to_string).collect())
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, EngineError> {
        let args = ["volume", "ls", "--format", "{{json .}}"];
        let text = self.engine_text(&args).await?;
        parsers::json_lines(&text)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &args), e))
    }

    async fn inspect_volume(&self, name: &str) -> Result<VolumeRecord, EngineError> {
        let value = self.inspect_blob(&["volume", "inspect", name]).await?;
        serde_json::from_value(value).map_err(|e| unparsable("volume inspect", e))
    }

    async fn list_networks(&self) -> Result<Vec<NetworkRecord>, EngineError> {
        let args = ["network", "ls", "--format", "{{json .}}"];
        let text = self.engine_text(&args).await?;
        parsers::json_lines(&text)
            .map_err(|e| unparsable(&display_command(&self.config.engine_binary, &args), e))
    }

    async fn inspect_network(&self, name: &str) -> Result<NetworkRecord, EngineError> {
        let value = self.inspect_blob(&["network", "inspect", name]).await?;
        serde_json::from_value(value).map_err(|e| unparsable("network inspect", e))
    }

    async fn pull_image(&self, reference: &str) -> Result<LineStream, EngineError> {
        let args = vec!["pull".to_string(), reference.to_string()];
        let (child, command) = self.spawn_engine(&args, Stdio::null())?;
        Ok(relay_lines(child, command, None))
    }

    async fn push_image(&self, reference: &str) -> Result<LineStream, EngineError> {
        let args = vec!["push".to_string(), reference.to_string()];
        let (child, command) = self.spawn_engine(&args, Stdio::null())?;
        Ok(relay_lines(child, command, None))
    }

    async fn load_images(&self, input: BodyInput) -> Result<LineStream, EngineError> {
        let args = vec!["load".to_string()];
        let (mut child, command) = self.spawn_engine(&args, Stdio::piped())?;
        let Some(mut stdin) = child.stdin.take() else {
            return Err(EngineError::SpawnFailed {
                command,
                reason: "stdin pipe missing".to_string(),
            });
        };

        // The body copy runs concurrently with output reading; its result is
        // delivered through a single-slot channel so a failed copy is never
        // silently dropped.
        let (copy_tx, copy_rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut input = input;
            let result: std::io::Result<()> = async {
                while let Some(chunk) = input.next().await {
                    stdin.write_all(&chunk?).await?;
                }
                stdin.shutdown().await
            }
            .await;
            let _ = copy_tx.send(result);
        });

        Ok(relay_lines(child, command, Some(copy_rx)))
    }

    async fn save_images(&self, names: Vec<String>) -> Result<ByteStream, EngineError> {
        let mut args = vec!["save".to_string()];
        args.extend(names);
        let (child, command) = self.spawn_engine(&args, Stdio::null())?;
        Ok(relay_bytes(child, command))
    }

    async fn build_image(
        &self,
        context: PathBuf,
        options: BuildOptions,
    ) -> Result<LineStream, EngineError> {
        let args = build_args(&context, &options);
        let (child, command) = self.spawn_engine(&args, Stdio::null())?;
        Ok(relay_lines(child, command, None))
    }

    async fn cache_usage(&self) -> Result<Vec<CacheRecord>, EngineError> {
        let args = ["du", "--verbose"];
        let output = self.build_output(&args).await?;
        parsers::parse_cache_report(&String::from_utf8_lossy(&output))
            .map_err(|e| unparsable(&display_command(&self.config.build_binary, &args), e))
    }

    async fn prune_cache(&self) -> Result<(), EngineError> {
        self.build_output(&["prune"]).await?;
        Ok(())
    }
}

fn build_args(context: &Path, options: &BuildOptions) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if let Some(tag) = &options.tag {
        args.push("-t".to_string());
        args.push(tag.clone());
    }
    if let Some(dockerfile) = &options.dockerfile {
        args.push("-f".to_string());
        args.push(dockerfile.clone());
    }
    if let Some(platform) = &options.platform {
        args.push("--platform".to_string());
        args.push(platform.clone());
    }
    for (key, value) in &options.build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }
    for (key, value) in &options.labels {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(context.display().to_string());
    args
}

fn display_command<S: AsRef<str>>(bin: &str, args: &[S]) -> String {
    let mut command = bin.to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg.as_ref());
    }
    command
}

fn unparsable(command: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::UnparsableOutput {
        command: command.to_string(),
        reason: err.to_string(),
    }
}

async fn run_output(bin: &str, args: &[&str]) -> Result<Vec<u8>, EngineError> {
    let command = display_command(bin, args);
    debug!(command = %command, "running");
    let output = Command::new(bin)
        .args(args)
        .output()
        .await
        .map_err(|e| EngineError::SpawnFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(command = %command, %stderr, "command failed");
        let lowered = stderr.to_lowercase();
        if lowered.contains("no such") || lowered.contains("not found") {
            return Err(EngineError::NotFound { message: stderr });
        }
        return Err(EngineError::CommandFailed {
            command,
            reason: stderr,
        });
    }
    Ok(output.stdout)
}

/// Reads subprocess stderr to completion, then reaps the process. The stderr
/// pipe is drained before `wait` so a chatty tool cannot deadlock on a full
/// pipe buffer.
async fn finish_child(
    child: &mut Child,
    command: &str,
) -> Option<std::io::Error> {
    let stderr = match child.stderr.take() {
        Some(mut pipe) => {
            let mut text = String::new();
            let _ = pipe.read_to_string(&mut text).await;
            text.trim().to_string()
        }
        None => String::new(),
    };
    match child.wait().await {
        Ok(status) if status.success() => None,
        Ok(status) => Some(std::io::Error::other(format!(
            "{} exited with {}: {}",
            command, status, stderr
        ))),
        Err(e) => Some(e),
    }
}

/// Forwards subprocess stdout line by line. At end of output the optional
/// input-copy result is awaited first, then the exit status; either failure
/// surfaces as the final stream item. Dropping the stream kills the child.
fn relay_lines(
    mut child: Child,
    command: String,
    copy_done: Option<oneshot::Receiver<std::io::Result<()>>>,
) -> LineStream {
    let (tx, rx) = mpsc::channel::<std::io::Result<String>>(16);
    tokio::spawn(async move {
        let Some(stdout) = child.stdout.take() else {
            return;
        };
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(Ok(line)).await.is_err() {
                        // Receiver dropped (client gone): abandon, child is
                        // killed on drop.
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
        if let Some(done) = copy_done {
            if let Ok(Err(e)) = done.await {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
        if let Some(e) = finish_child(&mut child, &command).await {
            let _ = tx.send(Err(e)).await;
        }
    });
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

/// Forwards subprocess stdout as raw chunks (image export).
fn relay_bytes(mut child: Child, command: String) -> ByteStream {
    let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(16);
    tokio::spawn(async move {
        let Some(mut stdout) = child.stdout.take() else {
            return;
        };
        let mut buf = vec![0u8; 32 * 1024];
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
        if let Some(e) = finish_child(&mut child, &command).await {
            let _ = tx.send(Err(e)).await;
        }
    });
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}
