use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::*;

use super::*;

const BRIDGE_SCRIPT: &str = include_str!("../../python/chem_bridge.py");

/// How to launch the Python side of the chemistry bridge.
#[derive(Debug, Clone)]
pub struct PythonConfig {
    /// Interpreter with RDKit installed.
    pub program: PathBuf,
    /// Let the bridge's stderr (RDKit warnings, tracebacks) reach the terminal.
    pub forward_stderr: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Canonicalize {
        smiles: &'a str,
    },
    Generate {
        smiles: &'a str,
        output_dir: &'a Path,
        num_confs: u32,
        min_method: &'static str,
        force_fields: Vec<ForceField>,
        write_multi: bool,
    },
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    ok: bool,
    error: Option<String>,
    canonical: Option<String>,
    table: Option<ConformerTable>,
    rdkit: Option<String>,
    #[serde(default)]
    neurosnap: bool,
}

impl BridgeReply {
    fn into_result(self) -> Result<Self, ToolkitError> {
        if self.ok {
            Ok(self)
        } else {
            Err(ToolkitError::Rejected(
                self.error.unwrap_or_else(|| "toolkit reported an unspecified error".to_string()),
            ))
        }
    }
}

/// One JSON document per line in each direction.
///
/// Replies carry no request id, so they are matched to requests purely by
/// order. After any transport failure the two streams can no longer be
/// trusted to line up, and every later call fails with
/// [`ToolkitError::Closed`] without touching them.
pub struct BridgeChannel<W, R> {
    writer: W,
    reader: R,
    broken: bool,
}

impl<W: Write, R: BufRead> BridgeChannel<W, R> {
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader,
            broken: false,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    fn call(&mut self, request: &BridgeRequest) -> Result<BridgeReply, ToolkitError> {
        if self.broken {
            return Err(ToolkitError::Closed);
        }
        let result = self.exchange(request);
        if let Err(err) = &result {
            warn!("Chemistry bridge is out of step, no further requests will be sent: {}", err);
            self.broken = true;
        }
        result
    }

    fn exchange(&mut self, request: &BridgeRequest) -> Result<BridgeReply, ToolkitError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        self.read_reply()
    }

    fn read_reply(&mut self) -> Result<BridgeReply, ToolkitError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(ToolkitError::Closed);
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Waits for the greeting the bridge sends once its imports succeed.
    fn handshake(&mut self) -> Result<(), ToolkitError> {
        let hello = match self.read_reply() {
            Ok(hello) => hello,
            Err(err) => {
                self.broken = true;
                return Err(err);
            }
        };
        if !hello.ok {
            return Err(ToolkitError::Unavailable(
                hello.error.unwrap_or_else(|| "bridge failed to start".to_string()),
            ));
        }
        info!(
            "Chemistry bridge ready (RDKit {}, neurosnap {})",
            hello.rdkit.as_deref().unwrap_or("unknown"),
            if hello.neurosnap { "available" } else { "not installed" }
        );
        Ok(())
    }
}

impl<W: Write, R: BufRead> Canonicalizer for BridgeChannel<W, R> {
    fn canonicalize(&mut self, smiles: &str) -> Result<String, ToolkitError> {
        let reply = self.call(&BridgeRequest::Canonicalize { smiles })?.into_result()?;
        reply
            .canonical
            .ok_or_else(|| ToolkitError::Rejected("toolkit returned no canonical SMILES".to_string()))
    }
}

impl<W: Write, R: BufRead> ConformerGenerator for BridgeChannel<W, R> {
    fn generate(&mut self, request: &ConformerRequest) -> Result<ConformerTable, ToolkitError> {
        let reply = self
            .call(&BridgeRequest::Generate {
                smiles: &request.smiles,
                output_dir: &request.output_dir,
                num_confs: request.num_confs,
                min_method: request.min_method.as_str(),
                force_fields: request.min_method.force_fields(),
                write_multi: request.write_multi,
            })?
            .into_result()?;
        reply
            .table
            .ok_or_else(|| ToolkitError::Rejected("toolkit returned no conformer statistics".to_string()))
    }
}

/// RDKit running in a long-lived Python child process.
///
/// The process is started once per pipeline run and shut down on drop by
/// closing its stdin.
pub struct PythonToolkit {
    child: Child,
    channel: Option<BridgeChannel<ChildStdin, BufReader<ChildStdout>>>,
}

impl PythonToolkit {
    pub fn spawn(config: &PythonConfig) -> Result<Self, ToolkitError> {
        debug!("Starting chemistry bridge with {}", config.program.display());
        let stderr = if config.forward_stderr {
            Stdio::inherit()
        } else {
            Stdio::null()
        };
        let mut child = Command::new(&config.program)
            .arg("-u")
            .arg("-c")
            .arg(BRIDGE_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|source| ToolkitError::Spawn {
                program: config.program.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(ToolkitError::Closed);
        };

        let mut toolkit = Self {
            child,
            channel: Some(BridgeChannel::new(stdin, BufReader::new(stdout))),
        };
        toolkit.channel()?.handshake()?;
        Ok(toolkit)
    }

    fn channel(&mut self) -> Result<&mut BridgeChannel<ChildStdin, BufReader<ChildStdout>>, ToolkitError> {
        self.channel.as_mut().ok_or(ToolkitError::Closed)
    }

    /// Closes the bridge's stdin once the channel is out of step, so the
    /// child can exit while the remaining molecules fail fast.
    fn release_if_broken(&mut self) {
        if self.channel.as_ref().is_some_and(BridgeChannel::is_broken) {
            self.channel = None;
        }
    }
}

impl Canonicalizer for PythonToolkit {
    fn canonicalize(&mut self, smiles: &str) -> Result<String, ToolkitError> {
        let result = self.channel()?.canonicalize(smiles);
        self.release_if_broken();
        result
    }
}

impl ConformerGenerator for PythonToolkit {
    fn generate(&mut self, request: &ConformerRequest) -> Result<ConformerTable, ToolkitError> {
        let result = self.channel()?.generate(request);
        self.release_if_broken();
        result
    }
}

impl Drop for PythonToolkit {
    fn drop(&mut self) {
        // Closing stdin ends the bridge's read loop.
        drop(self.channel.take());
        match self.child.wait() {
            Ok(status) if !status.success() => warn!("Chemistry bridge exited with {}", status),
            Ok(_) => debug!("Chemistry bridge exited"),
            Err(err) => warn!("Failed to wait for chemistry bridge: {}", err),
        }
    }
}
