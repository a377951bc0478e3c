//! node process runner.

use blake3::Hasher;
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use js_coverage::{ExecError, Executable, Executor, Invocation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::future::Future;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

const HARNESS_FILENAME: &str = "js-adequacy-harness.mjs";
const HARNESS_LOCK_FILENAME: &str = "js-adequacy-harness.lock";
const NODE_BINARY_ENV: &str = "NODE_BINARY";
const HARNESS_SOURCE: &str = r#"import { createInterface } from 'node:readline';
import { Console } from 'node:console';
import { stdin, stdout, stderr } from 'node:process';

// stdout carries the protocol; program output goes to stderr.
const protocolWrite = stdout.write.bind(stdout);
stdout.write = (chunk, ...rest) => stderr.write(chunk, ...rest);
globalThis.console = new Console({ stdout: stderr, stderr });

const sink = { func: new Set(), stmt: new Set(), branch: new Set() };
let entry = null;

const reply = (message) => protocolWrite(JSON.stringify(message) + '\n');
const describe = (err) => (err && err.message ? err.message : String(err));

reply({ ready: true });

const rl = createInterface({ input: stdin, crlfDelay: Infinity });

for await (const line of rl) {
  if (!line.trim()) continue;

  let req;
  try {
    req = JSON.parse(line);
  } catch (err) {
    reply({ id: null, error: `invalid json: ${describe(err)}` });
    continue;
  }

  const id = req.id;

  if (req.kind === 'compile') {
    let orig;
    try {
      orig = new Function('__cov__', 'const orig = ' + req.program + '\n;\nreturn orig;')(sink);
    } catch (err) {
      reply({ id, notRunnable: describe(err) });
      continue;
    }
    if (typeof orig !== 'function') {
      reply({ id, notRunnable: `expected a function, got ${typeof orig}` });
      continue;
    }
    entry = orig;
    reply({ id });
  } else if (req.kind === 'invoke') {
    if (entry === null) {
      reply({ id, error: 'no program compiled' });
      continue;
    }
    sink.func.clear();
    sink.stmt.clear();
    sink.branch.clear();
    let threw = null;
    try {
      entry(...(req.args || []));
    } catch (err) {
      threw = describe(err);
    }
    reply({ id, func: [...sink.func], stmt: [...sink.stmt], branch: [...sink.branch], threw });
  } else {
    reply({ id, error: `unknown request kind: ${req.kind}` });
  }
}
"#;

/// Error types for the node runner.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Failed to spawn node process.
    #[error("failed to spawn node: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// node process exited with error.
    #[error("node exited with code {code}: {stderr}")]
    ProcessFailed { code: i32, stderr: String },

    /// node binary not found at an explicitly given path.
    #[error("node binary not found at: {0}")]
    NotFound(Utf8PathBuf),

    /// No node binary could be located.
    #[error("node binary not found; install Node.js or set {NODE_BINARY_ENV}")]
    NotInstalled,

    /// Failed to write the harness script.
    #[error("failed to prepare harness script: {0}")]
    ScriptFailed(String),

    /// The program did not evaluate to a callable entry point.
    #[error("{0}")]
    NotRunnable(String),

    /// node runner protocol error.
    #[error("node runner protocol error: {0}")]
    ProtocolError(String),

    /// Failed to parse node response.
    #[error("failed to parse node response: {0}")]
    ParseError(String),
}

impl From<NodeError> for ExecError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::NotRunnable(message) => ExecError::NotRunnable(message),
            other => ExecError::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum NodeRequest<'a> {
    Compile { id: u64, program: &'a str },
    Invoke { id: u64, args: &'a [Value] },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeResponse {
    id: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    not_runnable: Option<String>,
    #[serde(flatten)]
    invocation: Invocation,
}

#[derive(Debug, Deserialize)]
struct NodeReady {
    ready: bool,
}

/// Compiles instrumented programs in `node` child processes.
#[derive(Debug, Clone)]
pub struct NodeRunner {
    node_path: Utf8PathBuf,
    script_path: Utf8PathBuf,
}

impl NodeRunner {
    /// Creates a runner for the node binary at `node_path`.
    pub fn new(node_path: Utf8PathBuf) -> Result<Self, NodeError> {
        if !node_path.exists() {
            return Err(NodeError::NotFound(node_path));
        }
        let script_path = ensure_script()?;
        Ok(Self {
            node_path,
            script_path,
        })
    }

    /// Creates a runner for `explicit` if given, or for the node found by
    /// [`NodeRunner::find_node`].
    pub fn discover(explicit: Option<&str>) -> Result<Self, NodeError> {
        let node_path = match explicit {
            Some(path) => Utf8PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => Self::find_node().ok_or(NodeError::NotInstalled)?,
        };
        Self::new(node_path)
    }

    /// Attempts to find node in the environment, PATH or version managers.
    /// 1. `NODE_BINARY` environment variable
    /// 2. PATH
    /// 3. ~/.nvm/current/bin/node
    /// 4. ~/.volta/bin/node
    pub fn find_node() -> Option<Utf8PathBuf> {
        if let Ok(path) = std::env::var(NODE_BINARY_ENV) {
            let expanded = shellexpand::tilde(&path);
            let path = Utf8Path::new(expanded.as_ref());
            if path.exists() {
                return Some(path.to_owned());
            }
        }

        if let Ok(path) = which::which("node") {
            if let Ok(utf8_path) = Utf8PathBuf::try_from(path) {
                return Some(utf8_path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            if let Ok(home) = Utf8PathBuf::try_from(home) {
                for bin in [".nvm/current/bin", ".volta/bin"] {
                    if let Some(path) = find_node_in_bin(&home.join(bin)) {
                        return Some(path);
                    }
                }
            }
        }

        None
    }

    /// Gets the cache directory for js-adequacy.
    pub fn get_cache_dir() -> Option<Utf8PathBuf> {
        dirs::cache_dir()
            .and_then(|p| Utf8PathBuf::try_from(p).ok())
            .map(|p| p.join("js-adequacy"))
    }

    /// The node binary this runner spawns.
    pub fn node_path(&self) -> &Utf8Path {
        &self.node_path
    }

    /// Gets the version of the node binary.
    pub async fn get_node_version(&self) -> Result<String, NodeError> {
        let output = Command::new(&self.node_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(NodeError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NodeError::ProcessFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn compile_program(&self, program: String) -> Result<NodeExecutable, NodeError> {
        let mut worker = NodeWorker::spawn(&self.node_path, &self.script_path).await?;
        let id = worker.next_id();
        let response = worker
            .request(NodeRequest::Compile {
                id,
                program: &program,
            })
            .await?;
        if let Some(message) = response.not_runnable {
            return Err(NodeError::NotRunnable(message));
        }
        Ok(NodeExecutable { worker })
    }
}

impl Executor for NodeRunner {
    type Executable = NodeExecutable;

    fn compile(
        &self,
        program: &str,
    ) -> impl Future<Output = Result<NodeExecutable, ExecError>> + Send {
        let runner = self.clone();
        let program = program.to_string();
        async move { Ok(runner.compile_program(program).await?) }
    }
}

/// A program compiled into a running node process.
///
/// The process is killed when the executable is dropped.
pub struct NodeExecutable {
    worker: NodeWorker,
}

impl std::fmt::Debug for NodeExecutable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeExecutable")
            .field("pid", &self.worker.child.id())
            .finish()
    }
}

impl Executable for NodeExecutable {
    fn invoke(
        &mut self,
        args: &[Value],
    ) -> impl Future<Output = Result<Invocation, ExecError>> + Send {
        let args = args.to_vec();
        async move {
            let id = self.worker.next_id();
            let response = self
                .worker
                .request(NodeRequest::Invoke { id, args: &args })
                .await?;
            Ok(response.invocation)
        }
    }
}

fn find_node_in_bin(bin: &Utf8Path) -> Option<Utf8PathBuf> {
    let candidates: &[&str] = if cfg!(windows) {
        &["node.exe", "node"]
    } else {
        &["node"]
    };

    for candidate in candidates.iter() {
        let path = bin.join(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

fn ensure_script() -> Result<Utf8PathBuf, NodeError> {
    let cache_dir = NodeRunner::get_cache_dir()
        .ok_or_else(|| NodeError::ScriptFailed("could not determine cache directory".into()))?;
    write_script(&cache_dir)
}

fn script_is_current(script_path: &Utf8Path) -> bool {
    let mut expected = Hasher::new();
    expected.update(HARNESS_SOURCE.as_bytes());

    match fs::read(script_path) {
        Ok(existing) => {
            let mut hasher = Hasher::new();
            hasher.update(&existing);
            hasher.finalize() == expected.finalize()
        }
        Err(_) => false,
    }
}

/// Writes the harness into `dir` unless an identical copy is already there.
///
/// Concurrent writers are serialized through a lock file next to the script.
fn write_script(dir: &Utf8Path) -> Result<Utf8PathBuf, NodeError> {
    fs::create_dir_all(dir)
        .map_err(|e| NodeError::ScriptFailed(format!("failed to create cache dir: {e}")))?;

    let script_path = dir.join(HARNESS_FILENAME);
    if script_is_current(&script_path) {
        return Ok(script_path);
    }

    let lock = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(HARNESS_LOCK_FILENAME))
        .map_err(|e| NodeError::ScriptFailed(format!("failed to open lock file: {e}")))?;
    lock.lock_exclusive()
        .map_err(|e| NodeError::ScriptFailed(format!("failed to lock harness script: {e}")))?;

    let result = if script_is_current(&script_path) {
        Ok(())
    } else {
        fs::write(&script_path, HARNESS_SOURCE)
            .map_err(|e| NodeError::ScriptFailed(format!("failed to write harness script: {e}")))
    };

    let _ = lock.unlock();
    result.map(|()| script_path)
}

struct NodeWorker {
    child: Child,
    stdin: ChildStdin,
    stdout: tokio::io::Lines<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    next_id: u64,
}

impl NodeWorker {
    async fn spawn(node_path: &Utf8Path, script_path: &Utf8Path) -> Result<Self, NodeError> {
        let mut child = Command::new(node_path)
            .arg(script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(NodeError::SpawnFailed)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| NodeError::ProtocolError("failed to open node stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| NodeError::ProtocolError("failed to open node stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| NodeError::ProtocolError("failed to open node stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buffer = String::new();
            let _ = reader.read_to_string(&mut buffer).await;
            buffer
        });

        let mut stdout_reader = BufReader::new(stdout).lines();

        let ready_line = stdout_reader
            .next_line()
            .await
            .map_err(|e| NodeError::ProtocolError(format!("failed to read node ready: {e}")))?;

        let Some(ready_line) = ready_line else {
            let stderr = stderr_task.await.unwrap_or_default();
            let status = child.wait().await.map_err(NodeError::SpawnFailed)?;
            return Err(NodeError::ProcessFailed {
                code: status.code().unwrap_or(-1),
                stderr,
            });
        };

        let ready: NodeReady = serde_json::from_str(&ready_line)
            .map_err(|e| NodeError::ParseError(format!("invalid ready response: {e}")))?;
        if !ready.ready {
            return Err(NodeError::ProtocolError(format!(
                "unexpected node ready response: {}",
                ready_line
            )));
        }

        Ok(Self {
            child,
            stdin,
            stdout: stdout_reader,
            stderr_task: Some(stderr_task),
            next_id: 1,
        })
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn request(&mut self, request: NodeRequest<'_>) -> Result<NodeResponse, NodeError> {
        let id = match &request {
            NodeRequest::Compile { id, .. } | NodeRequest::Invoke { id, .. } => *id,
        };

        let line = serde_json::to_string(&request)
            .map_err(|e| NodeError::ProtocolError(format!("failed to serialize request: {e}")))?;
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| NodeError::ProtocolError(format!("failed to write to node stdin: {e}")))?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(|e| NodeError::ProtocolError(format!("failed to write newline: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| NodeError::ProtocolError(format!("failed to flush node stdin: {e}")))?;

        loop {
            let line = self.stdout.next_line().await.map_err(|e| {
                NodeError::ProtocolError(format!("failed to read node response: {e}"))
            })?;

            let Some(line) = line else {
                let stderr = match self.stderr_task.take() {
                    Some(handle) => handle.await.unwrap_or_default(),
                    None => String::new(),
                };
                let status = self.child.wait().await.map_err(NodeError::SpawnFailed)?;
                return Err(NodeError::ProcessFailed {
                    code: status.code().unwrap_or(-1),
                    stderr,
                });
            };

            if let Some(response) = parse_response(&line, id)? {
                return Ok(response);
            }
        }
    }
}

/// Parses one stdout line as the reply to request `expected_id`.
///
/// Returns `Ok(None)` for lines to skip: anything that is not a JSON object
/// with an `id` key, and replies to earlier requests.
fn parse_response(line: &str, expected_id: u64) -> Result<Option<NodeResponse>, NodeError> {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return Ok(None);
    };
    if !value.as_object().is_some_and(|object| object.contains_key("id")) {
        return Ok(None);
    }

    let response: NodeResponse = serde_json::from_value(value)
        .map_err(|e| NodeError::ParseError(format!("invalid response: {e} ({line})")))?;

    match response.id {
        Some(id) if id < expected_id => Ok(None),
        Some(id) if id > expected_id => Err(NodeError::ProtocolError(format!(
            "unexpected response id {id}, expected {expected_id}"
        ))),
        _ => match response.error {
            Some(error) => Err(NodeError::ProtocolError(error)),
            None if response.id.is_none() => Err(NodeError::ProtocolError(format!(
                "missing response id: {line}"
            ))),
            None => Ok(Some(response)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let compile = serde_json::to_value(NodeRequest::Compile {
            id: 1,
            program: "function f() {}",
        })
        .unwrap();
        assert_eq!(
            compile,
            json!({ "kind": "compile", "id": 1, "program": "function f() {}" })
        );

        let args = [json!(3), json!("x")];
        let invoke = serde_json::to_value(NodeRequest::Invoke { id: 2, args: &args }).unwrap();
        assert_eq!(invoke, json!({ "kind": "invoke", "id": 2, "args": [3, "x"] }));
    }

    #[test]
    fn test_parse_invoke_response() {
        let response = parse_response(
            r#"{"id":2,"func":[0],"stmt":[0,1],"branch":[],"threw":null}"#,
            2,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            response.invocation,
            Invocation {
                func: vec![0],
                stmt: vec![0, 1],
                branch: vec![],
                threw: None,
            }
        );
    }

    #[test]
    fn test_parse_not_runnable_response() {
        let response = parse_response(r#"{"id":1,"notRunnable":"boom"}"#, 1)
            .unwrap()
            .unwrap();
        assert_eq!(response.not_runnable.as_deref(), Some("boom"));
        assert_eq!(response.invocation, Invocation::default());
    }

    #[test]
    fn test_parse_rejects_mismatched_and_failed_responses() {
        assert!(matches!(
            parse_response(r#"{"id":3}"#, 2),
            Err(NodeError::ProtocolError(_))
        ));
        assert!(matches!(
            parse_response(r#"{"id":null,"error":"invalid json"}"#, 2),
            Err(NodeError::ProtocolError(_))
        ));
        assert!(matches!(
            parse_response(r#"{"id":2,"func":"nope"}"#, 2),
            Err(NodeError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_skips_foreign_and_stale_lines() {
        assert!(parse_response("pos", 2).unwrap().is_none());
        assert!(parse_response("42", 2).unwrap().is_none());
        assert!(parse_response(r#"{"level":"info"}"#, 2).unwrap().is_none());
        assert!(parse_response(r#"{"id":1,"func":[0]}"#, 2).unwrap().is_none());
        assert!(parse_response(r#"{"id":2}"#, 2).unwrap().is_some());
    }

    #[test]
    fn test_error_conversion() {
        assert!(matches!(
            ExecError::from(NodeError::NotRunnable("nope".into())),
            ExecError::NotRunnable(message) if message == "nope"
        ));
        assert!(matches!(
            ExecError::from(NodeError::NotInstalled),
            ExecError::Transport(_)
        ));
    }

    #[test]
    fn test_write_script_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();

        let path = write_script(dir).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), HARNESS_SOURCE);

        fs::write(&path, "stale").unwrap();
        assert!(!script_is_current(&path));
        let again = write_script(dir).unwrap();
        assert_eq!(again, path);
        assert!(script_is_current(&path));
    }

    #[test]
    fn test_find_node_in_bin() {
        let dir = tempfile::tempdir().unwrap();
        let bin = Utf8Path::from_path(dir.path()).unwrap();
        assert_eq!(find_node_in_bin(bin), None);

        let name = if cfg!(windows) { "node.exe" } else { "node" };
        fs::write(bin.join(name), "").unwrap();
        assert_eq!(find_node_in_bin(bin), Some(bin.join(name)));
    }

    #[test]
    fn test_missing_explicit_node() {
        assert!(matches!(
            NodeRunner::new(Utf8PathBuf::from("/definitely/not/here/node")),
            Err(NodeError::NotFound(_))
        ));
    }
}
