//! Capability registry and dynamic execution.
//!
//! Synthesized capabilities are made invocable through an in-process
//! registry keyed by name, populated by an explicit register step after
//! synthesis. The default handle runs the persisted Python source in a
//! subprocess; tests register native handles instead.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{OrchestratorError, Result};
use crate::store::CapabilityStore;

/// An invocable capability handle.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn invoke(&self, args: &Value) -> Result<Value>;
}

/// Map from capability name to its invocable handle.
///
/// Lookup of an unregistered name is a typed error, never a best-effort
/// dynamic import.
pub struct CapabilityRegistry {
    inner: RwLock<HashMap<String, Arc<dyn Capability>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handle under a name. Re-registering replaces the
    /// previous handle.
    pub fn register(&self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.into(), capability);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Capability>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| OrchestratorError::CapabilityNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces an invocable handle for a synthesized capability.
///
/// The seam that lets deployments substitute a gated or sandboxed
/// execution mechanism, and lets tests substitute native handles.
pub trait CapabilityLoader: Send + Sync {
    fn load(&self, name: &str) -> Arc<dyn Capability>;
}

/// Loader producing subprocess-backed handles for Python sources held in
/// a capability store.
pub struct PythonLoader {
    store: CapabilityStore,
    interpreter: String,
}

impl PythonLoader {
    pub fn new(store: CapabilityStore, interpreter: impl Into<String>) -> Self {
        Self {
            store,
            interpreter: interpreter.into(),
        }
    }
}

impl CapabilityLoader for PythonLoader {
    fn load(&self, name: &str) -> Arc<dyn Capability> {
        Arc::new(PythonCapability::new(
            name,
            self.store.root().to_path_buf(),
            self.interpreter.clone(),
        ))
    }
}

/// Executes a synthesized Python capability in a subprocess.
///
/// The bootstrap imports the module named after the capability from the
/// store directory and calls the function with the same name, with the
/// argument object unpacked as keyword arguments. Arguments travel as
/// JSON on stdin; the result comes back as JSON on stdout.
pub struct PythonCapability {
    name: String,
    dir: PathBuf,
    interpreter: String,
}

impl PythonCapability {
    pub fn new(name: impl Into<String>, dir: PathBuf, interpreter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir,
            interpreter: interpreter.into(),
        }
    }

    fn bootstrap(&self) -> Result<String> {
        // JSON string escaping is valid Python string escaping here.
        let dir_literal = serde_json::to_string(&self.dir.to_string_lossy())?;

        Ok(format!(
            "import json, sys\n\
             sys.path.insert(0, {dir})\n\
             from {name} import {name}\n\
             args = json.load(sys.stdin)\n\
             print(json.dumps({name}(**args)))\n",
            dir = dir_literal,
            name = self.name,
        ))
    }

    fn failure(&self, reason: impl Into<String>) -> OrchestratorError {
        OrchestratorError::invocation(&self.name, reason)
    }
}

#[async_trait]
impl Capability for PythonCapability {
    async fn invoke(&self, args: &Value) -> Result<Value> {
        let bootstrap = self.bootstrap()?;

        debug!(capability = %self.name, interpreter = %self.interpreter, "Invoking capability");

        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(&bootstrap)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("failed to spawn {}: {}", self.interpreter, e)))?;

        let payload = serde_json::to_vec(args)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| self.failure(format!("failed to write arguments: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.failure(format!("failed to wait for interpreter: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_result(&stdout)
            .ok_or_else(|| self.failure(format!("output was not valid JSON: {}", stdout.trim())))
    }
}

/// The result is the last line of stdout that parses as JSON, so stray
/// prints from the synthesized code do not break decoding.
fn parse_result(stdout: &str) -> Option<Value> {
    let trimmed = stdout.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    trimmed
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| serde_json::from_str(line).ok())
}
