//! MCP client configuration files
//!
//! Desktop clients store their server map in one of three shapes:
//! `{"mcpServers": {...}}` (Claude Desktop, Cursor), `{"mcp": {"servers": {...}}}`
//! (VS Code settings) and `{"servers": {...}}` (`.vscode/mcp.json`).
//! Declaration order is kept so scans and reports follow the file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ScanError;

/// How to reach a configured server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ServerTransport {
    /// Streamable HTTP endpoint
    Remote { url: String },
    /// Child process speaking JSON-RPC over stdio
    Local {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Entry with neither a url nor a command; fails when connecting
    Unconfigured,
}

/// A single configured server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name from the config map key
    pub name: String,
    /// Transport descriptor
    #[serde(flatten)]
    pub transport: ServerTransport,
}

impl ServerConfig {
    /// Local server spawned from a command
    pub fn local(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: ServerTransport::Local {
                command: command.into(),
                args: Vec::new(),
                env: BTreeMap::new(),
            },
        }
    }

    /// Remote server reached over HTTP
    pub fn remote(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: ServerTransport::Remote { url: url.into() },
        }
    }

    /// Set arguments (ignored for remote servers)
    pub fn with_args(mut self, new_args: Vec<String>) -> Self {
        if let ServerTransport::Local { ref mut args, .. } = self.transport {
            *args = new_args;
        }
        self
    }

    /// Add an environment variable (ignored for remote servers)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ServerTransport::Local { ref mut env, .. } = self.transport {
            env.insert(key.into(), value.into());
        }
        self
    }

    /// Build from one entry of a server map
    pub fn from_entry(name: &str, entry: &Value) -> Self {
        let transport = match entry.as_object() {
            Some(fields) => transport_from_fields(fields),
            None => ServerTransport::Unconfigured,
        };

        Self {
            name: name.to_string(),
            transport,
        }
    }

    /// Short human description of the target
    pub fn target(&self) -> String {
        match &self.transport {
            ServerTransport::Remote { url } => url.clone(),
            ServerTransport::Local { command, args, .. } if args.is_empty() => command.clone(),
            ServerTransport::Local { command, args, .. } => {
                format!("{} {}", command, args.join(" "))
            }
            ServerTransport::Unconfigured => "<unconfigured>".to_string(),
        }
    }
}

fn transport_from_fields(fields: &Map<String, Value>) -> ServerTransport {
    if let Some(url) = fields.get("url").and_then(Value::as_str) {
        return ServerTransport::Remote {
            url: url.to_string(),
        };
    }

    let Some(command) = fields.get("command").and_then(Value::as_str) else {
        return ServerTransport::Unconfigured;
    };

    let args = fields
        .get("args")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(scalar_to_string).collect())
        .unwrap_or_default();

    let env = fields
        .get("env")
        .and_then(Value::as_object)
        .map(|vars| {
            vars.iter()
                .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    ServerTransport::Local {
        command: command.to_string(),
        args,
        env,
    }
}

/// Config files sometimes carry numbers or booleans where strings are expected
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A parsed config file
#[derive(Debug, Clone)]
pub struct McpConfigFile {
    /// Path as given by the caller
    pub path: String,
    /// Servers in declaration order
    pub servers: Vec<ServerConfig>,
}

impl McpConfigFile {
    /// Name of the directory holding the config file
    pub fn server_group_name(&self) -> String {
        server_group_name(Path::new(&self.path))
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Load and parse an MCP config file
pub fn load_config(path: &Path) -> Result<McpConfigFile, ScanError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ScanError::ConfigRead {
        path: display.clone(),
        source,
    })?;

    parse_config(&content, &display)
}

/// Parse config file content; `path` is used for error messages and grouping
pub fn parse_config(content: &str, path: &str) -> Result<McpConfigFile, ScanError> {
    let value: Value = serde_json::from_str(content).map_err(|source| ScanError::ConfigParse {
        path: path.to_string(),
        source,
    })?;

    let servers = extract_servers(&value).ok_or_else(|| ScanError::NoServers {
        path: path.to_string(),
    })?;

    Ok(McpConfigFile {
        path: path.to_string(),
        servers,
    })
}

/// Locate the server map in any of the known shapes
pub fn extract_servers(config: &Value) -> Option<Vec<ServerConfig>> {
    let map = config
        .get("mcpServers")
        .and_then(Value::as_object)
        .or_else(|| {
            config
                .get("mcp")
                .and_then(|mcp| mcp.get("servers"))
                .and_then(Value::as_object)
        })
        .or_else(|| config.get("servers").and_then(Value::as_object))?;

    Some(
        map.iter()
            .map(|(name, entry)| ServerConfig::from_entry(name, entry))
            .collect(),
    )
}

/// Basename of the directory containing `path`
pub fn server_group_name(path: &Path) -> String {
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
