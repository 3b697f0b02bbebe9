//! Configuration: MCP client config files, their discovery, and scanner settings

pub mod discovery;
pub mod server;
pub mod settings;

pub use discovery::find_config_files;
pub use server::{
    extract_servers, load_config, parse_config, server_group_name, McpConfigFile, ServerConfig,
    ServerTransport,
};
pub use settings::{AiSettings, ScanSettings, Settings, SettingsError};
