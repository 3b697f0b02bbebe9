//! Well-known MCP client config locations

use std::path::{Path, PathBuf};

use tracing::debug;

/// Every location probed when no explicit path is given, in probe order
pub fn candidate_paths(home: &Path, config_dir: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
    let mut paths = vec![
        // Claude Desktop
        home.join("Library/Application Support/Claude/claude_desktop_config.json"),
        home.join("AppData/Roaming/Claude/claude_desktop_config.json"),
        home.join(".config/Claude/claude_desktop_config.json"),
        // Cursor
        home.join(".cursor/mcp.json"),
        // Windsurf
        home.join(".codeium/windsurf/mcp_config.json"),
        // Cline (VS Code extension storage)
        home.join(
            "Library/Application Support/Code/User/globalStorage/saoudrizwan.claude-dev/settings/cline_mcp_settings.json",
        ),
        home.join(".config/Code/User/globalStorage/saoudrizwan.claude-dev/settings/cline_mcp_settings.json"),
        // VS Code user settings
        home.join("Library/Application Support/Code/User/settings.json"),
        home.join(".config/Code/User/settings.json"),
    ];

    if let Some(config_dir) = config_dir {
        paths.push(config_dir.join("Claude/claude_desktop_config.json"));
        paths.push(config_dir.join("Code/User/settings.json"));
    }

    // Project-local configs
    paths.push(cwd.join(".cursor/mcp.json"));
    paths.push(cwd.join(".vscode/mcp.json"));
    paths.push(cwd.join("mcp.json"));

    let mut unique = Vec::with_capacity(paths.len());
    for path in paths {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
}

/// Find existing MCP config files in standard locations
pub fn find_config_files() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        debug!("No home directory; skipping config discovery");
        return Vec::new();
    };
    let config_dir = dirs::config_dir();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let found: Vec<PathBuf> = candidate_paths(&home, config_dir.as_deref(), &cwd)
        .into_iter()
        .filter(|path| path.is_file())
        .collect();

    debug!("Discovered {} MCP config file(s)", found.len());
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_unique() {
        let home = Path::new("/home/user");
        // config_dir overlaps with a home-relative path on Linux
        let paths = candidate_paths(home, Some(Path::new("/home/user/.config")), home);
        let mut sorted = paths.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), paths.len());
    }

    #[test]
    fn candidates_cover_known_clients() {
        let paths = candidate_paths(Path::new("/h"), None, Path::new("/work"));
        assert!(paths.contains(&PathBuf::from("/h/.cursor/mcp.json")));
        assert!(paths.contains(&PathBuf::from(
            "/h/Library/Application Support/Claude/claude_desktop_config.json"
        )));
        assert!(paths.contains(&PathBuf::from("/work/.vscode/mcp.json")));
    }
}
