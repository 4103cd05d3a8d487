use std::env;
use std::path::Path;

use rabbit_core::{ContextProvider, OsInfo, ShellInfo};
use sysinfo::System;

/// Diagnostic commands worth advertising to the model, most useful first.
#[cfg(not(windows))]
const CANDIDATE_COMMANDS: &[&str] = &[
    "ps", "top", "df", "du", "free", "uptime", "ls", "cat", "grep", "find",
    "netstat", "ss", "ip", "ifconfig", "ping", "curl", "lsof", "journalctl",
    "systemctl", "dmesg", "vm_stat", "iostat", "uname", "whoami", "env",
];

#[cfg(windows)]
const CANDIDATE_COMMANDS: &[&str] = &[
    "tasklist", "systeminfo", "ipconfig", "netstat", "ping", "dir", "type",
    "findstr", "where", "wmic", "powershell", "sc", "whoami", "set",
];

/// Facts about the machine this process runs on.
///
/// Everything is probed once on creation.
#[derive(Clone, Debug)]
pub struct SystemContext {
    os_info: OsInfo,
    shell_info: ShellInfo,
    common_commands: Vec<String>,
}

impl SystemContext {
    /// Probes the current machine.
    pub fn detect() -> Self {
        let os_info = OsInfo {
            os_type: os_type().to_owned(),
            release: System::kernel_version()
                .or_else(System::os_version)
                .unwrap_or_else(|| "unknown".to_owned()),
        };
        let shell_info = ShellInfo {
            shell_type: shell_type(),
        };
        let common_commands = CANDIDATE_COMMANDS
            .iter()
            .filter(|cmd| which::which(cmd).is_ok())
            .map(|cmd| (*cmd).to_owned())
            .collect();
        debug!("detected {os_info:?}, {shell_info:?}");
        Self {
            os_info,
            shell_info,
            common_commands,
        }
    }
}

impl ContextProvider for SystemContext {
    #[inline]
    fn os_info(&self) -> OsInfo {
        self.os_info.clone()
    }

    #[inline]
    fn shell_info(&self) -> ShellInfo {
        self.shell_info.clone()
    }

    #[inline]
    fn common_commands(&self) -> Vec<String> {
        self.common_commands.clone()
    }
}

#[inline]
fn os_type() -> &'static str {
    match env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        _ => "Unknown",
    }
}

fn shell_type() -> String {
    if cfg!(windows) {
        return "cmd".to_owned();
    }
    env::var_os("SHELL")
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sh".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let context = SystemContext::detect();
        assert_eq!(context.os_info().os_type, os_type());
        assert!(!context.os_info().release.is_empty());
        assert!(!context.shell_info().shell_type.contains('/'));

        let commands = context.common_commands();
        assert!(commands.iter().all(|cmd| CANDIDATE_COMMANDS.contains(&cmd.as_str())));
    }
}
