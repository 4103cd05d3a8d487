//! Environment facts that shape the prompt and command execution.

/// Facts about the operating system the agent runs on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OsInfo {
    /// Operating system family, e.g. `Linux` or `Darwin`.
    pub os_type: String,
    /// Release or version string of the operating system.
    pub release: String,
}

impl Default for OsInfo {
    fn default() -> Self {
        Self {
            os_type: "Unknown".to_owned(),
            release: "unknown".to_owned(),
        }
    }
}

/// Facts about the shell commands will run in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShellInfo {
    /// Shell name, e.g. `bash`.
    pub shell_type: String,
}

impl Default for ShellInfo {
    fn default() -> Self {
        Self {
            shell_type: "sh".to_owned(),
        }
    }
}

/// Supplies environment facts to the agent.
///
/// The agent reads the context once at the start of each task.
pub trait ContextProvider: Send + Sync {
    /// Returns the operating system facts.
    fn os_info(&self) -> OsInfo;

    /// Returns the shell facts.
    fn shell_info(&self) -> ShellInfo;

    /// Returns commands known to be available, most useful first.
    fn common_commands(&self) -> Vec<String>;
}

/// A context provider that always reports the same facts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticContext {
    os_info: OsInfo,
    shell_info: ShellInfo,
    common_commands: Vec<String>,
}

impl StaticContext {
    /// Creates a context from the given facts.
    pub fn new<I, S>(os_info: OsInfo, shell_info: ShellInfo, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            os_info,
            shell_info,
            common_commands: commands.into_iter().map(Into::into).collect(),
        }
    }
}

impl ContextProvider for StaticContext {
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
