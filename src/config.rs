//! Harness configuration
//!
//! Defaults follow the layout the test suites were authored against; every field can be
//! overridden through the `with_*` builders or the CLI.

use std::path::PathBuf;

/// An external command: program plus fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The build script invocation for the host platform.
    pub fn default_build() -> Self {
        if cfg!(windows) {
            Self::new("cmd").arg("/c").arg("build.cmd")
        } else {
            Self::new("sh").arg("build.sh")
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Root of the test-case tree
    pub test_dir: PathBuf,
    /// Glob matched against file names of candidate binaries
    pub image_pattern: String,
    /// Method selected on marked test types
    pub entry_method: String,
    /// First-attribute name marking a binding test
    pub binding_marker: String,
    /// First-attribute name marking a codegen test
    pub codegen_marker: String,
    /// Unmarked entry points need strictly more instructions than this
    pub min_entry_instructions: usize,
    /// Directory name, two levels above each binary, holding generated sources
    pub generated_root: String,
    /// Build invocation, run inside the generated-source directory
    pub build_command: CommandSpec,
    /// Executable produced by the build, relative to the generated-source directory
    pub executable: String,
    /// Build output containing this flags a build error
    pub error_marker: String,
    /// Build output containing this is shown as progress
    pub progress_marker: String,
    /// Runtime initialization call emitted at the top of the synthesized `main`
    pub runtime_init: String,
    /// Environment variables removed before spawning child processes
    pub scrubbed_env: Vec<String>,
    /// Only run tests whose display name contains this keyword
    pub filter: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("testcases"),
            image_pattern: "*.exe".to_string(),
            entry_method: "Entry".to_string(),
            binding_marker: "TestAttribute".to_string(),
            codegen_marker: "CodeGenAttribute".to_string(),
            min_entry_instructions: 2,
            generated_root: "gen".to_string(),
            build_command: CommandSpec::default_build(),
            executable: if cfg!(windows) { "final.exe" } else { "final" }.to_string(),
            error_marker: "error".to_string(),
            progress_marker: "Compiled:".to_string(),
            runtime_init: "il2cpp_Init".to_string(),
            // Breaks clang's header lookup when inherited from a VS developer prompt
            scrubbed_env: vec!["VCInstallDir".to_string()],
            filter: None,
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = dir.into();
        self
    }

    pub fn with_image_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.image_pattern = pattern.into();
        self
    }

    pub fn with_build_command(mut self, command: CommandSpec) -> Self {
        self.build_command = command;
        self
    }

    pub fn with_executable(mut self, name: impl Into<String>) -> Self {
        self.executable = name.into();
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Whether a test with this display name passes the keyword filter.
    pub fn selects(&self, display_name: &str) -> bool {
        self.filter.as_deref().is_none_or(|k| display_name.contains(k))
    }
}
