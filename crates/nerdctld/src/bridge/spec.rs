//! Per-request command specification graph.
//!
//! A [`CommandSpec`] is the mutable state a command-line parser would hold
//! for one invocation: the global flags seeded from the process defaults, the
//! aliases subcommands inherit, the selected subcommand path with its local
//! flags, and the positional arguments. A fresh graph is built for every
//! request and consumed into a [`CommandInvocation`].

use std::collections::BTreeMap;

use serde::Serialize;

use nerdctld_config::CommandDefaults;

use super::errors::BridgeError;
use super::invocation::{CommandInvocation, ExecutionContext};

/// Value carried by a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Boolean switch.
    Bool(bool),
    /// Single string value.
    String(String),
    /// Repeatable string value.
    StringList(Vec<String>),
}

impl FlagValue {
    fn is_empty(&self) -> bool {
        match self {
            Self::Bool(_) => false,
            Self::String(value) => value.is_empty(),
            Self::StringList(values) => values.is_empty(),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(values: Vec<String>) -> Self {
        Self::StringList(values)
    }
}

/// Declared flag with its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    name: &'static str,
    value: FlagValue,
    changed: bool,
}

impl Flag {
    /// Long flag name without leading dashes.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Current value.
    #[must_use]
    pub const fn value(&self) -> &FlagValue {
        &self.value
    }

    /// Whether the value was set after declaration.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.changed
    }
}

/// Ordered collection of flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flags: Vec<Flag>,
}

impl FlagSet {
    /// Declares `name` with `default`, replacing an earlier declaration.
    pub fn declare(&mut self, name: &'static str, default: impl Into<FlagValue>) {
        let flag = Flag {
            name,
            value: default.into(),
            changed: false,
        };
        match self.flags.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = flag,
            None => self.flags.push(flag),
        }
    }

    /// Looks a flag up by long name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|flag| flag.name == name)
    }

    fn set(&mut self, name: &str, value: FlagValue) -> bool {
        match self.flags.iter_mut().find(|flag| flag.name == name) {
            Some(flag) => {
                flag.value = value;
                flag.changed = true;
                true
            }
            None => false,
        }
    }

    /// Flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }
}

/// Alternative name resolving to a global flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagAlias {
    /// Alias as typed, without dashes (`n`, `host`).
    pub alias: &'static str,
    /// Long name of the global flag it resolves to.
    pub target: &'static str,
}

/// Aliases every subcommand inherits from the root command.
pub const INHERITED_ALIASES: &[FlagAlias] = &[
    FlagAlias {
        alias: "a",
        target: "address",
    },
    FlagAlias {
        alias: "H",
        target: "address",
    },
    FlagAlias {
        alias: "host",
        target: "address",
    },
    FlagAlias {
        alias: "n",
        target: "namespace",
    },
    FlagAlias {
        alias: "storage-driver",
        target: "snapshotter",
    },
];

/// Separates flags from positional arguments in a rendered argv.
pub const END_OF_OPTIONS: &str = "--";

/// Command graph for a single invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    persistent: FlagSet,
    aliases: Vec<FlagAlias>,
    path: Vec<&'static str>,
    local: FlagSet,
    args: Vec<String>,
}

impl CommandSpec {
    /// Creates an empty root command.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Declares the global flags with the process-wide defaults.
    pub fn attach_defaults(&mut self, defaults: &CommandDefaults) {
        let flags = &mut self.persistent;
        flags.declare("debug", defaults.debug);
        flags.declare("debug-full", defaults.debug_full);
        flags.declare("address", defaults.address.as_str());
        flags.declare("namespace", defaults.namespace.as_str());
        flags.declare("snapshotter", defaults.snapshotter.as_str());
        flags.declare("cni-path", defaults.cni_path.as_str());
        flags.declare("cni-netconfpath", defaults.cni_netconfpath.as_str());
        flags.declare("data-root", defaults.data_root.as_str());
        flags.declare("cgroup-manager", defaults.cgroup_manager.as_str());
        flags.declare("insecure-registry", defaults.insecure_registry);
        flags.declare("hosts-dir", defaults.hosts_dir.clone());
        flags.declare("experimental", defaults.experimental);
        flags.declare("host-gateway-ip", defaults.host_gateway_ip.as_str());
    }

    /// Merges aliases for the global flags into the graph.
    pub fn inherit_aliases(&mut self, aliases: &[FlagAlias]) {
        for alias in aliases {
            if !self.aliases.contains(alias) {
                self.aliases.push(*alias);
            }
        }
    }

    /// Selects the subcommand at `path`, discarding earlier local state.
    pub fn descend(&mut self, path: &[&'static str]) {
        self.path = path.to_vec();
        self.local = FlagSet::default();
        self.args.clear();
    }

    /// Declares a flag local to the selected subcommand.
    pub fn declare_local(&mut self, name: &'static str, default: impl Into<FlagValue>) {
        self.local.declare(name, default);
    }

    /// Sets a flag by name or inherited alias.
    ///
    /// Local flags shadow global flags of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownFlag`] when no flag answers to `name`.
    pub fn set(&mut self, name: &str, value: impl Into<FlagValue>) -> Result<(), BridgeError> {
        let value = value.into();
        if self.local.get(name).is_some() {
            self.local.set(name, value);
            return Ok(());
        }
        let target = self.resolve_global(name).ok_or_else(|| BridgeError::UnknownFlag {
            name: name.to_owned(),
        })?;
        self.persistent.set(target, value);
        Ok(())
    }

    /// Long name of the global flag answering to `name`, if any.
    #[must_use]
    pub fn resolve_global(&self, name: &str) -> Option<&'static str> {
        if let Some(flag) = self.persistent.get(name) {
            return Some(flag.name);
        }
        self.aliases
            .iter()
            .find(|alias| alias.alias == name)
            .and_then(|alias| self.persistent.get(alias.target))
            .map(Flag::name)
    }

    /// Appends a positional argument.
    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Global flags.
    #[must_use]
    pub const fn persistent(&self) -> &FlagSet {
        &self.persistent
    }

    /// Flags of the selected subcommand.
    #[must_use]
    pub const fn local(&self) -> &FlagSet {
        &self.local
    }

    /// Renders the argument vector: global flags, subcommand words, changed
    /// local flags, then positional arguments.
    ///
    /// Positional arguments follow [`END_OF_OPTIONS`], so values supplied by
    /// clients are never parsed as flags.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let mut argv = Vec::new();
        for flag in self.persistent.iter() {
            render_global(&mut argv, flag);
        }
        argv.extend(self.path.iter().map(|word| (*word).to_owned()));
        for flag in self.local.iter().filter(|flag| flag.changed) {
            render_local(&mut argv, flag);
        }
        if !self.args.is_empty() {
            argv.push(END_OF_OPTIONS.to_owned());
            argv.extend(self.args.iter().cloned());
        }
        argv
    }

    /// Consumes the graph into an invocation.
    #[must_use]
    pub fn into_invocation(self, context: ExecutionContext) -> CommandInvocation {
        let argv = self.render();
        let mut flags = BTreeMap::new();
        for flag in self.persistent.iter().chain(self.local.iter()) {
            flags.insert(flag.name.to_owned(), flag.value.clone());
        }
        CommandInvocation::new(argv, flags, context)
    }
}

fn render_global(argv: &mut Vec<String>, flag: &Flag) {
    if flag.value.is_empty() {
        return;
    }
    match &flag.value {
        FlagValue::Bool(value) => argv.push(format!("--{}={value}", flag.name)),
        FlagValue::String(value) => argv.push(format!("--{}={value}", flag.name)),
        FlagValue::StringList(values) => {
            argv.extend(values.iter().map(|value| format!("--{}={value}", flag.name)));
        }
    }
}

fn render_local(argv: &mut Vec<String>, flag: &Flag) {
    match &flag.value {
        FlagValue::Bool(true) => argv.push(format!("--{}", flag.name)),
        FlagValue::Bool(false) => argv.push(format!("--{}=false", flag.name)),
        FlagValue::String(value) => {
            argv.push(format!("--{}", flag.name));
            argv.push(value.clone());
        }
        FlagValue::StringList(values) => {
            for value in values {
                argv.push(format!("--{}", flag.name));
                argv.push(value.clone());
            }
        }
    }
}
