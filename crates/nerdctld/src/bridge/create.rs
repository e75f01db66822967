//! Container-create request body and its flag mapping.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::errors::BridgeError;
use super::request::ApiRequest;
use super::spec::{CommandSpec, FlagValue};

/// Docker network mode equivalent to omitting `--network`.
const DEFAULT_NETWORK_MODE: &str = "default";

/// Strings the API accepts either bare or as an array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ContainerCreateBody {
    image: Option<String>,
    cmd: Option<StringOrList>,
    entrypoint: Option<StringOrList>,
    env: Option<Vec<String>>,
    labels: Option<BTreeMap<String, String>>,
    working_dir: Option<String>,
    user: Option<String>,
    hostname: Option<String>,
    tty: Option<bool>,
    open_stdin: Option<bool>,
    host_config: Option<HostConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct HostConfig {
    binds: Option<Vec<String>>,
    auto_remove: Option<bool>,
    privileged: Option<bool>,
    network_mode: Option<String>,
    restart_policy: Option<RestartPolicy>,
    port_bindings: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RestartPolicy {
    name: Option<String>,
    maximum_retry_count: Option<u32>,
}

impl RestartPolicy {
    fn render(&self) -> Option<String> {
        let name = self.name.as_deref().filter(|name| !name.is_empty())?;
        match self.maximum_retry_count {
            Some(count) if count > 0 && name == "on-failure" => Some(format!("{name}:{count}")),
            _ => Some(name.to_owned()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct PortBinding {
    host_ip: Option<String>,
    host_port: Option<String>,
}

fn publish_spec(container_port: &str, binding: &PortBinding) -> String {
    let host_ip = binding.host_ip.as_deref().filter(|ip| !ip.is_empty());
    let host_port = binding.host_port.as_deref().filter(|port| !port.is_empty());
    match (host_ip, host_port) {
        (Some(ip), Some(port)) => format!("{ip}:{port}:{container_port}"),
        (Some(ip), None) => format!("{ip}::{container_port}"),
        (None, Some(port)) => format!("{port}:{container_port}"),
        (None, None) => container_port.to_owned(),
    }
}

/// Declares the create flags and populates them from `request`.
pub(super) fn populate(spec: &mut CommandSpec, request: &ApiRequest) -> Result<(), BridgeError> {
    let body: ContainerCreateBody = if request.body.is_empty() {
        ContainerCreateBody::default()
    } else {
        serde_json::from_slice(&request.body).map_err(|source| BridgeError::InvalidBody { source })?
    };
    let image = body
        .image
        .filter(|image| !image.is_empty())
        .ok_or(BridgeError::MissingField { field: "Image" })?;

    declare(spec);
    let host = body.host_config.unwrap_or_default();

    if let Some(name) = request.query_param("name") {
        spec.set("name", name)?;
    }
    let mut entrypoint = body
        .entrypoint
        .map(StringOrList::into_vec)
        .unwrap_or_default()
        .into_iter();
    if let Some(program) = entrypoint.next() {
        spec.set("entrypoint", program)?;
    }
    set_list(spec, "env", body.env)?;
    if let Some(labels) = body.labels {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        set_list(spec, "label", Some(labels))?;
    }
    set_string(spec, "workdir", body.working_dir)?;
    set_string(spec, "user", body.user)?;
    set_string(spec, "hostname", body.hostname)?;
    set_true(spec, "tty", body.tty)?;
    set_true(spec, "interactive", body.open_stdin)?;
    set_list(spec, "volume", host.binds)?;
    set_true(spec, "rm", host.auto_remove)?;
    set_true(spec, "privileged", host.privileged)?;
    if let Some(mode) = host
        .network_mode
        .filter(|mode| !mode.is_empty() && mode != DEFAULT_NETWORK_MODE)
    {
        spec.set("network", vec![mode])?;
    }
    if let Some(restart) = host.restart_policy.as_ref().and_then(RestartPolicy::render) {
        spec.set("restart", restart)?;
    }
    if let Some(bindings) = host.port_bindings {
        let mut published = Vec::new();
        for (container_port, bindings) in bindings {
            match bindings.filter(|bindings| !bindings.is_empty()) {
                Some(bindings) => published.extend(
                    bindings
                        .iter()
                        .map(|binding| publish_spec(&container_port, binding)),
                ),
                None => published.push(container_port),
            }
        }
        set_list(spec, "publish", Some(published))?;
    }

    spec.push_arg(image);
    for arg in entrypoint {
        spec.push_arg(arg);
    }
    for arg in body.cmd.map(StringOrList::into_vec).unwrap_or_default() {
        spec.push_arg(arg);
    }
    Ok(())
}

fn declare(spec: &mut CommandSpec) {
    let empty = || FlagValue::StringList(Vec::new());
    spec.declare_local("name", "");
    spec.declare_local("entrypoint", "");
    spec.declare_local("env", empty());
    spec.declare_local("label", empty());
    spec.declare_local("workdir", "");
    spec.declare_local("user", "");
    spec.declare_local("hostname", "");
    spec.declare_local("tty", false);
    spec.declare_local("interactive", false);
    spec.declare_local("volume", empty());
    spec.declare_local("rm", false);
    spec.declare_local("privileged", false);
    spec.declare_local("network", empty());
    spec.declare_local("restart", "no");
    spec.declare_local("publish", empty());
}

fn set_string(
    spec: &mut CommandSpec,
    name: &'static str,
    value: Option<String>,
) -> Result<(), BridgeError> {
    match value.filter(|value| !value.is_empty()) {
        Some(value) => spec.set(name, value),
        None => Ok(()),
    }
}

fn set_list(
    spec: &mut CommandSpec,
    name: &'static str,
    values: Option<Vec<String>>,
) -> Result<(), BridgeError> {
    match values.filter(|values| !values.is_empty()) {
        Some(values) => spec.set(name, values),
        None => Ok(()),
    }
}

fn set_true(
    spec: &mut CommandSpec,
    name: &'static str,
    value: Option<bool>,
) -> Result<(), BridgeError> {
    if value == Some(true) {
        spec.set(name, true)?;
    }
    Ok(())
}
