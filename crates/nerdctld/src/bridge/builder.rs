//! Stateless construction of command invocations.

use nerdctld_config::CommandDefaults;

use super::create;
use super::errors::BridgeError;
use super::invocation::{CommandInvocation, ExecutionContext};
use super::operation::Operation;
use super::request::ApiRequest;
use super::spec::{CommandSpec, INHERITED_ALIASES};

/// Builds the invocation for `request` from a brand-new command graph.
///
/// Nothing is cached between calls; `defaults` is the only shared input and is
/// only read.
///
/// # Errors
///
/// Returns [`BridgeError`] when the request does not carry what the operation
/// needs.
pub fn build_invocation(
    request: &ApiRequest,
    defaults: &CommandDefaults,
) -> Result<CommandInvocation, BridgeError> {
    let mut spec = CommandSpec::root();
    spec.attach_defaults(defaults);
    spec.inherit_aliases(INHERITED_ALIASES);
    spec.descend(request.operation.command_path());
    match request.operation {
        Operation::ContainerCreate => create::populate(&mut spec, request)?,
        Operation::ContainerStart => populate_start(&mut spec, request)?,
        Operation::ContainerStop => populate_stop(&mut spec, request)?,
        Operation::ContainerKill => populate_kill(&mut spec, request)?,
        Operation::ContainerRemove => populate_remove(&mut spec, request)?,
    }
    let context = ExecutionContext::new(request.api_version.as_str(), request.operation);
    Ok(spec.into_invocation(context))
}

fn container_id(request: &ApiRequest) -> Result<&str, BridgeError> {
    request
        .path_param("id")
        .filter(|id| !id.is_empty())
        .ok_or(BridgeError::MissingPathParam { name: "id" })
}

fn populate_start(spec: &mut CommandSpec, request: &ApiRequest) -> Result<(), BridgeError> {
    let id = container_id(request)?;
    spec.declare_local("detach-keys", "");
    if let Some(keys) = request.query_param("detachKeys") {
        spec.set("detach-keys", keys)?;
    }
    spec.push_arg(id);
    Ok(())
}

fn populate_stop(spec: &mut CommandSpec, request: &ApiRequest) -> Result<(), BridgeError> {
    let id = container_id(request)?;
    spec.declare_local("time", "");
    if let Some(timeout) = request.query_param("t") {
        let seconds: i64 = timeout.parse().map_err(|_| BridgeError::InvalidQuery {
            name: "t",
            value: timeout.to_owned(),
        })?;
        spec.set("time", seconds.to_string())?;
    }
    spec.push_arg(id);
    Ok(())
}

fn populate_kill(spec: &mut CommandSpec, request: &ApiRequest) -> Result<(), BridgeError> {
    let id = container_id(request)?;
    spec.declare_local("signal", "SIGKILL");
    if let Some(signal) = request.query_param("signal") {
        spec.set("signal", signal)?;
    }
    spec.push_arg(id);
    Ok(())
}

fn populate_remove(spec: &mut CommandSpec, request: &ApiRequest) -> Result<(), BridgeError> {
    let id = container_id(request)?;
    spec.declare_local("force", false);
    spec.declare_local("volumes", false);
    if query_flag(request, "force")? {
        spec.set("force", true)?;
    }
    if query_flag(request, "v")? {
        spec.set("volumes", true)?;
    }
    spec.push_arg(id);
    Ok(())
}

fn query_flag(request: &ApiRequest, name: &'static str) -> Result<bool, BridgeError> {
    match request.query_param(name) {
        None => Ok(false),
        Some("1" | "true" | "True") => Ok(true),
        Some("0" | "false" | "False") => Ok(false),
        Some(value) => Err(BridgeError::InvalidQuery {
            name,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    use crate::bridge::FlagValue;

    #[fixture]
    fn defaults() -> CommandDefaults {
        CommandDefaults {
            namespace: "k8s.io".to_owned(),
            ..CommandDefaults::default()
        }
    }

    fn tail(invocation: &CommandInvocation) -> Vec<&str> {
        let start = invocation
            .argv()
            .iter()
            .position(|arg| arg == "container")
            .expect("subcommand rendered");
        invocation
            .argv()
            .iter()
            .skip(start)
            .map(String::as_str)
            .collect()
    }

    #[rstest]
    fn create_renders_globals_before_subcommand(defaults: CommandDefaults) {
        let request = ApiRequest::new("v1.43", Operation::ContainerCreate)
            .with_query_param("name", "web")
            .with_body(r#"{"Image":"nginx"}"#);
        let invocation = build_invocation(&request, &defaults).expect("valid request");
        let argv = invocation.argv();
        assert_eq!(argv.first().map(String::as_str), Some("--debug=false"));
        assert!(argv.contains(&"--namespace=k8s.io".to_owned()));
        assert_eq!(tail(&invocation), ["container", "create", "--name", "web", "--", "nginx"]);
        assert_eq!(
            invocation.flag("namespace"),
            Some(&FlagValue::from("k8s.io"))
        );
        assert_eq!(invocation.flag("name"), Some(&FlagValue::from("web")));
        assert_eq!(invocation.context().api_version(), "1.43");
        assert_eq!(invocation.context().operation(), Operation::ContainerCreate);
    }

    #[rstest]
    #[case(Operation::ContainerStart, &[], &["container", "start", "--", "web"])]
    #[case(Operation::ContainerStop, &[("t", "5")], &["container", "stop", "--time", "5", "--", "web"])]
    #[case(
        Operation::ContainerKill,
        &[("signal", "SIGTERM")],
        &["container", "kill", "--signal", "SIGTERM", "--", "web"]
    )]
    #[case(
        Operation::ContainerRemove,
        &[("force", "1"), ("v", "true")],
        &["container", "rm", "--force", "--volumes", "--", "web"]
    )]
    #[case(Operation::ContainerRemove, &[("force", "0")], &["container", "rm", "--", "web"])]
    fn lifecycle_operations_target_the_path_id(
        defaults: CommandDefaults,
        #[case] operation: Operation,
        #[case] query: &[(&str, &str)],
        #[case] expected: &[&str],
    ) {
        let mut request = ApiRequest::new("v1.43", operation).with_path_param("id", "web");
        for (name, value) in query {
            request = request.with_query_param(name, *value);
        }
        let invocation = build_invocation(&request, &defaults).expect("valid request");
        assert_eq!(tail(&invocation), expected);
    }

    #[rstest]
    #[case(Operation::ContainerStart)]
    #[case(Operation::ContainerStop)]
    #[case(Operation::ContainerKill)]
    #[case(Operation::ContainerRemove)]
    fn dash_prefixed_ids_stay_positional(defaults: CommandDefaults, #[case] operation: Operation) {
        let request = ApiRequest::new("v1.43", operation).with_path_param("id", "--force");
        let invocation = build_invocation(&request, &defaults).expect("valid request");
        let argv = invocation.argv();
        let [.., separator, id] = argv else {
            panic!("argv too short: {argv:?}");
        };
        assert_eq!((separator.as_str(), id.as_str()), ("--", "--force"));
        assert_eq!(argv.iter().filter(|arg| *arg == "--force").count(), 1);
        if operation == Operation::ContainerRemove {
            assert_eq!(invocation.flag("force"), Some(&FlagValue::Bool(false)));
        }
    }

    #[rstest]
    fn dash_prefixed_image_stays_positional(defaults: CommandDefaults) {
        let request = ApiRequest::new("v1.43", Operation::ContainerCreate)
            .with_body(r#"{"Image":"--privileged","Cmd":["alpine","sh"]}"#);
        let invocation = build_invocation(&request, &defaults).expect("valid request");
        assert_eq!(
            tail(&invocation),
            ["container", "create", "--", "--privileged", "alpine", "sh"]
        );
        assert_eq!(invocation.flag("privileged"), Some(&FlagValue::Bool(false)));
    }

    #[rstest]
    fn stop_rejects_non_numeric_timeout(defaults: CommandDefaults) {
        let request = ApiRequest::new("v1.43", Operation::ContainerStop)
            .with_path_param("id", "web")
            .with_query_param("t", "soon");
        let error = build_invocation(&request, &defaults).expect_err("invalid timeout");
        assert!(matches!(error, BridgeError::InvalidQuery { name: "t", .. }));
    }

    #[rstest]
    fn missing_id_is_rejected(defaults: CommandDefaults) {
        let request = ApiRequest::new("v1.43", Operation::ContainerStart);
        let error = build_invocation(&request, &defaults).expect_err("id required");
        assert!(matches!(error, BridgeError::MissingPathParam { name: "id" }));
    }

    #[rstest]
    fn every_build_gets_a_fresh_request_id(defaults: CommandDefaults) {
        let request = ApiRequest::new("v1.43", Operation::ContainerStart).with_path_param("id", "a");
        let first = build_invocation(&request, &defaults).expect("valid request");
        let second = build_invocation(&request, &defaults).expect("valid request");
        assert_ne!(first.context().request_id(), second.context().request_id());
        assert_eq!(first.argv(), second.argv());
    }
}
