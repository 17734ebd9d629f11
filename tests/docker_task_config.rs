//! End-to-end docker task configuration cases: operator config in both the
//! block-parsed shape (everything a one-element list) and the JSON job shape,
//! through decode, wire encoding and plugin-side weak decoding.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use taskconf::{config_from_json_envelope, decode, DiagnosticCode, Variables};

struct Case {
    name: &'static str,
    config: taskconf::Value,
    vars: Variables,
    expected: DockerTaskConfig,
}

fn envelope(src: &str) -> taskconf::Value {
    config_from_json_envelope(src).expect("valid job document")
}

fn devices() -> Vec<DockerDevice> {
    vec![
        DockerDevice {
            host_path: "/dev/sda1".to_string(),
            container_path: "/dev/xvdc".to_string(),
            cgroup_permissions: "r".to_string(),
        },
        DockerDevice {
            host_path: "/dev/sda2".to_string(),
            container_path: "/dev/xvdd".to_string(),
            cgroup_permissions: String::new(),
        },
    ]
}

fn cases() -> Vec<Case> {
    let none = Variables::new;
    vec![
        Case {
            name: "single string attr",
            config: json(r#"[{"image": "redis:3.2"}]"#),
            vars: none(),
            expected: redis(),
        },
        Case {
            name: "single string attr json",
            config: envelope(r#"{"Config": {"image": "redis:3.2"}}"#),
            vars: none(),
            expected: redis(),
        },
        Case {
            name: "number attr",
            config: json(r#"[{"image": "redis:3.2", "pids_limit": 2}]"#),
            vars: none(),
            expected: DockerTaskConfig { pids_limit: 2, ..redis() },
        },
        Case {
            name: "number attr json",
            config: envelope(r#"{"Config": {"image": "redis:3.2", "pids_limit": "2"}}"#),
            vars: none(),
            expected: DockerTaskConfig { pids_limit: 2, ..redis() },
        },
        Case {
            name: "number attr interpolated",
            config: json(r#"[{"image": "redis:3.2", "pids_limit": "${2 + 2}"}]"#),
            vars: none(),
            expected: DockerTaskConfig { pids_limit: 4, ..redis() },
        },
        Case {
            name: "number attr interpolated json",
            config: envelope(r#"{"Config": {"image": "redis:3.2", "pids_limit": "${2 + 2}"}}"#),
            vars: none(),
            expected: DockerTaskConfig { pids_limit: 4, ..redis() },
        },
        Case {
            name: "multi attr",
            config: json(r#"[{"image": "redis:3.2", "args": ["foo", "bar"]}]"#),
            vars: none(),
            expected: DockerTaskConfig {
                args: vec!["foo".to_string(), "bar".to_string()],
                ..redis()
            },
        },
        Case {
            name: "multi attr variables",
            config: json(
                r#"[{
                    "image": "redis:3.2",
                    "args": ["${NOMAD_META_hello}", "${NOMAD_ALLOC_INDEX}"],
                    "pids_limit": "${NOMAD_ALLOC_INDEX + 2}"
                }]"#,
            ),
            vars: docker_vars(),
            expected: DockerTaskConfig {
                args: vec!["world".to_string(), "2".to_string()],
                pids_limit: 4,
                ..redis()
            },
        },
        Case {
            name: "port_map",
            config: json(r#"[{"image": "redis:3.2", "port_map": [{"foo": 1234, "bar": 5678}]}]"#),
            vars: none(),
            expected: DockerTaskConfig {
                port_map: BTreeMap::from([("foo".to_string(), 1234), ("bar".to_string(), 5678)]),
                ..redis()
            },
        },
        Case {
            name: "port_map json",
            config: envelope(
                r#"{"Config": {"image": "redis:3.2", "port_map": [{"foo": 1234, "bar": 5678}]}}"#,
            ),
            vars: none(),
            expected: DockerTaskConfig {
                port_map: BTreeMap::from([("foo".to_string(), 1234), ("bar".to_string(), 5678)]),
                ..redis()
            },
        },
        Case {
            name: "devices",
            config: json(
                r#"[{
                    "image": "redis:3.2",
                    "devices": [
                        {"host_path": "/dev/sda1", "container_path": "/dev/xvdc", "cgroup_permissions": "r"},
                        {"host_path": "/dev/sda2", "container_path": "/dev/xvdd"}
                    ]
                }]"#,
            ),
            vars: none(),
            expected: DockerTaskConfig {
                devices: devices(),
                ..redis()
            },
        },
        Case {
            name: "docker_logging",
            config: json(
                r#"[{
                    "image": "redis:3.2",
                    "network_mode": "host",
                    "dns_servers": ["169.254.1.1"],
                    "logging": [{"type": "syslog", "config": [{"tag": "driver-test"}]}]
                }]"#,
            ),
            vars: none(),
            expected: DockerTaskConfig {
                network_mode: "host".to_string(),
                dns: vec!["169.254.1.1".to_string()],
                logging: DockerLogging {
                    kind: "syslog".to_string(),
                    config: BTreeMap::from([("tag".to_string(), "driver-test".to_string())]),
                },
                ..redis()
            },
        },
        Case {
            name: "docker_json",
            config: envelope(
                r#"{"Config": {
                    "image": "redis:3.2",
                    "devices": [
                        {"host_path": "/dev/sda1", "container_path": "/dev/xvdc", "cgroup_permissions": "r"},
                        {"host_path": "/dev/sda2", "container_path": "/dev/xvdd"}
                    ]
                }}"#,
            ),
            vars: none(),
            expected: DockerTaskConfig {
                devices: devices(),
                ..redis()
            },
        },
    ]
}

#[test]
fn test_docker_task_config_cases() {
    for case in cases() {
        let actual = launch(&case.config, &case.vars);
        assert_eq!(actual, case.expected, "case: {}", case.name);
    }
}

#[test]
fn test_absent_repeated_blocks_are_empty_lists() {
    let decoded = decode(&json(r#"{"image": "redis:3.2"}"#), &docker_schema(), &Variables::new());
    assert!(decoded.diagnostics.is_empty());
    assert_eq!(decoded.value.get("devices"), Some(&taskconf::Value::List(vec![])));
    assert_eq!(decoded.value.get("mounts"), Some(&taskconf::Value::List(vec![])));
}

#[test]
fn test_all_problems_reported_in_one_pass() {
    let config = json(
        r#"{
            "pids_limit": "lots",
            "args": ["${NOMAD_META_missing}"],
            "devices": [{"container_path": "/dev/xvdc"}],
            "logging": {"config": {"tag": "${1 +}"}}
        }"#,
    );
    let decoded = decode(&config, &docker_schema(), &docker_vars());
    let found: Vec<(String, DiagnosticCode)> = decoded
        .diagnostics
        .iter()
        .map(|d| (d.path.to_string(), d.code))
        .collect();
    assert_eq!(
        found,
        vec![
            ("image".to_string(), DiagnosticCode::MissingAttribute),
            ("args[0]".to_string(), DiagnosticCode::UnresolvedVariable),
            ("pids_limit".to_string(), DiagnosticCode::TypeMismatch),
            ("devices[0].host_path".to_string(), DiagnosticCode::MissingAttribute),
            ("logging.config.tag".to_string(), DiagnosticCode::InvalidExpression),
        ]
    );
}

#[test]
fn test_plugin_struct_accepts_differently_cased_keys() {
    #[derive(Debug, Default, serde::Deserialize, PartialEq)]
    #[serde(default)]
    struct Legacy {
        #[serde(rename = "Image")]
        image: String,
        #[serde(rename = "PidsLimit")]
        pids_limit: i64,
        #[serde(rename = "pids_LIMIT")]
        pids: i64,
    }

    let canonical = taskconf::parse_driver_config(
        &json(r#"{"image": "redis:3.2", "pids_limit": 3}"#),
        &docker_schema(),
        &Variables::new(),
        taskconf::EscalationPolicy::AnyDiagnostic,
    )
    .unwrap();
    let bytes = taskconf::wire::encode(&canonical).unwrap();
    let legacy: Legacy = taskconf::wire::decode(&bytes).unwrap();
    assert_eq!(legacy.image, "redis:3.2");
    assert_eq!(legacy.pids_limit, 0);
    assert_eq!(legacy.pids, 3);
}
