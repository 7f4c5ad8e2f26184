use burrow_core::{Error, Hostname, ProcessId};
use burrow_namespace::*;

#[test]
fn test_namespace_request_standard() {
    let request = NamespaceRequest::standard();
    let enabled = request.enabled_namespaces();
    assert_eq!(enabled, vec!["pid", "mnt", "net", "uts", "ipc"]);
}

#[test]
fn test_namespace_request_is_closed_set() {
    // user, cgroup and time namespaces cannot be expressed
    let flags = NamespaceRequest::standard().to_clone_flags();
    let expected = NamespaceKind::ALL
        .into_iter()
        .fold(nix::sched::CloneFlags::empty(), |acc, kind| {
            acc | kind.clone_flag()
        });
    assert_eq!(flags, expected);
}

#[test]
fn test_phase_is_exactly_one() {
    use std::ffi::OsStr;

    for value in [None, Some("init"), Some("1"), Some("true"), Some("")] {
        let phase = Phase::from_value(value.map(OsStr::new));
        let is_init = phase == Phase::Initializer;
        let is_supervisor = phase == Phase::Supervisor;
        assert!(is_init ^ is_supervisor);
        assert_eq!(is_init, value == Some("init"));
    }
}

#[test]
fn test_init_config_with_hostname() {
    let config = InitConfig::new().with_hostname(Hostname::new("my-box").unwrap());
    assert_eq!(config.hostname.as_str(), "my-box");
}

#[test]
fn test_initializer_with_mock_backend() {
    let backend = MockBackend::new().with_exit_code(3);
    let mut out = Vec::new();

    let config = InitConfig::new()
        .with_command(vec!["/bin/sh".to_string(), "-c".to_string(), "exit 3".to_string()]);
    let code = Initializer::with_backend(config, backend.clone(), &mut out)
        .run()
        .unwrap();

    assert_eq!(code, 3);
    assert_eq!(backend.calls().len(), 5);
    assert!(String::from_utf8_lossy(&out).contains("Hostname set to: mycontainer"));
}

#[test]
fn test_initializer_refuses_outside_pid_namespace() {
    // the real backend on the test process: never PID 1, so the sequence
    // must stop before any mount is attempted
    let mut out = Vec::new();
    let result = Initializer::with_backend(InitConfig::new(), LinuxBackend, &mut out).run();

    match result {
        Err(Error::PidNotIsolated { pid }) => {
            assert_eq!(pid, ProcessId::current().as_raw());
        }
        other => panic!("expected PidNotIsolated, got {other:?}"),
    }
}

#[test]
fn test_namespace_info_for_self() {
    let by_pid = NamespaceInfo::for_pid(ProcessId::current().as_raw()).unwrap();
    let current = NamespaceInfo::current().unwrap();
    assert_eq!(by_pid, current);
}

/// Supervisor that clones without any new namespace, so no privileges
/// are needed to exercise spawn, wait and status relay
fn unisolated_supervisor(executable: &str, args: &[&str]) -> Supervisor {
    let no_namespaces = NamespaceRequest {
        pid: false,
        mount: false,
        network: false,
        uts: false,
        ipc: false,
    };

    Supervisor::new(
        executable.into(),
        args.iter().map(Into::into).collect(),
        Vec::new(),
    )
    .with_request(no_namespaces)
}

#[test]
fn test_supervisor_relays_exit_code() {
    let supervisor = unisolated_supervisor("/bin/sh", &["sh", "-c", "exit 7"]);
    assert_eq!(supervisor.run().unwrap(), 7);
}

#[test]
fn test_supervisor_relays_signal_as_exit_code() {
    let supervisor = unisolated_supervisor("/bin/sh", &["sh", "-c", "kill -TERM $$"]);
    assert_eq!(supervisor.run().unwrap(), 128 + libc::SIGTERM);
}

#[test]
fn test_supervisor_exec_failure_exits_127() {
    let supervisor = unisolated_supervisor("/nonexistent/burrow-test-binary", &["burrow"]);
    assert_eq!(supervisor.run().unwrap(), 127);
}

#[test]
#[ignore] // Requires root
fn test_supervisor_runs_isolated_child() {
    if !nix::unistd::geteuid().is_root() {
        return;
    }

    // any executable works as the child; it just has to run isolated
    let supervisor = Supervisor::new(
        "/bin/true".into(),
        vec!["true".into()],
        Vec::new(),
    );
    assert_eq!(supervisor.run().unwrap(), 0);
}
