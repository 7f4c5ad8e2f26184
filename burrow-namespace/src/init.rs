//! The inner phase: make the fresh namespaces usable, then hand over to
//! the interactive command
//!
//! Steps run in a fixed order and each one depends on the previous:
//! 1. report identity and require PID 1
//! 2. make `/` recursively private
//! 3. mount a fresh `/proc`
//! 4. set the hostname and read it back
//! 5. launch the command and wait for it
//!
//! Any failure aborts the sequence. Nothing needs undoing: the namespaces
//! and the `/proc` mount disappear with their last member process.

use burrow_core::{Error, Hostname, HostnameOperation, InitEvent, Result};
use std::io::{self, Stdout, Write};
use tracing::{debug, error, info};

use crate::backend::{IsolationBackend, LinuxBackend};
use crate::config::{InitConfig, ReportFormat};
use crate::executor::build_command;

/// Namespace initializer, PID 1 of the new PID namespace
#[derive(Debug)]
pub struct Initializer<B = LinuxBackend, W = Stdout> {
    config: InitConfig,
    backend: B,
    out: W,
}

impl Initializer {
    /// Initializer using real syscalls and reporting on stdout
    #[must_use]
    pub fn new(config: InitConfig) -> Self {
        Self::with_backend(config, LinuxBackend, io::stdout())
    }
}

impl<B: IsolationBackend, W: Write> Initializer<B, W> {
    /// Initializer with an explicit backend and report writer
    pub fn with_backend(config: InitConfig, backend: B, out: W) -> Self {
        Self {
            config,
            backend,
            out,
        }
    }

    /// Run every step and return the command's exit code
    ///
    /// # Errors
    /// Returns the error of the first step that fails
    pub fn run(mut self) -> Result<i32> {
        info!("👶 Initializer started");

        self.report_identity()?;

        let propagation = self.backend.make_root_private()?;
        debug!("✅ Mount propagation is private");

        self.backend.mount_proc(&propagation)?;
        debug!("✅ New /proc mounted");

        self.apply_hostname()?;

        self.launch()
    }

    fn report_identity(&mut self) -> Result<()> {
        let pid = self.backend.pid();
        let namespaces = self.backend.namespaces().inspect_err(|e| {
            error!(pid = %pid, error = %e, "Cannot read own namespaces");
        })?;

        self.report(&InitEvent::Identity { pid, namespaces })?;

        if !pid.is_init() {
            return Err(Error::PidNotIsolated { pid: pid.as_raw() });
        }

        Ok(())
    }

    fn apply_hostname(&mut self) -> Result<()> {
        let requested = self.config.hostname.clone();
        self.backend.set_hostname(&requested)?;

        let current = self.backend.hostname()?;
        if current != requested.as_str() {
            return Err(Error::Hostname {
                operation: HostnameOperation::Get,
                reason: Some(format!("read back '{current}', expected '{requested}'")),
                source: None,
            });
        }

        let hostname = Hostname::new(current)?;
        self.report(&InitEvent::HostnameSet { hostname })
    }

    fn launch(&mut self) -> Result<i32> {
        let (program, args) = build_command(&self.config.command);
        let command: Vec<String> = std::iter::once(program).chain(args).collect();

        self.report(&InitEvent::Launching {
            command: command.clone(),
        })?;

        let exit_code = self.backend.run_command(&command)?;
        info!(exit_code, "👋 Command exited");

        Ok(exit_code)
    }

    fn report(&mut self, event: &InitEvent) -> Result<()> {
        event.emit_trace();
        self.write_event(event)
            .map_err(|e| Error::Report { source: e })
    }

    fn write_event(&mut self, event: &InitEvent) -> io::Result<()> {
        match self.config.report {
            ReportFormat::Human => match event {
                // the launch line only matters to machines; keep the
                // interactive transcript close to a plain shell
                InitEvent::Launching { .. } => {}
                _ => writeln!(self.out, "{event}")?,
            },
            ReportFormat::Json => {
                let line = serde_json::to_string(event).map_err(io::Error::other)?;
                writeln!(self.out, "{line}")?;
            }
        }

        // the command writes to the same descriptor; nothing may be left
        // in our buffer when it starts
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockCall, MockFailure};
    use burrow_core::ProcessId;

    fn config() -> InitConfig {
        InitConfig::new().with_command(vec!["/bin/true".to_string()])
    }

    fn run(backend: &MockBackend, config: InitConfig) -> (Result<i32>, String) {
        let mut out = Vec::new();
        let result = Initializer::with_backend(config, backend.clone(), &mut out).run();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_steps_run_in_order() {
        let backend = MockBackend::new();
        let (result, _) = run(&backend, config());

        assert_eq!(result.unwrap(), 0);
        assert_eq!(
            backend.calls(),
            vec![
                MockCall::MakeRootPrivate,
                MockCall::MountProc,
                MockCall::SetHostname("mycontainer".to_string()),
                MockCall::GetHostname,
                MockCall::RunCommand(vec!["/bin/true".to_string()]),
            ]
        );
    }

    #[test]
    fn test_human_report() {
        let backend = MockBackend::new();
        let (_, output) = run(&backend, config());

        assert_eq!(
            output,
            "Inside isolated environment, PID: 1\nHostname set to: mycontainer\n"
        );
    }

    #[test]
    fn test_json_report() {
        let backend = MockBackend::new();
        let (_, output) = run(&backend, config().with_report(ReportFormat::Json));

        let events: Vec<InitEvent> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], InitEvent::Identity { pid, .. } if pid.is_init()));
        assert!(
            matches!(&events[1], InitEvent::HostnameSet { hostname } if hostname.as_str() == "mycontainer")
        );
        assert!(matches!(&events[2], InitEvent::Launching { command } if command == &["/bin/true"]));
    }

    #[test]
    fn test_exit_code_is_relayed() {
        let backend = MockBackend::new().with_exit_code(42);
        let (result, _) = run(&backend, config());
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_default_command_is_shell() {
        let backend = MockBackend::new();
        let _ = run(&backend, InitConfig::new());

        assert_eq!(
            backend.calls().last(),
            Some(&MockCall::RunCommand(vec!["sh".to_string()]))
        );
    }

    #[test]
    fn test_not_pid_one_touches_nothing() {
        let backend = MockBackend::new().with_pid(ProcessId::from_raw(4242));
        let (result, output) = run(&backend, config());

        assert!(matches!(result, Err(Error::PidNotIsolated { pid: 4242 })));
        assert!(backend.calls().is_empty());
        // identity is still reported for diagnostics
        assert!(output.contains("PID: 4242"));
    }

    #[test]
    fn test_propagation_failure_stops_before_mount() {
        let backend = MockBackend::new().failing_at(MockFailure::MakeRootPrivate);
        let (result, _) = run(&backend, config());

        assert!(matches!(result, Err(Error::MountPropagation { .. })));
        assert_eq!(backend.calls(), vec![MockCall::MakeRootPrivate]);
    }

    #[test]
    fn test_proc_failure_stops_before_hostname() {
        let backend = MockBackend::new().failing_at(MockFailure::MountProc);
        let (result, _) = run(&backend, config());

        assert!(matches!(result, Err(Error::ProcMount { .. })));
        assert_eq!(
            backend.calls(),
            vec![MockCall::MakeRootPrivate, MockCall::MountProc]
        );
    }

    #[test]
    fn test_hostname_set_failure_is_fatal() {
        let backend = MockBackend::new().failing_at(MockFailure::SetHostname);
        let (result, _) = run(&backend, config());

        assert!(matches!(
            result,
            Err(Error::Hostname {
                operation: HostnameOperation::Set,
                ..
            })
        ));
        assert!(!backend.calls().contains(&MockCall::GetHostname));
    }

    #[test]
    fn test_hostname_readback_failure_is_fatal() {
        let backend = MockBackend::new().failing_at(MockFailure::GetHostname);
        let (result, output) = run(&backend, config());

        assert!(matches!(
            result,
            Err(Error::Hostname {
                operation: HostnameOperation::Get,
                ..
            })
        ));
        assert!(!output.contains("Hostname set to"));
        assert!(
            !backend
                .calls()
                .iter()
                .any(|call| matches!(call, MockCall::RunCommand(_)))
        );
    }

    #[test]
    fn test_hostname_mismatch_is_fatal() {
        let backend = MockBackend::new().with_hostname_readback("host");
        let (result, _) = run(&backend, config());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("expected 'mycontainer'"));
    }

    #[test]
    fn test_namespace_read_failure_names_step() {
        let backend = MockBackend::new().failing_at(MockFailure::Namespaces);
        let (result, output) = run(&backend, config());

        let err = result.unwrap_err();
        assert!(matches!(err, Error::NamespaceInspection { .. }));
        assert!(err.to_string().contains("/proc/self/ns"));
        assert!(output.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_report_write_failure_is_fatal() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let backend = MockBackend::new();
        let result = Initializer::with_backend(config(), backend.clone(), Closed).run();

        assert!(matches!(result, Err(Error::Report { .. })));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_launch_failure_is_fatal() {
        let backend = MockBackend::new().failing_at(MockFailure::RunCommand);
        let (result, _) = run(&backend, config());
        assert!(matches!(result, Err(Error::CommandLaunch { .. })));
    }
}
