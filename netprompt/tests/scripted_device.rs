//! End-to-end sessions against a scripted device, through the public API only.

use std::time::Duration;

use netprompt::error::SessionError;
use netprompt::transport::{ScriptStep, ScriptedTransport};
use netprompt::{Error, Protocol, Session, SessionConfig};

fn config() -> SessionConfig {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut config = SessionConfig::new("198.51.100.7", "admin", "hunter2");
    config.timeout = Duration::from_millis(300);
    config.command_timeout = Some(Duration::from_millis(300));
    config
}

#[tokio::test]
async fn ssh_session_runs_commands_against_banner() {
    let (transport, handle) = ScriptedTransport::builder()
        .read("Last login: Mon Oct 19 09:12:44 2026\r\n")
        .read("router#")
        .respond(
            "show version\n",
            [
                ScriptStep::data("show version\r\n"),
                ScriptStep::data("Cisco IOS Software\r\nVersion 1.0\r\n"),
                ScriptStep::data("router#"),
            ],
        )
        .build();

    let session = Session::with_transport(transport, Protocol::Ssh, config())
        .await
        .unwrap();
    assert_eq!(session.banner(), "router#");

    session.enter_command("show version", "Version").await.unwrap();
    let response = session.get_data("show version").await.unwrap();
    assert!(response.contains("Version 1.0"));
    assert!(response.data.ends_with(b"router#"));

    session.close().await.unwrap();
    assert!(handle.is_closed());
}

#[tokio::test]
async fn silent_device_times_out_with_partial_output() {
    let (transport, _) = ScriptedTransport::builder()
        .read("switch>")
        .respond("show interfaces\n", [ScriptStep::data("show interfaces\r\nGi0/1 up\r\n")])
        .build();
    let session = Session::with_transport(transport, Protocol::Ssh, config())
        .await
        .unwrap();

    let err = session.get_data("show interfaces").await.unwrap_err();
    assert!(matches!(err, Error::Session(SessionError::CommandTimeout { .. })));
    assert_eq!(err.partial_output(), Some(&b"show interfaces\r\nGi0/1 up\r\n"[..]));
}

#[tokio::test]
async fn telnet_login_sends_each_credential_once() {
    let (transport, handle) = ScriptedTransport::builder()
        .read("login: ")
        .respond("admin\n", [ScriptStep::data("Password: ")])
        .respond("hunter2\n", [ScriptStep::data("\r\nrouter#")])
        .build();

    let session = Session::with_transport(transport, Protocol::Telnet, config())
        .await
        .unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.banner(), "router#");
    assert_eq!(handle.write_count("admin\n"), 1);
    assert_eq!(handle.write_count("hunter2\n"), 1);
}

#[tokio::test]
async fn telnet_login_incorrect_produces_no_session() {
    let (transport, handle) = ScriptedTransport::builder()
        .read("login: ")
        .respond("admin\n", [ScriptStep::data("Password: ")])
        .respond(
            "hunter2\n",
            [
                ScriptStep::data("\r\nLogin incorrect\r\n"),
                ScriptStep::data("router#"),
            ],
        )
        .build();

    let err = Session::with_transport(transport, Protocol::Telnet, config())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Session(SessionError::AuthenticationFailed { .. })
    ));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn repeated_commands_return_identical_bytes() {
    let (transport, _) = ScriptedTransport::builder()
        .read("router#")
        .respond(
            "show clock\n",
            [ScriptStep::data("show clock\r\n*09:30:00.000 UTC Mon Oct 19 2026\r\nrouter#")],
        )
        .build();
    let session = Session::with_transport(transport, Protocol::Ssh, config())
        .await
        .unwrap();

    let first = session.execute("show clock", "router#").await.unwrap();
    let second = session.execute("show clock", "router#").await.unwrap();
    assert_eq!(first.data, second.data);
}

#[tokio::test]
async fn end_of_stream_during_get_data_is_success() {
    let (transport, _) = ScriptedTransport::builder()
        .read("router#")
        .respond("reload\n", [ScriptStep::data("reload\r\nReloading...\r\n"), ScriptStep::Eof])
        .build();
    let session = Session::with_transport(transport, Protocol::Ssh, config())
        .await
        .unwrap();

    let response = session.get_data("reload").await.unwrap();
    assert!(response.is_end_of_stream());
    assert_eq!(response.data, b"reload\r\nReloading...\r\n");
}
