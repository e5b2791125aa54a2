//! Process-level behaviour of the `toomany` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::net::TcpListener;

fn toomany() -> Command {
    let mut cmd = Command::cargo_bin("toomany").unwrap();
    cmd.env_remove("TOOMANY_LOG")
        .env_remove("TOOMANY_HOST")
        .env_remove("TOOMANY_PORT")
        .env("TOOMANY_WORKERS", "1");
    cmd
}

#[test]
fn exits_non_zero_when_port_is_taken() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    toomany()
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "failed to bind 127.0.0.1:{port}"
        )));
}

#[test]
fn exits_non_zero_on_invalid_host() {
    toomany()
        .args(["--host", "nowhere"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid address"));
}

#[test]
fn rejects_bad_arguments() {
    toomany()
        .args(["--port", "not-a-port"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--port"));
}

#[test]
fn help_lists_options() {
    toomany()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--host").and(predicate::str::contains("--port")));
}

#[cfg(unix)]
mod signals {
    use assert_cmd::cargo::CommandCargoExt;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::net::TcpListener;
    use std::process::{Child, Command, ExitStatus, Stdio};
    use std::time::{Duration, Instant};

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn spawn(port: u16) -> Child {
        Command::cargo_bin("toomany")
            .unwrap()
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .env_remove("TOOMANY_LOG")
            .env("TOOMANY_WORKERS", "1")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    async fn wait_healthy(port: u16) -> reqwest::Response {
        let url = format!("http://127.0.0.1:{port}/healthcheck");
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Ok(res) = reqwest::get(&url).await {
                return res;
            }
            assert!(Instant::now() < deadline, "server never came up");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn wait_exit(child: &mut Child) -> ExitStatus {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(status) = child.try_wait().unwrap() {
                return status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                panic!("server did not exit after signal");
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn serves_then_exits_zero_on(signal: Signal) {
        let port = free_port();
        let mut child = spawn(port);

        let res = wait_healthy(port).await;
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "ok");

        let pid = Pid::from_raw(i32::try_from(child.id()).unwrap());
        kill(pid, signal).unwrap();

        let status = wait_exit(&mut child).await;
        assert_eq!(status.code(), Some(0), "exit after {signal:?}");
    }

    #[tokio::test]
    async fn exits_zero_on_sigterm() {
        serves_then_exits_zero_on(Signal::SIGTERM).await;
    }

    #[tokio::test]
    async fn exits_zero_on_sigint() {
        serves_then_exits_zero_on(Signal::SIGINT).await;
    }
}
