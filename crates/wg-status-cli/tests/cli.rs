//! End-to-end tests of the `wg-status` binary against saved dumps.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DUMP: &str = "wg0\tyAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=\tHIgo9xNzJMWLKASShiTqIybxZ0U3wGLiUeJ1PKf8ykw=\t51820\toff\n\
wg0\txTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=\t(none)\t192.0.2.1:51820\t10.0.0.2/32\t0\t0\t0\toff\n";

fn fixture(dump: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("wg.dump"), dump).expect("write dump");

    let link = dir.path().join("sys/class/net/wg0");
    fs::create_dir_all(&link).expect("link dir");
    fs::write(link.join("uevent"), "DEVTYPE=wireguard\nINTERFACE=wg0\n").expect("uevent");
    fs::write(link.join("flags"), "0x91\n").expect("flags");
    fs::write(link.join("mtu"), "1420\n").expect("mtu");

    let module = dir.path().join("sys/module/wireguard");
    fs::create_dir_all(&module).expect("module dir");
    fs::write(module.join("version"), "1.0.0\n").expect("module version");
    dir
}

fn wg_status(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wg-status").expect("binary");
    cmd.env_remove("WG_STATUS_CONFIG")
        .env_remove("WG_STATUS_BACKEND")
        .arg("--dump-file")
        .arg(root.join("wg.dump"))
        .arg("--sysfs-root")
        .arg(root);
    cmd
}

#[test]
fn connections_panel_shows_never() {
    let dir = fixture(DUMP);
    wg_status(dir.path())
        .arg("connections")
        .assert()
        .success()
        .stdout(predicate::str::contains("interface: wg0"))
        .stdout(predicate::str::contains(
            "peer: xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=",
        ))
        .stdout(predicate::str::contains("latest handshake: (never)"));
}

#[test]
fn interfaces_panel_reads_sysfs() {
    let dir = fixture(DUMP);
    wg_status(dir.path())
        .arg("interfaces")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"wg0\s+up\s+1420\s+51820\s+1").expect("regex"));
}

#[test]
fn kmod_panel() {
    let dir = fixture(DUMP);
    wg_status(dir.path())
        .arg("kmod")
        .assert()
        .success()
        .stdout("wireguard kernel module: loaded (version 1.0.0)\n");
}

#[test]
fn empty_dump_shows_placeholder() {
    let dir = fixture("");
    wg_status(dir.path())
        .arg("connections")
        .assert()
        .success()
        .stdout("No WireGuard interfaces found.\n");
}

#[test]
fn all_panels_with_version_unavailable() {
    let dir = fixture(DUMP);
    wg_status(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("== Connection Status =="))
        .stdout(predicate::str::contains("== WireGuard Version ==\nStatus unavailable."))
        .stdout(predicate::str::contains("== Kernel Module Status =="));
}

#[test]
fn malformed_dump_is_unavailable_not_fatal() {
    let dir = fixture("wg0\tonly-two-fields\n");
    wg_status(dir.path())
        .arg("connections")
        .assert()
        .success()
        .stdout("Status unavailable.\n");
}

#[test]
fn json_output() {
    let dir = fixture(DUMP);
    let output = wg_status(dir.path())
        .args(["--format", "json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let peer = &value["interfaces"]["interfaces"][0]["peers"][0];
    assert_eq!(peer["latest_handshake"], "never");
    assert_eq!(value["module_loaded"], true);
    assert_eq!(value["module_version"], "1.0.0");
    assert_eq!(value["errors"][0]["query"], "version");
}

#[test]
fn zero_timeout_is_rejected() {
    let dir = fixture(DUMP);
    wg_status(dir.path())
        .args(["--timeout-ms", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn unknown_panel_is_usage_error() {
    Command::cargo_bin("wg-status")
        .expect("binary")
        .arg("routes")
        .assert()
        .failure();
}
