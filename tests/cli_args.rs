use assert_cmd::Command;

#[test]
fn help_lists_all_commands() {
    let mut cmd = Command::cargo_bin("hostprobe").unwrap();
    let assert = cmd.arg("--help").assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    for name in [
        "all",
        "cpu",
        "memory",
        "network",
        "disk",
        "processes",
        "system",
        "hardware",
        "gpu",
        "gpu-temp",
        "meta",
        "modules",
        "server",
    ] {
        assert!(out.contains(name), "missing command {name} in --help");
    }
}

#[test]
fn version_flag_works() {
    let mut cmd = Command::cargo_bin("hostprobe").unwrap();
    cmd.arg("--version").assert().success();
}

#[test]
fn modules_command_lists_module_names() {
    let mut cmd = Command::cargo_bin("hostprobe").unwrap();
    let assert = cmd.arg("modules").assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    assert!(out.contains("cpu"));
    assert!(out.contains("net-rate"));
    assert!(out.contains("diskmounts"));
    assert!(out.contains("gpu-temp"));
}

#[test]
fn gpu_temp_requires_pci_id() {
    let mut cmd = Command::cargo_bin("hostprobe").unwrap();
    cmd.arg("gpu-temp").assert().failure();
}

#[test]
fn unknown_meta_module_fails() {
    let mut cmd = Command::cargo_bin("hostprobe").unwrap();
    cmd.args(["meta", "--modules", "bogus"]).assert().failure();
}
