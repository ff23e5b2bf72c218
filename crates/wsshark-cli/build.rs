use std::env;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-env-changed=WSSHARK_COMMIT");

    let commit = env::var("WSSHARK_COMMIT")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| git(&["rev-parse", "HEAD"]))
        .map(|full| full.chars().take(7).collect::<String>())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let date = git(&["log", "-1", "--format=%cs"]).unwrap_or_else(|| UNKNOWN.to_string());

    println!("cargo:rustc-env=WSSHARK_BUILD_COMMIT={commit}");
    println!("cargo:rustc-env=WSSHARK_BUILD_DATE={date}");
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}
