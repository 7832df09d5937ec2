use std::env;
use std::process::Command;

const PREFIX: &str = "WARDROBE_BUDGET_BUILD";

fn main() {
    for watched in ["build.rs", ".git/HEAD", ".git/refs"] {
        println!("cargo:rerun-if-changed={watched}");
    }

    let hash = run("git", &["rev-parse", "--short", "HEAD"]).filter(|hash| !hash.is_empty());
    let status = run("git", &["status", "--porcelain"])
        .map(|changes| if changes.is_empty() { "clean" } else { "dirty" });
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    emit("HASH", hash.as_deref().unwrap_or("unknown"));
    emit("STATUS", status.unwrap_or("unknown"));
    emit("TIMESTAMP", &timestamp);
    emit("TARGET", &env::var("TARGET").unwrap_or_else(|_| "unknown-target".into()));
    emit("PROFILE", &env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".into()));
    emit(
        "RUSTC",
        run("rustc", &["--version"]).as_deref().unwrap_or("unknown"),
    );
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={PREFIX}_{key}={value}");
}

/// Trimmed stdout of a successful command.
fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|text| text.trim().to_string())
}
