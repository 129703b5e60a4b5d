use std::error::Error;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::{env, process};

fn main() -> Result<(), Box<dyn Error>> {
    let profile = env::var("PROFILE")?;

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../umbra-gpu/src");
    println!("cargo:rerun-if-changed=../umbra-shaders/src");
    println!("cargo:rerun-if-changed=../umbra-shader-builder/Cargo.toml");
    println!("cargo:rerun-if-changed=../umbra-shader-builder/src/main.rs");
    println!("cargo:rustc-env=PROFILE={profile}");

    let mut dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or("missing OUT_DIR")?);

    // Strip `$profile/build/*/out`.
    let ok = dir.ends_with("out")
        && dir.pop()
        && dir.pop()
        && dir.ends_with("build")
        && dir.pop()
        && dir.ends_with(&profile)
        && dir.pop();

    assert!(ok, "unexpected OUT_DIR layout");

    let dir = dir.join("shader-builder");

    // The builder prints `cargo:rustc-env=...` lines that, since its stdout is
    // inherited, get picked up by cargo as if they came from this script
    let status = Command::new("cargo")
        .args([
            "run",
            "--release",
            "-p",
            "umbra-shader-builder",
            "--target-dir",
        ])
        .arg(dir)
        .env_remove("CARGO_ENCODED_RUSTFLAGS")
        .stderr(Stdio::inherit())
        .stdout(Stdio::inherit())
        .status()?;

    if !status.success() {
        process::exit(status.code().unwrap_or(1));
    }

    Ok(())
}
