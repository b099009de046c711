use std::path::PathBuf;
use std::process::Command;

fn main() {
    let commit = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=SCRAPERS_GIT_COMMIT={commit}");

    // Rebuild when HEAD moves so `--version` stays accurate.
    if let Ok(raw) = git(&["rev-parse", "--git-dir"]) {
        let git_dir = PathBuf::from(raw);
        let git_dir = if git_dir.is_absolute() {
            git_dir
        } else {
            match std::env::var("CARGO_MANIFEST_DIR") {
                Ok(manifest_dir) => PathBuf::from(manifest_dir).join(git_dir),
                Err(_) => return,
            }
        };
        println!("cargo:rerun-if-changed={}", git_dir.join("HEAD").display());
    }
}

fn git(args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|err| err.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).to_string());
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        return Err(format!("empty output from git {}", args.join(" ")));
    }
    Ok(value)
}
