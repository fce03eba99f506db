// Stamps the binary with the build date and the source revision

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    println!(
        "cargo:rustc-env=FUZZIE_BUILD_DATE={}",
        chrono::Utc::now().format("%Y-%m-%d")
    );

    if let Some(revision) = git(&["rev-parse", "--short", "HEAD"]) {
        let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
            .map_or(false, |status| !status.is_empty());
        let suffix = if dirty { "-dirty" } else { "" };
        println!("cargo:rustc-env=FUZZIE_REVISION={}{}", revision, suffix);
    }

    println!("cargo:rerun-if-changed=../.git/HEAD");
}
