use std::process::Command;

fn setup_windows_build() {
    // Version resource shown in the DLL's file properties
    let mut res = tauri_winres::WindowsResource::new();
    res.set("OriginalFilename", "retrocam.dll");
    res.compile().expect("compile version resource");
}

/// Trimmed stdout of a successful git invocation.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_owned())
}

/// `v<crate version>`, followed by the abbreviated commit and a `-dirty` marker when built
/// from a git checkout.
fn display_version() -> String {
    let version = format!("v{}", env!("CARGO_PKG_VERSION"));
    let Some(commit) = git(&["describe", "--always", "--dirty", "--abbrev=8", "--exclude=*"]) else {
        println!("cargo:warning=Not a git checkout, version string has no commit hash");
        return version;
    };

    if let Some(git_dir) = git(&["rev-parse", "--git-dir"]) {
        println!("cargo:rerun-if-changed={}/HEAD", git_dir);
        println!("cargo:rerun-if-changed={}/index", git_dir);
    }
    format!("{}-{}", version, commit)
}

fn main() {
    if std::env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows") {
        setup_windows_build();
    }

    println!("cargo:rustc-env=RETROCAM_DISPLAY_VERSION={}", display_version());
}
