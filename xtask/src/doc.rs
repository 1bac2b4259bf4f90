use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Features documented: everything that builds on the host.
const DOC_FEATURES: &str = "std,serde,tracing";

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building i2c-kv documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    // Broken intra-doc links fail the build rather than rendering as text.
    let output = Command::new("cargo")
        .args(["doc", "-p", "i2c-kv", "--no-deps", "--features", DOC_FEATURES])
        .args(open.then_some("--open"))
        .env("RUSTDOCFLAGS", "-D rustdoc::broken_intra_doc_links")
        .output()
        .context("Failed to run cargo doc")?;

    if !output.status.success() {
        eprintln!("{}", "  ✗ cargo doc failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("cargo doc failed");
    }

    println!(
        "{}",
        format!(
            "  ✓ Docs ({DOC_FEATURES}) built in {:.2}s: target/doc/i2c_kv/index.html",
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();

    Ok(())
}
