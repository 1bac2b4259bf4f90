use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Bare-metal target used to prove the library stays `no_std`.
const EMBEDDED_TARGET: &str = "thumbv7em-none-eabihf";

/// One `cargo check` configuration of the library.
struct Build {
    label: &'static str,
    args: &'static [&'static str],
}

const BUILDS: &[Build] = &[
    Build {
        label: "no_std, no logging",
        args: &["--target", EMBEDDED_TARGET, "--no-default-features"],
    },
    Build {
        label: "no_std + defmt",
        args: &["--target", EMBEDDED_TARGET, "--features", "defmt"],
    },
    Build {
        label: "no_std + serde",
        args: &["--target", EMBEDDED_TARGET, "--features", "serde"],
    },
    Build {
        label: "host, std + tracing + serde",
        args: &["--features", "std,tracing,serde"],
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking i2c-kv builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for build in BUILDS {
        println!("{}", format!("  Checking {}...", build.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(["check", "-p", "i2c-kv"])
            .args(build.args)
            .output()
            .with_context(|| format!("Failed to check {}", build.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} check failed", build.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} check failed", build.label);
        }

        println!(
            "{}",
            format!(
                "  ✓ {} passed in {:.2}s",
                build.label,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
    }

    // defmt and tracing are mutually exclusive; make sure the guard fires.
    println!("{}", "  Checking logging backend exclusivity...".cyan());
    let both = Command::new("cargo")
        .args(["check", "-p", "i2c-kv", "--features", "defmt,tracing"])
        .output()
        .context("Failed to check defmt+tracing build")?;
    if both.status.success() {
        anyhow::bail!("defmt + tracing built; the compile_error guard is missing");
    }
    println!("{}", "  ✓ defmt + tracing rejected".green());
    println!();

    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();

    let clippy_output = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .output()
        .context("Failed to run clippy")?;

    if !clippy_output.status.success() {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
    } else {
        println!(
            "{}",
            format!(
                "  ✓ Clippy passed in {:.2}s",
                clippy_start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    println!("{}", "  Checking code formatting...".cyan());

    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if !fmt_output.status.success() {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    } else {
        println!("{}", "  ✓ Formatting check passed".green());
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
