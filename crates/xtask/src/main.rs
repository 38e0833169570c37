use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Crates the domain must never depend on or name in its sources.
const DOMAIN_FORBIDDEN: &[&str] = &[
    "tokio",
    "sqlx",
    "async-trait",
    "async_trait",
    "dashmap",
    "tracing-subscriber",
    "tracing_subscriber",
    "dotenvy",
];

const DOMAIN_PACKAGE: &str = "skirmish-domain";

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  arch-check"),
    }
}

#[derive(Deserialize)]
struct Metadata {
    packages: Vec<Package>,
}

#[derive(Deserialize)]
struct Package {
    name: String,
    manifest_path: PathBuf,
    dependencies: Vec<Dependency>,
}

#[derive(Deserialize)]
struct Dependency {
    name: String,
    kind: Option<String>,
}

fn arch_check() -> anyhow::Result<()> {
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }

    let metadata: Metadata =
        serde_json::from_slice(&output.stdout).context("parsing cargo metadata")?;
    let domain = metadata
        .packages
        .iter()
        .find(|p| p.name == DOMAIN_PACKAGE)
        .with_context(|| format!("{DOMAIN_PACKAGE} not found in workspace"))?;

    let mut violations = forbidden_dependencies(domain);

    let src = domain
        .manifest_path
        .parent()
        .map(|dir| dir.join("src"))
        .context("domain manifest has no parent directory")?;
    violations.extend(forbidden_imports(&src)?);

    if violations.is_empty() {
        println!("arch-check: {DOMAIN_PACKAGE} is free of I/O dependencies");
        return Ok(());
    }

    for violation in &violations {
        eprintln!("arch-check: {violation}");
    }
    anyhow::bail!("arch-check found {} violation(s)", violations.len())
}

/// Normal (non-dev) dependencies of `package` that appear in the forbidden list.
fn forbidden_dependencies(package: &Package) -> Vec<String> {
    package
        .dependencies
        .iter()
        .filter(|d| d.kind.as_deref() != Some("dev"))
        .filter(|d| DOMAIN_FORBIDDEN.contains(&d.name.as_str()))
        .map(|d| format!("{} depends on {}", package.name, d.name))
        .collect()
}

fn forbidden_imports(src: &Path) -> anyhow::Result<Vec<String>> {
    let pattern = format!(r"\b({})::", DOMAIN_FORBIDDEN.join("|").replace('-', "_"));
    let re = regex_lite::Regex::new(&pattern).context("building import pattern")?;

    let mut violations = Vec::new();
    for file in rust_files(src)? {
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        for (idx, line) in text.lines().enumerate() {
            if line.trim_start().starts_with("//") {
                continue;
            }
            if let Some(m) = re.find(line) {
                violations.push(format!(
                    "{}:{} uses {}",
                    file.display(),
                    idx + 1,
                    m.as_str().trim_end_matches("::")
                ));
            }
        }
    }
    Ok(violations)
}

fn rust_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in
            std::fs::read_dir(&dir).with_context(|| format!("listing {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
