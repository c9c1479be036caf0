// src/main.rs

use anyhow::{Result, bail};
use blink::{Config, PackageManager};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

const SUPPORT_PAGE: &str = "\
Blink Package Manager - Support

  Issues:  https://github.com/Aperture-OS/blink/issues
  Website: https://aperture-os.github.io

When reporting a problem, include the full error output and the
relevant log lines (run with RUST_LOG=debug for more detail).
";

#[derive(Parser)]
#[command(name = "blink")]
#[command(author, version, about = "Lightweight, source-based package manager for Aperture OS", long_about = None)]
struct Cli {
    /// Install root holding the manifest, lock, sources and build trees
    #[arg(long, global = true, default_value = blink::config::DEFAULT_ROOT)]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a package recipe into the cache
    #[command(aliases = ["d", "download", "g", "dl"])]
    Get {
        /// Package name
        package: String,
        /// Cache directory (default: the install root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Fetch and display package information
    #[command(visible_alias = "search", aliases = ["information", "pkginfo", "details", "fetch"])]
    Info {
        /// Package name
        package: String,
        /// Re-download the recipe even if cached
        #[arg(short, long)]
        force: bool,
        /// Cache directory (default: the install root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Download, build and install a package
    #[command(aliases = ["i", "add", "inst"])]
    Install {
        /// Package name
        package: String,
        /// Reinstall, re-fetching recipe and source
        #[arg(short, long)]
        force: bool,
        /// Cache directory (default: the install root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Run a package's uninstall commands and forget it
    #[command(aliases = ["remove", "rm"])]
    Uninstall {
        /// Package name
        package: String,
        /// Cache directory (default: the install root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Clone or update the configured recipe repositories
    Sync {
        /// Hard-reset checkouts to the configured branch
        #[arg(short, long)]
        force: bool,
    },
    /// Sync repositories and reinstall packages with newer recipes
    #[command(aliases = ["upgrade", "up"])]
    Update {
        /// Hard-reset checkouts to the configured branch
        #[arg(short, long)]
        force: bool,
        /// Cache directory (default: the install root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Delete cached recipes, sources and build trees
    #[command(aliases = ["cleanup", "clear", "c"])]
    Clean {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Cache directory (default: the install root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// List installed packages
    #[command(aliases = ["ls", "installed"])]
    List,
    /// Show support information
    #[command(aliases = ["issue", "bug", "contact"])]
    Support,
    /// Show Blink version
    #[command(aliases = ["v", "ver"])]
    Version,
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn require_root() -> Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        bail!("This command must be run as root");
    }
    Ok(())
}

/// Ask before wiping caches; an empty answer counts as yes
fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [Y/n] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(matches!(answer.as_str(), "" | "y" | "yes"))
}

fn version_page() -> String {
    format!(
        "Blink Package Manager - Version {}\nLicensed under GPL v3.0 by Aperture OS\nhttps://aperture-os.github.io\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Get { package, path } => {
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, path.as_deref())?;
            let recipe_path = manager.get(&package)?;
            println!("Recipe for {} saved to {}", package, recipe_path.display());
            Ok(())
        }
        Commands::Info {
            package,
            force,
            path,
        } => {
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, path.as_deref())?;
            manager.info(&package, force)?;
            Ok(())
        }
        Commands::Install {
            package,
            force,
            path,
        } => {
            require_root()?;
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, path.as_deref())?;
            let entry = manager.install(&package, force)?;
            println!(
                "Installed {} {}-{}",
                entry.name, entry.version, entry.release
            );
            Ok(())
        }
        Commands::Uninstall { package, path } => {
            require_root()?;
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, path.as_deref())?;
            manager.uninstall(&package)?;
            println!("Uninstalled {}", package);
            Ok(())
        }
        Commands::Sync { force } => {
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, None)?;
            manager.sync(force)?;
            println!("Repositories synchronized");
            Ok(())
        }
        Commands::Update { force, path } => {
            require_root()?;
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, path.as_deref())?;
            let updated = manager.update(force)?;
            if updated.is_empty() {
                println!("All packages are up to date");
            } else {
                for entry in updated {
                    println!("Updated {} to {}-{}", entry.name, entry.version, entry.release);
                }
            }
            Ok(())
        }
        Commands::Clean { yes, path } => {
            require_root()?;
            if !yes
                && !confirm("Delete the cached recipes, sources and build trees?")?
            {
                bail!("User declined, nothing was removed");
            }
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, path.as_deref())?;
            manager.clean()?;
            info!("Cache cleaned");
            Ok(())
        }
        Commands::List => {
            let config = Config::load(&cli.root)?;
            let manager = PackageManager::new(&config, None)?;
            let manifest = manager.list()?;

            if manifest.is_empty() {
                println!("No packages installed");
            } else {
                println!("{:<24} {:<16} {:<8} INSTALLED", "NAME", "VERSION", "RELEASE");
                for entry in &manifest.installed {
                    println!(
                        "{:<24} {:<16} {:<8} {}",
                        entry.name,
                        entry.version,
                        entry.release,
                        entry.installed_at_display()
                    );
                }
            }
            Ok(())
        }
        Commands::Support => {
            print!("{}", SUPPORT_PAGE);
            Ok(())
        }
        Commands::Version => {
            print!("{}", version_page());
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "blink", &mut io::stdout());
            Ok(())
        }
    }
}
