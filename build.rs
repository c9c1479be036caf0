// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn path_arg() -> Arg {
    Arg::new("path")
        .short('p')
        .long("path")
        .value_name("DIR")
        .help("Cache directory (default: the install root)")
}

fn force_arg(help: &'static str) -> Arg {
    Arg::new("force")
        .short('f')
        .long("force")
        .action(ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("blink")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Aperture OS")
        .about("Lightweight, source-based package manager for Aperture OS")
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .value_name("DIR")
                .default_value("/var/blink")
                .help("Install root holding the manifest, lock, sources and build trees"),
        )
        .subcommand(
            Command::new("get")
                .about("Download a package recipe into the cache")
                .arg(Arg::new("package").required(true).help("Package name"))
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("info")
                .visible_alias("search")
                .about("Fetch and display package information")
                .arg(Arg::new("package").required(true).help("Package name"))
                .arg(force_arg("Re-download the recipe even if cached"))
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("install")
                .about("Download, build and install a package")
                .arg(Arg::new("package").required(true).help("Package name"))
                .arg(force_arg("Reinstall, re-fetching recipe and source"))
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Run a package's uninstall commands and forget it")
                .arg(Arg::new("package").required(true).help("Package name"))
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("sync")
                .about("Clone or update the configured recipe repositories")
                .arg(force_arg("Hard-reset checkouts to the configured branch")),
        )
        .subcommand(
            Command::new("update")
                .about("Sync repositories and reinstall packages with newer recipes")
                .arg(force_arg("Hard-reset checkouts to the configured branch"))
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("clean")
                .about("Delete cached recipes, sources and build trees")
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .help("Do not ask for confirmation"),
                )
                .arg(path_arg()),
        )
        .subcommand(Command::new("list").about("List installed packages"))
        .subcommand(Command::new("support").about("Show support information"))
        .subcommand(Command::new("version").about("Show Blink version"))
        .subcommand(
            Command::new("completion")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("blink.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
