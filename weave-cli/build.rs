use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the views in src/inspect.rs
// We need to duplicate this here since build scripts can't access src/ modules
const AVAILABLE_VIEWS: &[&str] = &["tokens", "lowered", "tree", "blocks"];

const FORMATS: &[&str] = &["markdown", "html", "json"];

fn input_arg(help: &'static str) -> Arg {
    Arg::new("input")
        .help(help)
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let format_parser = clap::builder::PossibleValuesParser::new(FORMATS);

    let mut cmd = Command::new("weave")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert and inspect weave documents")
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a weave.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats")
                .arg(input_arg("Input file path"))
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format")
                        .value_parser(format_parser.clone()),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format")
                        .value_parser(format_parser),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Parse a Markdown file and serialize it back")
                .arg(input_arg("Input Markdown file"))
                .arg(
                    Arg::new("check")
                        .long("check")
                        .help("Exit with status 1 if the round trip changes the input")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the Markdown pipeline's intermediate stages")
                .arg(input_arg("Input Markdown file"))
                .arg(
                    Arg::new("view")
                        .help("Stage to print")
                        .value_parser(clap::builder::PossibleValuesParser::new(AVAILABLE_VIEWS))
                        .index(2),
                ),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "weave", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "weave", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "weave", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
