// Command-line interface for weave
//
// This binary converts documents between the formats the weave editor reads and writes, and
// exposes the Markdown pipeline's intermediate stages for debugging.
//
// The core capabilities live in the weave-babel crate. This crate only wires them to files,
// configuration and the terminal.
//
// Converting:
//
// The conversion needs a to and from pair. The from is auto-detected from the file extension,
// while being overwrittable by an explicit --from flag.
// Usage:
//  weave <input> --to <format> [--from <format>] [--output <file>]  - Convert between formats (default)
//  weave convert <input> --to <format> [--from <format>] [--output <file>]  - Same as above (explicit)
//  weave roundtrip <input> [--check]      - Markdown -> tree -> Markdown
//  weave inspect <input> [<view>]          - Print a pipeline stage (defaults to "tree")
//  weave --list-formats                    - List available formats
//
// Extra Parameters:
//
// Format-specific parameters can be passed using --extra-<parameter-name> <value>.
// The CLI layer strips the "extra-" prefix and passes the parameters to the format.
// Keys containing a dot override configuration values instead.
// Example:
//  weave notes.md --to html --extra-standalone --extra-title Notes
//  weave notes.md --to html --extra-markdown.breaks true
//
// Logging goes to stderr and is filtered by the WEAVE_LOG environment variable
// (e.g. WEAVE_LOG=debug), defaulting to warnings.

mod inspect;

use clap::{Arg, ArgAction, Command, ValueHint};
use std::collections::HashMap;
use std::fs;
use tracing_subscriber::EnvFilter;
use weave_babel::formats::{HtmlFormat, JsonFormat, MarkdownFormat};
use weave_babel::{FormatRegistry, Pipeline};
use weave_config::{Loader, WeaveConfig};

const LOG_ENV: &str = "WEAVE_LOG";
const PROJECT_CONFIG: &str = "weave.toml";

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
/// - `--extras-<key>` (alias for `--extra-<key>`)
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        let key_opt = if let Some(key) = arg.strip_prefix("--extra-") {
            Some(key)
        } else {
            arg.strip_prefix("--extras-")
        };

        if let Some(key) = key_opt {
            let has_value = args.get(i + 1).is_some_and(|next| !next.starts_with('-'));

            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn build_cli() -> Command {
    Command::new("weave")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert and inspect weave documents")
        .long_about(
            "weave converts documents between Markdown, HTML and the editor's JSON tree.\n\n\
            Commands:\n  \
            - convert:   Transform between document formats (default)\n  \
            - roundtrip: Parse Markdown and write it back\n  \
            - inspect:   View the Markdown pipeline's intermediate stages\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to pass format-specific options.\n  \
            Boolean flags can omit the value (defaults to 'true').\n  \
            Names containing a dot override configuration keys.\n\n\
            Examples:\n  \
            weave notes.md --to html                  # Convert to HTML (outputs to stdout)\n  \
            weave page.html --to markdown -o notes.md # Convert HTML to a Markdown file\n  \
            weave roundtrip notes.md --check          # Verify Markdown survives a round trip\n  \
            weave inspect notes.md lowered            # View the text handed to the parser",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
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
                .about("Convert between document formats (default command)")
                .long_about(
                    "Convert documents between different formats.\n\n\
                    Supported formats:\n  \
                    - markdown: Markdown with math, scripts and alignment fences (.md)\n  \
                    - html:     HTML fragment or standalone page (.html)\n  \
                    - json:     The document tree as JSON (.json)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.\n\n\
                    Examples:\n  \
                    weave convert notes.md --to html                    # HTML fragment\n  \
                    weave convert notes.md --to html --extra-standalone # Complete page\n  \
                    weave notes.md --to json                            # 'convert' is optional",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .long_help(
                            "Target format to convert to.\n\n\
                            Available formats: markdown, html, json\n\
                            Use the format name, not the file extension.",
                        )
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Parse a Markdown file and serialize it back")
                .long_about(
                    "Runs Markdown through the full pipeline: parse to the document tree,\n\
                    then serialize back to Markdown. The result is written to stdout.\n\n\
                    With --check nothing is printed; the command exits with status 1 when\n\
                    the result differs from the input (ignoring trailing whitespace).",
                )
                .arg(
                    Arg::new("input")
                        .help("Input Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
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
                .long_about(
                    "View a Markdown file at different processing stages.\n\n\
                    Views:\n  \
                    - tokens:  Inline token stream (JSON)\n  \
                    - lowered: Text handed to the structural parser\n  \
                    - tree:    Document tree (JSON, default)\n  \
                    - blocks:  Line span of each block in the serialized output (JSON)",
                )
                .arg(
                    Arg::new("input")
                        .help("Input Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("view")
                        .help("Stage to print. Defaults to 'tree'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            inspect::AVAILABLE_VIEWS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();

    let (cleaned_args, mut extra_params) = parse_extra_args(&args);

    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            if cleaned_args.len() > 1
                && !cleaned_args[1].starts_with('-')
                && !matches!(
                    cleaned_args[1].as_str(),
                    "convert" | "roundtrip" | "inspect" | "help"
                )
            {
                let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&cleaned_args[1..]);

                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    let config = load_cli_config(
        matches.get_one::<String>("config").map(|s| s.as_str()),
        &mut extra_params,
    );

    if matches.get_flag("list-formats") {
        handle_list_formats_command(&config);
        return;
    }

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            let Some(input) = sub_matches.get_one::<String>("input") else {
                fail("input is required")
            };
            let Some(to) = sub_matches.get_one::<String>("to") else {
                fail("--to is required")
            };
            let registry = build_registry(&config);

            let from = match sub_matches.get_one::<String>("from") {
                Some(f) => f.to_string(),
                None => match registry.detect_format_from_filename(input) {
                    Some(detected) => detected,
                    None => {
                        eprintln!("Error: Could not detect format from filename '{input}'");
                        eprintln!("Please specify --from explicitly");
                        std::process::exit(1);
                    }
                },
            };

            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_convert_command(&registry, input, &from, to, output, &extra_params);
        }
        Some(("roundtrip", sub_matches)) => {
            let Some(input) = sub_matches.get_one::<String>("input") else {
                fail("input is required")
            };
            let check = sub_matches.get_flag("check");
            handle_roundtrip_command(&config, input, check);
        }
        Some(("inspect", sub_matches)) => {
            let Some(input) = sub_matches.get_one::<String>("input") else {
                fail("input is required")
            };
            let view = sub_matches
                .get_one::<String>("view")
                .map(|s| s.as_str())
                .unwrap_or(inspect::DEFAULT_VIEW);
            handle_inspect_command(&config, input, view);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn read_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

/// Every built-in format, configured from `config`.
fn build_registry(config: &WeaveConfig) -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    registry.register(MarkdownFormat::new(config.pipeline_options()));
    registry.register(HtmlFormat::new(config.html_options()));
    registry.register(JsonFormat::default());
    registry
}

fn handle_convert_command(
    registry: &FormatRegistry,
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    extra_params: &HashMap<String, String>,
) {
    if let Err(e) = registry.get(from) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = registry.get(to) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let source = read_source(input);
    tracing::debug!(input, from, to, "converting");

    let doc = registry.parse(&source, from).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });

    let result = registry
        .serialize_with_options(&doc, to, extra_params)
        .unwrap_or_else(|e| {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        });

    match output {
        Some(path) => {
            fs::write(path, result).unwrap_or_else(|e| {
                eprintln!("Error writing file '{path}': {e}");
                std::process::exit(1);
            });
        }
        None => print!("{result}"),
    }
}

fn handle_roundtrip_command(config: &WeaveConfig, input: &str, check: bool) {
    let source = read_source(input);
    let pipeline = Pipeline::new(config.pipeline_options());
    let result = pipeline.serialize(&pipeline.parse(&source));

    if !check {
        println!("{result}");
        return;
    }

    if let Some((line, expected, actual)) = first_difference(&source, &result) {
        eprintln!("{input}: round trip differs at line {line}");
        eprintln!("- {expected}");
        eprintln!("+ {actual}");
        std::process::exit(1);
    }
}

/// First differing line (1-based) of two texts, ignoring trailing whitespace.
fn first_difference<'a>(left: &'a str, right: &'a str) -> Option<(usize, &'a str, &'a str)> {
    let left = left.trim_end();
    let right = right.trim_end();
    if left == right {
        return None;
    }
    let mut left_lines = left.lines();
    let mut right_lines = right.lines();
    let mut line = 1;
    loop {
        match (left_lines.next(), right_lines.next()) {
            (Some(l), Some(r)) if l == r => line += 1,
            (l, r) => return Some((line, l.unwrap_or(""), r.unwrap_or(""))),
        }
    }
}

fn handle_inspect_command(config: &WeaveConfig, input: &str, view: &str) {
    let source = read_source(input);
    let pipeline = Pipeline::new(config.pipeline_options());

    let output = inspect::execute_view(&pipeline, &source, view).unwrap_or_else(|e| {
        eprintln!("Execution error: {e}");
        std::process::exit(1);
    });

    print!("{output}");
}

fn handle_list_formats_command(config: &WeaveConfig) {
    println!("Available formats:\n");
    let registry = build_registry(config);
    for name in registry.list_formats() {
        let Ok(format) = registry.get(&name) else {
            continue;
        };
        let extensions = format.file_extensions().join(", ");
        println!("  {name:<10} {}  [{extensions}]", format.description());
    }
    println!("\nInspect views:");
    for view in inspect::AVAILABLE_VIEWS {
        println!("  {view}");
    }
}

/// Defaults, then `weave.toml` in the working directory when present, then
/// `--config`, then dotted `--extra-` keys.
fn load_cli_config(
    explicit_path: Option<&str>,
    extra_params: &mut HashMap<String, String>,
) -> WeaveConfig {
    let loader = Loader::new().with_optional_file(PROJECT_CONFIG);
    let mut loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    for (key, value) in take_config_overrides(extra_params) {
        loader = loader.set_override(&key, value).unwrap_or_else(|err| {
            eprintln!("Invalid configuration override '{key}': {err}");
            std::process::exit(1);
        });
    }

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// Removes the dotted keys from `extra_params`, sorted for a stable layering order.
fn take_config_overrides(extra_params: &mut HashMap<String, String>) -> Vec<(String, String)> {
    let keys: Vec<String> = extra_params
        .keys()
        .filter(|key| key.contains('.'))
        .cloned()
        .collect();
    let mut overrides: Vec<(String, String)> = keys
        .into_iter()
        .filter_map(|key| extra_params.remove(&key).map(|value| (key, value)))
        .collect();
    overrides.sort();
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_extra_args_empty() {
        let args = args(&["weave", "inspect", "notes.md"]);
        let (cleaned, extra) = parse_extra_args(&args);

        assert_eq!(cleaned, args);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_parse_extra_args_value_and_flag() {
        let (cleaned, extra) = parse_extra_args(&args(&[
            "weave",
            "notes.md",
            "--extra-title",
            "Notes",
            "--to",
            "html",
            "--extra-standalone",
        ]));

        assert_eq!(cleaned, args(&["weave", "notes.md", "--to", "html"]));
        assert_eq!(extra.get("title"), Some(&"Notes".to_string()));
        assert_eq!(extra.get("standalone"), Some(&"true".to_string()));
    }

    #[test]
    fn test_parse_extra_args_boolean_flag_before_option() {
        let (cleaned, extra) =
            parse_extra_args(&args(&["weave", "--extra-standalone", "--to", "html"]));

        assert_eq!(cleaned, args(&["weave", "--to", "html"]));
        assert_eq!(extra.get("standalone"), Some(&"true".to_string()));
    }

    #[test]
    fn test_parse_extra_args_allows_extras_alias() {
        let (_, extra) = parse_extra_args(&args(&["weave", "--extras-css", "body{}"]));
        assert_eq!(extra.get("css"), Some(&"body{}".to_string()));
    }

    #[test]
    fn test_config_overrides_are_split_from_format_options() {
        let mut extra = HashMap::new();
        extra.insert("markdown.breaks".to_string(), "true".to_string());
        extra.insert("standalone".to_string(), "true".to_string());

        let overrides = take_config_overrides(&mut extra);

        assert_eq!(
            overrides,
            vec![("markdown.breaks".to_string(), "true".to_string())]
        );
        assert_eq!(extra.len(), 1);
        assert!(extra.contains_key("standalone"));
    }

    #[test]
    fn test_dotted_override_reaches_config() {
        let mut extra = HashMap::new();
        extra.insert("markdown.breaks".to_string(), "true".to_string());
        let config = load_cli_config(None, &mut extra);
        assert!(config.markdown.breaks);
    }

    #[test]
    fn test_first_difference_ignores_trailing_whitespace() {
        assert_eq!(first_difference("a\nb\n\n", "a\nb"), None);
        assert_eq!(first_difference("a\nb", "a\nc"), Some((2, "b", "c")));
        assert_eq!(first_difference("a", "a\nb"), Some((2, "", "b")));
    }

    #[test]
    fn test_registry_lists_builtin_formats() {
        let mut extra = HashMap::new();
        let registry = build_registry(&load_cli_config(None, &mut extra));
        assert_eq!(registry.list_formats(), vec!["html", "json", "markdown"]);
    }
}
