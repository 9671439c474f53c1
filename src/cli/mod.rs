// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::core::constants::{CONFIG_INPUT_KEY, CONFIG_OUTPUT_KEY, CONFIG_UGLIFY_KEY, DEFAULT_CONFIG_FILE};
use crate::error::{CompilerError, Result};
use crate::{ConfigMap, ProjectOptions};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum};
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct Cli;

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

impl Cli {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self) -> Result<()> {
        self.run_from(std::env::args_os())
    }

    pub fn run_from<I, T>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.build_cli().get_matches_from(args);
        self.setup_logging(matches.get_count("verbose"));

        let options = self.build_project_options(&matches)?;
        match matches.subcommand() {
            Some(("compile", sub_matches)) => handlers::handle_compile_command(options, sub_matches),
            Some(("watch", _)) => handlers::handle_watch_command(options),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        }
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (JSON or TOML)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .arg(Arg::new("define").short('D').long("define").value_name("KEY=VALUE").help("Set a configuration value").action(ArgAction::Append))
            .arg(Arg::new("input").long("input").value_name("DIR").help("Input root directory"))
            .arg(Arg::new("output").long("output").value_name("DIR").help("Output root directory"))
            .arg(Arg::new("uglify").long("uglify").help("Minify every written file").action(ArgAction::SetTrue))
            .subcommand(
                Command::new("compile")
                    .about("Compile the input tree once")
                    .arg(Arg::new("stats").long("stats").help("Show detailed compilation statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("text").help("Statistics output format")),
            )
            .subcommand(Command::new("watch").about("Compile, then recompile whenever the input tree changes"))
    }

    fn setup_logging(&self, verbose_count: u8) {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
    }

    /// Merge the config file with command-line overrides. Paths from the
    /// config file are relative to its directory; paths given on the command
    /// line are relative to the working directory.
    pub fn build_project_options(&self, matches: &ArgMatches) -> Result<ProjectOptions> {
        let explicit = matches.get_one::<String>("config").map(PathBuf::from);
        let config_path = explicit.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if explicit.is_some() || config_path.is_file() {
            config::load(&config_path)?
        } else {
            log::debug!("No {} found, using command-line settings only", DEFAULT_CONFIG_FILE);
            ConfigMap::new()
        };
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut input = path_setting(&config, CONFIG_INPUT_KEY).map(|p| base_dir.join(p));
        let mut output = path_setting(&config, CONFIG_OUTPUT_KEY).map(|p| base_dir.join(p));

        if let Some(defines) = matches.get_many::<String>("define") {
            for define in defines {
                let (key, value) = config::parse_define(define)?;
                config.insert(key, value);
            }
        }
        if let Some(dir) = matches.get_one::<String>("input") {
            config.insert(CONFIG_INPUT_KEY.to_string(), Value::String(dir.clone()));
            input = Some(PathBuf::from(dir));
        }
        if let Some(dir) = matches.get_one::<String>("output") {
            config.insert(CONFIG_OUTPUT_KEY.to_string(), Value::String(dir.clone()));
            output = Some(PathBuf::from(dir));
        }
        if matches.get_flag("uglify") {
            config.insert(CONFIG_UGLIFY_KEY.to_string(), Value::Bool(true));
        }

        let input = input.ok_or_else(|| {
            CompilerError::config(format!("No input directory: set \"input\" in {} or pass --input", config_path.display()))
        })?;
        let output = output.ok_or_else(|| {
            CompilerError::config(format!("No output directory: set \"output\" in {} or pass --output", config_path.display()))
        })?;

        Ok(ProjectOptions::new(input, output).with_config(config))
    }
}

fn path_setting(config: &ConfigMap, key: &str) -> Option<PathBuf> {
    config.get(key).and_then(Value::as_str).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn options(args: &[&str]) -> Result<ProjectOptions> {
        let cli = Cli::new();
        let matches = cli
            .build_cli()
            .try_get_matches_from(std::iter::once("transcend").chain(args.iter().copied()))
            .unwrap();
        cli.build_project_options(&matches)
    }

    #[test]
    fn test_config_paths_resolve_against_config_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("transcend.json");
        fs::write(&config_path, r#"{"input": "src", "output": "build", "debug": false}"#).unwrap();

        let options = options(&["-c", config_path.to_str().unwrap(), "compile"]).unwrap();
        assert_eq!(options.input, temp_dir.path().join("src"));
        assert_eq!(options.output, temp_dir.path().join("build"));
        assert_eq!(options.config.get("debug"), Some(&json!(false)));
    }

    #[test]
    fn test_command_line_overrides_win() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("transcend.toml");
        fs::write(&config_path, "input = \"src\"\noutput = \"build\"\ndebug = false\n").unwrap();

        let options = options(&[
            "-c",
            config_path.to_str().unwrap(),
            "-D",
            "debug=true",
            "-D",
            "target=web",
            "--output",
            "dist",
            "--uglify",
            "watch",
        ])
        .unwrap();

        assert_eq!(options.input, temp_dir.path().join("src"));
        assert_eq!(options.output, PathBuf::from("dist"));
        assert_eq!(options.config.get("debug"), Some(&json!(true)));
        assert_eq!(options.config.get("target"), Some(&json!("web")));
        assert_eq!(options.config.get("uglify"), Some(&json!(true)));
    }

    #[test]
    fn test_missing_output_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("transcend.json");
        fs::write(&config_path, r#"{"input": "src"}"#).unwrap();

        let err = options(&["-c", config_path.to_str().unwrap(), "compile"]).unwrap_err();
        assert!(matches!(err, CompilerError::Config { .. }));
    }

    #[test]
    fn test_explicit_missing_config_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("absent.json");
        let err = options(&["-c", config_path.to_str().unwrap(), "--input", "a", "--output", "b", "compile"]).unwrap_err();
        assert!(matches!(err, CompilerError::FileNotFound { .. }));
    }

    #[test]
    fn test_compile_format_flag() {
        let matches = Cli::new()
            .build_cli()
            .try_get_matches_from(["transcend", "compile", "--stats", "--format", "json"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "compile");
        assert!(sub.get_flag("stats"));
        assert!(matches!(sub.get_one::<OutputFormat>("format"), Some(OutputFormat::Json)));
    }
}
