use std::path::PathBuf;
use std::sync::Arc;
use std::{env, fs};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use oaish_api::ApiClient;
use oaish_engine::{
    Catalog, Session, check_response_field, command_params, complete_targets, flag_for, load_config, parse_document, parse_flag_args,
    render_response, suggest_parameters,
};
use oaish_types::{CommandConfig, ShellConfig};
use oaish_util::{infer_str, resolve_data};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Bearer token used when `--token` is not given.
const TOKEN_ENV: &str = "OAISH_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    match matches.subcommand() {
        Some(("state", sub)) => run_state(&config, sub),
        Some(("commands", _)) => {
            print!("{}", format_commands(&config));
            Ok(())
        }
        Some((name, sub)) => {
            let mut shell = Shell::open(&matches, config).await?;
            shell.dispatch(name, sub).await
        }
        None => Ok(()),
    }
}

fn init_tracing() {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    let passthrough = || {
        Arg::new("args")
            .num_args(0..)
            .trailing_var_arg(true)
            .allow_hyphen_values(true)
            .help("Positional values and --name value parameters")
    };
    let dry_run = || {
        Arg::new("dry-run")
            .long("dry-run")
            .action(ArgAction::SetTrue)
            .help("Print the request instead of sending it")
    };
    let raw = || {
        Arg::new("raw")
            .long("raw")
            .action(ArgAction::SetTrue)
            .help("Also print the raw JSON response")
    };
    let stream = || {
        Arg::new("stream")
            .long("stream")
            .action(ArgAction::SetTrue)
            .help("Print the response line by line as it arrives")
    };

    Command::new("oaish")
        .about("Discover an OpenAPI service and call its operations")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the YAML config (defaults to $OAISH_CONFIG_PATH)"),
        )
        .arg(Arg::new("base-url").long("base-url").global(true).help("Override the API base URL"))
        .arg(Arg::new("token").long("token").global(true).help("Bearer token (defaults to $OAISH_TOKEN)"))
        .arg(
            Arg::new("spec")
                .long("spec")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Read the API description from a local JSON/YAML file instead of discovering it"),
        )
        .subcommand(
            Command::new("operations")
                .about("List cataloged operations")
                .arg(Arg::new("tag").long("tag").help("Only operations with this tag")),
        )
        .subcommand(
            Command::new("params")
                .about("List the inputs of an operation")
                .arg(Arg::new("operation").required(true)),
        )
        .subcommand(
            Command::new("call")
                .about("Call an operation by operationId")
                .arg(Arg::new("operation").required(true))
                .arg(dry_run())
                .arg(raw())
                .arg(stream())
                .arg(passthrough()),
        )
        .subcommand(Command::new("commands").about("List configured commands"))
        .subcommand(
            Command::new("run")
                .about("Run a configured command")
                .arg(Arg::new("command").required(true))
                .arg(dry_run())
                .arg(raw())
                .arg(stream())
                .arg(passthrough()),
        )
        .subcommand(
            Command::new("state")
                .about("Show or edit session state")
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true).allow_hyphen_values(true)),
                ),
        )
        .subcommand(
            Command::new("complete")
                .about("Print completion candidates for a partial invocation")
                .arg(Arg::new("words").num_args(0..).trailing_var_arg(true).allow_hyphen_values(true)),
        )
}

/// How a call is carried out and printed.
#[derive(Debug, Clone, Copy, Default)]
struct CallMode {
    dry_run: bool,
    raw: bool,
    stream: bool,
}

impl CallMode {
    /// Reads the mode switches from the subcommand, or from `--name` words left in `flags`.
    fn take(matches: &ArgMatches, flags: &mut Map<String, Value>) -> Self {
        let mut switch = |name: &str| matches.get_flag(name) | flags.remove(name).is_some();
        Self {
            dry_run: switch("dry-run"),
            raw: switch("raw"),
            stream: switch("stream"),
        }
    }
}

struct Shell {
    config: ShellConfig,
    client: Option<ApiClient>,
    session: Session,
}

impl Shell {
    async fn open(matches: &ArgMatches, config: ShellConfig) -> Result<Self> {
        let base_url = matches
            .get_one::<String>("base-url")
            .cloned()
            .or_else(|| config.base_url.clone());
        let token = matches
            .get_one::<String>("token")
            .cloned()
            .or_else(|| env::var(TOKEN_ENV).ok());
        let client = base_url
            .as_deref()
            .map(|url| ApiClient::new(url, token))
            .transpose()?;

        let document = match matches.get_one::<PathBuf>("spec") {
            Some(path) => {
                let text = fs::read_to_string(path).with_context(|| format!("read API description {}", path.display()))?;
                parse_document(&text).with_context(|| format!("parse API description {}", path.display()))?
            }
            None => {
                let client = client
                    .as_ref()
                    .ok_or_else(|| anyhow!("No base_url provided in config or arguments"))?;
                client.discover(&config.openapi_url).await?
            }
        };

        let catalog = Catalog::from_document(document);
        info!(operations = catalog.len(), prefix = %catalog.common_prefix(), "catalog ready");
        let session = Session::from_config(catalog, &config.state)?;
        Ok(Self { config, client, session })
    }

    async fn dispatch(&mut self, name: &str, matches: &ArgMatches) -> Result<()> {
        match name {
            "operations" => {
                self.list_operations(matches.get_one::<String>("tag").map(String::as_str));
                Ok(())
            }
            "params" => self.list_params(required_arg(matches, "operation")?),
            "call" => {
                let operation_id = required_arg(matches, "operation")?.to_string();
                let (mut flags, positional) = parse_flag_args(&trailing_args(matches));
                let mode = CallMode::take(matches, &mut flags);
                if !positional.is_empty() {
                    warn!(ignored = ?positional, "positional arguments are only used by configured commands");
                }
                let hooks = self.config.command_for_operation(&operation_id).cloned();
                self.execute(&operation_id, flags, None, hooks.as_ref(), mode).await
            }
            "run" => {
                let name = required_arg(matches, "command")?;
                let command = self
                    .find_command(name)
                    .cloned()
                    .ok_or_else(|| anyhow!("unknown command '{name}'"))?;
                let (mut flags, positional) = parse_flag_args(&trailing_args(matches));
                let mode = CallMode::take(matches, &mut flags);
                let params = command_params(&self.session.assembler(), &command, &positional, flags);
                let operation_id = command.operation_id.clone();
                self.execute(&operation_id, params, Some(&command), Some(&command), mode).await
            }
            "complete" => {
                let words: Vec<String> = matches.get_many::<String>("words").map(|values| values.cloned().collect()).unwrap_or_default();
                self.complete(&words);
                Ok(())
            }
            other => bail!("unsupported subcommand '{other}'"),
        }
    }

    fn client(&self) -> Result<&ApiClient> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("No base_url provided in config or arguments"))
    }

    fn find_command(&self, name: &str) -> Option<&CommandConfig> {
        self.config
            .commands
            .get(name)
            .or_else(|| self.config.commands.get(&format!("/{name}")))
    }

    fn list_operations(&self, tag: Option<&str>) {
        let catalog = self.session.catalog();
        if !catalog.common_prefix().is_empty() {
            println!("Paths relative to {}", catalog.common_prefix());
        }
        for operation in catalog.operations() {
            if tag.is_some_and(|tag| !operation.tags.iter().any(|candidate| candidate == tag)) {
                continue;
            }
            println!(
                "{:<7} {:<40} {}  {}",
                operation.method,
                operation.display_path,
                operation.operation_id,
                operation.summary.as_deref().unwrap_or("")
            );
        }
    }

    fn list_params(&self, operation_id: &str) -> Result<()> {
        let catalog = self.session.catalog();
        if !catalog.contains(operation_id) {
            bail!("unknown operation '{operation_id}'");
        }
        for param in catalog.params_for_operation(operation_id) {
            println!(
                "{:<32} {:<7} {:<8} {}",
                flag_for(&param),
                param.location.as_str(),
                param.param_type,
                if param.required { "required" } else { "" }
            );
        }
        Ok(())
    }

    /// Runs one call. `command` drives validation and rendering; `hooks` supplies the
    /// `after_call` extraction, which also applies to plain `call` of a bound operation.
    async fn execute(
        &mut self,
        operation_id: &str,
        params: Map<String, Value>,
        command: Option<&CommandConfig>,
        hooks: Option<&CommandConfig>,
        mode: CallMode,
    ) -> Result<()> {
        let catalog = Arc::clone(self.session.catalog());
        let operation = catalog
            .get(operation_id)
            .ok_or_else(|| anyhow!("unknown operation '{operation_id}'"))?;
        if let Some(command) = command {
            check_response_field(&catalog, command).context("use force_response_field: true to override")?;
        }

        let assembly = self.session.prepare_call(operation_id, params);
        for key in &assembly.autofilled {
            eprintln!("Autofilled from state: {key}");
        }

        let client = self.client()?;
        if mode.dry_run {
            println!("{}", serde_json::to_string_pretty(&client.preview(operation, &assembly.payload))?);
            return Ok(());
        }
        if mode.stream {
            println!("Streaming response:");
            client
                .stream_lines(operation, &assembly.payload, |line| println!("{line}"))
                .await?;
            return Ok(());
        }
        let response = client.call(operation, &assembly.payload).await?;

        if let Some(field) = command.and_then(|command| command.default_response_field.as_deref())
            && resolve_data(&response.body, field).is_none()
        {
            warn!(field, "field not found in the response payload; showing the full response");
        }
        println!("{}", render_response(&response.body, command));
        if mode.raw {
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }

        if let Some(hooks) = hooks {
            for key in self.session.apply_after_call(hooks, &response.body)? {
                eprintln!("State updated: {key}");
            }
        }
        Ok(())
    }

    /// First word completes a command or operation; later words complete `--param` flags.
    fn complete(&self, words: &[String]) {
        let catalog = self.session.catalog();
        let Some((target, rest)) = words.split_first().filter(|(_, rest)| !rest.is_empty()) else {
            let prefix = words.first().map(String::as_str).unwrap_or("");
            for candidate in complete_targets(catalog, &self.config, prefix) {
                println!("{candidate}");
            }
            return;
        };

        let operation_id = self
            .find_command(target)
            .map(|command| command.operation_id.as_str())
            .unwrap_or(target.as_str());
        let (partial, typed) = rest.split_last().map(|(last, typed)| (last.as_str(), typed)).unwrap_or(("", &[]));
        let supplied: Vec<&str> = typed.iter().filter_map(|word| word.strip_prefix("--")).collect();
        for param in suggest_parameters(catalog, operation_id, &supplied, partial) {
            println!("{}", flag_for(&param));
        }
    }
}

/// Configured commands as aligned `name  operationId  description` rows.
fn format_commands(config: &ShellConfig) -> String {
    if config.commands.is_empty() {
        return "No commands configured\n".to_string();
    }
    let name_width = config.commands.keys().map(String::len).max().unwrap_or(0);
    let operation_width = config
        .commands
        .values()
        .map(|command| command.operation_id.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (name, command) in &config.commands {
        let line = format!(
            "{name:<name_width$}  {:<operation_width$}  {}",
            command.operation_id,
            command.description.as_deref().unwrap_or("")
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn run_state(config: &ShellConfig, matches: &ArgMatches) -> Result<()> {
    let mut session = Session::from_config(Catalog::default(), &config.state)?;
    match matches.subcommand() {
        Some(("get", sub)) => {
            let key = required_arg(sub, "key")?;
            let value = session.state().lookup(key).cloned().unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Some(("set", sub)) => {
            let key = required_arg(sub, "key")?;
            let value = parse_state_value(required_arg(sub, "value")?);
            session.state_mut().set(key, value)?;
        }
        _ => println!("{}", serde_json::to_string_pretty(&session.state().to_value())?),
    }
    Ok(())
}

/// JSON text is stored as parsed; anything else goes through primitive inference.
fn parse_state_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| infer_str(text))
}

fn required_arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument '{name}'"))
}

fn trailing_args(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("args")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}
