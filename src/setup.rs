//! `config` subcommands: interactive setup and file management.

use crate::config::{write_private, Config, ENV_FORMAT, ENV_HOME_ID, ENV_TOKEN, TEMPLATE};
use crate::output::OutputFormat;
use crate::ConfigCommand;
use colored::Colorize;
use powerctl_client::{mask_token, GraphQlClient};
use powerctl_protocol::{Home, GRAPHQL_ENDPOINT};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config as EditorConfig, Editor};
use std::error::Error;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

const TOKEN_URL: &str = "https://developer.tibber.com/settings/access-token";

/// Editors tried, in order, when neither `EDITOR` nor `VISUAL` is set.
const FALLBACK_EDITORS: [&str; 3] = ["vim", "nano", "vi"];

/// Executes a `config` subcommand against the file at `explicit` or the default path.
pub async fn execute(
    explicit: Option<&Path>,
    cmd: ConfigCommand,
) -> Result<String, Box<dyn Error>> {
    let path = Config::resolve_path(explicit)?;
    let env = |key: &str| std::env::var(key).ok();

    match cmd {
        ConfigCommand::Init => {
            let mut prompt = LinePrompt::new()?;
            init(&path, &mut prompt, &mut io::stdout(), GRAPHQL_ENDPOINT).await
        }
        ConfigCommand::Show => show(&path, env),
        ConfigCommand::Path => Ok(path.display().to_string()),
        ConfigCommand::Set { key, value } => set(&path, &key, &value),
        ConfigCommand::Edit => edit(&path, find_editor(env, Path::new("/usr/bin"))),
    }
}

/// Source of answers for interactive setup.
pub trait Prompt {
    /// Shows `prompt` and returns the trimmed answer.
    fn ask(&mut self, prompt: &str) -> Result<String, Box<dyn Error>>;
}

/// Terminal prompt backed by rustyline.
struct LinePrompt {
    editor: Editor<(), DefaultHistory>,
}

impl LinePrompt {
    fn new() -> Result<Self, ReadlineError> {
        let config = EditorConfig::builder().auto_add_history(false).build();
        Ok(Self {
            editor: Editor::with_config(config)?,
        })
    }
}

impl Prompt for LinePrompt {
    fn ask(&mut self, prompt: &str) -> Result<String, Box<dyn Error>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(line.trim().to_string()),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                Err("Setup cancelled".into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn init<P: Prompt, W: Write>(
    path: &Path,
    prompt: &mut P,
    out: &mut W,
    endpoint: &str,
) -> Result<String, Box<dyn Error>> {
    writeln!(out, "{}", "Tibber CLI Configuration Setup".bold().cyan())?;
    writeln!(out, "{}\n", "=".repeat(30).dimmed())?;
    writeln!(out, "Get your API token from: {}\n", TOKEN_URL)?;
    out.flush()?;

    let token = prompt.ask("Enter your Tibber API token: ")?;
    if token.is_empty() {
        return Err("Token is required".into());
    }

    writeln!(out, "\nValidating token...")?;
    out.flush()?;
    let client = GraphQlClient::with_endpoint(&token, endpoint)?;
    let homes = client
        .homes()
        .await
        .map_err(|e| format!("Invalid token: {}", e))?;
    writeln!(out, "Found {} home(s)\n", homes.len())?;

    let home_id = match homes.as_slice() {
        [] => None,
        [only] => Some(only.id.clone()),
        many => {
            writeln!(out, "Select default home:")?;
            for (i, home) in many.iter().enumerate() {
                let pulse = if home.is_live_capable() { " [Pulse]" } else { "" };
                writeln!(out, "  {}) {}{}", i + 1, home.title(), pulse)?;
            }
            writeln!(out)?;
            out.flush()?;
            let choice = prompt.ask("Enter number (or press Enter to skip): ")?;
            pick_home(many, &choice).map(|home| home.id.clone())
        }
    };

    let answer = prompt.ask("Default output format (pretty/json/markdown) [pretty]: ")?;
    let format: OutputFormat = answer.parse()?;

    let config = Config {
        token: Some(token),
        home_id,
        format,
    };
    config.save(path)?;
    tracing::debug!("Wrote config to {}", path.display());

    Ok(format!(
        "\n{} {}\n\nYou can now use the CLI:\n  \
         powerctl home     - View your home info\n  \
         powerctl prices   - View electricity prices\n  \
         powerctl live     - Stream live power data",
        "Configuration saved to".green(),
        path.display()
    ))
}

/// Maps a 1-based menu answer to a home. Blank or out of range means none.
fn pick_home<'a>(homes: &'a [Home], choice: &str) -> Option<&'a Home> {
    let index: usize = choice.trim().parse().ok()?;
    index.checked_sub(1).and_then(|i| homes.get(i))
}

fn show<F>(path: &Path, env: F) -> Result<String, Box<dyn Error>>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        return Ok(format!(
            "No configuration file found.\n\n\
             Run 'powerctl config init' to create one, or set {} environment variable.",
            ENV_TOKEN
        ));
    }

    let config = Config::from_file(path)?;
    let mut out = format!("Configuration file: {}\n\n", path.display());
    if let Some(token) = config.masked_token() {
        let _ = writeln!(out, "  token: {}", token);
    }
    if let Some(home_id) = config.home_id.as_deref() {
        let _ = writeln!(out, "  home_id: {}", home_id);
    }
    let _ = writeln!(out, "  format: {}", config.format);

    let overrides: Vec<String> = [ENV_TOKEN, ENV_HOME_ID, ENV_FORMAT]
        .into_iter()
        .filter_map(|key| {
            let value = env(key).filter(|v| !v.is_empty())?;
            let shown = if key == ENV_TOKEN {
                mask_token(&value)
            } else {
                value
            };
            Some(format!("  {}: {}", key, shown))
        })
        .collect();
    if !overrides.is_empty() {
        let _ = write!(out, "\nEnvironment overrides:\n{}", overrides.join("\n"));
    }

    Ok(out.trim_end().to_string())
}

/// Updates one key in the file, leaving environment overrides out of it.
fn set(path: &Path, key: &str, value: &str) -> Result<String, Box<dyn Error>> {
    let mut config = Config::from_file_or_default(path)?;
    config.set(key, value)?;
    config.save(path)?;
    Ok(format!("Set {} in {}", key, path.display()))
}

fn edit(path: &Path, editor: Option<String>) -> Result<String, Box<dyn Error>> {
    if !path.exists() {
        write_private(path, TEMPLATE.as_bytes())?;
        tracing::debug!("Created config template at {}", path.display());
    }

    let Some(editor) = editor else {
        return Ok(format!(
            "Config file location: {}\n\
             No editor found. Set EDITOR environment variable or edit the file manually.",
            path.display()
        ));
    };

    // EDITOR may carry arguments, e.g. "code --wait".
    let mut parts = editor.split_whitespace();
    let program = parts.next().ok_or("EDITOR is empty")?;
    eprintln!("Opening {} with {}", path.display(), editor);

    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| format!("Failed to launch {}: {}", editor, e))?;
    if !status.success() {
        return Err(format!("{} exited with {}", editor, status).into());
    }

    Config::from_file(path)?;
    Ok(String::new())
}

/// `EDITOR`, then `VISUAL`, then the first fallback editor present in `search_dir`.
fn find_editor<F>(env: F, search_dir: &Path) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env("EDITOR")
        .filter(|e| !e.trim().is_empty())
        .or_else(|| env("VISUAL").filter(|e| !e.trim().is_empty()))
        .or_else(|| {
            FALLBACK_EDITORS
                .into_iter()
                .find(|name| search_dir.join(name).exists())
                .map(str::to_string)
        })
}
