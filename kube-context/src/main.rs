use std::{env, ffi::OsString, process};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::engine::{ArgValueCandidates, CompletionCandidate};
use clap_complete::CompleteEnv;
use console::style;
use log::debug;

use rustkube::shell::{launch_shell, ShellOptions, TempKubeConfig};
use rustkube::switch::{
    apply_context, check_flags, filtered_context_names, select_context, DialoguerPicker, Mode,
};
use rustkube::{kube_dir, PathOptions, KUBECONFIG_ENV};

/// Exit status for every failure, usage errors included.
const FAILURE: i32 = 1;

const EXAMPLES: &str = "Examples:
  # to select the context to switch to
  kube-context

  # switch straight to a context
  kube-context prod

  # view the current context
  kube-context -b

  # work on a context in a subshell without changing it anywhere else
  kube-context -s prod";

/// View or change the current Kubernetes context (Kubernetes cluster)
#[derive(Parser, Debug)]
#[command(
    name = "kube-context",
    version,
    long_about = "Displays or changes the current Kubernetes context (cluster).",
    after_help = EXAMPLES
)]
struct Cli {
    /// Context to switch to
    #[arg(value_name = "CONTEXT", add = ArgValueCandidates::new(context_candidates))]
    context: Option<String>,

    /// Filter the list of contexts to switch between using the given text
    #[arg(short, long, default_value = "")]
    filter: String,

    /// Run without prompting; only switches when a context is given
    #[arg(short, long)]
    batch: bool,

    /// Start shell with chosen context
    #[arg(short, long)]
    shell: bool,

    /// Kube config files to use, separated like PATH
    #[arg(long, env = "KUBECONFIG", value_name = "PATHS")]
    kubeconfig: Option<OsString>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn path_options(&self) -> PathOptions {
        PathOptions::new(self.kubeconfig.as_deref(), kube_dir().as_deref())
    }
}

/// The command line being completed, as the completion script passes it after
/// `--`, cut off before the word under the cursor.
fn completion_words(args: Vec<OsString>, index: Option<usize>) -> Vec<OsString> {
    let mut words: Vec<OsString> = args
        .into_iter()
        .skip_while(|arg| arg != "--")
        .skip(1)
        .collect();
    let current = index.unwrap_or(words.len().saturating_sub(1));
    words.truncate(current);
    words
}

/// Filter and config location typed so far on the line being completed.
fn completion_scope() -> (String, PathOptions) {
    let index = env::var("_CLAP_COMPLETE_INDEX")
        .ok()
        .and_then(|index| index.parse().ok());
    let words = completion_words(env::args_os().collect(), index);
    match Cli::try_parse_from(&words) {
        Ok(cli) => {
            let paths = cli.path_options();
            (cli.filter, paths)
        }
        Err(err) => {
            debug!("Completing without flags: {err}");
            let env_value = env::var_os(KUBECONFIG_ENV);
            let paths = PathOptions::new(env_value.as_deref(), kube_dir().as_deref());
            (String::new(), paths)
        }
    }
}

fn context_candidates() -> Vec<CompletionCandidate> {
    let (filter, paths) = completion_scope();
    match paths
        .load()
        .and_then(|config| filtered_context_names(&config, &filter))
    {
        Ok(names) => names.into_iter().map(CompletionCandidate::new).collect(),
        Err(err) => {
            // A failed run makes the completion script discard every candidate.
            debug!("No completions: {err}");
            process::exit(FAILURE);
        }
    }
}

fn main() -> Result<()> {
    CompleteEnv::with_factory(Cli::command).complete();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            process::exit(FAILURE);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();
    debug!("CLI args: {:?}", cli);

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let mode = Mode::from_batch(cli.batch);
    check_flags(mode, cli.shell)?;

    let mut paths = cli.path_options();

    // From here on only the copy is read and written.
    let temp = if cli.shell {
        let temp = TempKubeConfig::create(&paths, &env::temp_dir())?;
        paths = temp.path_options();
        Some(temp)
    } else {
        None
    };

    let config = paths.load()?;
    let names = filtered_context_names(&config, &cli.filter)?;
    debug!("Candidate contexts: {:?}", names);

    let chosen = select_context(
        &names,
        cli.context.as_deref(),
        mode,
        &config.current_context,
        &DialoguerPicker,
    )?;

    let report = apply_context(&config, &paths, &chosen)?;
    println!("{}", report.render(|value| style(value).green().to_string()));

    if let Some(temp) = temp {
        let shell = ShellOptions::new(env::var("SHELL").ok());
        launch_shell(&shell, temp.path())?;
        temp.cleanup();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(words: &[&str]) -> Vec<OsString> {
        words.iter().map(OsString::from).collect()
    }

    #[test]
    fn completion_words_drop_the_current_word() {
        let args = os(&["/bin/kube-context", "--", "kube-context", "-f", "pr", ""]);
        assert_eq!(
            completion_words(args.clone(), Some(3)),
            os(&["kube-context", "-f", "pr"])
        );
        assert_eq!(completion_words(args, None), os(&["kube-context", "-f", "pr"]));
    }

    #[test]
    fn completion_words_need_the_separator() {
        assert!(completion_words(os(&["kube-context", "prod"]), Some(1)).is_empty());
    }

    #[test]
    fn recovered_words_parse_into_filter() {
        let words = os(&["kube-context", "--filter", "pr", "-b"]);
        let cli = Cli::try_parse_from(&words).unwrap();
        assert_eq!(cli.filter, "pr");
        assert!(cli.batch);
    }
}
