use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell as CompShell};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use surge::commands::{inspect, run};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code used when the run completed but thresholds were crossed.
const THRESHOLDS_CROSSED_EXIT_CODE: i32 = 99;

#[derive(Parser)]
#[command(name = "surge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Staged HTTP load testing with thresholds and reports")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load test
    Run {
        /// Scenario file (YAML); the built-in posts scenario is used when omitted
        #[arg(long = "config")]
        config: Option<PathBuf>,
        /// Replace the stages, e.g. --stage 30s:7 --stage 2m:92
        #[arg(long = "stage", action = clap::ArgAction::Append)]
        stages: Vec<String>,
        /// Target URL override
        #[arg(long = "url")]
        url: Option<String>,
        /// HTML report path
        #[arg(long = "html")]
        html: Option<PathBuf>,
        /// Also write the summary as JSON
        #[arg(long = "summary-export")]
        summary_export: Option<PathBuf>,
        /// Progress report interval in CI mode
        #[arg(long = "report-interval", default_value = "10s")]
        report_interval: String,
        /// Do not evaluate thresholds
        #[arg(long = "no-thresholds")]
        no_thresholds: bool,
        /// Plain text summary
        #[arg(long = "no-color")]
        no_color: bool,
        /// CI mode (no animations)
        #[arg(long = "ci")]
        ci: bool,
        /// Skip TLS verification
        #[arg(long = "insecure")]
        insecure: bool,
    },
    /// Validate a scenario and print it fully resolved
    Inspect {
        /// Scenario file (YAML)
        #[arg(long = "config")]
        config: Option<PathBuf>,
        /// Replace the stages, e.g. --stage 30s:7
        #[arg(long = "stage", action = clap::ArgAction::Append)]
        stages: Vec<String>,
    },
    /// Generate shell completions (internal)
    #[command(hide = true)]
    Completions {
        /// Shell: bash, zsh, fish
        shell: String,
    },
    /// Generate man page (internal)
    #[command(hide = true)]
    Man,
}

pub fn print_banner() {
    let banner = r#"
    ███████╗██╗   ██╗██████╗  ██████╗ ███████╗
    ██╔════╝██║   ██║██╔══██╗██╔════╝ ██╔════╝   surge
    ███████╗██║   ██║██████╔╝██║  ███╗█████╗     staged HTTP load testing
    ╚════██║██║   ██║██╔══██╗██║   ██║██╔══╝
    ███████║╚██████╔╝██║  ██║╚██████╔╝███████╗
    ╚══════╝ ╚═════╝ ╚═╝  ╚═╝ ╚═════╝ ╚══════╝
"#;

    if atty::is(atty::Stream::Stdout) {
        println!("{}", banner.cyan());
    } else {
        println!("surge v{}, staged HTTP load testing", env!("CARGO_PKG_VERSION"));
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Run { .. }) {
        print_banner();
    }

    match cli.command {
        Commands::Run {
            config,
            stages,
            url,
            html,
            summary_export,
            report_interval,
            no_thresholds,
            no_color,
            ci,
            insecure,
        } => {
            let result = run::handle_run(run::RunOptions {
                config,
                stages,
                url,
                html,
                summary_export,
                report_interval,
                no_thresholds,
                no_color,
                ci,
                insecure,
            })
            .await;

            if let Err(err) = result {
                if let Some(crossed) = err.downcast_ref::<run::ThresholdsCrossed>() {
                    eprintln!("{} {}", "✖".red().bold(), crossed);
                    std::process::exit(THRESHOLDS_CROSSED_EXIT_CODE);
                }
                return Err(err);
            }
        }
        Commands::Inspect { config, stages } => {
            inspect::handle_inspect(config, stages).await?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            let sh = match shell.as_str() {
                "bash" => CompShell::Bash,
                "zsh" => CompShell::Zsh,
                "fish" => CompShell::Fish,
                "powershell" | "pwsh" => CompShell::PowerShell,
                "elvish" => CompShell::Elvish,
                other => {
                    eprintln!(
                        "Unsupported shell: {} (use bash|zsh|fish|powershell|elvish)",
                        other
                    );
                    std::process::exit(2);
                }
            };
            generate(sh, &mut cmd, name, &mut std::io::stdout());
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            man.render(&mut std::io::stdout())?;
        }
    }

    Ok(())
}
