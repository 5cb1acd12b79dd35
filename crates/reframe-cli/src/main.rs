use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::App;
use config::AppConfig;

fn cli() -> Command {
    let email = || Arg::new("email").long("email").required(true).help("Account email");
    let password = || {
        Arg::new("password")
            .long("password")
            .env("REFRAME_PASSWORD")
            .required(true)
            .help("Account password")
    };
    let draft = || Arg::new("draft").long("draft").required(true).help("Draft id");
    let photo = || {
        Arg::new("photo")
            .long("photo")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Path to the photo file")
    };

    Command::new("reframe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Before/after transformation photos")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Config file (defaults to the per-user config dir)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("signup")
                .about("Create an account")
                .arg(email())
                .arg(password()),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password")
                .arg(email())
                .arg(password()),
        )
        .subcommand(Command::new("logout").about("Sign out"))
        .subcommand(
            Command::new("reset-password")
                .about("Send a password reset email")
                .arg(email()),
        )
        .subcommand(
            Command::new("oauth-url")
                .about("Print the browser URL for an OAuth sign-in")
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .default_value("google")
                        .help("OAuth provider"),
                )
                .arg(
                    Arg::new("redirect")
                        .long("redirect")
                        .required(true)
                        .help("URL the browser returns to"),
                ),
        )
        .subcommand(
            Command::new("oauth-callback")
                .about("Finish an OAuth sign-in from the redirect URL")
                .arg(Arg::new("url").required(true).help("Redirect URL with tokens")),
        )
        .subcommand(Command::new("init-storage").about("Create the photo bucket if missing"))
        .subcommand(
            Command::new("capture")
                .about("Start a transformation from a before photo")
                .arg(photo()),
        )
        .subcommand(
            Command::new("complete")
                .about("Finish a draft with its after photo")
                .arg(draft())
                .arg(photo()),
        )
        .subcommand(Command::new("drafts").about("List your drafts"))
        .subcommand(
            Command::new("feed")
                .about("List completed transformations")
                .arg(Arg::new("user").long("user").help("Only this user's")),
        )
        .subcommand(Command::new("profile").about("Show your transformations"))
        .subcommand(
            Command::new("show")
                .about("Show one transformation")
                .arg(Arg::new("id").required(true).help("Transformation id")),
        )
        .subcommand(Command::new("delete").about("Delete a draft").arg(draft()))
}

/// Logs go to stderr so `--json` output stays parseable
fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let text = (!json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let json = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

fn arg<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name).map_or("", String::as_str)
}

fn path_arg(args: &ArgMatches, name: &str) -> PathBuf {
    args.get_one::<PathBuf>(name).cloned().unwrap_or_default()
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config = AppConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let app = App::new(config, matches.get_flag("json"))?;

    match matches.subcommand() {
        Some(("signup", args)) => app.sign_up(arg(args, "email"), arg(args, "password")).await,
        Some(("login", args)) => app.login(arg(args, "email"), arg(args, "password")).await,
        Some(("logout", _)) => app.logout().await,
        Some(("reset-password", args)) => app.reset_password(arg(args, "email")).await,
        Some(("oauth-url", args)) => app.oauth_url(arg(args, "provider"), arg(args, "redirect")),
        Some(("oauth-callback", args)) => app.oauth_callback(arg(args, "url")).await,
        Some(("init-storage", _)) => app.init_storage().await,
        Some(("capture", args)) => app.capture(path_arg(args, "photo")).await,
        Some(("complete", args)) => {
            app.complete(arg(args, "draft"), path_arg(args, "photo"))
                .await
        }
        Some(("drafts", _)) => app.drafts().await,
        Some(("feed", args)) => app.feed(args.get_one::<String>("user").map(String::as_str)).await,
        Some(("profile", _)) => app.profile().await,
        Some(("show", args)) => app.show(arg(args, "id")).await,
        Some(("delete", args)) => app.delete(arg(args, "draft")).await,
        _ => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    match run(matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
