//! `guest-portal`: drive a guest portal session from the terminal

mod logging;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use portal_core::prelude::*;
use portal_core::{MutationOutcome, PortalSession};
use portal_model::{Section, SectionCompletion};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "guest-portal.toml";

fn build_cli() -> Command {
    let token = Arg::new("token")
        .long("token")
        .short('t')
        .required(true)
        .help("Guest access token");

    Command::new("guest-portal")
        .version(portal_core::VERSION)
        .about("Guest portal synchronization client")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_CONFIG_PATH)
                .help("Path to the TOML configuration file"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("Backend origin; overrides config and environment"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("status")
                .about("Show section completion for a guest")
                .arg(token.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("rsvp")
                .about("Answer the invitation")
                .arg(token.clone())
                .arg(
                    Arg::new("status")
                        .long("status")
                        .required(true)
                        .value_parser(value_parser!(RsvpStatus))
                        .help("confirmed, declined or maybe"),
                )
                .arg(
                    Arg::new("attendees")
                        .long("attendees")
                        .value_parser(value_parser!(u32))
                        .help("Number of attendees (defaults to 1)"),
                )
                .arg(
                    Arg::new("requests")
                        .long("requests")
                        .help("Special requests"),
                ),
        )
        .subcommand(
            Command::new("activity")
                .about("Change registration for one activity")
                .arg(token)
                .arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Activity id"),
                )
                .arg(
                    Arg::new("action")
                        .long("action")
                        .value_parser(["register", "unregister", "toggle"])
                        .default_value("toggle")
                        .help("What to do with the registration"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or create the configuration file")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(
                    Command::new("init")
                        .about("Write a default configuration file")
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .action(ArgAction::SetTrue)
                                .help("Overwrite an existing file"),
                        ),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<(PathBuf, PortalConfig)> {
    let path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = PortalConfig::load_or_default(&path)
        .with_context(|| format!("loading {}", path.display()))?
        .apply_env()?;
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.gateway.base_url.clone_from(base_url);
    }
    config.validate()?;
    Ok((path, config))
}

async fn open_session(
    config: &PortalConfig,
    args: &ArgMatches,
) -> Result<Arc<PortalSession<HttpGateway>>> {
    let token = args
        .get_one::<String>("token")
        .map(GuestToken::new)
        .context("missing --token")?;
    let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
    let registry = SessionRegistry::new(gateway, config);
    let session = registry
        .open(&token)
        .await
        .with_context(|| format!("loading portal for {token}"))?;
    Ok(session)
}

fn render_completion(completion: &SectionCompletion) -> String {
    let mut out = format!(
        "Progress: {}/{}\n",
        completion.completed_count(),
        completion.total()
    );
    for (section, done) in completion.sections() {
        let mark = if done { "x" } else { " " };
        let _ = writeln!(out, "  [{mark}] {section}");
    }
    out
}

fn report<T>(outcome: &MutationOutcome<T>, session: &PortalSession<HttpGateway>) {
    match &outcome.refresh {
        Ok(_) => println!("Saved {}.", outcome.kind),
        Err(err) => println!("Saved {}, but reloading failed: {err}", outcome.kind),
    }
    if let Some(completion) = session.store().completion() {
        print!("{}", render_completion(&completion));
    }
}

async fn run(matches: ArgMatches) -> Result<()> {
    let (path, config) = load_config(&matches)?;
    debug!(path = %path.display(), base_url = %config.gateway.base_url, "configuration ready");

    match matches.subcommand() {
        Some(("status", args)) => {
            let session = open_session(&config, args).await?;
            let store = session.store();
            let aggregate = store.aggregate().context("no portal data")?;
            let completion = store.completion().unwrap_or_default();
            if args.get_flag("json") {
                let body = serde_json::json!({
                    "guest": aggregate.guest.full_name(),
                    "rsvp_status": aggregate.guest.rsvp_status,
                    "status": store.status(),
                    "completion": completion,
                    "missing": Section::ALL
                        .iter()
                        .filter(|section| !completion.get(**section))
                        .map(ToString::to_string)
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!(
                    "{} ({})",
                    aggregate.guest.full_name(),
                    aggregate.guest.rsvp_status
                );
                print!("{}", render_completion(&completion));
            }
        }
        Some(("rsvp", args)) => {
            let session = open_session(&config, args).await?;
            let status = *args
                .get_one::<RsvpStatus>("status")
                .context("missing --status")?;
            let mut input = RsvpInput::new(status);
            input.number_of_attendees = args.get_one::<u32>("attendees").copied();
            input.special_requests = args.get_one::<String>("requests").cloned();
            let outcome = session.orchestrator().update_rsvp(&input).await?;
            report(&outcome, &session);
        }
        Some(("activity", args)) => {
            let session = open_session(&config, args).await?;
            let id = ActivityId(*args.get_one::<i64>("id").context("missing --id")?);
            let orchestrator = session.orchestrator();
            let outcome = match args.get_one::<String>("action").map(String::as_str) {
                Some("register") => orchestrator.register_activity(id).await?,
                Some("unregister") => orchestrator.unregister_activity(id).await?,
                _ => orchestrator.toggle_activity(id).await?,
            };
            let state = if outcome.confirmed.is_registered {
                "registered"
            } else {
                "not registered"
            };
            println!("Activity {id}: {state}");
            report(&outcome, &session);
        }
        Some(("config", args)) => match args.subcommand() {
            Some(("show", _)) => print!("{}", config.to_toml_string()?),
            Some(("init", init)) => {
                if path.exists() && !init.get_flag("force") {
                    bail!("{} already exists; pass --force to overwrite", path.display());
                }
                PortalConfig::default().save(&path)?;
                println!("Wrote {}", path.display());
            }
            _ => unreachable!("config requires a subcommand"),
        },
        _ => unreachable!("a subcommand is required"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    logging::init(matches.get_flag("log-json"))?;
    run(matches).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn rsvp_parses_status_and_attendees() {
        let matches = build_cli()
            .try_get_matches_from([
                "guest-portal", "rsvp", "--token", "AB12CD34", "--status", "confirmed",
                "--attendees", "2",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "rsvp");
        assert_eq!(args.get_one::<RsvpStatus>("status"), Some(&RsvpStatus::Confirmed));
        assert_eq!(args.get_one::<u32>("attendees"), Some(&2));
    }

    #[test]
    fn unknown_rsvp_status_is_rejected() {
        let result = build_cli().try_get_matches_from([
            "guest-portal", "rsvp", "--token", "AB12CD34", "--status", "perhaps",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn activity_defaults_to_toggle() {
        let matches = build_cli()
            .try_get_matches_from(["guest-portal", "activity", "-t", "AB12CD34", "--id", "5"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<String>("action").map(String::as_str), Some("toggle"));
    }

    #[test]
    fn config_path_flag_is_global() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.toml");
        let matches = build_cli()
            .try_get_matches_from([
                "guest-portal",
                "config",
                "show",
                "--config",
                path.to_str().unwrap(),
                "--base-url",
                "https://rsvp.example.com",
            ])
            .unwrap();
        let (loaded_path, config) = load_config(&matches).unwrap();
        assert_eq!(loaded_path, path);
        assert_eq!(config.gateway.base_url, "https://rsvp.example.com");
    }

    #[test]
    fn completion_renders_checklist() {
        let completion = SectionCompletion {
            rsvp: true,
            ..SectionCompletion::default()
        };
        let text = render_completion(&completion);
        assert!(text.starts_with("Progress: 1/6"));
        assert!(text.contains("[x] rsvp"));
        assert!(text.contains("[ ] activities"));
    }
}
