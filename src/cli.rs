//! Terminal front end. Each invocation is an independent UI instance; `watch` is the
//! long-running background process.

use crate::badge::{BadgeNotifier, LogIndicator, StatusFileIndicator};
use crate::board::TicketBoard;
use crate::config::{AppPaths, Settings, SettingsManager};
use crate::duration::{format_duration, format_live_duration};
use crate::session::{read_error_file, SessionError, TimerSession, RETRY_LABEL};
use crate::timer::{ActiveTimer, FileTimerStore, TimerStore};
use clap::{Args, Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use jira_api::{JiraClient, Ticket};
use log::{debug, info};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// How often `watch` re-reads the shared timer file.
const WATCH_POLL_PERIOD: Duration = Duration::from_secs(1);

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configure Jira connection and ticket filters")]
    Init,
    #[command(about = "Show pinned, in-progress and recently done tickets")]
    List,
    #[command(about = "Start the timer on a ticket")]
    Start(KeyArgs),
    #[command(about = "Stop the timer and log the time")]
    Stop(StopArgs),
    #[command(about = "Throw away the running timer without logging")]
    Discard(DiscardArgs),
    #[command(about = "Log a duration such as \"1h 30m\" without the timer")]
    Log(LogArgs),
    #[command(about = "Show the running timer")]
    Status,
    #[command(about = "Show time you logged today")]
    Today,
    #[command(about = "Pin a ticket so it is always listed")]
    Pin(KeyArgs),
    #[command(about = "Unpin a ticket")]
    Unpin(KeyArgs),
    #[command(about = "Keep the badge in sync and remind about running timers")]
    Watch,
}

#[derive(Debug, Args)]
struct KeyArgs {
    /// Ticket key, e.g. PROJ-123
    key: String,
}

#[derive(Debug, Args)]
struct StopArgs {
    /// Description sent with the worklog
    #[arg(short, long)]
    comment: Option<String>,
}

#[derive(Debug, Args)]
struct DiscardArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[derive(Debug, Args)]
struct LogArgs {
    key: String,
    /// Jira duration text: "2h 30m", "1d", "45m"
    duration: String,
    #[arg(short, long)]
    comment: Option<String>,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> CliResult {
        let cli = Self::parse();
        let app = App::open()?;
        match cli.command {
            Commands::Init => app.init().await,
            Commands::List => app.list().await,
            Commands::Start(args) => app.start(&args.key).await,
            Commands::Stop(args) => app.stop(args.comment.as_deref()).await,
            Commands::Discard(args) => app.discard(args.yes),
            Commands::Log(args) => {
                app.log(&args.key, &args.duration, args.comment.as_deref())
                    .await
            }
            Commands::Status => app.status(),
            Commands::Today => app.today().await,
            Commands::Pin(args) => app.pin(&args.key),
            Commands::Unpin(args) => app.unpin(&args.key),
            Commands::Watch => app.watch().await,
        }
    }
}

struct App {
    paths: AppPaths,
    settings_manager: SettingsManager,
    settings: Settings,
    store: Arc<FileTimerStore>,
}

impl App {
    fn open() -> Result<Self, Box<dyn Error>> {
        let paths = AppPaths::resolve()?;
        let settings_manager = SettingsManager::new(&paths);
        let settings = settings_manager.load();
        let store = Arc::new(FileTimerStore::new(paths.timer_file()));
        debug!("Using settings at {}", settings_manager.path().display());
        Ok(Self {
            paths,
            settings_manager,
            settings,
            store,
        })
    }

    fn client(&self) -> Result<JiraClient, Box<dyn Error>> {
        Ok(JiraClient::new(self.settings.jira_config()?)?)
    }

    fn session(&self) -> Result<TimerSession<FileTimerStore, JiraClient>, Box<dyn Error>> {
        Ok(TimerSession::new(self.store.clone(), self.client()?)
            .with_error_file(self.paths.last_error_file()))
    }

    async fn resolve_ticket(&self, client: &JiraClient, key: &str) -> Result<Ticket, Box<dyn Error>> {
        let key = key.trim().to_uppercase();
        client
            .fetch_by_keys(std::slice::from_ref(&key))
            .await?
            .into_iter()
            .find(|ticket| ticket.key == key)
            .ok_or_else(|| format!("ticket {} not found", key).into())
    }

    async fn init(mut self) -> CliResult {
        let theme = ColorfulTheme::default();
        let current = self.settings.clone();

        self.settings.jira_host = Input::with_theme(&theme)
            .with_prompt("Jira host (https://your-org.atlassian.net)")
            .default(current.jira_host)
            .interact_text()?;
        self.settings.jira_email = Input::with_theme(&theme)
            .with_prompt("Email (leave empty for a personal access token)")
            .default(current.jira_email)
            .allow_empty(true)
            .interact_text()?;
        let token: String = Password::with_theme(&theme)
            .with_prompt("API token (leave empty to keep the current one)")
            .allow_empty_password(true)
            .interact()?;
        if !token.trim().is_empty() {
            self.settings.jira_token = token.trim().to_string();
        }
        self.settings.filter_statuses = Input::with_theme(&theme)
            .with_prompt("Statuses to list, comma separated (empty for defaults)")
            .default(current.filter_statuses)
            .allow_empty(true)
            .interact_text()?;
        self.settings.filter_issue_types = Input::with_theme(&theme)
            .with_prompt("Issue types to list, comma separated (empty for all)")
            .default(current.filter_issue_types)
            .allow_empty(true)
            .interact_text()?;
        self.settings.timer_notification_interval = Input::with_theme(&theme)
            .with_prompt("Remind about a running timer every N minutes (0 disables)")
            .default(current.timer_notification_interval)
            .interact_text()?;

        self.settings_manager.save(&self.settings)?;
        println!("Settings saved to {}", self.settings_manager.path().display());

        if self.client()?.validate_connection().await {
            println!("Connected to {}", self.settings.host());
        } else {
            println!("Could not reach Jira with these settings. Check host and token.");
        }
        Ok(())
    }

    async fn list(&self) -> CliResult {
        let client = self.client()?;
        let board = TicketBoard::load(&client, &self.settings).await?;
        let running = self.store.read()?;

        if let Some(ticket) = running
            .as_ref()
            .and_then(|timer| board.find_by_id(&timer.ticket_id))
        {
            println!(
                "Running: {} {}\n  {}\n",
                ticket.key,
                ticket.summary,
                self.settings.browse_url(&ticket.key)
            );
        }
        print_section("Pinned", &board.pinned, running.as_ref());
        print_section("In progress", &board.in_progress, running.as_ref());
        print_section("Done (last 7 days)", &board.done, running.as_ref());
        Ok(())
    }

    async fn start(&self, key: &str) -> CliResult {
        let session = self.session()?;
        let ticket = self.resolve_ticket(session.api(), key).await?;

        if session.is_running_elsewhere(&ticket.id)? {
            return Err("another ticket's timer is running; stop or discard it first".into());
        }

        let timer = match session.start(&ticket.id, &ticket.key).await {
            Ok(timer) => timer,
            Err(err) if err.is_user_arbitrated() => {
                let proceed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!("{}. Start anyway?", err))
                    .default(false)
                    .interact()?;
                if !proceed {
                    return Ok(());
                }
                session.start_unchecked(&ticket.id)?
            }
            Err(err) => return Err(err.into()),
        };

        debug!("Timer record: {:?}", timer);
        println!("Timer running on {} {}", ticket.key, ticket.summary);
        println!("  {}", self.settings.browse_url(&ticket.key));
        Ok(())
    }

    async fn stop(&self, comment: Option<&str>) -> CliResult {
        let session = self.session()?;
        if let Some(comment) = comment {
            session.set_description(comment);
        }

        match session.stop().await {
            Ok(outcome) => {
                if let Some(advisory) = &outcome.advisory {
                    println!("{}", advisory.message());
                }
                println!(
                    "Logged {} on ticket {}",
                    format_duration(outcome.submitted_seconds),
                    outcome.ticket_id
                );
                Ok(())
            }
            Err(err @ SessionError::SubmissionFailed { .. }) => {
                println!("The timer is still running. {}: `jiratime stop`", session.save_label());
                println!("To drop the time instead: `jiratime discard`");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn discard(&self, yes: bool) -> CliResult {
        let Some(timer) = self.store.read()? else {
            return Err(SessionError::NotRunning.into());
        };
        if !yes {
            let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!(
                    "Discard {} of unsaved time on ticket {}?",
                    format_duration(timer.elapsed_seconds()),
                    timer.ticket_id
                ))
                .default(false)
                .interact()?;
            if !confirmed {
                return Ok(());
            }
        }

        let discarded = self.session()?.discard()?;
        println!(
            "Discarded {} on ticket {}",
            format_duration(discarded.lost_seconds),
            discarded.timer.ticket_id
        );
        Ok(())
    }

    async fn log(&self, key: &str, duration: &str, comment: Option<&str>) -> CliResult {
        let session = self.session()?;
        let ticket = self.resolve_ticket(session.api(), key).await?;
        let outcome = session.log_manual(&ticket.id, duration, comment).await?;

        if let Some(advisory) = &outcome.advisory {
            println!("{}", advisory.message());
        }
        println!("Logged {} on {}", outcome.duration_text, ticket.key);
        Ok(())
    }

    fn status(&self) -> CliResult {
        match self.store.read()? {
            Some(timer) => {
                println!(
                    "Timer running on ticket {} for {}",
                    timer.ticket_id,
                    format_live_duration(timer.start_time)
                );
                if let Some(error) = read_error_file(&self.paths.last_error_file()) {
                    println!("Last save failed: {}", error);
                    println!("{}: `jiratime stop`", RETRY_LABEL);
                }
            }
            None => println!("No timer running."),
        }
        Ok(())
    }

    async fn today(&self) -> CliResult {
        let seconds = self.client()?.fetch_todays_seconds().await?;
        println!("Logged today: {}", format_duration(seconds));
        Ok(())
    }

    fn pin(mut self, key: &str) -> CliResult {
        if self.settings.pin(key) {
            self.settings_manager.save(&self.settings)?;
            println!("Pinned {}", key.trim().to_uppercase());
        } else {
            println!("{} is already pinned", key.trim().to_uppercase());
        }
        Ok(())
    }

    fn unpin(mut self, key: &str) -> CliResult {
        if self.settings.unpin(key) {
            self.settings_manager.save(&self.settings)?;
            println!("Unpinned {}", key.trim().to_uppercase());
        } else {
            println!("{} was not pinned", key.trim().to_uppercase());
        }
        Ok(())
    }

    async fn watch(&self) -> CliResult {
        let _badge = BadgeNotifier::attach(
            self.store.clone(),
            Arc::new(StatusFileIndicator::new(self.paths.badge_file())),
        )?;
        let _log = BadgeNotifier::attach(self.store.clone(), Arc::new(LogIndicator))?;

        let minutes = self.settings.timer_notification_interval;
        let reminders_enabled = minutes > 0;
        let mut reminders =
            tokio::time::interval(Duration::from_secs(u64::from(minutes.max(1)) * 60));
        // the first tick fires immediately
        reminders.tick().await;

        info!("Watching {}", self.store.path().display());
        let watcher = self.store.watch(WATCH_POLL_PERIOD);
        tokio::pin!(watcher);

        loop {
            tokio::select! {
                _ = &mut watcher => break,
                _ = reminders.tick(), if reminders_enabled => {
                    if let Some(timer) = self.store.read()? {
                        remind(&timer);
                    }
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Stopping watcher");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn remind(timer: &ActiveTimer) {
    println!(
        "Timer still running on ticket {} ({})",
        timer.ticket_id,
        format_live_duration(timer.start_time)
    );
}

fn print_section(title: &str, tickets: &[Ticket], running: Option<&ActiveTimer>) {
    println!("{}", title);
    if tickets.is_empty() {
        println!("  (none)");
    }
    for ticket in tickets {
        let marker = match running {
            Some(timer) if timer.ticket_id == ticket.id => '>',
            _ => ' ',
        };
        println!(
            "{} {:<12} {:<14} {} [{}]",
            marker,
            ticket.key,
            ticket.status.name,
            ticket.summary,
            format_duration(ticket.time_spent_seconds)
        );
    }
    println!();
}
