#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use entretiens::{
    calendar::{upcoming, CalendarView},
    io,
    notification::{plan_reminders, ReminderOptions, TextReminder},
    permissions::{
        Capability, PermissionOptions, PermissionPlatform, PermissionStatus, PermissionsManager,
        RequestAllOutcome, ThreadPause,
    },
    scheduler::{JsonOutboxPlatform, PlatformError, ReminderScheduler},
    storage::{JsonFileStore, KeyValueStore},
};
use std::collections::BTreeMap;
use std::time::Duration;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Rappels d'entretiens, calendrier et autorisations (simulation locale)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON des drapeaux persistés
    #[arg(long, global = true, default_value = "entretiens-store.json")]
    store: String,

    /// Fichier JSON des notifications programmées
    #[arg(long, global = true, default_value = "outbox.json")]
    outbox: String,

    /// Décalage UTC de l'appareil, en minutes
    #[arg(long, global = true, default_value_t = 0, allow_hyphen_values = true)]
    utc_offset_minutes: i32,

    /// Instant courant (RFC3339 UTC), par défaut l'horloge système
    #[arg(long, global = true)]
    now: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Calculer les rappels sans les programmer
    Plan {
        /// Réponse JSON de l'API des entretiens
        #[arg(long)]
        interviews: String,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Annuler les rappels existants puis programmer les nouveaux
    Schedule {
        #[arg(long)]
        interviews: String,
    },

    /// Annuler tous les rappels de la session
    Teardown,

    /// Afficher la grille du mois
    Calendar {
        #[arg(long)]
        interviews: String,
        /// Mois affiché `YYYY-MM`
        #[arg(long)]
        month: Option<String>,
        /// Date sélectionnée `YYYY-MM-DD`
        #[arg(long)]
        select: Option<String>,
    },

    /// Autorisations système
    Permissions {
        #[command(subcommand)]
        cmd: PermissionCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PermissionCommands {
    /// Indiquer si le parcours de première ouverture a été fait
    Status,
    /// Lancer le parcours de première ouverture avec des réponses simulées
    RequestAll {
        /// "notifications=granted,location=denied,..."
        #[arg(long, default_value = "")]
        answers: String,
        /// Délai entre deux dialogues, en millisecondes
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Effacer le drapeau persistant
    Reset,
}

/// Réponses de dialogue fixées à l'avance.
struct ScriptedPermissions {
    answers: BTreeMap<Capability, PermissionStatus>,
}

impl ScriptedPermissions {
    fn parse(raw: &str) -> Result<Self> {
        let mut answers = BTreeMap::new();
        for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (cap, status) = pair
                .split_once('=')
                .with_context(|| format!("expected capability=status, got {pair}"))?;
            let cap: Capability = cap.parse().map_err(anyhow::Error::msg)?;
            let status = match status.trim() {
                "granted" => PermissionStatus::Granted,
                "denied" => PermissionStatus::Denied,
                "undetermined" => PermissionStatus::Undetermined,
                other => bail!("unknown status: {other}"),
            };
            answers.insert(cap, status);
        }
        Ok(Self { answers })
    }
}

impl PermissionPlatform for ScriptedPermissions {
    fn check(&mut self, _capability: Capability) -> Result<PermissionStatus, PlatformError> {
        Ok(PermissionStatus::Undetermined)
    }

    fn request(&mut self, capability: Capability) -> Result<PermissionStatus, PlatformError> {
        Ok(self
            .answers
            .get(&capability)
            .copied()
            .unwrap_or_default())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let offset = FixedOffset::east_opt(cli.utc_offset_minutes * 60)
        .with_context(|| format!("invalid UTC offset: {} minutes", cli.utc_offset_minutes))?;
    let now: DateTime<Utc> = match &cli.now {
        Some(raw) => raw.parse().context("now RFC3339")?,
        None => Utc::now(),
    };
    let opts = ReminderOptions {
        utc_offset: offset,
        ..ReminderOptions::default()
    };
    let store = JsonFileStore::open(&cli.store)?;

    let code = match cli.cmd {
        Commands::Plan { interviews, out_csv } => {
            let list = io::import_interviews_json(interviews)?;
            let reminders = plan_reminders(&list, now, &opts, &TextReminder);
            if let Some(path) = out_csv {
                io::export_reminders_csv(path, &reminders)?;
            }
            for r in &reminders {
                println!(
                    "{} | {} | {} | {}",
                    r.trigger_at.to_rfc3339(),
                    r.interview_id.as_str(),
                    r.kind.as_str(),
                    r.title
                );
            }
            0
        }
        Commands::Schedule { interviews } => {
            let list = io::import_interviews_json(interviews)?;
            let mut scheduler =
                ReminderScheduler::new(JsonOutboxPlatform::open(&cli.outbox), &store, opts)?;
            let report = scheduler.reschedule(&list, now)?;
            println!(
                "cancelled {} | scheduled {} | failed {}",
                report.cancelled, report.scheduled, report.failed
            );
            if report.cancel_failed > 0 {
                println!("cancel failed {} (kept for retry)", report.cancel_failed);
            }
            if report.failed > 0 || report.cancel_failed > 0 {
                // Code 2 = WARNING/INCOMPLETE
                2
            } else {
                0
            }
        }
        Commands::Teardown => {
            let mut scheduler =
                ReminderScheduler::new(JsonOutboxPlatform::open(&cli.outbox), &store, opts)?;
            let cancelled = scheduler.teardown()?;
            println!("cancelled {cancelled}");
            0
        }
        Commands::Calendar {
            interviews,
            month,
            select,
        } => {
            let list = io::import_interviews_json(interviews)?;
            let selected = match select {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").context("select YYYY-MM-DD")?,
                None => now.with_timezone(&offset).date_naive(),
            };
            let mut view = CalendarView::new(selected, offset)?;
            if let Some(raw) = month {
                let first = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
                    .context("month YYYY-MM")?;
                view.show_month(first.year(), first.month())?;
            }
            print!("{}", view.render_text(&list, now));
            for i in view.selected_interviews(&list) {
                println!(
                    "{} {} | {} | {}",
                    i.time.format("%H:%M"),
                    i.kind.as_str(),
                    i.offer_title,
                    i.company
                );
            }
            if let Some(next) = upcoming(&list, now, &offset).first() {
                println!("next: {} {} {}", next.day_key(), next.time.format("%H:%M"), next.offer_title);
            }
            0
        }
        Commands::Permissions { cmd } => match cmd {
            PermissionCommands::Status => {
                let done = store.get(&PermissionOptions::default().flag_key)?.as_deref() == Some("true");
                println!("first-launch flow done: {done}");
                0
            }
            PermissionCommands::RequestAll { answers, delay_ms } => {
                let platform = ScriptedPermissions::parse(&answers)?;
                let popts = PermissionOptions {
                    prompt_delay: Duration::from_millis(delay_ms),
                    ..PermissionOptions::default()
                };
                let mut manager = PermissionsManager::new(platform, &store, ThreadPause, popts);
                match manager.request_all()? {
                    RequestAllOutcome::AlreadyDone => println!("already done"),
                    RequestAllOutcome::Completed { statuses, notices } => {
                        for (cap, status) in statuses {
                            println!("{}: {:?}", cap.as_str(), status);
                        }
                        for n in notices {
                            eprintln!("{}", n.message);
                        }
                    }
                }
                0
            }
            PermissionCommands::Reset => {
                store.remove(&PermissionOptions::default().flag_key)?;
                println!("flag cleared");
                0
            }
        },
    };

    std::process::exit(code);
}
