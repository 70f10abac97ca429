use stash::{Amount, Goal, LedgerService,
    backend::{JsonStore, PreferenceStore},
    core::contribution::parse_amount_str,
    export};

use std::{fs, io, path::PathBuf};
use anyhow::{self, Context};
use colored::Colorize;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(version, about, propagate_version = true)]
struct Cli {
   /// Path to ledger file to operate on
   #[clap(value_parser)]
    path: PathBuf,

   /// Action to perform
   #[clap(subcommand)]
   action: Subcommands,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Show the amount saved so far
    Total,
    /// List all contributions
    History,
    /// Record a new contribution
    Save(Save),
    /// Forget every contribution
    Clear,
    /// Write the history as CSV
    Export(Export),
    /// Show or set the savings goal
    Goal(GoalArgs)
}

#[derive(Args, Debug)]
struct Save {
    /// Amount saved, must be greater than zero
    #[clap(value_parser)]
    amount: String
}

#[derive(Args, Debug)]
struct Export {
    /// File to write to, standard output if omitted
    #[clap(short='o', long, value_parser)]
    output: Option<PathBuf>
}

#[derive(Args, Debug)]
struct GoalArgs {
    /// New goal to store
    #[clap(short='s', long, value_parser)]
    set: Option<Amount>,

    /// Preferences file, kept apart from the ledger
    #[clap(short='p', long, value_parser, default_value = "preferences.json")]
    prefs: PathBuf
}

fn print_total(total: Amount) {
    let fmt_total = if total > 0.0 { total.to_string().green() } else { total.to_string().normal() };
    println!("{}: {}", "Total saved".bold(), fmt_total);
}

fn print_progress(goal: Goal, total: Amount) {
    let percent = goal.progress(total);
    let fmt_percent = if percent >= 100 {
        format!("{}%", percent).green().bold()
    } else {
        format!("{}%", percent).yellow()
    };
    println!("{}: {} ({} of goal reached)", "Goal".bold(), goal.target(), fmt_percent);
}

impl Export {
    fn export(&self, service: &LedgerService<JsonStore>) -> anyhow::Result<()> {
        let history = service.history()?;
        match &self.output {
            Some(path) => {
                let file = fs::File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                export::write_csv(&history, file)?;
            },
            None => export::write_csv(&history, io::stdout().lock())?
        }
        return Ok(());
    }
}

impl GoalArgs {
    fn goal(&self, service: &LedgerService<JsonStore>) -> anyhow::Result<()> {
        let prefs = PreferenceStore::new(&self.prefs);
        let mut preferences = prefs.read()
            .with_context(|| format!("failed to read {}", self.prefs.display()))?;

        if let Some(target) = self.set {
            preferences.goal = Goal::new(target).with_context(|| "goal must be greater than zero")?;
            prefs.save(&preferences)?;
        }
        print_progress(preferences.goal, service.total()?);
        return Ok(());
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let store = JsonStore::open(&args.path)
        .with_context(|| format!("failed to open ledger {}", args.path.display()))?;
    let service = LedgerService::new(store);

    match &args.action {
        Subcommands::Total => {
            print_total(service.total()?);
        },
        Subcommands::History => {
            for contribution in service.history()? {
                println!("{}", contribution);
            }
        },
        Subcommands::Save(save) => {
            let amount = parse_amount_str(&save.amount)
                .with_context(|| format!("cannot save {:?}", save.amount))?;
            print_total(service.save(amount)?);
        },
        Subcommands::Clear => {
            service.clear()?;
            println!("Cleared");
        },
        Subcommands::Export(export) => export.export(&service)?,
        Subcommands::Goal(goal) => goal.goal(&service)?
    }

    service.shutdown()?;
    Ok(())
}
