//! `chronos plan`: run one planning session in the terminal.
//!
//! Agent steps and notifications are printed as they arrive, followed by the
//! task list, the timeline and the action bar. `--sync` and `--refine` then
//! trigger the action bar's actions.

use chrono::{Local, NaiveDate};
use chronos_core::render::{render_snapshot, step_marker};
use chronos_core::{
    Config, HttpBackend, Notification, Planner, PlannerEvent, Severity, StepPacing, StepStatus,
    SyncOutcome,
};
use clap::Args;
use colored::*;
use log::debug;
use std::io::Read;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Args)]
pub struct PlanArgs {
    /// Brain dump text. Read from --file or stdin when omitted
    text: Option<String>,
    /// Read the brain dump from a file
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,
    /// Day to plan (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Push the optimized schedule to the calendar
    #[arg(long)]
    sync: bool,
    /// Open refinement mode after planning
    #[arg(long)]
    refine: bool,
    /// Skip the step pacing
    #[arg(long)]
    fast: bool,
    /// Print the final session as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_brain_dump(&args)?;
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(plan(args, &text, &config))
}

fn read_brain_dump(args: &PlanArgs) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()).into());
    }
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

async fn plan(args: PlanArgs, text: &str, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = HttpBackend::new(config.base_url()?, config.timeout())?;
    debug!("planning backend at {}", backend.base_url());

    let mut settings = config.planner_settings()?;
    if args.fast {
        settings.pacing = StepPacing::instant();
    }
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let (planner, mut events) = Planner::with_events(backend, settings);
    let printer = Printer { json: args.json };

    let submit = planner.submit(text, date);
    tokio::pin!(submit);
    loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => printer.event(&event),
            result = &mut submit => {
                result?;
                break;
            }
        }
    }
    printer.drain(&mut events);

    if !args.json {
        println!();
        println!("{}", render_snapshot(&planner.snapshot()));
    }

    let mut sync_failed = false;
    if args.sync {
        sync_failed = planner.sync().await == SyncOutcome::Failed;
        printer.drain(&mut events);
    }
    if args.refine {
        planner.refine();
        printer.drain(&mut events);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&planner.snapshot())?);
    }

    if sync_failed {
        return Err("calendar sync failed".into());
    }
    Ok(())
}

/// Terminal output for planner events. In JSON mode stdout carries only the
/// final snapshot, so progress is suppressed and notifications go to stderr.
struct Printer {
    json: bool,
}

impl Printer {
    fn drain(&self, events: &mut UnboundedReceiver<PlannerEvent>) {
        while let Ok(event) = events.try_recv() {
            self.event(&event);
        }
    }

    fn event(&self, event: &PlannerEvent) {
        match event {
            PlannerEvent::StepStarted { label, .. } if !self.json => {
                println!("{} {}", step_marker(StepStatus::Active).cyan(), label);
            }
            PlannerEvent::StepsFinished if !self.json => {
                println!("{} {}", step_marker(StepStatus::Done).green(), "Thought process complete".dimmed());
            }
            PlannerEvent::Notified(notification) => self.notification(notification),
            other => debug!("{other:?}"),
        }
    }

    fn notification(&self, n: &Notification) {
        let label = match n.severity {
            Severity::Info => "info".blue(),
            Severity::Success => "success".green(),
            Severity::Warning => "warning".yellow(),
            Severity::Error => "error".red(),
        }
        .bold();
        let line = match &n.description {
            Some(description) => format!("{label}: {} {}", n.title, description.dimmed()),
            None => format!("{label}: {}", n.title),
        };
        if self.json || matches!(n.severity, Severity::Warning | Severity::Error) {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}
