use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use intake_wizard::config::WizardConfig;
use intake_wizard::draft::{Draft, FieldPath};
use intake_wizard::enrichment::{EnrichmentService, StaticKeywordProvider, SuggestionStatus};
use intake_wizard::error::{CompletionError, TransitionError};
use intake_wizard::schema::{FieldSchemaCatalog, TaxonomyKey, builtin};
use intake_wizard::wizard::{Retreat, WizardHost, WizardPhase, WizardStateMachine};

#[derive(Parser, Debug)]
#[command(name = "intake-wizard", version, about = "Run an intake wizard in the terminal")]
struct Cli {
    /// Wizard to run.
    #[arg(long, default_value = builtin::CV_BUILDER)]
    wizard: String,

    /// Applicant pathway (e.g. plab-img, uk-graduate).
    #[arg(long, default_value = "plab-img")]
    pathway: String,

    /// Optional template within the pathway (e.g. nhs-standard).
    #[arg(long)]
    template: Option<String>,

    /// Extra wizard definitions to load, as a JSON catalog.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// List the available wizards and exit.
    #[arg(long)]
    list: bool,
}

/// Prints the submitted draft as JSON on stdout.
struct StdoutHost;

#[async_trait]
impl WizardHost for StdoutHost {
    async fn on_complete(&self, draft: &Draft) -> Result<(), CompletionError> {
        let json = serde_json::to_string_pretty(draft)
            .map_err(|e| CompletionError::Rejected(e.to_string()))?;
        println!("{json}");
        Ok(())
    }

    fn on_cancel(&self, draft: &Draft) {
        eprintln!("Cancelled with {} answered field(s); nothing submitted.", draft.len());
    }

    fn on_exit(&self) {
        eprintln!("Already on the first step.");
    }
}

const HELP: &str = "\
  section.field=value   set a field (empty value clears it)
  section.field+=item   add an item to a list field
  section.field-=N      remove item N (0-based) from a list field
  :next  :back  :goto N  :done  :cancel  :status  :accept ITEM  :help";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = WizardConfig::from_env();
    let catalog = FieldSchemaCatalog::from_config(&config, cli.catalog.as_deref())?;

    if cli.list {
        for id in catalog.ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let definition = catalog.get(&cli.wizard)?;
    let key = TaxonomyKey::new(cli.pathway.clone(), cli.template.as_deref());

    let mut wizard = WizardStateMachine::new(Arc::clone(&definition), key.clone(), Arc::new(StdoutHost))?;

    if let Some(service) =
        EnrichmentService::for_wizard(&definition, Arc::new(StaticKeywordProvider::default()), &config)
    {
        let service = Arc::new(service);
        let mut rx = service.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                if state.status == SuggestionStatus::Ready && !state.results.is_empty() {
                    eprintln!("\n💡 Suggestions: {}", state.results.join(", "));
                    eprint!("> ");
                }
            }
        });
        wizard = wizard.with_enrichment(service);
    }

    eprintln!("📝 {} ({key})", definition.title);
    eprintln!("{HELP}\n");
    print_step(&wizard);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }

        match handle_line(&mut wizard, line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("⚠️  {e}"),
        }
        if wizard.phase().is_terminal() {
            break;
        }
        eprint!("> ");
    }

    Ok(())
}

/// Returns `Ok(false)` when the session should end.
async fn handle_line(wizard: &mut WizardStateMachine, line: &str) -> Result<bool, TransitionError> {
    let (command, arg) = match line.split_once(' ') {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match command {
        ":next" => {
            let advanced = match wizard.next() {
                Ok(advanced) => advanced,
                Err(e) => {
                    print_errors(wizard);
                    return Err(e);
                }
            };
            for (path, warning) in &advanced.warnings {
                eprintln!("   note: {path} {warning}");
            }
            print_step(wizard);
        }
        ":back" => match wizard.previous()? {
            Retreat::Step(_) => print_step(wizard),
            Retreat::Exited => {}
        },
        ":goto" => match arg.parse::<usize>() {
            Ok(n) => {
                let jumped = wizard.go_to_step(n);
                print_step(wizard);
                if jumped.is_err() {
                    print_errors(wizard);
                }
                jumped?;
            }
            Err(_) => eprintln!("Usage: :goto N"),
        },
        ":done" => {
            let result = wizard.complete().await;
            if matches!(result, Err(TransitionError::ValidationFailed { .. })) {
                print_errors(wizard);
            }
            result?;
            eprintln!("✅ Submitted.");
            return Ok(false);
        }
        ":cancel" => {
            wizard.cancel()?;
            return Ok(false);
        }
        ":status" => match serde_json::to_string_pretty(&wizard.status()) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => eprintln!("Cannot render status: {e}"),
        },
        ":accept" => {
            wizard.accept_suggestion(arg)?;
        }
        ":help" => eprintln!("{HELP}"),
        _ => edit_field(wizard, line)?,
    }
    Ok(true)
}

fn edit_field(wizard: &mut WizardStateMachine, line: &str) -> Result<(), TransitionError> {
    let (target, op, raw) = if let Some((t, v)) = line.split_once("+=") {
        (t, "+", v)
    } else if let Some((t, v)) = line.split_once("-=") {
        (t, "-", v)
    } else if let Some((t, v)) = line.split_once('=') {
        (t, "=", v)
    } else {
        eprintln!("Unrecognised input. Type :help for commands.");
        return Ok(());
    };

    let Some(path) = FieldPath::parse(target.trim()) else {
        eprintln!("Field paths look like section.field");
        return Ok(());
    };
    let raw = raw.trim();

    match op {
        "+" => wizard.add_item(path, raw),
        "-" => match raw.parse::<usize>() {
            Ok(index) => wizard.remove_item(path, index),
            Err(_) => {
                eprintln!("Usage: section.field-=N");
                Ok(())
            }
        },
        _ if raw.is_empty() => wizard.clear_field(path),
        _ => {
            let parsed = wizard
                .definition()
                .field_spec(&path)
                .map(|spec| spec.kind.parse_input(raw));
            match parsed {
                Some(Some(value)) => wizard.set_field(path, value),
                Some(None) => {
                    eprintln!("{path} does not accept {raw:?}");
                    Ok(())
                }
                None => wizard.set_field(path, raw),
            }
        }
    }
}

fn print_step(wizard: &WizardStateMachine) {
    if !matches!(wizard.phase(), WizardPhase::Editing { .. }) {
        return;
    }
    let step = wizard.current_step();
    eprintln!(
        "\n── Step {}/{}: {} ──",
        wizard.current_step_index() + 1,
        wizard.step_count(),
        step.title
    );
    for spec in &wizard.resolved_fields().fields {
        let marker = if spec.is_required() { "*" } else { " " };
        let value = wizard
            .draft()
            .get(&spec.path)
            .map(|v| v.display())
            .unwrap_or_default();
        eprintln!(" {marker} {:<36} {} = {value}", spec.path.to_string(), spec.label);
    }
    if let Some(failure) = wizard.completion_failure() {
        eprintln!("   ❌ Last submission failed: {failure}. Type :done to retry.");
    }
}

fn print_errors(wizard: &WizardStateMachine) {
    for (path, kind) in &wizard.state().validation_errors {
        eprintln!("   ❌ {path}: {kind}");
    }
}
