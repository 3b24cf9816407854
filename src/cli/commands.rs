use crate::config::{load_order, PlanConfig};
use crate::core::aggregator::pens_per_mixer;
use crate::core::planner::build_plan;
use crate::core::rations::RationTable;
use crate::core::normalize_mixer_str;
use crate::core::session::{CommitOutcome, PlanSession};
use crate::error::{MixerError, MixerResult};
use crate::excel::address::format_cell_address;
use crate::excel::importer::{WorkbookExtraction, WorkbookImporter};
use crate::types::{MixerPlan, MixerRoute, TableStrategy};
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Format kilograms for display, dropping needless decimals
fn format_kg(n: f64) -> String {
    let rounded = (n * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn strategy_label(strategy: TableStrategy) -> &'static str {
    match strategy {
        TableStrategy::TableDefinition => "table definition",
        TableStrategy::SheetHeuristic => "sheet heuristic",
    }
}

/// Configuration from `--config`, overlaid with `--order`
pub fn load_config(config: Option<&Path>, order: Option<&Path>) -> MixerResult<PlanConfig> {
    let base = match config {
        Some(path) => PlanConfig::load(path)?,
        None => PlanConfig::default(),
    };
    Ok(match order {
        Some(path) => base.with_order(&load_order(path)?),
        None => base,
    })
}

fn extract_workbook(file: &Path, header_rows: usize) -> MixerResult<WorkbookExtraction> {
    if !file.exists() {
        return Err(MixerError::Validation(format!(
            "File not found: {}",
            file.display()
        )));
    }
    WorkbookImporter::open(file)?
        .with_header_scan_rows(header_rows)
        .extract()
}

/// Execute the extract command
pub fn extract(file: PathBuf, header_rows: usize, json: bool, verbose: bool) -> MixerResult<()> {
    let extraction = extract_workbook(&file, header_rows)?;
    let rations = extraction
        .comida
        .as_ref()
        .ok()
        .map(|table| RationTable::from_table(table, &HashMap::new()));

    if json {
        let output = json!({
            "file": file.display().to_string(),
            "sheets": extraction.sheet_names,
            "tables": extraction.summaries(),
            "rations": rations,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "🔎 Mixer - Workbook tables".bold().green());
    println!("   File: {}", file.display());
    println!("   Sheets: {}\n", extraction.sheet_names.join(", "));

    for (target, result) in extraction.tables() {
        match result {
            Ok(table) => {
                println!(
                    "   {} {} → {}!{}:{} '{}' ({}, {} rows)",
                    "✅".green(),
                    target.label().bold(),
                    table.sheet_name.bright_blue(),
                    format_cell_address(table.range.start),
                    format_cell_address(table.range.end),
                    table.table_name,
                    strategy_label(table.strategy),
                    table.row_count()
                );
                if verbose {
                    println!("      Headers: {}", table.headers.join(" | ").cyan());
                }
            }
            Err(e) if e.is_table_not_found() => {
                println!("   {} {}: {}", "⚪".dimmed(), target.label().bold(), e)
            }
            Err(e) => println!("   {} {}: {}", "❌".red(), target.label().bold(), e),
        }
    }

    let Some(rations) = rations else {
        println!();
        return Ok(());
    };

    println!("\n{}", "📋 Ration rows:".bold().cyan());
    println!(
        "   {:<12} {:>6} {:<12} {:<10} {:>7} {:>9} {:>10}",
        "Corral", "Cab", "Etapa", "Mixer", "Ajuste", "KgTC/Dia", "Kg"
    );
    for row in &rations.rows {
        let mixer = row.mixer.to_string();
        let mixer = if row.mixer.is_assigned() {
            mixer.normal()
        } else {
            mixer.yellow()
        };
        println!(
            "   {:<12} {:>6} {:<12} {:<10} {:>7} {:>9} {:>10}",
            row.corral,
            row.cab,
            row.etapa,
            mixer,
            format_kg(row.ajuste),
            format_kg(row.kg_tc_dia),
            format_kg(row.kg)
        );
    }

    let mut counts: Vec<_> = pens_per_mixer(&rations.rows).into_iter().collect();
    counts.sort_unstable();
    let summary: Vec<String> = counts
        .iter()
        .map(|(mixer, n)| format!("{} ({} rows)", mixer, n))
        .collect();
    println!(
        "\n   {} rows, {} discarded without Corral",
        rations.len(),
        rations.discarded
    );
    if !summary.is_empty() {
        println!("   Mixers: {}", summary.join(", ").bright_blue());
    }
    println!();

    Ok(())
}

fn print_route(route: &MixerRoute) {
    println!(
        "{} {}  {} kg  {}",
        "🚜 Mixer".bold().green(),
        route.mixer.to_string().bold().green(),
        format_kg(route.total_kg).bold(),
        route.dominant_stage.as_str().cyan()
    );

    println!("   {}", "Load:".bold());
    if route.loads.is_empty() {
        println!("      {}", "(no ingredient inclusions for this diet)".dimmed());
    }
    for (i, step) in route.loads.iter().enumerate() {
        println!(
            "      {:>2}. {:<24} {:>10} kg   Σ {:>10}",
            i + 1,
            step.insumo,
            format_kg(step.kg),
            format_kg(step.cumulative_kg)
        );
    }

    println!("   {}", "Discharge:".bold());
    for (i, stop) in route.discharges.iter().enumerate() {
        println!(
            "      {:>2}. {:<12} {:<12} {:>10} kg   → {:>10} left",
            i + 1,
            stop.corral.bright_blue(),
            stop.stage.as_str(),
            format_kg(stop.kg),
            format_kg(stop.remaining_kg)
        );
    }
    println!();
}

fn print_plan(plan: &MixerPlan, messages: &[String], mixer: Option<u32>) {
    for route in plan
        .mixers
        .iter()
        .filter(|r| mixer.map_or(true, |m| r.mixer == m))
    {
        print_route(route);
    }
    for message in messages {
        println!("{} {}", "⚠️ ".yellow(), message.yellow());
    }
}

/// Execute the plan command
pub fn plan(
    file: PathBuf,
    config: Option<PathBuf>,
    order: Option<PathBuf>,
    mixer: Option<u32>,
    json: bool,
    verbose: bool,
) -> MixerResult<()> {
    let config = load_config(config.as_deref(), order.as_deref())?;
    let extraction = extract_workbook(&file, config.header_scan_rows)?;
    let report = build_plan(&extraction, &config)?;

    if json {
        let output = match mixer {
            Some(m) => serde_json::to_value(report.plan.mixer(m))?,
            None => serde_json::to_value(&report)?,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "🧮 Mixer - Load & discharge plan".bold().green());
    println!("   File: {}", file.display());
    if verbose {
        println!(
            "   {} ration rows, {} ingredients, diets: {}",
            report.rations.len(),
            report.inclusion.insumo_order.len(),
            report
                .inclusion
                .diets()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    println!();

    if let Some(m) = mixer {
        if report.plan.mixer(m).is_none() {
            return Err(MixerError::Validation(format!(
                "Mixer {} has no pens assigned",
                m
            )));
        }
    }
    print_plan(&report.plan, &report.messages, mixer);
    Ok(())
}

/// Execute the normalize command
pub fn normalize(values: Vec<String>) -> MixerResult<()> {
    for value in values {
        println!(
            "   {:<24} → {}",
            format!("{:?}", value),
            normalize_mixer_str(&value).bold()
        );
    }
    Ok(())
}

/// Execute the watch command
pub fn watch(
    file: PathBuf,
    config: Option<PathBuf>,
    order: Option<PathBuf>,
    verbose: bool,
) -> MixerResult<()> {
    println!("{}", "👁️  Mixer - Watch Mode".bold().green());
    println!("   Watching: {}", file.display());
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !file.exists() {
        return Err(MixerError::Validation(format!(
            "File not found: {}",
            file.display()
        )));
    }
    let config = Arc::new(load_config(config.as_deref(), order.as_deref())?);

    let canonical_path = file.canonicalize()?;
    let parent_dir = canonical_path
        .parent()
        .ok_or_else(|| MixerError::Validation("Cannot determine parent directory".to_string()))?;
    let file_name = canonical_path.file_name().map(|n| n.to_os_string());

    let (tx, rx) = channel();

    // Excel writes through a temp file and rename; debounce the burst
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)
        .map_err(|e| MixerError::Validation(format!("Failed to create file watcher: {}", e)))?;
    debouncer
        .watcher()
        .watch(parent_dir, RecursiveMode::NonRecursive)
        .map_err(|e| MixerError::Validation(format!("Failed to watch directory: {}", e)))?;

    if verbose {
        println!(
            "   {} {}",
            "Watching directory:".cyan(),
            parent_dir.display()
        );
    }

    let session = Arc::new(PlanSession::new());

    println!("{}", "🔄 Initial run...".cyan());
    run_watch_action(&canonical_path, &config, &session);

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event.path.file_name().map(|n| n.to_os_string()) == file_name
                });
                if !relevant {
                    continue;
                }
                println!(
                    "\n{} {}",
                    "🔄 Change detected at".cyan(),
                    chrono::Local::now().format("%H:%M:%S").to_string().cyan()
                );

                // runs overlap when saves come faster than extraction; the
                // session keeps only the newest
                let path = canonical_path.clone();
                let config = Arc::clone(&config);
                let session = Arc::clone(&session);
                thread::spawn(move || run_watch_action(&path, &config, &session));
            }
            Ok(Err(error)) => {
                eprintln!("{} Watch error: {}", "❌".red(), error);
            }
            Err(e) => {
                eprintln!("{} Channel error: {}", "❌".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// Plan one version of the file and print it if still the newest run
fn run_watch_action(file: &Path, config: &PlanConfig, session: &PlanSession) {
    let ticket = session.begin();
    let result = extract_workbook(file, config.header_scan_rows)
        .and_then(|extraction| build_plan(&extraction, config));

    match result {
        Ok(report) => {
            let snapshot = report.into_snapshot(file.display().to_string(), ticket);
            match session.commit(ticket, snapshot) {
                CommitOutcome::Committed => {
                    if let Some(latest) = session.latest() {
                        print_plan(&latest.plan, &latest.messages, None);
                    }
                    println!("{}", "✅ Plan updated".bold().green());
                }
                CommitOutcome::Superseded => {
                    tracing::debug!(ticket = ticket.id(), "watch run superseded");
                }
            }
        }
        Err(e) if session.is_current(ticket) => {
            println!("{} {}", "❌ Plan failed:".bold().red(), e)
        }
        Err(_) => {}
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
