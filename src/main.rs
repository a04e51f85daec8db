// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CLI entry point for keylayout-remap
//!
//! Acts as the reference host: bindings come from a JSON file, while
//! preferences, user layouts and the remap journal live in the data
//! directory.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use keylayout_remap::config::{
    export_layout_file, import_layout_file, layout_name_from_path, write_export_file,
    ConfigManager, ImportOptions, LayoutCatalog, LayoutMerge, LogLevel, Preferences,
    DEFAULT_DATA_DIR, JOURNAL_FILE, LAYOUTS_FILE, PREFERENCES_FILE,
};
use keylayout_remap::core::{
    built_in_layout, plan, ApplyReport, Journal, RemapEngine, RevertReport, Translation,
    REFERENCE_LAYOUT,
};
use keylayout_remap::host::{BindingFile, FileWatcher};
use keylayout_remap::logging;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "keylayout-remap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding preferences, user layouts and the remap journal
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// JSON file holding the host's binding sets
    #[arg(short, long, global = true, default_value = "~/.config/keylayout-remap/bindings.json")]
    bindings: PathBuf,

    /// Log level; RUST_LOG takes precedence, preferences are the fallback
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available keyboard layouts
    Layouts,

    /// Show a layout's translation, or the effective one for the preferred layouts
    Show {
        /// Layout name
        name: Option<String>,
    },

    /// Preview which shortcuts would be remapped
    Plan,

    /// Remap shortcuts so they follow the target layout
    Apply {
        /// Layout the keyboard physically has
        #[arg(long)]
        input: Option<String>,

        /// Layout whose shortcut positions should be kept
        #[arg(long)]
        target: Option<String>,
    },

    /// Restore every remapped shortcut
    Revert,

    /// Show emulation status and journal contents
    Status,

    /// Manage user layouts
    Layout {
        #[command(subcommand)]
        command: LayoutCommands,
    },

    /// Export or import preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Re-apply whenever the bindings file changes
    Watch,
}

#[derive(Subcommand)]
enum LayoutCommands {
    /// Create a user layout, optionally copied from another layout
    Add {
        name: String,
        #[arg(long)]
        from: Option<String>,
    },

    /// Delete a user layout
    Remove { name: String },

    /// Map one physical key of a user layout; mapping a key to itself clears it
    SetKey {
        name: String,
        physical: String,
        substituted: String,
    },

    /// Import a layout file
    Import {
        file: PathBuf,
        /// Layout name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Replace an existing user layout of that name
        #[arg(long)]
        replace: bool,
    },

    /// Export a layout to a file
    Export { name: String, file: PathBuf },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Write preferences to a file
    Export {
        file: PathBuf,
        /// Include user layouts
        #[arg(long)]
        layouts: bool,
        /// Include the remap journal
        #[arg(long)]
        journal: bool,
    },

    /// Read preferences from a file
    Import {
        file: PathBuf,
        /// How imported user layouts combine with the current ones
        #[arg(long, value_enum, default_value_t = MergeArg::Keep)]
        layouts: MergeArg,
        /// Replace the remap journal with the imported one
        #[arg(long)]
        journal: bool,
        /// Take the emulation status from the file (reverts first, re-applies after)
        #[arg(long)]
        emulation_status: bool,
        /// Overwrite layouts in use even while emulation is active
        #[arg(long)]
        ignore_lock: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MergeArg {
    Keep,
    Overwrite,
    Update,
    InverseUpdate,
}

impl From<MergeArg> for LayoutMerge {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Keep => LayoutMerge::Keep,
            MergeArg::Overwrite => LayoutMerge::Overwrite,
            MergeArg::Update => LayoutMerge::Update,
            MergeArg::InverseUpdate => LayoutMerge::InverseUpdate,
        }
    }
}

/// Everything loaded from the data directory
struct Session {
    manager: ConfigManager,
    prefs: Preferences,
    catalog: LayoutCatalog,
    journal: Journal,
}

impl Session {
    fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let manager = ConfigManager::new(data_dir.to_path_buf())?;
        let mut prefs = manager.load_preferences();
        let mut catalog = manager.load_layouts();
        prefs.sanitize(&catalog);
        catalog.set_locked(prefs.is_emulation_active);
        let journal = manager.load_journal();

        Ok(Self {
            manager,
            prefs,
            catalog,
            journal,
        })
    }

    fn engine(&self) -> RemapEngine {
        RemapEngine::resume(self.prefs.remap_options(), &self.journal)
    }
}

fn expand(path: &Path) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::tilde(
        path.to_str()
            .ok_or_else(|| anyhow!("Invalid path encoding"))?,
    );
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Level stored in preferences, read before logging is set up.
fn stored_log_level(data_dir: &Path) -> LogLevel {
    fs::read_to_string(data_dir.join(PREFERENCES_FILE))
        .map(|text| Preferences::from_json_or_default(&text).logging_level)
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = expand(&cli.data_dir)?;
    let bindings = expand(&cli.bindings)?;

    logging::init(cli.log_level.unwrap_or_else(|| stored_log_level(&data_dir)));

    let mut session = Session::open(&data_dir)?;

    match cli.command {
        Commands::Layouts => list_layouts(&session),
        Commands::Show { name } => show_translation(&session, name.as_deref())?,
        Commands::Plan => preview(&session, &bindings)?,
        Commands::Apply { input, target } => {
            select_layouts(&mut session, input, target)?;
            let report = apply(&mut session, &bindings)?;
            print_apply_report(&report);
            if !report.success {
                std::process::exit(1);
            }
        }
        Commands::Revert => {
            let report = revert(&mut session, &bindings)?;
            print_revert_report(&report);
            if !report.success {
                std::process::exit(1);
            }
        }
        Commands::Status => print_status(&session)?,
        Commands::Layout { command } => run_layout_command(&mut session, command)?,
        Commands::Prefs { command } => run_prefs_command(&mut session, &bindings, command)?,
        Commands::Watch => watch(&data_dir, &bindings)?,
    }

    Ok(())
}

fn list_layouts(session: &Session) {
    let in_use = session.prefs.layouts_in_use();

    println!("{}", "Keyboard layouts\n".bold());
    for name in session.catalog.names() {
        let marker = if in_use.contains(&name.as_str()) {
            "●".green()
        } else {
            " ".normal()
        };
        match built_in_layout(&name) {
            Some(layout) => println!(
                "{} {} {}",
                marker,
                name.cyan().bold(),
                format!("- {}", layout.description).dimmed()
            ),
            None => println!("{} {} {}", marker, name.cyan(), "(user)".magenta()),
        }
    }
}

fn print_translation(translation: &Translation) {
    if translation.is_identity() {
        println!("  {}", "identity (no keys remapped)".dimmed());
        return;
    }
    for (physical, substituted) in translation.forward() {
        println!("  {} → {}", physical.cyan(), substituted.green());
    }
    if !translation.is_valid() {
        let conflicts: Vec<&str> = translation.conflicts().iter().map(String::as_str).collect();
        println!(
            "\n{} Conflicting keys: {}",
            "⚠".yellow(),
            conflicts.join(" ").yellow()
        );
    }
}

fn show_translation(session: &Session, name: Option<&str>) -> anyhow::Result<()> {
    let translation = match name {
        Some(name) => {
            let translation = session
                .catalog
                .translation(name)
                .ok_or_else(|| anyhow!("No keyboard layout named '{}'", name))?;
            println!("{}", format!("Layout {}\n", name).bold());
            translation
        }
        None => {
            println!(
                "{}",
                format!(
                    "Typing on {} as if on {}\n",
                    session.prefs.preferred_input_layout, session.prefs.preferred_target_layout
                )
                .bold()
            );
            session.prefs.effective_translation(&session.catalog)
        }
    };
    print_translation(&translation);
    Ok(())
}

fn preview(session: &Session, bindings: &Path) -> anyhow::Result<()> {
    let file = BindingFile::load(bindings)?;
    let translation = session.prefs.effective_translation(&session.catalog);
    let pending = plan(&file, &translation, &session.journal);

    if pending.is_empty() {
        println!("{} All shortcuts are already remapped", "✓".green());
        return Ok(());
    }

    println!("{}", format!("{} shortcut(s) to remap\n", pending.len()).bold());
    for remap in &pending {
        let kind = if remap.existing.is_some() {
            " (re-remap)".yellow()
        } else {
            "".normal()
        };
        println!(
            "  {} {} → {}{}",
            format!("[{}]", remap.set_id).dimmed(),
            remap.binding.to_string().cyan(),
            remap.new_char.green().bold(),
            kind
        );
    }
    Ok(())
}

/// Updates the preferred layouts; refused while emulation is active.
fn select_layouts(
    session: &mut Session,
    input: Option<String>,
    target: Option<String>,
) -> anyhow::Result<()> {
    if input.is_none() && target.is_none() {
        return Ok(());
    }
    let prefs = &mut session.prefs;
    let changes = input.as_deref().is_some_and(|i| i != prefs.preferred_input_layout)
        || target.as_deref().is_some_and(|t| t != prefs.preferred_target_layout);
    if changes && prefs.is_emulation_active {
        bail!("Emulation is active; revert before choosing other layouts");
    }

    for name in input.iter().chain(target.iter()) {
        if !session.catalog.contains(name) {
            bail!("No keyboard layout named '{}'", name);
        }
    }
    if let Some(input) = input {
        prefs.preferred_input_layout = input;
    }
    if let Some(target) = target {
        // Naming a target explicitly opts in to non-reference targets
        if target != REFERENCE_LAYOUT {
            prefs.allow_non_reference_target_layouts = true;
        }
        prefs.preferred_target_layout = target;
    }
    session.manager.save_preferences(prefs)?;
    Ok(())
}

fn apply(session: &mut Session, bindings: &Path) -> anyhow::Result<ApplyReport> {
    let translation = session.prefs.effective_translation(&session.catalog);
    if !session.prefs.is_applicable(&session.catalog, true) {
        let target = session.prefs.target_translation(&session.catalog);
        let broken = if target.is_valid() {
            &session.prefs.preferred_input_layout
        } else {
            &session.prefs.preferred_target_layout
        };
        bail!("Layout '{}' has conflicting keys; fix it before applying", broken);
    }

    let mut file = BindingFile::load(bindings)?;
    let engine = session.engine();
    let report = engine.apply(
        &mut file,
        &translation,
        &mut session.journal,
        &mut session.manager,
    )?;

    if report.applied > 0 {
        file.save()?;
    }
    let active = !session.journal.is_empty();
    if active != session.prefs.is_emulation_active {
        session.prefs.is_emulation_active = active;
        session.manager.save_preferences(&session.prefs)?;
    }
    info!("Apply finished with engine {}", engine.state());
    Ok(report)
}

fn revert(session: &mut Session, bindings: &Path) -> anyhow::Result<RevertReport> {
    let mut file = BindingFile::load(bindings)?;
    let engine = session.engine();
    let report = engine.revert(&mut file, &mut session.journal, &mut session.manager)?;

    if report.reverted > 0 {
        file.save()?;
    }
    session.prefs.is_emulation_active = false;
    session.catalog.set_locked(false);
    session.manager.save_preferences(&session.prefs)?;
    Ok(report)
}

fn print_apply_report(report: &ApplyReport) {
    if report.success {
        println!("{} {}", "✓".green(), report.message);
        return;
    }
    println!("{} {}", "✗".red().bold(), report.message.red());
    if report.orphaned > 0 {
        println!(
            "  {} {} journal entr{} describe remaps that did not happen; apply again to retry",
            "⚠".yellow(),
            report.orphaned,
            if report.orphaned == 1 { "y" } else { "ies" }
        );
    }
}

fn print_revert_report(report: &RevertReport) {
    let mark = if report.success { "✓".green() } else { "⚠".yellow() };
    println!("{} {}", mark, report.message);
    for unresolved in &report.unresolved {
        println!(
            "  {} {} {} ({} → {})",
            "?".yellow(),
            format!("[{}]", unresolved.set_id).dimmed(),
            unresolved.operation_id,
            unresolved.entry.diff.source_char,
            unresolved.entry.diff.target_char
        );
    }
}

fn print_status(session: &Session) -> anyhow::Result<()> {
    let prefs = &session.prefs;
    let status = if prefs.is_emulation_active {
        "active".green().bold()
    } else {
        "inactive".dimmed()
    };
    let entries = session.journal.len();
    println!("Emulation:     {}", status);
    println!("Input layout:  {}", prefs.preferred_input_layout.cyan());
    println!("Target layout: {}", prefs.preferred_target_layout.cyan());
    println!("Engine:        {}", session.engine().state());
    println!(
        "Journal:       {} entr{}",
        entries,
        if entries == 1 { "y" } else { "ies" }
    );

    for (set_id, operation_id, _, entry) in session.journal.iter() {
        println!(
            "  {} {} {} → {}",
            format!("[{}]", set_id).dimmed(),
            operation_id,
            entry.diff.source_char.cyan(),
            entry.diff.target_char.green()
        );
    }

    let backups = [PREFERENCES_FILE, LAYOUTS_FILE, JOURNAL_FILE]
        .iter()
        .map(|name| session.manager.list_backups(name).map(|b| b.len()))
        .sum::<Result<usize, _>>()?;
    println!("Backups:       {} in {}", backups, session.manager.backup_dir().display());
    Ok(())
}

fn run_layout_command(session: &mut Session, command: LayoutCommands) -> anyhow::Result<()> {
    let catalog = &mut session.catalog;
    match command {
        LayoutCommands::Add { name, from } => {
            let forward = match from {
                Some(from) => catalog
                    .translation(&from)
                    .ok_or_else(|| anyhow!("No keyboard layout named '{}'", from))?
                    .forward()
                    .clone(),
                None => Default::default(),
            };
            catalog.add(&name, forward)?;
            println!("{} Added layout {}", "✓".green(), name.cyan());
        }
        LayoutCommands::Remove { name } => {
            catalog.remove(&name)?;
            println!("{} Removed layout {}", "✓".green(), name.cyan());
        }
        LayoutCommands::SetKey {
            name,
            physical,
            substituted,
        } => {
            let translation = catalog.set_key(&name, &physical, &substituted)?;
            println!(
                "{} {}: {} → {}",
                "✓".green(),
                name.cyan(),
                physical,
                translation.map_forward(&physical).green()
            );
            if !translation.is_valid() {
                let conflicts: Vec<&str> =
                    translation.conflicts().iter().map(String::as_str).collect();
                println!("{} Conflicting keys: {}", "⚠".yellow(), conflicts.join(" ").yellow());
            }
        }
        LayoutCommands::Import {
            file,
            name,
            replace,
        } => {
            let file = expand(&file)?;
            let forward = import_layout_file(&file)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            let name = name.unwrap_or_else(|| layout_name_from_path(&file));
            let translation = Translation::from_forward(forward.clone());
            if replace {
                catalog.set(&name, forward)?;
            } else {
                catalog.add(&name, forward)?;
            }
            println!("{} Imported layout {}", "✓".green(), name.cyan());
            print_translation(&translation);
        }
        LayoutCommands::Export { name, file } => {
            let translation = catalog
                .translation(&name)
                .ok_or_else(|| anyhow!("No keyboard layout named '{}'", name))?;
            let file = expand(&file)?;
            export_layout_file(&file, &translation)?;
            println!("{} Exported {} to {}", "✓".green(), name.cyan(), file.display());
            return Ok(());
        }
    }
    session.manager.save_layouts(&session.catalog)?;
    Ok(())
}

fn run_prefs_command(
    session: &mut Session,
    bindings: &Path,
    command: PrefsCommands,
) -> anyhow::Result<()> {
    match command {
        PrefsCommands::Export {
            file,
            layouts,
            journal,
        } => {
            let file = expand(&file)?;
            let text = session.prefs.export_to_json(
                layouts.then_some(&session.catalog),
                journal.then_some(&session.journal),
            )?;
            write_export_file(&file, &text)?;
            println!("{} Exported preferences to {}", "✓".green(), file.display());
        }
        PrefsCommands::Import {
            file,
            layouts,
            journal,
            emulation_status,
            ignore_lock,
        } => {
            let file = expand(&file)?;
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let options = ImportOptions {
                layouts: layouts.into(),
                import_journal: journal,
                import_emulation_status: emulation_status,
                ignore_emulation_lock: ignore_lock,
            };

            if emulation_status && session.prefs.is_emulation_active {
                debug!("Reverting before importing the emulation status");
                print_revert_report(&revert(session, bindings)?);
            }

            session.prefs.import_from_json(
                &text,
                &mut session.catalog,
                &mut session.journal,
                &options,
            )?;
            session.manager.save_preferences(&session.prefs)?;
            session.manager.save_layouts(&session.catalog)?;
            if journal {
                session.manager.save_journal(&session.journal)?;
            }
            println!("{} Imported preferences from {}", "✓".green(), file.display());

            if emulation_status && session.prefs.is_emulation_active {
                print_apply_report(&apply(session, bindings)?);
            }
        }
    }
    Ok(())
}

fn watch(data_dir: &Path, bindings: &Path) -> anyhow::Result<()> {
    let session = Session::open(data_dir)?;
    if !session.prefs.reapply_on_reload {
        bail!("Re-applying on reload is turned off in preferences");
    }
    let watcher = FileWatcher::new(bindings)?;
    println!(
        "{} Watching {} (Ctrl+C to stop)",
        "→".cyan(),
        bindings.display()
    );

    while watcher.wait() {
        // Settings may have changed since the last pass
        let mut session = Session::open(data_dir)?;
        watcher.settle(session.prefs.reapply_delay());

        if !session.prefs.is_emulation_active {
            debug!("Bindings changed while emulation is inactive");
            continue;
        }
        match apply(&mut session, bindings) {
            Ok(report) if report.applied > 0 || !report.success => print_apply_report(&report),
            Ok(_) => debug!("Bindings changed; nothing to re-apply"),
            Err(e) => eprintln!("{} {:#}", "✗".red().bold(), e),
        }
    }
    Ok(())
}
