//! Interactive Mode - menu-driven archive editing
//!
//! Holds one archive at a time and asks before throwing away unsaved edits.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm, FuzzySelect, Input, MultiSelect, Select};

use crate::archive::{store, Archive};
use crate::cli::commands::{
    collect_inputs, extract_with_progress, label_for, print_extract_result, print_rows,
    size_change_prompt,
};
use crate::cli::{AppContext, InteractiveArgs, OutputFormat};
use crate::export::ExtractOptions;
use crate::info::{human_size, ChunkInfo, Summary};

/// Run interactive session
pub fn run_interactive_session(ctx: &AppContext, args: &InteractiveArgs) -> Result<()> {
    let term = Term::stdout();
    term.clear_screen()?;

    print_interactive_banner();

    let mut session = InteractiveSession::new(ctx);
    if let Some(path) = &args.archive {
        session.open_path(path.clone());
    }

    while session.state != SessionState::Exit {
        session.show_menu()?;
    }

    println!("\n{}\n", "Bye!".bright_cyan());
    Ok(())
}

fn print_interactive_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════╗
║  RPA-SPLICE - Interactive Mode                               ║
║                                                              ║
║  Open a container, edit its chunks, save when you're done.  ║
╚══════════════════════════════════════════════════════════════╝
"#;
    println!("{}", banner.bright_cyan());
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SessionState {
    Menu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MenuAction {
    Open,
    New,
    Add,
    Replace,
    Delete,
    Extract,
    Info,
    Save,
    SaveAs,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 10] = [
        MenuAction::Open,
        MenuAction::New,
        MenuAction::Add,
        MenuAction::Replace,
        MenuAction::Delete,
        MenuAction::Extract,
        MenuAction::Info,
        MenuAction::Save,
        MenuAction::SaveAs,
        MenuAction::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuAction::Open => "Open archive",
            MenuAction::New => "New archive",
            MenuAction::Add => "Add files",
            MenuAction::Replace => "Replace chunk",
            MenuAction::Delete => "Delete chunks",
            MenuAction::Extract => "Extract chunks",
            MenuAction::Info => "Chunk info",
            MenuAction::Save => "Save",
            MenuAction::SaveAs => "Save as",
            MenuAction::Quit => "Quit",
        }
    }

    /// Actions that need at least one chunk loaded
    fn needs_chunks(self) -> bool {
        matches!(
            self,
            MenuAction::Replace
                | MenuAction::Delete
                | MenuAction::Extract
                | MenuAction::Info
                | MenuAction::Save
                | MenuAction::SaveAs
        )
    }
}

struct InteractiveSession<'a> {
    ctx: &'a AppContext,
    state: SessionState,
    archive: Archive,
}

impl<'a> InteractiveSession<'a> {
    fn new(ctx: &'a AppContext) -> Self {
        Self {
            ctx,
            state: SessionState::Menu,
            archive: ctx.new_archive(),
        }
    }

    fn show_menu(&mut self) -> Result<()> {
        self.print_status();

        let labels: Vec<&str> = MenuAction::ALL.iter().map(|a| a.label()).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact_opt()?;

        let action = match selection {
            Some(i) => MenuAction::ALL[i],
            None => MenuAction::Quit,
        };

        if action.needs_chunks() && self.archive.is_empty() {
            println!("{}", "No chunks loaded.".yellow());
            return Ok(());
        }

        let outcome = match action {
            MenuAction::Open => self.open(),
            MenuAction::New => self.new_archive(),
            MenuAction::Add => self.add_files(),
            MenuAction::Replace => self.replace_chunk(),
            MenuAction::Delete => self.delete_chunks(),
            MenuAction::Extract => self.extract_chunks(),
            MenuAction::Info => self.show_info(),
            MenuAction::Save => self.save(),
            MenuAction::SaveAs => self.save_as(),
            MenuAction::Quit => self.quit(),
        };

        // Failed actions are reported and the session carries on
        if let Err(e) = outcome {
            println!("{} {:#}", "✗".bright_red(), e);
        }
        Ok(())
    }

    fn print_status(&self) {
        let name = self
            .archive
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<untitled>".to_string());
        let dirty = if self.archive.is_dirty() {
            " *".bright_yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "\n{}{} | {} chunks | {}",
            name.bright_white(),
            dirty,
            self.archive.len(),
            human_size(self.archive.total_size())
        );
    }

    /// True when there is nothing unsaved, or the user agrees to drop it
    fn confirm_discard(&self) -> Result<bool> {
        if !self.archive.is_dirty() {
            return Ok(true);
        }
        Ok(Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("You have unsaved changes. Discard them?")
            .default(false)
            .interact()?)
    }

    fn open(&mut self) -> Result<()> {
        if !self.confirm_discard()? {
            return Ok(());
        }
        let path = prompt_path("Archive path")?;
        self.open_path(path);
        Ok(())
    }

    fn open_path(&mut self, path: PathBuf) {
        match self.ctx.open_archive(&path) {
            Ok(archive) => {
                println!(
                    "{} Loaded {} chunks from {}",
                    "✓".bright_green(),
                    archive.len(),
                    path.display()
                );
                self.archive = archive;
            }
            Err(e) => println!("{} {:#}", "✗".bright_red(), e),
        }
    }

    fn new_archive(&mut self) -> Result<()> {
        if self.confirm_discard()? {
            self.archive.clear();
            println!("{} Started a new archive", "✓".bright_green());
        }
        Ok(())
    }

    fn add_files(&mut self) -> Result<()> {
        let raw: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Files or directories (comma separated)")
            .interact_text()?;
        let paths: Vec<PathBuf> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();

        for path in collect_inputs(&paths, true)? {
            let data = store::read_payload(&path)?;
            let index = self.archive.append_labeled(data, label_for(&path));
            let chunk = self.archive.chunk(index)?;
            println!(
                "  {} #{} {} ({})",
                "+".bright_green(),
                index,
                chunk.display_name(),
                chunk.extension()
            );
        }
        Ok(())
    }

    fn replace_chunk(&mut self) -> Result<()> {
        let Some(index) = self.pick_chunk("Chunk to replace")? else {
            return Ok(());
        };
        let path = prompt_path("Replacement file")?;
        let data = store::read_payload(&path)?;

        let old_len = self.archive.chunk(index)?.len();
        if self.ctx.config.edit.confirm_size_change {
            if let Some(prompt) = size_change_prompt(old_len, data.len()) {
                let go = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(prompt)
                    .default(false)
                    .interact()?;
                if !go {
                    return Ok(());
                }
            }
        }

        self.archive.replace(index, data)?;
        println!("{} Replaced chunk {}", "✓".bright_green(), index);
        Ok(())
    }

    fn delete_chunks(&mut self) -> Result<()> {
        let indices = self.pick_chunks("Chunks to delete (space to select)")?;
        if indices.is_empty() {
            return Ok(());
        }

        if self.ctx.config.edit.confirm_delete {
            let go = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Delete {} chunk(s)?", indices.len()))
                .default(false)
                .interact()?;
            if !go {
                return Ok(());
            }
        }

        let removed = self.archive.delete(indices)?;
        println!("{} Removed {} chunk(s)", "✓".bright_green(), removed);
        Ok(())
    }

    fn extract_chunks(&mut self) -> Result<()> {
        let indices = self.pick_chunks("Chunks to extract (space to select)")?;
        if indices.is_empty() {
            return Ok(());
        }

        let default_dest = self
            .ctx
            .config
            .extract
            .default_dest
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        let dest: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Destination folder")
            .default(default_dest)
            .interact_text()?;

        let options = ExtractOptions {
            dest: PathBuf::from(dest),
            create_manifest: self.ctx.config.extract.create_manifest,
            ..Default::default()
        };
        let result = extract_with_progress(&self.archive, Some(&indices), options)?;
        print_extract_result(OutputFormat::Human, &result, false)
    }

    fn show_info(&mut self) -> Result<()> {
        let indices = self.pick_chunks("Chunks to inspect (space to select)")?;
        match indices.as_slice() {
            [] => {}
            [index] => print_rows(&ChunkInfo::from_chunk(self.archive.chunk(*index)?).rows()),
            _ => {
                let chunks = indices
                    .iter()
                    .map(|&i| self.archive.chunk(i))
                    .collect::<crate::Result<Vec<_>>>()?;
                print_rows(&Summary::from_chunks(chunks).rows());
            }
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        match self.archive.path().map(|p| p.to_path_buf()) {
            Some(path) => self.save_to(path),
            None => self.save_as(),
        }
    }

    fn save_as(&mut self) -> Result<()> {
        let path = prompt_path("Save as")?;
        if path.exists() {
            let overwrite = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("{} exists. Overwrite?", path.display()))
                .default(false)
                .interact()?;
            if !overwrite {
                return Ok(());
            }
        }
        self.save_to(path)
    }

    fn save_to(&mut self, path: PathBuf) -> Result<()> {
        store::save(&mut self.archive, &path)?;
        println!("{} Saved {}", "✓".bright_green(), path.display());
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        if self.confirm_discard()? {
            self.state = SessionState::Exit;
        }
        Ok(())
    }

    fn chunk_items(&self) -> Vec<String> {
        self.archive
            .iter()
            .map(|c| {
                format!(
                    "#{:<4} {:<32} {:<6} {}",
                    c.index(),
                    c.display_name(),
                    c.extension(),
                    humansize::format_size(c.len() as u64, humansize::BINARY)
                )
            })
            .collect()
    }

    fn pick_chunk(&self, prompt: &str) -> Result<Option<usize>> {
        Ok(FuzzySelect::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&self.chunk_items())
            .default(0)
            .interact_opt()?)
    }

    fn pick_chunks(&self, prompt: &str) -> Result<Vec<usize>> {
        Ok(MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&self.chunk_items())
            .interact_opt()?
            .unwrap_or_default())
    }
}

fn prompt_path(prompt: &str) -> Result<PathBuf> {
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?;
    Ok(PathBuf::from(raw.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_labels_unique() {
        let mut labels: Vec<&str> = MenuAction::ALL.iter().map(|a| a.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), MenuAction::ALL.len());
    }

    #[test]
    fn test_actions_needing_chunks() {
        assert!(!MenuAction::Open.needs_chunks());
        assert!(!MenuAction::New.needs_chunks());
        assert!(!MenuAction::Add.needs_chunks());
        assert!(!MenuAction::Quit.needs_chunks());
        assert!(MenuAction::Delete.needs_chunks());
        assert!(MenuAction::Save.needs_chunks());
    }

    #[test]
    fn test_session_starts_empty() {
        let cli = <crate::cli::Cli as clap::Parser>::try_parse_from(["rpa-splice"]).unwrap();
        let ctx = AppContext::from_cli(&cli).unwrap();
        let session = InteractiveSession::new(&ctx);
        assert_eq!(session.state, SessionState::Menu);
        assert!(session.archive.is_empty());
        assert!(session.chunk_items().is_empty());
    }
}
