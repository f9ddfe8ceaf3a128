//! Command handlers - one function per subcommand

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use walkdir::WalkDir;

use crate::archive::{store, Archive, Chunk};
use crate::cli::{
    AddArgs, AppContext, ConfigArgs, DeleteArgs, ExtractArgs, InfoArgs, ListArgs, OutputFormat,
    ReplaceArgs, SignaturesArgs, SniffArgs,
};
use crate::config::{generate_sample_config, Config};
use crate::export::{ExtractOptions, ExtractResult, Exporter};
use crate::info::{human_size, ChunkInfo, Summary};

/// One row of `list` output
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRow {
    pub index: usize,
    pub name: String,
    pub extension: String,
    pub description: String,
    pub size: u64,
}

impl From<&Chunk> for ChunkRow {
    fn from(chunk: &Chunk) -> Self {
        Self {
            index: chunk.index(),
            name: chunk.display_name(),
            extension: chunk.extension().to_string(),
            description: chunk.description().to_string(),
            size: chunk.len() as u64,
        }
    }
}

#[derive(Debug, Serialize)]
struct SniffRow {
    path: PathBuf,
    extension: String,
    description: String,
    size: u64,
}

pub fn list(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let archive = ctx.open_archive(&args.archive)?;
    let rows: Vec<ChunkRow> = archive.iter().map(ChunkRow::from).collect();

    match ctx.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Human => {
            println!("{}", list_header(&args.archive, &archive));
            println!("{}", format!("{:>5}  {:<32} {:<6} {}", "#", "Name", "Type", "Size").bold());
            for row in &rows {
                println!(
                    "{:>5}  {:<32} {:<6} {}",
                    row.index,
                    row.name,
                    row.extension,
                    humansize::format_size(row.size, humansize::BINARY)
                );
            }
        }
    }
    Ok(())
}

pub fn info(ctx: &AppContext, args: &InfoArgs) -> Result<()> {
    let archive = ctx.open_archive(&args.archive)?;

    if let [index] = args.indices.as_slice() {
        let info = ChunkInfo::from_chunk(archive.chunk(*index)?);
        match ctx.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
            OutputFormat::Human => print_rows(&info.rows()),
        }
        return Ok(());
    }

    let chunks = if args.indices.is_empty() {
        archive.iter().collect::<Vec<_>>()
    } else {
        args.indices
            .iter()
            .map(|&i| archive.chunk(i))
            .collect::<crate::Result<Vec<_>>>()?
    };
    let summary = Summary::from_chunks(chunks);
    match ctx.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Human => print_rows(&summary.rows()),
    }
    Ok(())
}

pub fn extract(ctx: &AppContext, args: &ExtractArgs) -> Result<()> {
    let archive = ctx.open_archive(&args.archive)?;
    let dest = args
        .dest
        .clone()
        .or_else(|| ctx.config.extract.default_dest.clone())
        .context("No destination given and no [extract] default_dest configured")?;

    let options = ExtractOptions {
        dest,
        pattern: args.pattern.clone(),
        create_manifest: args.manifest || ctx.config.extract.create_manifest,
        dry_run: args.dry_run,
    };
    let result = extract_with_progress(&archive, args.index.as_deref(), options)?;
    print_extract_result(ctx.output, &result, args.dry_run)
}

/// Run an extraction behind an indicatif progress bar
pub fn extract_with_progress(
    archive: &Archive,
    indices: Option<&[usize]>,
    options: ExtractOptions,
) -> Result<ExtractResult> {
    let total = indices.map_or(archive.len(), <[usize]>::len);
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?,
    );

    let result = Exporter::new(options).extract(archive, indices, |p| {
        pb.set_length(p.total as u64);
        pb.set_position(p.completed as u64);
        pb.set_message(p.current_file);
    });

    pb.finish_and_clear();
    result
}

pub fn print_extract_result(output: OutputFormat, result: &ExtractResult, dry_run: bool) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result.files)?),
        OutputFormat::Human => {
            for file in &result.files {
                println!(
                    "  {} #{} -> {}",
                    if dry_run { "·".dimmed() } else { "✓".bright_green() },
                    file.index,
                    file.path.display()
                );
            }
            println!(
                "\n{} {} chunks ({})",
                if dry_run { "Would extract" } else { "Extracted" },
                result.files.len(),
                human_size(result.total_bytes)
            );
            if let Some(manifest) = &result.manifest_path {
                println!("Manifest: {}", manifest.display());
            }
        }
    }
    Ok(())
}

pub fn add(ctx: &AppContext, args: &AddArgs) -> Result<()> {
    let mut archive = if args.archive.exists() {
        ctx.open_archive(&args.archive)?
    } else {
        tracing::info!("Creating new archive {}", args.archive.display());
        ctx.new_archive()
    };

    let inputs = collect_inputs(&args.files, args.recursive)?;
    let mut added = Vec::with_capacity(inputs.len());
    for path in &inputs {
        let data = store::read_payload(path)?;
        let index = archive.append_labeled(data, label_for(path));
        added.push(ChunkRow::from(archive.chunk(index)?));
    }

    let out = args.out.as_deref().unwrap_or(&args.archive);
    store::save(&mut archive, out)?;

    match ctx.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&added)?),
        OutputFormat::Human => {
            for row in &added {
                println!(
                    "  {} #{} {} ({})",
                    "+".bright_green(),
                    row.index,
                    row.name,
                    humansize::format_size(row.size, humansize::BINARY)
                );
            }
            println!("Saved {} chunks to {}", archive.len(), out.display());
        }
    }
    Ok(())
}

pub fn replace(ctx: &AppContext, args: &ReplaceArgs) -> Result<()> {
    let mut archive = ctx.open_archive(&args.archive)?;
    let old_len = archive.chunk(args.index)?.len();
    let data = store::read_payload(&args.file)?;

    if ctx.config.edit.confirm_size_change && !args.yes {
        if let Some(prompt) = size_change_prompt(old_len, data.len()) {
            if !confirm(&prompt)? {
                println!("{}", "Cancelled.".yellow());
                return Ok(());
            }
        }
    }

    let old = archive.replace(args.index, data)?;
    let out = args.out.as_deref().unwrap_or(&args.archive);
    store::save(&mut archive, out)?;

    let new = archive.chunk(args.index)?;
    match ctx.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "index": args.index,
                "old": ChunkRow::from(&old),
                "new": ChunkRow::from(new),
            }))?
        ),
        OutputFormat::Human => println!(
            "{} #{} {} ({}) -> {} ({})",
            "✓".bright_green(),
            args.index,
            old.extension(),
            human_size(old.len() as u64),
            new.extension(),
            human_size(new.len() as u64)
        ),
    }
    Ok(())
}

pub fn delete(ctx: &AppContext, args: &DeleteArgs) -> Result<()> {
    let mut archive = ctx.open_archive(&args.archive)?;
    for &index in &args.indices {
        archive.chunk(index)?;
    }

    if ctx.config.edit.confirm_delete && !args.yes {
        let prompt = format!("Delete {} chunk(s) from {}?", args.indices.len(), args.archive.display());
        if !confirm(&prompt)? {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    let removed = archive.delete(args.indices.iter().copied())?;
    let out = args.out.as_deref().unwrap_or(&args.archive);
    store::save(&mut archive, out)
        .with_context(|| format!("Failed to save {}", out.display()))?;

    match ctx.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "removed": removed, "remaining": archive.len() })
        ),
        OutputFormat::Human => println!(
            "{} Removed {} chunk(s), {} left",
            "✓".bright_green(),
            removed,
            archive.len()
        ),
    }
    Ok(())
}

pub fn sniff(ctx: &AppContext, args: &SniffArgs) -> Result<()> {
    let mut rows = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let data = store::read_payload(path)?;
        let class = ctx.registry.sniff(&data);
        rows.push(SniffRow {
            path: path.clone(),
            extension: class.extension,
            description: class.description,
            size: data.len() as u64,
        });
    }

    match ctx.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Human => {
            for row in &rows {
                println!(
                    "{}: {} ({})",
                    row.path.display(),
                    row.extension.bright_white(),
                    row.description
                );
            }
        }
    }
    Ok(())
}

pub fn signatures(ctx: &AppContext, args: &SignaturesArgs) -> Result<()> {
    if args.init {
        let path = ctx.signatures_path();
        if path.exists() {
            println!("Signature file already exists: {}", path.display());
            return Ok(());
        }
        ctx.registry.save_to(&path)?;
        println!("{} Wrote {} signatures to {}", "✓".bright_green(), ctx.registry.len(), path.display());
        return Ok(());
    }

    match ctx.output {
        OutputFormat::Json => {
            let records: Vec<_> = ctx.registry.entries().iter().map(|e| e.to_record()).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Human => {
            println!("Source: {}", ctx.registry.source().to_string().bright_cyan());
            for entry in ctx.registry.entries() {
                println!(
                    "  {:<24} {:<6} {}",
                    hex::encode_upper(&entry.magic),
                    entry.extension,
                    entry.description
                );
            }
        }
    }
    Ok(())
}

pub fn config(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    if !args.init {
        print!("{}", generate_sample_config());
        return Ok(());
    }

    let path = if ctx.config_path == Config::default_path() {
        Config::ensure_exists()?
    } else {
        if !ctx.config_path.exists() {
            if let Some(parent) = ctx.config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&ctx.config_path, generate_sample_config())
                .with_context(|| format!("Failed to write config: {}", ctx.config_path.display()))?;
        }
        ctx.config_path.clone()
    };
    println!("Config: {}", path.display());
    Ok(())
}

/// `game.rpa: 3 chunks, 12 bytes (12 B), marker "||"`
pub fn list_header(path: &Path, archive: &Archive) -> String {
    format!(
        "{}: {} chunks, {}, marker {}",
        path.display().to_string().bright_cyan(),
        archive.len(),
        human_size(archive.total_size()),
        archive.marker()
    )
}

/// Prompt text for a replacement whose size differs, `None` when equal
pub fn size_change_prompt(old_len: usize, new_len: usize) -> Option<String> {
    match new_len.cmp(&old_len) {
        Ordering::Equal => None,
        Ordering::Greater => Some(format!(
            "The new file is {} bytes larger than the original. Continue?",
            new_len - old_len
        )),
        Ordering::Less => Some(format!(
            "The new file is {} bytes smaller than the original. Continue?",
            old_len - new_len
        )),
    }
}

/// Expand directories (with `recursive`) into their files, sorted by path
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if !path.is_dir() {
            out.push(path.clone());
            continue;
        }
        if !recursive {
            bail!("{} is a directory (use --recursive)", path.display());
        }
        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) if e.file_type().is_file() => Some(e.into_path()),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .collect();
        files.sort();
        out.extend(files);
    }
    Ok(out)
}

/// File name shown for a chunk added from `path`
pub fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

pub fn print_rows(rows: &[(&'static str, String)]) {
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in rows {
        println!("  {:<width$}  {}", key.bright_cyan(), value, width = width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_size_change_prompt() {
        assert_eq!(size_change_prompt(10, 10), None);
        assert!(size_change_prompt(10, 15).unwrap().contains("5 bytes larger"));
        assert!(size_change_prompt(10, 3).unwrap().contains("7 bytes smaller"));
    }

    #[test]
    fn test_collect_inputs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub").join("c.txt"), b"c").unwrap();

        let root = vec![dir.path().to_path_buf()];
        assert!(collect_inputs(&root, false).is_err());

        let files = collect_inputs(&root, true).unwrap();
        let names: Vec<String> = files.iter().map(|p| label_for(p)).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        let single = vec![dir.path().join("a.txt")];
        assert_eq!(collect_inputs(&single, false).unwrap(), single);
    }

    #[test]
    fn test_list_header_names_marker() {
        let mut archive = Archive::new(
            crate::Marker::new(b"||".to_vec()).unwrap(),
            crate::SignatureRegistry::builtin(),
        );
        archive.load([b"ab".to_vec(), b"c".to_vec()]);

        let header = list_header(Path::new("game.rpa"), &archive);
        assert!(header.contains("game.rpa"));
        assert!(header.contains(": 2 chunks, 3 bytes"));
        assert!(header.ends_with("marker \"||\""));
    }

    #[test]
    fn test_label_for() {
        assert_eq!(label_for(Path::new("/tmp/cover.png")), "cover.png");
    }

    #[test]
    fn test_chunk_row() {
        let mut archive = Archive::default();
        archive.append_labeled(b"hello".to_vec(), "notes");
        let row = ChunkRow::from(archive.get(0).unwrap());
        assert_eq!(row.name, "notes.txt");
        assert_eq!(row.size, 5);
        assert_eq!(row.extension, ".txt");
    }
}
