// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quire — command-line front end.
//
// Entry point. Initialises logging, loads configuration, binds pdfium, and
// runs one editor operation over the files given.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use clap::{Parser, Subcommand};
use quire_core::error::{QuireError, Result};
use quire_core::human_errors::humanize_error;
use quire_core::types::{CompressionPreset, PageId, RotateDirection, TextSource};
use quire_core::QuireConfig;
use quire_document::{
    AssemblyRequest, ChannelCredentials, CredentialRequest, Editor, FixedCredentials, PageMode,
    PdfiumRasterProvider, SearchOutcome, parse_tesseract_tsv, tesseract_image_size,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "quire")]
#[command(version)]
#[command(about = "Assemble, split, and search PDF pages", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE", env = "QUIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the pdfium shared library (system library when omitted)
    #[arg(long, global = true, value_name = "FILE", env = "PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Password to try on encrypted documents; repeat to try several.
    /// Without one, encrypted documents prompt on stdin.
    #[arg(long, global = true)]
    password: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show each page's text source and rotation
    Info {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Assemble pages from one or more files into a single PDF
    Merge {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Compression preset: none, lossless, light, balanced, strong
        #[arg(long, default_value = "none", value_parser = parse_preset)]
        preset: CompressionPreset,

        /// Keep rotations as page attributes instead of baking them in
        #[arg(long)]
        no_bake: bool,

        /// Skip object compaction for maximum viewer compatibility
        #[arg(long)]
        vector_compat: bool,

        /// Rotate a page before assembly, e.g. `3:90` (1-based page, degrees)
        #[arg(long, value_name = "PAGE:DEG", value_parser = parse_rotation)]
        rotate: Vec<(usize, i64)>,
    },

    /// Split a file by page ranges
    Split {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Ranges such as `1-3,5` or `*` for one file per page
        #[arg(long)]
        ranges: String,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        #[arg(long, default_value = "none", value_parser = parse_preset)]
        preset: CompressionPreset,
    },

    /// Find a phrase across the pages of one or more files
    Search {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        query: String,

        /// Tesseract TSV output for a page, e.g. `2:page2.tsv` (1-based page)
        #[arg(long = "ocr-tsv", value_name = "PAGE:FILE", value_parser = parse_ocr_tsv)]
        ocr_tsv: Vec<(usize, PathBuf)>,

        /// Also print highlight rectangles for every page with a match
        #[arg(long)]
        highlights: bool,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_preset(value: &str) -> std::result::Result<CompressionPreset, String> {
    CompressionPreset::from_name(value).ok_or_else(|| {
        format!("unknown preset \"{value}\" (expected none, lossless, light, balanced, strong)")
    })
}

fn parse_rotation(value: &str) -> std::result::Result<(usize, i64), String> {
    let (page, degrees) = value
        .split_once(':')
        .ok_or_else(|| format!("expected PAGE:DEG, got \"{value}\""))?;
    let page: usize = page.trim().parse().map_err(|err| format!("page: {err}"))?;
    let degrees: i64 = degrees.trim().parse().map_err(|err| format!("degrees: {err}"))?;
    if page == 0 {
        return Err("pages are numbered from 1".into());
    }
    if degrees % 90 != 0 {
        return Err(format!("{degrees} is not a multiple of 90"));
    }
    Ok((page, degrees))
}

fn parse_ocr_tsv(value: &str) -> std::result::Result<(usize, PathBuf), String> {
    let (page, path) = value
        .split_once(':')
        .ok_or_else(|| format!("expected PAGE:FILE, got \"{value}\""))?;
    let page: usize = page.trim().parse().map_err(|err| format!("page: {err}"))?;
    if page == 0 {
        return Err("pages are numbered from 1".into());
    }
    if path.is_empty() {
        return Err("missing TSV file".into());
    }
    Ok((page, PathBuf::from(path)))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => QuireConfig::load(path)?,
        None => QuireConfig::default(),
    };
    let provider = PdfiumRasterProvider::new(cli.pdfium_lib.as_deref())?;
    let mut editor = Editor::new(provider, config);

    match cli.command {
        Commands::Info { files } => {
            load(&mut editor, &files, &cli.password)?;
            for (number, page) in editor.pages().iter().enumerate() {
                let document = editor.workspace().document(page.document_id)?;
                let words = match &page.text_source {
                    TextSource::Native { text } | TextSource::Ocr { text, .. } => {
                        text.split_whitespace().count()
                    }
                    TextSource::None => 0,
                };
                println!(
                    "{:>4}  {} p{}  rotate {:>3}  {} ({} words)",
                    number + 1,
                    document.display_name,
                    page.source_page_index + 1,
                    page.rotation.degrees(),
                    page.text_source.kind(),
                    words
                );
            }
        }

        Commands::Merge {
            files,
            output,
            preset,
            no_bake,
            vector_compat,
            rotate,
        } => {
            load(&mut editor, &files, &cli.password)?;
            for (page, degrees) in rotate {
                let id = page_at(&editor, page)?;
                let (direction, turns) = if degrees < 0 {
                    (RotateDirection::CounterClockwise, -degrees / 90)
                } else {
                    (RotateDirection::Clockwise, degrees / 90)
                };
                for _ in 0..turns % 4 {
                    editor.rotate(id, direction)?;
                }
            }

            let request = AssemblyRequest {
                preset,
                bake_rotation: !no_bake,
                vector_compatibility: vector_compat,
            };
            let assembled = editor.export(&request)?;
            for (number, outcome) in assembled.report.iter().enumerate() {
                match &outcome.mode {
                    PageMode::Structural => println!("{:>4}  copied", number + 1),
                    PageMode::Rasterized { dpi, reason } => {
                        println!("{:>4}  rasterized at {:.0} dpi ({})", number + 1, dpi, reason)
                    }
                    PageMode::Blank { reason } => {
                        println!("{:>4}  blank ({})", number + 1, reason)
                    }
                }
            }
            std::fs::write(&output, &assembled.bytes)?;
            info!(path = %output.display(), bytes = assembled.bytes.len(), "Merged PDF written");
        }

        Commands::Split {
            file,
            ranges,
            output,
            preset,
        } => {
            load(&mut editor, &[file], &cli.password)?;
            let request = AssemblyRequest {
                preset,
                ..AssemblyRequest::default()
            };
            let parts = editor.split(&ranges, &request)?;
            std::fs::create_dir_all(&output)?;
            for (index, part) in parts.iter().enumerate() {
                let path = output.join(format!("part-{}.pdf", index + 1));
                std::fs::write(&path, part)?;
                println!("{}", path.display());
            }
        }

        Commands::Search {
            files,
            query,
            ocr_tsv,
            highlights,
            json,
        } => {
            load(&mut editor, &files, &cli.password)?;
            for (page, path) in ocr_tsv {
                let id = page_at(&editor, page)?;
                let tsv = std::fs::read_to_string(&path)?;
                let image_size = tesseract_image_size(&tsv).ok_or_else(|| {
                    QuireError::Ocr(format!("{} has no page row to size the image", path.display()))
                })?;
                editor.apply_ocr(id, parse_tesseract_tsv(&tsv, image_size)?)?;
                info!(page, path = %path.display(), "OCR text applied");
            }

            let outcome = editor.search(&query);
            let mut pages: Vec<PageId> = Vec::new();
            if let SearchOutcome::Matches(matches) = &outcome {
                for found in matches {
                    if !pages.contains(&found.page_id) {
                        pages.push(found.page_id);
                    }
                }
            }
            let mut rects = Vec::new();
            if highlights {
                for page_id in pages {
                    let position = editor.workspace().position(page_id)? + 1;
                    rects.push((position, editor.highlight_rects(page_id, &query, None)?));
                }
            }

            if json {
                let value = if highlights {
                    let rects: Vec<_> = rects
                        .iter()
                        .map(|(page, set)| serde_json::json!({ "page": page, "highlights": set }))
                        .collect();
                    serde_json::json!({ "outcome": outcome, "highlights": rects })
                } else {
                    serde_json::to_value(&outcome)?
                };
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                match &outcome {
                    SearchOutcome::Matches(matches) => {
                        for found in matches {
                            let position = editor.workspace().position(found.page_id)?;
                            println!("page {:>4}  …{}…", position + 1, found.snippet);
                        }
                    }
                    SearchOutcome::Empty(reason) => println!("{reason}"),
                }
                for (page, set) in &rects {
                    for group in &set.groups {
                        let boxes: Vec<String> = group
                            .rects
                            .iter()
                            .map(|rect| {
                                format!("{:.1},{:.1} {:.1}x{:.1}", rect.x, rect.y, rect.width, rect.height)
                            })
                            .collect();
                        println!("page {:>4}  highlight {}", page, boxes.join("  "));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Load `files` into the editor, skipping (and reporting) any that fail.
fn load(editor: &mut Editor<PdfiumRasterProvider>, files: &[PathBuf], passwords: &[String]) -> Result<()> {
    let mut inputs = Vec::with_capacity(files.len());
    for path in files {
        inputs.push((display_name(path), std::fs::read(path)?));
    }

    let report = if passwords.is_empty() {
        let (source, responder) = ChannelCredentials::pair();
        let prompter = thread::spawn(move || responder.serve(prompt));
        let report = editor.load_many(inputs, &source);
        drop(source);
        if prompter.join().is_err() {
            warn!("Password prompt thread panicked");
        }
        report
    } else {
        editor.load_many(inputs, &FixedCredentials::new(passwords.iter().cloned()))
    };

    for skipped in &report.skipped {
        let human = humanize_error(&skipped.error);
        eprintln!("skipped {}: {}", skipped.name, human.message);
    }
    if report.loaded.is_empty() {
        return Err(QuireError::Assembly("no document could be loaded".into()));
    }
    Ok(())
}

/// Id of the 1-based `page` of the working set.
fn page_at(editor: &Editor<PdfiumRasterProvider>, page: usize) -> Result<PageId> {
    page.checked_sub(1)
        .and_then(|index| editor.pages().get(index))
        .map(|page| page.id)
        .ok_or_else(|| QuireError::Workspace(format!("there is no page {page}")))
}

/// Ask for a password on the terminal. An empty line gives up.
fn prompt(request: &CredentialRequest) -> Option<String> {
    let mut stderr = io::stderr();
    if request.previous_failed {
        let _ = writeln!(stderr, "Wrong password.");
    }
    let _ = write!(stderr, "Password for {} (attempt {}): ", request.document, request.attempt);
    let _ = stderr.flush();

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    (!password.is_empty()).then_some(password)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
