#![warn(clippy::unwrap_used)]

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use hindi_text::{discover_font, reorder_short_i, GlyphRun, TextRasterizer};
use paper::{
    brand_batch, brand_file, output_path_for, render_paper, write_html, BatchReport, ExamPaper,
    LogoPages, PaperError, PressConfig,
};
use std::io::{self, BufRead as _, Write as _};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about = "Branded exam papers with Devanagari text", long_about = None)]
struct CliArguments {
    #[arg(
        long = "config",
        global = true,
        value_name = "json_file",
        help = "Configuration file (defaults are used when omitted)"
    )]
    config_path: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::Count, help = "More log output (-vv for debug)")]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add watermark, logos and footer to existing PDFs
    Brand {
        #[arg(value_name = "pdf_file", help = "Documents to brand (prompted for when omitted)")]
        files: Vec<PathBuf>,
        #[arg(long = "output-dir", value_name = "directory")]
        output_dir: Option<PathBuf>,
        #[arg(long = "every-page", help = "Put the logos on every page, not just the first")]
        every_page: bool,
    },
    /// Generate an exam paper from its JSON description
    Paper {
        #[arg(value_name = "json_file")]
        paper_path: PathBuf,
        #[arg(short = 'o', long = "output", value_name = "pdf_file")]
        output_path: Option<PathBuf>,
        #[arg(long = "html", value_name = "html_file", help = "Also write a printable HTML version")]
        html_path: Option<PathBuf>,
    },
    /// Rasterize one line of text to a PNG
    RenderText {
        text: String,
        #[arg(short = 'o', long = "output", value_name = "png_file")]
        output_path: PathBuf,
        #[arg(long = "size", default_value_t = 24.0, help = "Font size in points")]
        size: f32,
    },
    /// Show the code points of a text before and after short-i reordering
    Reorder { text: String },
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{error:#}");
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<()> {
    let arguments = CliArguments::parse();
    init_logging(arguments.verbose);
    log::debug!("{arguments:?}");

    let mut config = match &arguments.config_path {
        Some(path) => PressConfig::load(path)
            .with_context(|| format!("Failed to load the configuration {}", path.display()))?,
        None => PressConfig::default(),
    };

    match arguments.command {
        Command::Brand {
            files,
            output_dir,
            every_page,
        } => {
            if let Some(output_dir) = output_dir {
                config.branding.output_dir = output_dir;
            }
            if every_page {
                config.branding.logo_pages = LogoPages::EveryPage;
            }
            config.validate().context("Invalid configuration")?;

            if files.is_empty() {
                brand_interactive(&config)
            } else {
                print_report(&brand_batch(&config, &files));
                Ok(())
            }
        }

        Command::Paper {
            paper_path,
            output_path,
            html_path,
        } => {
            let exam = ExamPaper::load(&paper_path)
                .with_context(|| format!("Failed to load the paper {}", paper_path.display()))?;

            let output_path = output_path.unwrap_or_else(|| paper_path.with_extension("pdf"));
            render_paper(&exam, &config)
                .and_then(|mut doc| doc.save(&output_path).map_err(PaperError::from))
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            println!("PDF created: {}", output_path.display());

            if let Some(html_path) = html_path {
                write_html(&exam, &config, &html_path)
                    .with_context(|| format!("Failed to write {}", html_path.display()))?;
                println!("HTML created: {}", html_path.display());
            }
            Ok(())
        }

        Command::RenderText {
            text,
            output_path,
            size,
        } => {
            let Some(font) = discover_font(&config.fonts.candidates) else {
                bail!(
                    "No font with Devanagari coverage found (searched {} locations)",
                    config.fonts.candidates.len()
                );
            };
            println!("Using font: {}", font.path().display());

            let rasterizer = TextRasterizer::new(font, config.fonts.supersample)?;
            let rendered = rasterizer.rasterize(&GlyphRun::new(&text, size))?;
            rendered
                .image
                .save(&output_path)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            println!(
                "Saved {} ({:.1} x {:.1} pt)",
                output_path.display(),
                rendered.width_pt(),
                rendered.height_pt()
            );
            Ok(())
        }

        Command::Reorder { text } => {
            let visual = reorder_short_i(&text);
            println!("logical: {}", code_points(&text));
            println!("visual:  {}", code_points(&visual.to_string()));
            Ok(())
        }
    }
}

/// `warn` by default, `-v` for info, `-vv` for debug; `RUST_LOG` wins
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Ask for one document and its output name on the terminal
fn brand_interactive(config: &PressConfig) -> Result<()> {
    let input = prompt("PDF to brand: ")?;
    if input.is_empty() {
        bail!("No input file given");
    }
    let input = PathBuf::from(input);

    let default_output = output_path_for(config, &input);
    let default_name = default_output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let answer = prompt(&format!("Output filename [{default_name}]: "))?;
    let output = if answer.is_empty() {
        default_output
    } else {
        config.branding.output_dir.join(answer)
    };

    let mut report = BatchReport::default();
    match brand_file(config, &input, &output) {
        Ok(()) => report.branded.push(output),
        Err(PaperError::MissingSource(path)) => {
            log::warn!("skipping {} (file not found)", path.display());
            report.skipped.push(path);
        }
        Err(e) => report.failed.push((input, e.to_string())),
    }
    print_report(&report);
    Ok(())
}

/// Read one trimmed answer; surrounding quotes from drag-and-drop are removed
fn prompt(question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read from the terminal")?;
    Ok(unquote(answer.trim()).to_string())
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

fn print_report(report: &BatchReport) {
    for path in &report.branded {
        println!("Saved: {}", path.display());
    }
    for path in &report.skipped {
        println!("Skipped (not found): {}", path.display());
    }
    for (path, reason) in &report.failed {
        println!("Failed: {}: {reason}", path.display());
    }
    println!(
        "{} branded, {} skipped, {} failed",
        report.branded.len(),
        report.skipped.len(),
        report.failed.len()
    );
    if let Some(dir) = report.branded.first().and_then(|p| p.parent()) {
        if dir != Path::new("") {
            println!("Check the '{}' folder.", dir.display());
        }
    }
}

fn code_points(text: &str) -> String {
    text.chars()
        .map(|c| format!("U+{:04X}", c as u32))
        .collect::<Vec<_>>()
        .join(" ")
}
