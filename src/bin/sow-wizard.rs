//! CLI binary for sow-wizard.
//!
//! `serve` runs the HTTP API; the other subcommands drive the same library
//! operations from a terminal.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sow_wizard::{
    convert, install_hints, render_sow_draft, AppConfig, ContractType,
    ConversionProgressCallback, ConverterInfo, ConverterKind, Converters, DocumentStore, Folder,
    NoopProgressCallback, PdfMethod, SowApiClient, Wizard,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner driven by library progress events.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_detect_start(&self, kind: ConverterKind) {
        self.bar.set_prefix("Detecting");
        self.bar.set_message(kind.display_name());
    }

    fn on_detect_complete(&self, kind: ConverterKind, info: &ConverterInfo) {
        if info.available {
            self.bar.println(format!(
                "  {} {} {}",
                green("✓"),
                kind.display_name(),
                dim(&info.path)
            ));
        } else {
            self.bar
                .println(format!("  {} {} not found", red("✗"), kind.display_name()));
        }
    }

    fn on_conversion_start(&self, method: PdfMethod, input: &str) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(format!("{input} with {}", method.label()));
    }

    fn on_conversion_complete(&self, method: PdfMethod, output: &str) {
        self.bar.println(format!(
            "  {} {} {}",
            green("✓"),
            method.label(),
            dim(output)
        ));
    }

    fn on_conversion_error(&self, method: PdfMethod, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {} {}", red("✗"), method.label(), red(&msg)));
    }

    fn on_api_request_start(&self, endpoint: &str, documents: usize) {
        self.bar.set_prefix("Generating");
        self.bar
            .set_message(format!("{documents} document(s) → {}", dim(endpoint)));
    }

    fn on_api_response(&self, success: bool) {
        if success {
            self.bar
                .println(format!("  {} SOW API responded", green("✓")));
        } else {
            self.bar.println(format!("  {} SOW API request failed", red("✗")));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on the default address
  sow-wizard serve

  # List proposal documents in the input folder
  sow-wizard files

  # Check which converters are installed
  sow-wizard status

  # Generate a SOW and convert it to PDF
  sow-wizard generate --contract-type fixed-price --document proposal.pptx --pdf

  # Markdown preview of a generated SOW
  sow-wizard to-markdown SOW_2026-01-05T10-00-00-000Z.docx -o sow.md

  # Local draft without calling the API
  sow-wizard draft --contract-type "Time and Materials" --document proposal.pptx

ENVIRONMENT VARIABLES:
  DOCUMENTS_PATH           Documents root (default ./docs)
  ALLOWED_FILE_EXTENSIONS  Comma-separated upload extensions (default pptx)
  MAX_FILE_SIZE_MB         Upload limit in MB (default 50)
  SOW_API_ENDPOINT         External SOW generation endpoint
  SOW_API_KEY              Bearer token for the SOW API
  LIBREOFFICE_PATH         Use this soffice binary instead of searching
  CHROMIUM_PATH            Use this Chromium binary for the PDF fallback
  RUST_LOG                 Log filter (overrides --verbose / --quiet)
"#;

/// Statement-of-Work wizard backend.
#[derive(Parser, Debug)]
#[command(
    name = "sow-wizard",
    version,
    about = "Statement-of-Work wizard backend: upload proposals, generate SOWs, convert DOCX to PDF/Markdown",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,

    /// Output structured JSON instead of human-readable text.
    #[arg(long, global = true, env = "SOW_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "SOW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SOW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SOW_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Documents root directory.
    #[arg(long, env = "DOCUMENTS_PATH", default_value = "./docs")]
    documents_path: PathBuf,

    /// Proposal upload folder under the documents root.
    #[arg(long, env = "INPUT_FOLDER", default_value = "input")]
    input_folder: String,

    /// Generated DOCX folder under the documents root.
    #[arg(long, env = "GENERATED_SOWS_FOLDER", default_value = "generated_sows")]
    generated_sows_folder: String,

    /// Converted PDF folder under the documents root.
    #[arg(long, env = "CONVERTED_PDF_FOLDER", default_value = "converted_to_pdf")]
    converted_pdf_folder: String,

    /// Converted DOCX folder under the documents root.
    #[arg(long, env = "CONVERTED_DOCX_FOLDER", default_value = "converted_to_docx")]
    converted_docx_folder: String,

    /// Scratch folder under the documents root.
    #[arg(long, env = "TEMP_FOLDER", default_value = "temp")]
    temp_folder: String,

    /// Comma-separated list of allowed upload extensions.
    #[arg(long, env = "ALLOWED_FILE_EXTENSIONS", default_value = "pptx")]
    allowed_extensions: String,

    /// Maximum upload size in MB.
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value_t = 50)]
    max_file_size_mb: u64,

    /// External SOW generation endpoint.
    #[arg(long, env = "SOW_API_ENDPOINT")]
    api_endpoint: Option<String>,

    /// Bearer token for the SOW API.
    #[arg(long, env = "SOW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// SOW API timeout in seconds.
    #[arg(long, env = "SOW_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Converter process timeout in seconds.
    #[arg(long, env = "CONVERSION_TIMEOUT", default_value_t = 30)]
    conversion_timeout: u64,

    /// LibreOffice binary to use instead of searching.
    #[arg(long, env = "LIBREOFFICE_PATH")]
    libreoffice_path: Option<PathBuf>,

    /// Chromium binary to use for the PDF fallback.
    #[arg(long, env = "CHROMIUM_PATH")]
    chromium_path: Option<PathBuf>,

    /// Never fall back to headless Chromium.
    #[arg(long, env = "SOW_NO_CHROME_FALLBACK")]
    no_chrome_fallback: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "SOW_BIND_ADDR", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// List proposal documents in the input folder.
    Files,
    /// Detect LibreOffice and Chromium.
    Status,
    /// Convert a generated DOCX to PDF.
    ToPdf {
        /// File name in the generated SOWs folder.
        name: String,
    },
    /// Convert a generated DOCX to Markdown.
    ToMarkdown {
        /// File name in the generated SOWs folder.
        name: String,
        /// Write Markdown to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a SOW through the external API.
    Generate {
        /// Contract type id or label (fixed-price, time-and-materials, staff-augmentation).
        #[arg(long)]
        contract_type: ContractType,
        /// Proposal document in the input folder; repeat for several.
        #[arg(long = "document", required = true)]
        documents: Vec<String>,
        /// Also convert the generated DOCX to PDF.
        #[arg(long)]
        pdf: bool,
    },
    /// Render the local SOW draft without calling the API.
    Draft {
        #[arg(long)]
        contract_type: ContractType,
        #[arg(long = "document", required = true)]
        documents: Vec<String>,
        /// Write Markdown to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The server logs at info by default; one-shot commands stay quiet
    // while the spinner is active.
    let is_serve = matches!(cli.command, Command::Serve { .. });
    let show_progress = !is_serve && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let bind = match &cli.command {
        Command::Serve { bind } => Some(*bind),
        _ => None,
    };
    let config = build_config(&cli.config, bind)?;

    if let Command::Serve { .. } = cli.command {
        return sow_wizard::server::serve(config)
            .await
            .context("Server failed");
    }

    let spinner = show_progress.then(CliProgressCallback::new);
    let progress: &dyn ConversionProgressCallback = match &spinner {
        Some(s) => s.as_ref(),
        None => &NoopProgressCallback,
    };

    let result = run_command(&cli, config, progress).await;
    if let Some(s) = &spinner {
        s.finish();
    }
    result
}

async fn run_command(
    cli: &Cli,
    config: AppConfig,
    progress: &dyn ConversionProgressCallback,
) -> Result<()> {
    let store = DocumentStore::new(&config).context("Invalid documents root")?;

    match &cli.command {
        Command::Serve { .. } => Ok(()),

        // ── files ────────────────────────────────────────────────────────
        Command::Files => {
            let files = store.list_inputs().await.context("Failed to list files")?;
            if cli.json {
                print_json(&serde_json::json!({ "files": files }))?;
            } else if files.is_empty() {
                if !cli.quiet {
                    eprintln!("No files in {}", store.dir(Folder::Input).display());
                }
            } else {
                for f in &files {
                    println!(
                        "{:<40} {:>10}  {}  {}",
                        f.name,
                        f.size,
                        f.last_modified,
                        dim(f.category.as_str())
                    );
                }
            }
            Ok(())
        }

        // ── status ───────────────────────────────────────────────────────
        Command::Status => {
            let converters = Converters::from_config(&config);
            let mut report = Vec::new();
            for kind in [ConverterKind::LibreOffice, ConverterKind::Chromium] {
                let info = convert::converter_status(&converters, kind, progress)
                    .await
                    .context("Converter detection failed")?;
                report.push((kind, info));
            }
            if cli.json {
                let map: serde_json::Map<String, serde_json::Value> = report
                    .iter()
                    .map(|(kind, info)| {
                        let key = match kind {
                            ConverterKind::LibreOffice => "libreOffice",
                            ConverterKind::Chromium => "chromium",
                        };
                        (key.to_string(), serde_json::json!(info))
                    })
                    .collect();
                print_json(&serde_json::Value::Object(map))?;
            } else {
                for (kind, info) in &report {
                    if info.available {
                        println!(
                            "{} {:<12} {}  {}",
                            green("✓"),
                            kind.display_name(),
                            info.path,
                            dim(info.version.as_deref().unwrap_or(""))
                        );
                    } else {
                        println!("{} {:<12} not found", red("✗"), kind.display_name());
                        let hints = install_hints(*kind);
                        for line in [hints.mac_os, hints.linux, hints.windows] {
                            println!("    {}", dim(line));
                        }
                    }
                }
            }
            Ok(())
        }

        // ── to-pdf ───────────────────────────────────────────────────────
        Command::ToPdf { name } => {
            let converters = Converters::from_config(&config);
            let out = convert::convert_to_pdf(&store, &converters, name, progress)
                .await
                .with_context(|| format!("Failed to convert {name} to PDF"))?;
            if cli.json {
                print_json(&out)?;
            } else {
                let path = store.dir(Folder::ConvertedPdf).join(&out.pdf_path);
                if out.already_existed {
                    println!("{} PDF already exists: {}", cyan("◆"), path.display());
                } else {
                    println!(
                        "{} {}  {} bytes  →  {}",
                        green("✔"),
                        out.method.map(PdfMethod::label).unwrap_or(""),
                        out.size,
                        bold(&path.display().to_string())
                    );
                }
            }
            Ok(())
        }

        // ── to-markdown ──────────────────────────────────────────────────
        Command::ToMarkdown { name, output } => {
            let out = convert::docx_to_markdown(&store, name)
                .await
                .with_context(|| format!("Failed to convert {name} to Markdown"))?;
            if cli.json {
                print_json(&out)?;
                return Ok(());
            }
            write_markdown(&out.markdown, output.as_ref()).await?;
            if !cli.quiet {
                for m in &out.messages {
                    eprintln!("{} {}", cyan("⚠"), m.message);
                }
            }
            Ok(())
        }

        // ── generate ─────────────────────────────────────────────────────
        Command::Generate {
            contract_type,
            documents,
            pdf,
        } => {
            let client = config
                .sow_api_endpoint
                .as_ref()
                .map(|endpoint| {
                    SowApiClient::new(
                        endpoint.clone(),
                        config.sow_api_key.clone(),
                        config.api_timeout(),
                    )
                })
                .transpose()
                .context("Failed to build SOW API client")?;

            let generated =
                convert::generate_sow(&store, client.as_ref(), *contract_type, documents, progress)
                    .await
                    .context("SOW generation failed")?;

            let converted = match (&generated.filename, *pdf) {
                (Some(file), true) => {
                    let converters = Converters::from_config(&config);
                    Some(
                        convert::convert_to_pdf(&store, &converters, file, progress)
                            .await
                            .with_context(|| format!("Failed to convert {file} to PDF"))?,
                    )
                }
                _ => None,
            };

            if cli.json {
                print_json(&serde_json::json!({ "sow": generated, "pdf": converted }))?;
                return Ok(());
            }
            match &generated.filename {
                Some(file) => println!(
                    "{} SOW saved: {}",
                    green("✔"),
                    bold(&store.dir(Folder::GeneratedSows).join(file).display().to_string())
                ),
                None => {
                    if let Some(text) = &generated.sow_text {
                        write_markdown(text, None).await?;
                    }
                }
            }
            if let Some(pdf) = converted {
                println!(
                    "{} PDF: {}",
                    green("✔"),
                    bold(&store.dir(Folder::ConvertedPdf).join(&pdf.pdf_path).display().to_string())
                );
            }
            Ok(())
        }

        // ── draft ────────────────────────────────────────────────────────
        Command::Draft {
            contract_type,
            documents,
            output,
        } => {
            let available = store.list_inputs().await.context("Failed to list files")?;
            let mut wizard = Wizard::new();
            wizard.select_contract_type(*contract_type);
            wizard.next()?;
            for name in documents {
                let file = available
                    .iter()
                    .find(|f| &f.name == name)
                    .cloned()
                    .with_context(|| {
                        format!("{name} not found in {}", store.dir(Folder::Input).display())
                    })?;
                wizard.select(file);
            }
            wizard.next()?;

            let md = render_sow_draft(wizard.data(), Local::now().date_naive());
            write_markdown(&md, output.as_ref()).await
        }
    }
}

/// Map CLI args to `AppConfig`.
fn build_config(args: &ConfigArgs, bind: Option<SocketAddr>) -> Result<AppConfig> {
    let mut builder = AppConfig::builder()
        .documents_root(&args.documents_path)
        .input_folder(&args.input_folder)
        .generated_sows_folder(&args.generated_sows_folder)
        .converted_pdf_folder(&args.converted_pdf_folder)
        .converted_docx_folder(&args.converted_docx_folder)
        .temp_folder(&args.temp_folder)
        .allowed_extensions(sow_wizard::config::parse_extension_list(&args.allowed_extensions))
        .max_upload_mb(args.max_file_size_mb)
        .api_timeout_secs(args.api_timeout)
        .conversion_timeout_secs(args.conversion_timeout)
        .chrome_fallback(!args.no_chrome_fallback);

    if let Some(endpoint) = args.api_endpoint.as_deref().filter(|e| !e.is_empty()) {
        builder = builder.sow_api_endpoint(endpoint);
    }
    if let Some(key) = args.api_key.as_deref().filter(|k| !k.is_empty()) {
        builder = builder.sow_api_key(key);
    }
    if let Some(path) = &args.libreoffice_path {
        builder = builder.libreoffice_path(path);
    }
    if let Some(path) = &args.chromium_path {
        builder = builder.chromium_path(path);
    }
    if let Some(addr) = bind {
        builder = builder.bind_addr(addr);
    }

    builder.build().context("Invalid configuration")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

/// Write to `path` if given, else stdout with a trailing newline.
async fn write_markdown(markdown: &str, path: Option<&PathBuf>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(path, markdown)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(markdown.as_bytes())
                .context("Failed to write to stdout")?;
            if !markdown.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}
