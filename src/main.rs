use anyhow::{bail, Context};
use bibcert::controller::{Controller, Notification, NotificationKind, Presenter, SearchOutcome};
use bibcert::directory::Directory;
use bibcert::rendering::raster::{discover_font, load_font};
use bibcert::rendering::{AssetLoader, CertificateRenderer, FileExporter, NoAsset, RasterSurface, SourceAssetLoader};
use bibcert::{CertConfig, Source};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(name = "bibcert", version, about = "Find a participant by Bib Number and download their certificate")]
struct Cli {
    /// Bib Numbers to generate certificates for; reads them from stdin when omitted
    bibs: Vec<String>,
    #[arg(short, long, help = "JSON config file")]
    config: Option<PathBuf>,
    #[arg(short, long, help = "Participant dataset (path or URL)")]
    participants: Option<String>,
    #[arg(short, long, help = "Background image (path or URL)")]
    background: Option<String>,
    #[arg(long, help = "Always use the built-in background")]
    no_background: bool,
    #[arg(short, long, help = "Directory certificates are written to")]
    out_dir: Option<PathBuf>,
    #[arg(long, help = "Font file used for participant names")]
    font: Option<PathBuf>,
    #[arg(long, help = "Event label embedded in filenames")]
    event_label: Option<String>,
    #[arg(long, help = "Delay before each lookup, in milliseconds")]
    pacing_ms: Option<u64>,
    #[arg(long, help = "Also print each certificate as a data: URL")]
    data_url: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(CertConfig, Vec<String>, bool)> {
        let mut config = match &self.config {
            Some(path) => CertConfig::from_file(path)?,
            None => CertConfig::default(),
        };
        if let Some(p) = self.participants {
            config.participants = p;
        }
        if let Some(b) = self.background {
            config.background = Some(b);
        }
        if self.no_background {
            config.background = None;
        }
        if let Some(dir) = self.out_dir {
            config.output_dir = dir;
        }
        if let Some(font) = self.font {
            config.font_path = Some(font);
        }
        if let Some(label) = self.event_label {
            config.event_label = label;
        }
        if let Some(ms) = self.pacing_ms {
            config.pacing_delay_ms = ms;
        }
        config.validate()?;
        Ok((config, self.bibs, self.data_url))
    }
}

/// Renders status on the terminal.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn set_busy(&self, busy: bool) {
        if busy {
            eprintln!("Generating certificate...");
        }
    }

    fn show(&self, n: &Notification) {
        let tag = match n.kind {
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
            NotificationKind::Success => "success",
        };
        println!("[{}] {}", tag, n.message);
    }

    fn clear(&self) {}
}

fn build_surface(config: &CertConfig) -> anyhow::Result<RasterSurface> {
    let surface = RasterSurface::new(config.canvas.width, config.canvas.height);
    let font = match &config.font_path {
        Some(path) => Some(load_font(path)?),
        None => match discover_font() {
            Some((path, font)) => {
                log::info!("Using font {}", path.display());
                Some(font)
            }
            None => None,
        },
    };
    Ok(match font {
        Some(font) => surface.with_font(Arc::new(font)),
        None => {
            log::warn!("No usable font found; pass --font. Certificate generation will fail until one is set");
            surface
        }
    })
}

fn build_assets(config: &CertConfig) -> anyhow::Result<Arc<dyn AssetLoader>> {
    let loader: Arc<dyn AssetLoader> = match &config.background {
        Some(location) => Arc::new(SourceAssetLoader::new(Source::parse(location)?, config.fetch_timeout_ms)),
        None => Arc::new(NoAsset),
    };
    Ok(loader)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibcert=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config, bibs, print_data_url) = Cli::parse().into_config()?;

    let source = Source::parse(&config.participants).context("invalid participant source")?;
    let directory = Arc::new(Directory::new());
    let loader = {
        let directory = Arc::clone(&directory);
        let timeout_ms = config.fetch_timeout_ms;
        tokio::spawn(async move {
            // Failure leaves the directory ready and empty; the cause is already logged.
            let _ = directory.load(&source, timeout_ms).await;
        })
    };

    let renderer = CertificateRenderer::new(
        &config,
        build_assets(&config)?,
        Arc::new(FileExporter::new(config.output_dir.clone())),
    )?;
    let controller = Controller::new(
        Arc::clone(&directory),
        renderer,
        Box::new(build_surface(&config)?),
        Arc::new(ConsolePresenter),
        Duration::from_millis(config.pacing_delay_ms),
    );

    let report = |outcome: &SearchOutcome| {
        if let SearchOutcome::Generated(cert) = outcome {
            println!("{}", cert.saved_to);
            if print_data_url {
                println!("{}", cert.data_url());
            }
        }
    };

    if !bibs.is_empty() {
        loader.await.context("participant loader task failed")?;
        let mut failures = 0;
        for bib in &bibs {
            let outcome = controller.search(bib).await;
            report(&outcome);
            if !outcome.is_success() {
                failures += 1;
            }
        }
        if failures > 0 {
            bail!("{} of {} Bib Numbers did not produce a certificate", failures, bibs.len());
        }
        return Ok(());
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Bib Number> ");
        std::io::stdout().flush().ok();
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let outcome = controller.search(&line).await;
        report(&outcome);
    }
    Ok(())
}
