use clap::{Parser, Subcommand};
use site_render::page::Page;
use site_render::prefs::FilePreferences;
use site_render::render::Renderer;
use site_render::source::{self, DocumentSource};
use site_render::{config, generate, loader, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "site-render")]
#[command(about = "Renders a multilingual organization site from JSON documents")]
#[command(long_about = "\
Renders a multilingual organization site from JSON documents

The site store holds one config document and one content document per
language, as produced by the CMS:

  site/
  ├── site-config.json           # siteName, tagline, availableLangs, defaultLang,
  │                              # heroImage, donation, contact
  └── content/
      ├── en/content.json        # site.mission, site.heroImage, news[], sermons[]
      └── fr/content.json

Page templates are plain HTML. Any of these regions are filled when present:

  .site-name  .site-tagline  .hero-img  #news-list  #sermons-list
  #about-content  #donate-info  #contact-info  #blog-list
  #activities-list  #news-collection  #lang-select

Language: ?lang= in --url (if offered) → remembered choice → defaultLang → en

Run 'site-render gen-config' to generate a documented render.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding render.toml (and, by default, the preferences file)
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Override site_root: a directory or http(s) URL serving the documents
    #[arg(long, global = true)]
    site: Option<String>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one page template for the visitor's language
    Render {
        /// Page template
        page: PathBuf,
        /// Page URL, consulted for a ?lang= parameter
        #[arg(long)]
        url: Option<String>,
        /// Same as --url '?lang=<LANG>'; ignored unless the site offers it
        #[arg(long, conflicts_with = "url")]
        lang: Option<String>,
        /// Write the page here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Switch to a language, remember the choice, and render the page with it
    SwitchLang {
        /// Page template
        page: PathBuf,
        /// Language code to switch to
        lang: String,
        /// Write the page here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render every page template in every language
    Build {
        /// Directory of page templates
        #[arg(long, default_value = "pages")]
        pages: PathBuf,
        /// Output directory
        #[arg(long, default_value = "dist")]
        output: PathBuf,
    },
    /// Validate the site config and every language's content document
    Check,
    /// Print a stock render.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut settings = config::load_config(&cli.config_dir)?;
    if let Some(site) = &cli.site {
        settings.site_root = site.clone();
    }
    let site_root = resolve_site_root(&cli.config_dir, &settings.site_root);
    let source = source::open_source(&site_root)?;

    match cli.command {
        Command::Render {
            page,
            url,
            lang,
            out,
        } => {
            let location = lang.map(|lang| lang_query(&lang)).or(url);
            let renderer = open_renderer(&cli.config_dir, source, settings, &page)?;
            let init = renderer.initialize(location.as_deref())?;
            output::print_initialized(&init);
            emit_page(&renderer.page_html(), out.as_deref())?;
        }
        Command::SwitchLang { page, lang, out } => {
            let renderer = open_renderer(&cli.config_dir, source, settings, &page)?;
            renderer.initialize(None)?;
            let outcome = renderer.switch_language(&lang)?;
            output::print_outcome(&outcome);
            emit_page(&renderer.page_html(), out.as_deref())?;
        }
        Command::Build { pages, output: out_dir } => {
            init_thread_pool(&settings.processing);
            let summary = generate::generate(source.as_ref(), &pages, &out_dir, &settings)?;
            output::print_generate_summary(&summary, &out_dir);
        }
        Command::Check => {
            println!("==> Checking {}", site_root);
            let check = loader::check_site(source.as_ref())?;
            output::print_check(&check);
            if !check.is_healthy() {
                return Err("site check failed".into());
            }
            println!("==> Site is valid");
        }
        Command::GenConfig => unreachable!("handled before loading config"),
    }

    Ok(())
}

/// Install the stderr log subscriber. `SITE_RENDER_LOG` overrides the level
/// picked by the flags.
fn init_tracing(quiet: bool, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("SITE_RENDER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize logging: {error}"))?;
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// `?lang=<lang>` with the value form-encoded, so `&` or `#` stay part of it.
fn lang_query(lang: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("lang", lang)
        .finish();
    format!("?{query}")
}

/// Relative directory roots resolve against the config directory; URLs pass
/// through unchanged.
fn resolve_site_root(config_dir: &Path, site_root: &str) -> String {
    if site_root.starts_with("http://") || site_root.starts_with("https://") {
        site_root.to_string()
    } else {
        config_dir.join(site_root).to_string_lossy().into_owned()
    }
}

fn open_renderer(
    config_dir: &Path,
    source: Box<dyn DocumentSource>,
    settings: config::RenderConfig,
    page: &Path,
) -> Result<Renderer<Box<dyn DocumentSource>, FilePreferences>, Box<dyn std::error::Error>> {
    let template = std::fs::read_to_string(page)?;
    let prefs = FilePreferences::load(config_dir.join(&settings.preferences.path));
    Ok(Renderer::new(source, prefs, settings, Page::new(template)))
}

fn emit_page(html: &str, out: Option<&Path>) -> std::io::Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, html)
        }
        None => {
            print!("{html}");
            Ok(())
        }
    }
}
