use clap::{Parser, Subcommand};
use flowsite::report::NoMap;
use flowsite::storage::ReportStore;
use flowsite::types::SiteRecord;
use flowsite::{bundle, config, hydraulics, output, report, storage};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "flowsite")]
#[command(about = "Flow-meter installation reports: render, bundle, store")]
#[command(long_about = "\
Flow-meter installation reports: render, bundle, store

A site record is one JSON file describing a sewer flow-meter installation:
manhole and pipe details, commissioning readings, photos and a diagram
(binary payloads stored as base64). Commands derive from those records and
never edit them in place.

Pipeline:

  store    site.json  →  data/reports/           (timestamped record save)
  render   records    →  report.pdf              (branded multi-site PDF)
  bundle   site.json  →  bundle.json             (metadata + embedded PDF)
  publish  site.json  →  <archive>/<project>/<site>.json
                                                 (versioned, conflict-checked)

Derived flow values (averages, L/s estimates, percent difference) are
recomputed from the readings on every command; stored values are never
trusted. Reports for a render can come from explicit file arguments or, with
no arguments, from every record in the reports directory.

Run 'flowsite gen-config' to generate a documented flowsite.toml.")]
#[command(version)]
struct Cli {
    /// Reports directory (overrides the config file)
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = "flowsite.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render stored site records into one combined PDF report
    Render {
        /// Site record files; all stored reports when omitted
        files: Vec<PathBuf>,
        /// Output PDF path (default: timestamped name)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build the archival bundle (metadata + embedded PDF) for one site
    Bundle {
        file: PathBuf,
        /// Output path (default: <site>_bundle.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save a site record into the reports directory
    Store { file: PathBuf },
    /// Write a site's bundle to the archive under the slug path, refusing
    /// to overwrite a version it has not seen
    Publish {
        file: PathBuf,
        /// Archive root directory
        #[arg(long, default_value = "data/archive")]
        archive_root: PathBuf,
        /// Target repository as owner/name (validated only)
        #[arg(long)]
        repo: Option<String>,
    },
    /// List stored reports
    List,
    /// Delete a stored report by filename
    Delete { filename: String },
    /// Print a stock flowsite.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::ReportConfig::load(&cli.config)?;
    let reports_dir = cli
        .reports_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.storage.reports_dir));
    let store = ReportStore::new(&reports_dir);

    match cli.command {
        Command::Render { files, out } => {
            let sites = if files.is_empty() {
                let (reports, warnings) = store.load_all()?;
                for warning in &warnings {
                    eprintln!("{warning}");
                }
                reports.into_iter().map(|r| r.site).collect()
            } else {
                load_site_files(&files)?
            };
            if sites.is_empty() {
                return Err("no site records to render".into());
            }
            let sites = with_fresh_metrics(sites);
            let pdf = report::render_report(&sites, &NoMap, &config)?;
            let out = out.unwrap_or_else(default_report_name);
            std::fs::write(&out, &pdf)?;
            output::print_render_output(&sites, pdf.len(), &out);
        }
        Command::Bundle { file, out } => {
            let site = refresh(load_site_file(&file)?);
            let pdf = report::render_report(
                &[site.clone()],
                &NoMap,
                &config,
            )?;
            let site_bundle = bundle::build_site_bundle(&site, &pdf)?;
            let out = out.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "{}_bundle.json",
                    storage::slugify(&site.site_name, "site")
                ))
            });
            std::fs::write(&out, site_bundle.to_stable_json()?)?;
            output::print_bundle_output(&site, &site_bundle, &out);
        }
        Command::Store { file } => {
            let site = refresh(load_site_file(&file)?);
            let filename = store.save(&site)?;
            output::print_store_output(&site, &filename, store.root());
        }
        Command::Publish {
            file,
            archive_root,
            repo,
        } => {
            if let Some(repo) = &repo {
                storage::parse_repo_full_name(repo)?;
            }
            let site = refresh(load_site_file(&file)?);
            let pdf = report::render_report(
                &[site.clone()],
                &NoMap,
                &config,
            )?;
            let site_bundle = bundle::build_site_bundle(&site, &pdf)?;
            let archive = ReportStore::new(&archive_root);
            let relative = storage::site_storage_path(&site, &config.storage.base_folder);
            let expected = archive.read_version_token(&relative)?;
            let receipt = archive.write_with_precondition(
                &relative,
                site_bundle.to_stable_json()?.as_bytes(),
                expected.as_deref(),
            )?;
            output::print_publish_output(&receipt);
        }
        Command::List => {
            let (reports, warnings) = store.load_all()?;
            output::print_list_output(&reports, &warnings);
        }
        Command::Delete { filename } => {
            if store.delete(&filename)? {
                println!("Deleted {filename}");
            } else {
                return Err(format!("no stored report named {filename}").into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_site_file(path: &Path) -> Result<SiteRecord, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("could not read {}: {err}", path.display()))?;
    let site: SiteRecord = serde_json::from_str(&text)
        .map_err(|err| format!("could not parse {}: {err}", path.display()))?;
    Ok(site)
}

fn load_site_files(paths: &[PathBuf]) -> Result<Vec<SiteRecord>, Box<dyn std::error::Error>> {
    paths.iter().map(|p| load_site_file(p)).collect()
}

/// Derived values are never trusted from disk.
fn refresh(mut site: SiteRecord) -> SiteRecord {
    site.metrics = hydraulics::recompute_metrics(&site);
    site
}

fn with_fresh_metrics(sites: Vec<SiteRecord>) -> Vec<SiteRecord> {
    sites.into_iter().map(refresh).collect()
}

fn default_report_name() -> PathBuf {
    PathBuf::from(format!(
        "flow_meter_installation_report_{}.pdf",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}
