use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crime_atlas::boundary::load_boundaries;
use crime_atlas::choropleth::Atlas;
use crime_atlas::config::{validate_threshold, AtlasConfig};
use crime_atlas::loader::load_crime_table;
use crime_atlas::similarity::SimilarityMetric;
use crime_atlas::{logging, Reconciler};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "crime-atlas")]
#[command(about = "Reconcile district crime counts with district boundaries for choropleth maps")]
struct Cli {
    #[command(flatten)]
    sources: SourceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SourceArgs {
    /// Crime CSV (default: CRIME_ATLAS_CRIMES_PATH or ./CrimesOnWomenData.csv)
    #[arg(long, global = true)]
    crimes: Option<PathBuf>,

    /// District boundary GeoJSON (default: CRIME_ATLAS_BOUNDARIES_PATH or ./india_district.geojson)
    #[arg(long, global = true)]
    boundaries: Option<PathBuf>,

    /// GeoJSON property holding the district name
    #[arg(long, global = true)]
    name_property: Option<String>,

    /// Similarity cutoff in [0, 1]
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// sequence, jaro_winkler or levenshtein
    #[arg(long, global = true)]
    metric: Option<SimilarityMetric>,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile one category and year
    Reconcile {
        #[arg(short, long)]
        category: String,

        #[arg(short, long)]
        year: i32,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build every layer and write the figure description as JSON
    Layers {
        #[arg(short, long, default_value = "figure.json")]
        output: PathBuf,

        /// Also write the boundaries with a `district` key property
        #[arg(long)]
        annotated_geojson: Option<PathBuf>,
    },
    /// List the categories and years available in the crime table
    Categories,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = resolve_config(&cli.sources)?;

    let table = load_crime_table(&config.crimes_path, &config.catalog())
        .with_context(|| format!("loading {}", config.crimes_path.display()))?;

    match cli.command {
        Command::Categories => {
            println!("Categories:");
            for category in &table.categories {
                println!("  {}", category);
            }
            println!("Years: {:?}", table.years);
        }
        Command::Reconcile {
            category,
            year,
            format,
            output,
        } => {
            if !config.catalog().contains(&category) {
                bail!("'{}' is not an allowed crime category", category);
            }
            let boundaries = load_boundaries(&config.boundaries_path, &config.name_property)
                .with_context(|| format!("loading {}", config.boundaries_path.display()))?;
            let index = boundaries.index();

            let result = Reconciler::new(&index, config.matcher()).run(&table.records, &category, year);
            info!(
                "{} districts matched, {} unmatched",
                result.values.len(),
                result.unmatched.len()
            );

            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(std::fs::File::create(path)?),
                None => Box::new(std::io::stdout()),
            };
            match format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut out, &result.values)?;
                    writeln!(out)?;
                }
                OutputFormat::Csv => {
                    let mut writer = csv::Writer::from_writer(out);
                    writer.write_record(["district", "value"])?;
                    for (district, value) in &result.values {
                        writer.write_record([district.as_str(), value.to_string().as_str()])?;
                    }
                    writer.flush()?;
                }
            }
        }
        Command::Layers {
            output,
            annotated_geojson,
        } => {
            let boundaries = load_boundaries(&config.boundaries_path, &config.name_property)
                .with_context(|| format!("loading {}", config.boundaries_path.display()))?;
            let atlas = Atlas::build(&table, &boundaries.index(), config.matcher());
            let figure = atlas.figure(config.initial_category.as_deref(), Some(config.initial_year));

            std::fs::write(&output, serde_json::to_string_pretty(&figure)?)?;
            println!("Wrote {} layers to {}", figure.layers.len(), output.display());

            if let Some(path) = annotated_geojson {
                let annotated = boundaries.annotate(&config.name_property);
                std::fs::write(&path, serde_json::to_string(&annotated)?)?;
                println!("Wrote annotated boundaries to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Environment/config file settings, with command-line flags on top.
fn resolve_config(args: &SourceArgs) -> Result<AtlasConfig> {
    let mut config = AtlasConfig::load()?;
    if let Some(path) = &args.crimes {
        config.crimes_path = path.clone();
    }
    if let Some(path) = &args.boundaries {
        config.boundaries_path = path.clone();
    }
    if let Some(name_property) = &args.name_property {
        config.name_property = name_property.clone();
    }
    if let Some(threshold) = args.threshold {
        config.threshold = validate_threshold(threshold)?;
    }
    if let Some(metric) = args.metric {
        config.metric = metric;
    }
    Ok(config.validated()?)
}
