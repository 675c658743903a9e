//! Food Vision CLI
//!
//! Command-line entry point for classifying food photos, listing the
//! nutrition catalog and checking that the model loads.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use food_vision::inference::batch::predict_directory;
use food_vision::utils::format_duration_ms;
use food_vision::utils::logging::{init_logging, LogConfig};
use food_vision::{NutritionCatalog, OutputActivation, PredictionResult, Predictor, PredictorConfig};

/// Food image classification with nutrition facts
#[derive(Parser, Debug)]
#[command(name = "food_vision")]
#[command(version)]
#[command(about = "Classify food photos and report nutrition facts", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// JSON predictor configuration file
    #[arg(short, long, env = "FOOD_VISION_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the .tflite model (overrides the config file)
    #[arg(long, env = "FOOD_VISION_MODEL")]
    model: Option<PathBuf>,

    /// Path to the newline-delimited class names (overrides the config file)
    #[arg(long, env = "FOOD_VISION_CLASSES")]
    classes: Option<PathBuf>,

    /// Replacement nutrition catalog (JSON)
    #[arg(long, env = "FOOD_VISION_NUTRITION")]
    nutrition: Option<PathBuf>,

    /// Apply softmax to the raw model outputs
    #[arg(long, default_value = "false")]
    softmax: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a single image or every image under a directory
    Predict {
        /// Path to input image or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Print results as JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the foods in the nutrition catalog
    Foods,

    /// Load the model and report its health
    Health,
}

impl Cli {
    /// Defaults, then the optional config file, then flags / environment
    fn predictor_config(&self) -> Result<PredictorConfig> {
        let mut config = match &self.config {
            Some(path) => PredictorConfig::load(path)?,
            None => PredictorConfig::default(),
        };
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(classes) = &self.classes {
            config.class_names_path = classes.clone();
        }
        if let Some(nutrition) = &self.nutrition {
            config.nutrition_path = Some(nutrition.clone());
        }
        if self.softmax {
            config.output_activation = OutputActivation::Softmax;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = init_logging(&LogConfig::cli(cli.verbose));

    let config = cli.predictor_config()?;

    match &cli.command {
        Commands::Predict { input, json } => {
            if !json {
                print_banner();
            }
            cmd_predict(&config, input, *json)?;
        }

        Commands::Foods => {
            cmd_foods(&config)?;
        }

        Commands::Health => {
            print_banner();
            cmd_health(&config)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +--------------------------------------------------+
 |   Food Vision                                    |
 |   Food classification with nutrition facts       |
 +--------------------------------------------------+
  "#
        .green()
    );
}

fn cmd_predict(config: &PredictorConfig, input: &Path, json: bool) -> Result<()> {
    info!("Running prediction");
    info!("  Input: {:?}", input);
    info!("  Model: {:?}", config.model_path);

    if !input.exists() {
        anyhow::bail!("Input path not found: {}", input.display());
    }

    let predictor = Predictor::from_config(config)?;

    if input.is_dir() {
        let report = predict_directory(&predictor, input, !json)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        for outcome in &report.outcomes {
            match (&outcome.result, &outcome.error) {
                (Some(result), _) => print_result(&outcome.path, result),
                (None, Some(error)) => {
                    println!("{} {}: {}", "Error:".red(), outcome.path.display(), error)
                }
                (None, None) => {}
            }
        }

        let summary = &report.summary;
        println!("{}", "Summary:".cyan().bold());
        println!(
            "  {} images, {} ok, {} failed",
            summary.total,
            summary.succeeded.to_string().green(),
            summary.failed.to_string().red()
        );
        for (label, count) in &summary.label_counts {
            println!("  {:<20} {}", label, count);
        }
        return Ok(());
    }

    let start = std::time::Instant::now();
    let result = predictor.predict_file(input)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(input, &result);
        println!("  Time: {}", format_duration_ms(elapsed_ms));
    }

    Ok(())
}

fn print_result(path: &Path, result: &PredictionResult) {
    println!("{} {}", "Image:".cyan().bold(), path.display());
    println!(
        "  Food:       {} ({:.1}%)",
        result.top_label.green().bold(),
        result.confidence * 100.0
    );
    println!(
        "  Nutrition:  {} kcal, {}g protein, {}g fat, {}g carbs",
        result.nutrition.calories, result.nutrition.protein, result.nutrition.fat, result.nutrition.carbs
    );
    println!("  Advice:     {}", result.recommendation.yellow());
    println!("  Top predictions:");
    for (rank, candidate) in result.top_candidates.iter().enumerate() {
        println!(
            "    {}. {:<20} {:.1}%",
            rank + 1,
            candidate.label,
            candidate.confidence * 100.0
        );
    }
    println!();
}

fn cmd_foods(config: &PredictorConfig) -> Result<()> {
    let catalog = match &config.nutrition_path {
        Some(path) => NutritionCatalog::from_path(path)?,
        None => NutritionCatalog::embedded(),
    };

    println!("{} ({} entries)", "Known foods:".cyan().bold(), catalog.len());
    for label in catalog.available_labels() {
        let facts = catalog.lookup(&label);
        println!(
            "  {:<20} {:>6} kcal  {:>5}g protein  {:>5}g fat  {:>5}g carbs",
            label, facts.calories, facts.protein, facts.fat, facts.carbs
        );
    }
    Ok(())
}

fn cmd_health(config: &PredictorConfig) -> Result<()> {
    let predictor = Predictor::from_config(config)?;
    let health = predictor.health();

    let status = if health.model_loaded && !predictor.classes().is_sentinel() {
        "healthy".green()
    } else {
        "degraded".yellow()
    };

    println!("{}", "Health:".cyan().bold());
    println!("  Status:       {}", status);
    println!("  Model:        {}", config.model_path.display());
    println!("  Input size:   {}", predictor.engine().input_size());
    println!(
        "  Classes:      {} ({})",
        health.class_count,
        predictor.classes().labels().join(", ")
    );
    println!("  Catalog:      {} foods", predictor.nutrition().len());
    Ok(())
}
