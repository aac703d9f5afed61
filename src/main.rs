use creatorscan::classifier::classify;
use creatorscan::cli::{Cli, Commands, ConfigAction, RunsAction};
use creatorscan::collector::{is_comment_candidate, CommentSet};
use creatorscan::config::{Config, ConfigValidator};
use creatorscan::error::{Result, ScanError};
use creatorscan::metrics::{compute_metrics, AdmissionCriteria};
use creatorscan::pipeline::{ConcurrentPipeline, Outcome, Pipeline, PipelineReport};
use creatorscan::runs::{RunRecord, RunStore};
use creatorscan::source::{PacedFactory, ReplayFixture, SourceFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Run {
            fixture,
            keyword,
            profile,
            workers,
            output_dir,
        } => {
            cmd_run(cli.config, &fixture, keyword, profile, workers, output_dir)?;
        }
        Commands::Classify { texts } => {
            cmd_classify(&texts);
        }
        Commands::Analyze {
            file,
            min_comments,
            min_text_pct,
            json,
        } => {
            cmd_analyze(cli.config, &file, min_comments, min_text_pct, json)?;
        }
        Commands::Runs { action } => {
            cmd_runs(cli.config, action)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "creatorscan=debug"
    } else {
        "creatorscan=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_run(
    config_path: Option<PathBuf>,
    fixture: &Path,
    keyword: Option<String>,
    profile: Option<String>,
    workers: Option<usize>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path, profile.clone())?;
    if let Some(keyword) = keyword {
        config.keyword = keyword;
    }
    if let Some(workers) = workers {
        config.pipeline.workers = workers;
    }
    ConfigValidator::validate(&config)?;

    let settings = config.pipeline_settings()?;
    let workers = config.pipeline.workers;
    let mut outputs = config.output_paths();
    if let Some(dir) = &output_dir {
        outputs = outputs.in_dir(dir);
    }

    let store = RunStore::new(config.runs_dir());
    let mut record = RunRecord::new(&config.keyword, workers);
    record.profile = profile;
    record.fixture = Some(fixture.to_path_buf());

    tracing::info!("Loading fixture {}", fixture.display());
    let factory = Arc::new(PacedFactory::new(
        Arc::new(ReplayFixture::load(fixture)?),
        config.scroll_delay_range,
    ));

    let result = if workers > 1 {
        ConcurrentPipeline::new(settings, workers).run(factory)
    } else {
        factory
            .open()
            .map_err(|e| ScanError::SourceUnavailable(e.to_string()))
            .and_then(|mut source| Pipeline::new(settings).run(&mut source))
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            store.save_failed(&mut record, &e);
            return Err(e);
        }
    };

    let record_path = store.save_report(&mut record, &report, &outputs)?;

    print_report(&record, &report);
    println!("  Run record: {}", record_path.display());

    Ok(())
}

fn print_report(record: &RunRecord, report: &PipelineReport) {
    let stats = &report.stats;

    println!("✓ Run {} finished: {:?}", record.id, record.status);
    println!("  Keyword: {}", record.keyword);
    println!(
        "  Candidates: {} ({} triaged, {} skipped, {} failed units)",
        stats.candidates, stats.posts_triaged, stats.posts_skipped, stats.unit_failures
    );
    println!("  Creators registered: {}", report.registered.len());

    if report.outcome != Outcome::Completed {
        return;
    }

    println!(
        "  Posts analyzed: {} ({} passed)",
        stats.posts_analyzed, stats.posts_passed
    );
    println!("\nCreators:");
    for creator in &report.creators {
        let s = &creator.summary;
        println!(
            "  {:<24} posts {:>2}  passed {:>2}  avg EQS {:>7.2}  best {:>7.2}  worst {:>7.2}",
            creator.creator_handle.as_str(),
            s.posts_analyzed,
            s.posts_passed,
            s.avg_eqs,
            s.best_eqs,
            s.worst_eqs
        );
    }
    if let (Some(posts), Some(creators)) = (&record.posts_csv, &record.creators_csv) {
        println!("\n  Posts table: {}", posts.display());
        println!("  Creators table: {}", creators.display());
    }
}

fn cmd_classify(texts: &[String]) {
    for text in texts {
        println!("{:<6}  {}", classify(text).as_str(), text);
    }
}

fn cmd_analyze(
    config_path: Option<PathBuf>,
    file: &Path,
    min_comments: Option<usize>,
    min_text_pct: Option<f64>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, None)?;
    let defaults = config.criteria();
    let criteria = AdmissionCriteria::new(
        min_comments.unwrap_or(defaults.min_comments),
        min_text_pct.unwrap_or(defaults.min_text_percentage),
    );

    let content = std::fs::read_to_string(file).map_err(|e| ScanError::Io {
        source: e,
        context: format!("Failed to read comment file: {}", file.display()),
    })?;

    // Same filtering and deduplication the collector applies
    let comments: CommentSet = content
        .lines()
        .filter(|line| is_comment_candidate(line))
        .map(str::trim)
        .collect();
    let metrics = compute_metrics(comments.as_slice(), &criteria);

    if json {
        let out = serde_json::to_string_pretty(&metrics).map_err(|e| ScanError::Json {
            source: e,
            context: "Failed to serialize metrics".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", file.display());
    println!("  Comments:        {}", metrics.total_comments);
    println!("  Text:            {:.2}%", metrics.text_percentage);
    println!("  Emoji:           {:.2}%", metrics.emoji_percentage);
    println!("  Mixed:           {:.2}%", metrics.mixed_percentage);
    println!("  Unique ratio:    {:.4}", metrics.unique_commenters_ratio);
    println!("  EQS:             {:.2}", metrics.eqs);
    println!(
        "  Result:          {} (needs {} comments, {:.2}% text-based)",
        metrics.pass_label(),
        criteria.min_comments,
        criteria.min_text_percentage
    );

    Ok(())
}

fn cmd_runs(config_path: Option<PathBuf>, action: RunsAction) -> Result<()> {
    let config = load_config(config_path, None)?;
    let store = RunStore::new(config.runs_dir());

    match action {
        RunsAction::List { limit } => {
            let records = store.list()?;
            if records.is_empty() {
                println!("No runs recorded in {}", store.dir().display());
                return Ok(());
            }

            println!("Runs: {} total", records.len());
            for record in records.iter().take(limit) {
                println!(
                    "  {} - {} - {:?} ({} creators, {})",
                    record.id,
                    record.keyword,
                    record.status,
                    record.creators_registered,
                    record.started_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        RunsAction::Show { id } => {
            let record = store.find(&id)?;
            let json = serde_json::to_string_pretty(&record).map_err(|e| ScanError::Json {
                source: e,
                context: "Failed to serialize run record".to_string(),
            })?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { profile } => {
            let config = load_config(config_path, profile)?;
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Profiles: {}", config.profiles.len());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = Config::load_or_default(&path)?;
    if let Some(profile) = profile {
        config.apply_profile(&profile)?;
    }
    Ok(config)
}
