use crate::infra::{parse_date, today};
use crate::reports::{
    advisor_customers, advisor_overview, advisor_table, goal_comparison, product_report,
    ReportParams,
};
use chrono::{NaiveDate, Utc};
use clap::Args;
use policy_desk::config::AppConfig;
use policy_desk::error::AppError;
use policy_desk::import::load_rows;
use policy_desk::pipeline::{PolicyPipeline, SourceRows};
use policy_desk::reporting::{CompanySegment, DatasetStore, OfferSources, ADVISOR_ROSTER};
use policy_desk::telemetry;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct CustomersArgs {
    /// AXA policy export (CSV or JSON)
    #[arg(long)]
    pub(crate) axa: PathBuf,
    /// Nærsikring policy export
    #[arg(long)]
    pub(crate) naersikring: PathBuf,
    /// Customer master list
    #[arg(long)]
    pub(crate) customers: PathBuf,
    /// Accident/Health policy export
    #[arg(long)]
    pub(crate) accident: Option<PathBuf>,
    /// Marketing consent list
    #[arg(long)]
    pub(crate) marketing: Option<PathBuf>,
    /// Write the dataset here instead of stdout
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Emit one flat row per policy instead of the customer dataset
    #[arg(long)]
    pub(crate) flat: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// The converted, non-converted, rejected and Nærsikring portfolio exports
    #[arg(required = true, num_args = 1..)]
    pub(crate) files: Vec<PathBuf>,
    /// Override the configured data directory
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ScopeArgs {
    /// Company segment: hdi, axa, nærsikring, hdi-axa or alle
    #[arg(long)]
    pub(crate) segment: Option<CompanySegment>,
    /// Count migrated sales as well
    #[arg(long)]
    pub(crate) include_migrated: bool,
    /// Reporting year (defaults to the current year)
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Restrict product tables to one month (1-12)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub(crate) month: Option<u32>,
    /// Reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Override the configured data directory
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

impl ScopeArgs {
    fn params(&self) -> ReportParams {
        ReportParams::new(
            self.segment,
            self.include_migrated,
            self.year,
            self.month,
            self.today.unwrap_or_else(today),
        )
    }
}

#[derive(Args, Debug)]
pub(crate) struct AdvisorArgs {
    /// Advisor code
    #[arg(value_parser = clap::builder::PossibleValuesParser::new(ADVISOR_ROSTER))]
    pub(crate) code: String,
    /// Print customer statistics instead of sales and products
    #[arg(long)]
    pub(crate) customers: bool,
    #[command(flatten)]
    pub(crate) scope: ScopeArgs,
}

fn open_store(data_dir: Option<PathBuf>) -> Result<DatasetStore, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = data_dir {
        config.data.data_dir = data_dir;
    }
    telemetry::init(&config.telemetry)?;
    Ok(DatasetStore::new(&config.data))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn run_customers(args: CustomersArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let sources = SourceRows {
        axa: load_rows(&args.axa)?,
        naersikring: load_rows(&args.naersikring)?,
        accident_health: match &args.accident {
            Some(path) => load_rows(path)?,
            None => Vec::new(),
        },
    };
    let consent_rows = match &args.marketing {
        Some(path) => load_rows(path)?,
        None => Vec::new(),
    };
    let pipeline = PolicyPipeline::from_rows(&load_rows(&args.customers)?, &consent_rows);

    let json = if args.flat {
        serde_json::to_string_pretty(&pipeline.policy_rows(&sources))?
    } else {
        serde_json::to_string_pretty(&pipeline.run(&sources, Utc::now()))?
    };

    match args.out {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("Customer dataset written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub(crate) fn run_offer_import(args: ImportArgs) -> Result<(), AppError> {
    let store = open_store(args.data_dir)?;
    let dataset = OfferSources::from_paths(&args.files)?.assemble()?;
    store.save(&dataset)?;

    println!(
        "Saved {} converted, {} non-converted and {} rejected offers to {}",
        dataset.converted.len(),
        dataset.non_converted.len(),
        dataset.rejected.len(),
        store.dataset_path().display()
    );
    Ok(())
}

pub(crate) fn run_product_report(args: ScopeArgs) -> Result<(), AppError> {
    let params = args.params();
    let data = open_store(args.data_dir)?.load()?;
    print_json(&product_report(&data, &params))
}

pub(crate) fn run_goal_report(args: ScopeArgs) -> Result<(), AppError> {
    let params = args.params();
    let data = open_store(args.data_dir)?.load()?;
    print_json(&goal_comparison(&data, &params))
}

pub(crate) fn run_advisor_table(args: ScopeArgs) -> Result<(), AppError> {
    let params = args.params();
    let data = open_store(args.data_dir)?.load()?;
    print_json(&advisor_table(&data, &params))
}

pub(crate) fn run_advisor_report(args: AdvisorArgs) -> Result<(), AppError> {
    let params = args.scope.params();
    let data = open_store(args.scope.data_dir)?.load()?;
    if args.customers {
        print_json(&advisor_customers(&data, &args.code, &params))
    } else {
        print_json(&advisor_overview(&data, &args.code, &params))
    }
}
