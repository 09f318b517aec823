use crate::commands::{
    run_advisor_report, run_advisor_table, run_customers, run_goal_report, run_offer_import,
    run_product_report, AdvisorArgs, CustomersArgs, ImportArgs, ScopeArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use policy_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Policy Desk",
    about = "Build customer portfolios from policy exports and report on insurance sales",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Build the customer dataset from AXA, Nærsikring and Accident/Health exports
    Customers(CustomersArgs),
    /// Manage the stored offer dataset
    Offers {
        #[command(subcommand)]
        command: OffersCommand,
    },
    /// Print a sales report from the stored offer dataset as JSON
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum OffersCommand {
    /// Identify, assemble and save an upload of offer exports
    Import(ImportArgs),
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Offers, premium and hit rate per product
    Products(ScopeArgs),
    /// Monthly sales against goals for the current year
    Goals(ScopeArgs),
    /// Monthly premium per advisor
    Advisors(ScopeArgs),
    /// Sales, products or customer statistics for one advisor
    Advisor(AdvisorArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Customers(args) => run_customers(args),
        Command::Offers {
            command: OffersCommand::Import(args),
        } => run_offer_import(args),
        Command::Report { command } => match command {
            ReportCommand::Products(args) => run_product_report(args),
            ReportCommand::Goals(args) => run_goal_report(args),
            ReportCommand::Advisors(args) => run_advisor_table(args),
            ReportCommand::Advisor(args) => run_advisor_report(args),
        },
    }
}
