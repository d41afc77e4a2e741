use std::path::PathBuf;

use clap::{Parser, Subcommand};

use funneldash::export::{tree_to_csv, MetricColumns};
use funneldash::{
    Config, ConversionRow, Dashboard, Database, GroupNode, IntervalRow, MarketingFilters,
    MarketingTab, MonthRange, SalesFilters, SdrFilters,
};

#[derive(Parser)]
#[command(name = "funneldash", about = "Funnel analytics over a CRM contacts/deals database")]
struct Cli {
    /// CRM SQLite file (default: `database` from the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.funneldash/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reporting time zone, e.g. Europe/Lisbon
    #[arg(long)]
    tz: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

// Month ranges take `2024-01..2024-03`, `2024-01..`, `..2024-03` or `2024-02`.
#[derive(clap::Args)]
struct PipelineRanges {
    /// Deal created month range
    #[arg(long)]
    created: Option<String>,
    /// Distributed month range
    #[arg(long)]
    distributed: Option<String>,
    /// Completed call month range
    #[arg(long)]
    call: Option<String>,
    /// Proposal sent month range
    #[arg(long)]
    proposal: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Report(ReportCommand),
    /// Create an empty CRM database with the bundled schema
    Init {
        path: PathBuf,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// Commands that read the CRM database.
#[derive(Subcommand)]
enum ReportCommand {
    /// Sales view: owner funnel, intervals, country/program breakdown
    Sales {
        #[command(flatten)]
        ranges: PipelineRanges,
        /// Owner name fragment (repeatable)
        #[arg(long = "owner")]
        owners: Vec<String>,
        /// Restrict to one pipeline
        #[arg(long)]
        pipeline: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print a tree tab as CSV (breakdown)
        #[arg(long, value_name = "TAB")]
        csv: Option<String>,
    },
    /// SDR view: agent funnel, intervals, lost reasons, breakdown
    Sdr {
        #[command(flatten)]
        ranges: PipelineRanges,
        /// SDR agent name fragment (repeatable)
        #[arg(long = "agent")]
        agents: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print a tree tab as CSV (breakdown)
        #[arg(long, value_name = "TAB")]
        csv: Option<String>,
    },
    /// Marketing view: attribution trees over contacts
    Marketing {
        /// Contact created month range
        #[arg(long)]
        contact_created: Option<String>,
        /// Deal created month range
        #[arg(long)]
        deal_created: Option<String>,
        /// Distributed month range
        #[arg(long)]
        distributed: Option<String>,
        /// Proposal sent month range
        #[arg(long)]
        proposal_sent: Option<String>,
        /// Proposal signed month range
        #[arg(long)]
        proposal_signed: Option<String>,
        /// Apply only the contact created range
        #[arg(long)]
        contact_only: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print a tree tab as CSV (utm, first_touch, submission, ft_submission)
        #[arg(long, value_name = "TAB")]
        csv: Option<String>,
    },
    /// Print every deal with derived timings as JSON
    Deals,
    /// List filter values
    Meta {
        #[command(subcommand)]
        list: MetaList,
    },
    /// Show which optional attribution columns the database has
    Schema,
}

#[derive(Subcommand)]
enum MetaList {
    /// Distinct deal owners
    Owners,
    /// Distinct SDR agents
    Agents,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.database = Some(db);
    }
    if let Some(tz) = cli.tz {
        config.reporting_timezone = tz;
    }
    config.validate()?;

    match cli.command {
        Commands::Init { path } => {
            Database::create_at(&path).await?;
            println!("Created {}", path.display());
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            print!("{}", config.to_toml()?);
        }
        Commands::Report(command) => {
            let dash = open_dashboard(config).await?;
            run_report(&dash, command).await?;
        }
    }
    Ok(())
}

async fn open_dashboard(config: Config) -> anyhow::Result<Dashboard> {
    let Some(path) = config.database.clone() else {
        anyhow::bail!("no database given. Pass --db or set `database` in the config file.");
    };
    let db = Database::open_at(&path).await?;
    Ok(Dashboard::new(db, config).await?)
}

fn range(spec: Option<&str>) -> anyhow::Result<MonthRange> {
    Ok(spec.map(MonthRange::parse_spec).transpose()?.unwrap_or_default())
}

async fn run_report(dash: &Dashboard, command: ReportCommand) -> anyhow::Result<()> {
    match command {
        ReportCommand::Sales {
            ranges,
            owners,
            pipeline,
            json,
            csv,
        } => {
            let filters = SalesFilters {
                created: range(ranges.created.as_deref())?,
                distributed: range(ranges.distributed.as_deref())?,
                call: range(ranges.call.as_deref())?,
                proposal: range(ranges.proposal.as_deref())?,
                owners,
                pipeline,
            };
            let report = dash.sales(&filters).await?;
            if let Some(tab) = csv {
                expect_breakdown(&tab)?;
                print!("{}", tree_to_csv(&report.breakdown));
            } else if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Sales Overview");
                print_funnel(&report.overview);
                print_conversion("Owner", &report.owner_conversion);
                print_intervals("Owner", &report.time_intervals);
                println!("Country / Program");
                print_tree(&report.breakdown, 1);
            }
        }
        ReportCommand::Sdr {
            ranges,
            agents,
            json,
            csv,
        } => {
            let filters = SdrFilters {
                created: range(ranges.created.as_deref())?,
                distributed: range(ranges.distributed.as_deref())?,
                call: range(ranges.call.as_deref())?,
                proposal: range(ranges.proposal.as_deref())?,
                agents,
            };
            let report = dash.sdr(&filters).await?;
            if let Some(tab) = csv {
                expect_breakdown(&tab)?;
                print!("{}", tree_to_csv(&report.breakdown));
            } else if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("SDR Overview");
                print_funnel(&report.overview);
                print_conversion("Agent", &report.agent_conversion);
                print_intervals("Agent", &report.time_intervals);
                println!("MQL Lost Reasons");
                for r in &report.mql_lost_reasons {
                    println!("  {:>6}  {}", r.count, r.reason);
                }
                println!("Country / Program");
                print_tree(&report.breakdown, 1);
            }
        }
        ReportCommand::Marketing {
            contact_created,
            deal_created,
            distributed,
            proposal_sent,
            proposal_signed,
            contact_only,
            json,
            csv,
        } => {
            let filters = MarketingFilters {
                contact_created: range(contact_created.as_deref())?,
                deal_created: range(deal_created.as_deref())?,
                distributed: range(distributed.as_deref())?,
                proposal_sent: range(proposal_sent.as_deref())?,
                proposal_signed: range(proposal_signed.as_deref())?,
                contact_only,
            };
            let report = dash.marketing(&filters).await?;
            if let Some(tab) = csv {
                let tab = MarketingTab::parse(&tab)
                    .ok_or_else(|| anyhow::anyhow!("unknown marketing tab: {tab}"))?;
                print!("{}", tree_to_csv(report.tab(tab)));
            } else if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for tab in MarketingTab::ALL {
                    let nodes = report.tab(tab);
                    if nodes.is_empty() && tab.is_first_touch() {
                        continue;
                    }
                    println!("{} ({})", tab.name(), tab.levels().join(" / "));
                    print_tree(nodes, 1);
                }
            }
        }
        ReportCommand::Deals => {
            let deals = dash.deals().await?;
            println!("{}", serde_json::to_string_pretty(&deals)?);
        }
        ReportCommand::Meta { list } => {
            let values = match list {
                MetaList::Owners => dash.owners().await?,
                MetaList::Agents => dash.sdr_agents().await?,
            };
            for v in values {
                println!("{v}");
            }
        }
        ReportCommand::Schema => {
            let caps = dash.capabilities();
            println!("Optional contact columns");
            for field in funneldash::storage::schema::OPTIONAL_FIELDS {
                let (_, column) = funneldash::storage::schema::column_for(field);
                let mark = if caps.has(field) { "yes" } else { "no" };
                println!("  {:<30} {mark}", column);
            }
            println!(
                "First-touch tabs: {}",
                if dash.context().first_touch { "on" } else { "off" }
            );
        }
    }
    Ok(())
}

fn expect_breakdown(tab: &str) -> anyhow::Result<()> {
    if tab.trim().eq_ignore_ascii_case("breakdown") {
        Ok(())
    } else {
        anyhow::bail!("unknown tab: {tab} (expected: breakdown)")
    }
}

fn print_funnel(c: &funneldash::FunnelCounts) {
    println!("  Created:          {}", c.created);
    println!("  Distributed:      {}", c.distributed);
    println!("  Calls scheduled:  {}", c.calls_scheduled);
    println!("  Calls completed:  {}", c.calls_completed);
    println!("  Proposals:        {}", c.proposals);
    println!("  Closed won:       {}", c.closed_won);
}

fn print_conversion(title: &str, rows: &[ConversionRow]) {
    println!("{title} Conversion");
    println!(
        "  {:<28} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}  {:>6} {:>6} {:>6} {:>6} {:>6}",
        "", "created", "dist", "sched", "done", "prop", "won", "c>d%", "d>s%", "s>c%", "c>p%", "p>w%"
    );
    for r in rows {
        let f = &r.funnel;
        let c = &r.conversion;
        println!(
            "  {:<28} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}  {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1}",
            truncate(&r.label, 28),
            f.created,
            f.distributed,
            f.calls_scheduled,
            f.calls_completed,
            f.proposals,
            f.closed_won,
            c.conv_created_to_distributed,
            c.conv_distributed_to_scheduled,
            c.conv_scheduled_to_completed,
            c.conv_completed_to_proposal,
            c.conv_proposal_to_won,
        );
    }
}

fn print_intervals(title: &str, rows: &[IntervalRow]) {
    println!("{title} Time Intervals (avg / median)");
    for r in rows {
        println!("  {}", r.label);
        for (prefix, s) in r.stats.entries() {
            let show = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{v}"));
            println!(
                "    {:<12} {:>10} {:>10}  {}",
                prefix,
                show(s.avg),
                show(s.median),
                s.modes
            );
        }
    }
}

fn print_tree<M: MetricColumns>(nodes: &[GroupNode<M>], indent: usize) {
    for node in nodes {
        let values: Vec<String> = node.metrics.values().iter().map(u64::to_string).collect();
        println!(
            "{}{}  [{}]",
            "  ".repeat(indent),
            node.label,
            M::headers()
                .iter()
                .zip(values)
                .map(|(h, v)| format!("{h}={v}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        print_tree(node.children(), indent + 1);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_commands_parse_flat() {
        let cli = Cli::try_parse_from(["funneldash", "sales", "--owner", "jane", "--json"]).unwrap();
        match cli.command {
            Commands::Report(ReportCommand::Sales { owners, json, .. }) => {
                assert_eq!(owners, vec!["jane"]);
                assert!(json);
            }
            _ => panic!("expected sales"),
        }

        let cli = Cli::try_parse_from(["funneldash", "meta", "agents"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Report(ReportCommand::Meta {
                list: MetaList::Agents
            })
        ));
    }

    #[test]
    fn test_setup_commands_need_no_database() {
        let cli = Cli::try_parse_from(["funneldash", "init", "/tmp/crm.db"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { .. }));

        let cli = Cli::try_parse_from(["funneldash", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
