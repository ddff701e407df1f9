use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::time::Duration;
use sctid::{
    AllocatorConfig, ComponentCategory, Namespace, RangeReservation, Reservations, Sctid,
    SingleReservation,
};

/// Runtime configuration for the `sctid-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is honored), with defaults suitable for a single-node
/// deployment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sctid-server",
    version,
    about = "An HTTP service allocating SNOMED CT identifiers"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:3000"))]
    pub server_addr: String,

    /// Consecutive rejected candidates before a generation request fails.
    ///
    /// Environment variable: `MAX_GENERATION_ATTEMPTS`
    #[arg(
        long,
        env = "MAX_GENERATION_ATTEMPTS",
        default_value_t = sctid::DEFAULT_MAX_GENERATION_ATTEMPTS
    )]
    pub max_generation_attempts: usize,

    /// Identifiers read from the store per round trip in bulk operations.
    ///
    /// Environment variable: `REQUEST_BULK_LIMIT`
    #[arg(
        long,
        env = "REQUEST_BULK_LIMIT",
        default_value_t = sctid::DEFAULT_REQUEST_BULK_LIMIT
    )]
    pub request_bulk_limit: usize,

    /// Largest `quantity` accepted by bulk generate/reserve, and the largest
    /// id list accepted by any bulk endpoint.
    ///
    /// Environment variable: `MAX_BULK_QUANTITY`
    #[arg(long, env = "MAX_BULK_QUANTITY", default_value_t = 1_000_000)]
    pub max_bulk_quantity: usize,

    /// Number of independently locked shards in the in-memory store.
    ///
    /// Environment variable: `STORE_SHARDS`
    #[arg(long, env = "STORE_SHARDS", default_value_t = sctid::DEFAULT_SHARDS)]
    pub store_shards: usize,

    /// How candidate item ids are proposed.
    ///
    /// Environment variable: `STRATEGY`
    #[arg(long, env = "STRATEGY", value_enum, default_value_t = StrategyKind::Sequential)]
    pub strategy: StrategyKind,

    /// Seconds a bulk job may run before it is cancelled.
    ///
    /// Environment variable: `JOB_TIMEOUT_SECS`
    #[arg(long, env = "JOB_TIMEOUT_SECS", default_value_t = 300)]
    pub job_timeout_secs: u64,

    /// Seconds a finished or failed bulk job, including its records, stays
    /// queryable before it is dropped.
    ///
    /// Environment variable: `JOB_RETENTION_SECS`
    #[arg(long, env = "JOB_RETENTION_SECS", default_value_t = 600)]
    pub job_retention_secs: u64,

    /// Bulk jobs allowed to run at the same time; further jobs wait as
    /// `Pending`. Defaults to the number of CPUs.
    ///
    /// Environment variable: `MAX_CONCURRENT_JOBS`
    #[arg(long, env = "MAX_CONCURRENT_JOBS")]
    pub max_concurrent_jobs: Option<usize>,

    /// Comma separated identifiers that must never be allocated.
    ///
    /// Environment variable: `RESERVED_IDS`
    #[arg(long, env = "RESERVED_IDS", value_delimiter = ',')]
    pub reserved_ids: Vec<String>,

    /// Comma separated item id ranges that must never be allocated, written
    /// `namespace:from-to[:category+category]`. An empty namespace means
    /// international, e.g. `:100-199` or `1000154:1-500:concept`.
    ///
    /// Environment variable: `RESERVED_RANGES`
    #[arg(long, env = "RESERVED_RANGES", value_delimiter = ',')]
    pub reserved_ranges: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    Sequential,
    Random,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub allocator: AllocatorConfig,
    pub max_bulk_quantity: usize,
    pub store_shards: usize,
    pub strategy: StrategyKind,
    pub job_timeout: Duration,
    pub job_retention: Duration,
    pub max_concurrent_jobs: usize,
    pub reserved_ids: Vec<Sctid>,
    pub reserved_ranges: Vec<RangeReservation>,
}

impl ServerConfig {
    /// Builds the reservation registry described by this configuration.
    pub fn reservations(&self) -> Reservations {
        let reservations = Reservations::new();
        for id in &self.reserved_ids {
            reservations.create(format!("id:{id}"), SingleReservation::new(id.clone()));
        }
        for (index, range) in self.reserved_ranges.iter().enumerate() {
            reservations.create(format!("range:{index}"), range.clone());
        }
        reservations
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_generation_attempts == 0 {
            bail!("MAX_GENERATION_ATTEMPTS must be greater than 0");
        }
        if args.request_bulk_limit == 0 {
            bail!("REQUEST_BULK_LIMIT must be greater than 0");
        }
        if args.max_bulk_quantity == 0 {
            bail!("MAX_BULK_QUANTITY must be greater than 0");
        }
        if args.store_shards == 0 {
            bail!("STORE_SHARDS must be greater than 0");
        }
        if args.job_timeout_secs == 0 {
            bail!("JOB_TIMEOUT_SECS must be greater than 0");
        }
        if args.job_retention_secs == 0 {
            bail!("JOB_RETENTION_SECS must be greater than 0");
        }

        let max_concurrent_jobs = args.max_concurrent_jobs.unwrap_or_else(num_cpus::get);
        if max_concurrent_jobs == 0 {
            bail!("MAX_CONCURRENT_JOBS must be greater than 0");
        }

        let reserved_ids = args
            .reserved_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| {
                Sctid::parse(id).with_context(|| format!("invalid RESERVED_IDS entry `{id}`"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let reserved_ranges = args
            .reserved_ranges
            .iter()
            .map(|range| range.trim())
            .filter(|range| !range.is_empty())
            .map(parse_range)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            server_addr: args.server_addr,
            allocator: AllocatorConfig::default()
                .with_max_generation_attempts(args.max_generation_attempts)
                .with_request_bulk_limit(args.request_bulk_limit),
            max_bulk_quantity: args.max_bulk_quantity,
            store_shards: args.store_shards,
            strategy: args.strategy,
            job_timeout: Duration::from_secs(args.job_timeout_secs),
            job_retention: Duration::from_secs(args.job_retention_secs),
            max_concurrent_jobs,
            reserved_ids,
            reserved_ranges,
        })
    }
}

/// Parses `namespace:from-to[:category+category]`.
fn parse_range(raw: &str) -> anyhow::Result<RangeReservation> {
    let context = || format!("invalid RESERVED_RANGES entry `{raw}`");

    let mut parts = raw.split(':');
    let (Some(namespace), Some(bounds)) = (parts.next(), parts.next()) else {
        bail!("{}: expected `namespace:from-to`", context());
    };
    let categories = parts.next();
    if parts.next().is_some() {
        bail!("{}: too many `:` separators", context());
    }

    let namespace = Namespace::new(namespace.trim()).with_context(context)?;
    let Some((from, to)) = bounds.split_once('-') else {
        bail!("{}: expected `from-to`", context());
    };
    let from: u64 = from.trim().parse().with_context(context)?;
    let to: u64 = to.trim().parse().with_context(context)?;
    if from > to {
        bail!("{}: range start exceeds end", context());
    }

    let categories = categories
        .into_iter()
        .flat_map(|list| list.split('+'))
        .map(|name| name.trim().parse::<ComponentCategory>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(context)?;

    Ok(RangeReservation::new(namespace, from..=to, categories))
}
