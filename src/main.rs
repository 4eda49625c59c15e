use campaign_ledger::application::gateway::GatewayAdapter;
use campaign_ledger::application::service::CampaignService;
use campaign_ledger::config::{Environment, Settings};
use campaign_ledger::domain::campaign::CampaignId;
use campaign_ledger::domain::money::to_minor_units;
use campaign_ledger::domain::pledge::PledgeId;
use campaign_ledger::domain::ports::{
    AuditLogRef, CampaignStoreBox, PaymentProcessorBox, UserDirectoryBox,
};
use campaign_ledger::domain::user::{User, UserId};
use campaign_ledger::infrastructure::audit::TracingAuditLog;
use campaign_ledger::infrastructure::in_memory::{InMemoryCampaignStore, InMemoryUserDirectory};
#[cfg(feature = "gateway-http")]
use campaign_ledger::infrastructure::http::HttpProcessor;
#[cfg(feature = "storage-rocksdb")]
use campaign_ledger::infrastructure::rocksdb::RocksDBStore;
use campaign_ledger::infrastructure::simulated::SimulatedProcessor;
use campaign_ledger::interfaces::csv::refund_writer::RefundReportWriter;
use campaign_ledger::interfaces::json::overview::CampaignOverview;
use campaign_ledger::interfaces::json::seed::SeedFile;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use miette::{IntoDiagnostic, Result, miette};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one campaign as JSON, with its progress and days left
    Show { campaign: Uuid },
    /// Print every campaign as JSON, newest first
    List,
    Approve { campaign: Uuid },
    Reject {
        campaign: Uuid,
        #[arg(long)]
        reason: String,
    },
    Launch { campaign: Uuid },
    End { campaign: Uuid },
    Cancel { campaign: Uuid },
    /// Refund every open pledge of an ended, unsuccessful campaign
    RefundAll { campaign: Uuid },
    /// Refund a single pledge
    Refund {
        campaign: Uuid,
        pledge: Uuid,
        #[arg(long)]
        reason: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    campaign_ledger::telemetry::init();

    let (campaigns, users) = open_stores(&cli.settings)?;
    let seed = match &cli.settings.seed {
        Some(path) => Some(SeedFile::from_path(path).into_diagnostic()?),
        None => None,
    };
    if let Some(seed) = &seed {
        seed.apply(campaigns.as_ref(), users.as_ref())
            .await
            .into_diagnostic()?;
    }

    let audit: AuditLogRef = Arc::new(TracingAuditLog);
    let processor = payment_processor(&cli.settings, seed.as_ref()).await?;
    let gateway = GatewayAdapter::new(processor, audit.clone(), cli.settings.gateway());
    let service = CampaignService::new(campaigns, users, gateway, audit);

    let actor = match cli.settings.actor {
        Some(id) => Some(resolve_actor(&service, UserId(id)).await?),
        None => None,
    };
    let require_actor = || actor.as_ref().ok_or_else(|| miette!("--actor is required for this command"));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Show { campaign } => {
            let campaign = service.campaign(CampaignId(campaign)).await.into_diagnostic()?;
            write_json(&mut out, &CampaignOverview::new(&campaign, Utc::now()))?;
        }
        Command::List => {
            let all = service.campaigns().await.into_diagnostic()?;
            let now = Utc::now();
            let overviews: Vec<_> = all.iter().map(|c| CampaignOverview::new(c, now)).collect();
            write_json(&mut out, &overviews)?;
        }
        Command::Approve { campaign } => {
            let updated = service
                .approve_campaign(CampaignId(campaign), require_actor()?)
                .await
                .into_diagnostic()?;
            write_json(&mut out, &updated)?;
        }
        Command::Reject { campaign, reason } => {
            let updated = service
                .reject_campaign(CampaignId(campaign), require_actor()?, &reason)
                .await
                .into_diagnostic()?;
            write_json(&mut out, &updated)?;
        }
        Command::Launch { campaign } => {
            let updated = service
                .launch_campaign(CampaignId(campaign), require_actor()?)
                .await
                .into_diagnostic()?;
            write_json(&mut out, &updated)?;
        }
        Command::End { campaign } => {
            let updated = service
                .end_campaign(CampaignId(campaign), require_actor()?)
                .await
                .into_diagnostic()?;
            write_json(&mut out, &updated)?;
        }
        Command::Cancel { campaign } => {
            let updated = service
                .cancel_campaign(CampaignId(campaign), require_actor()?)
                .await
                .into_diagnostic()?;
            write_json(&mut out, &updated)?;
        }
        Command::RefundAll { campaign } => {
            let report = service
                .refund_campaign(CampaignId(campaign), require_actor()?)
                .await
                .into_diagnostic()?;
            RefundReportWriter::new(&mut out)
                .write_report(&report)
                .into_diagnostic()?;
            eprintln!("{}", report.summary());
        }
        Command::Refund {
            campaign,
            pledge,
            reason,
        } => {
            let pledge = PledgeId(pledge);
            let receipt = service
                .refund_pledge(CampaignId(campaign), pledge, require_actor()?, &reason)
                .await
                .into_diagnostic()?;
            RefundReportWriter::new(&mut out)
                .write_receipt(pledge, &receipt)
                .into_diagnostic()?;
        }
    }

    Ok(())
}

fn open_stores(settings: &Settings) -> Result<(CampaignStoreBox, UserDirectoryBox)> {
    if let Some(db_path) = &settings.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            info!(path = %db_path.display(), "using RocksDB storage");
            return Ok((Box::new(store.clone()), Box::new(store)));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            let _ = db_path;
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
        }
    }
    Ok((
        Box::new(InMemoryCampaignStore::new()),
        Box::new(InMemoryUserDirectory::new()),
    ))
}

async fn payment_processor(settings: &Settings, seed: Option<&SeedFile>) -> Result<PaymentProcessorBox> {
    #[cfg(feature = "gateway-http")]
    {
        if let Some(url) = &settings.processor_url {
            let key = settings.processor_api_key.as_deref().ok_or_else(|| {
                miette!("PROCESSOR_API_KEY is required when PROCESSOR_URL is set")
            })?;
            let processor = HttpProcessor::new(url.as_str(), key).into_diagnostic()?;
            info!(%url, "using HTTP payment processor");
            return Ok(Box::new(processor));
        }
    }

    if settings.environment == Environment::Production {
        return Err(miette!(
            "No payment processor configured; production needs PROCESSOR_URL and the 'gateway-http' feature"
        ));
    }

    let processor = SimulatedProcessor::lenient();
    for campaign in seed.map(|s| s.campaigns.as_slice()).unwrap_or_default() {
        for pledge in &campaign.backers {
            if let Some(charge) = &pledge.transaction_id {
                let minor = to_minor_units(pledge.amount.value()).into_diagnostic()?;
                processor.register_charge(charge.as_str(), minor).await;
            }
        }
    }
    info!("using simulated payment processor");
    Ok(Box::new(processor))
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).into_diagnostic()?;
    writeln!(out).into_diagnostic()
}

async fn resolve_actor(service: &CampaignService, id: UserId) -> Result<User> {
    service
        .user(id)
        .await
        .into_diagnostic()?
        .ok_or_else(|| miette!("Unknown actor {id}"))
}
