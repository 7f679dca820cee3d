//! Operator CLI: run migrations, provision accounts and load demo data.
//!
//! Reads the same layered configuration as the server (`config/*.toml`,
//! `APP__*` environment variables).

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::{debug, info, warn};

use textile_erp::{
    auth::user::{self, Entity as UserEntity},
    config::{self, AppConfig},
    db::{self, DbPool},
    errors::ServiceError,
    events::{self, EventSender},
    services::{
        asu_machines::{AsuMachineService, CreateAsuMachine},
        count_products::{CountProductService, CreateCountProduct},
        dyeing::{CreateDyeingFirm, DyeingService},
        inventory::{CreateInventoryItem, InventoryService},
        users::{CreateUser, ResetPassword, UserService},
    },
    entities::inventory_item::ItemCategory,
};

#[derive(Parser)]
#[command(name = "textile-admin", about = "Administration tasks for the textile ERP", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a user account
    CreateUser(CreateUserArgs),
    /// Replace a user's password
    ResetPassword(ResetPasswordArgs),
    /// Insert demo machines, count products, a dyeing firm and stock items
    SeedDemo,
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value = "admin")]
    role: String,
    /// Restrict the account to one ASU unit
    #[arg(long)]
    unit: Option<i32>,
}

#[derive(Args)]
struct ResetPasswordArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

struct CliContext {
    _config: AppConfig,
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let (event_sender, mut event_rx) = events::channel(32);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "textile_admin", event = event.name(), "received event");
            }
        });

        Ok(Self {
            _config: config,
            db,
            event_sender,
        })
    }

    fn users(&self) -> UserService {
        UserService::new(self.db.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db).await?;
            println!("Migrations applied");
        }
        Commands::CreateUser(args) => create_user(&context, args, cli.json).await?,
        Commands::ResetPassword(args) => reset_password(&context, args).await?,
        Commands::SeedDemo => seed_demo(&context).await?,
    }

    Ok(())
}

async fn create_user(context: &CliContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let profile = context
        .users()
        .create(CreateUser {
            name: args.name,
            email: args.email,
            password: args.password,
            role: args.role,
            unit: args.unit,
        })
        .await
        .map_err(|e| anyhow!("failed to create user: {}", e))?;

    if json {
        print_json(&profile)?;
    } else {
        println!(
            "Created {} ({}) with role {}",
            profile.email,
            profile.id,
            profile.role.as_str()
        );
    }
    Ok(())
}

async fn reset_password(context: &CliContext, args: ResetPasswordArgs) -> Result<()> {
    let email = args.email.trim().to_lowercase();
    let account = UserEntity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&*context.db)
        .await?
        .ok_or_else(|| anyhow!("no user with email {}", email))?;

    context
        .users()
        .reset_password(
            account.id,
            ResetPassword {
                new_password: args.password,
            },
        )
        .await
        .map_err(|e| anyhow!("failed to reset password: {}", e))?;

    println!("Password reset for {}", email);
    Ok(())
}

/// Conflicts mean the row is already there; anything else aborts the seed.
fn tolerate_existing<T>(result: Result<T, ServiceError>, what: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ServiceError::Conflict(msg)) => {
            warn!(%what, "skipping: {}", msg);
            Ok(None)
        }
        Err(e) => Err(anyhow!("failed to seed {}: {}", what, e)),
    }
}

async fn seed_demo(context: &CliContext) -> Result<()> {
    let machines = AsuMachineService::new(context.db.clone(), context.event_sender.clone());
    let counts = CountProductService::new(context.db.clone());
    let dyeing = DyeingService::new(context.db.clone(), context.event_sender.clone());
    let inventory = InventoryService::new(context.db.clone(), context.event_sender.clone());

    let mut created = 0usize;

    for (unit, machine_no, count, production_at_100) in [
        (1, 1, "30s", 180.0),
        (1, 2, "30s", 180.0),
        (1, 3, "40s", 140.0),
        (2, 1, "20s", 240.0),
        (2, 2, "20s", 240.0),
    ] {
        let input = CreateAsuMachine {
            unit,
            machine_no,
            machine_name: format!("ASU-{}-{:02}", unit, machine_no),
            count: count.to_string(),
            yarn_type: "Cotton Combed".to_string(),
            spindles: 1008,
            speed: 17500.0,
            production_at_100,
            is_active: true,
        };
        let what = format!("ASU machine {}/{}", unit, machine_no);
        if tolerate_existing(machines.create(input).await, &what)?.is_some() {
            created += 1;
        }
    }

    for (count_name, rate) in [("20s", 210), ("30s", 245), ("40s", 290)] {
        let input = CreateCountProduct {
            count_name: count_name.to_string(),
            yarn_type: "Cotton Combed".to_string(),
            quality: Some("A".to_string()),
            description: None,
            rate_per_kg: Some(Decimal::from(rate)),
            is_active: true,
        };
        if tolerate_existing(counts.create(input).await, count_name)?.is_some() {
            created += 1;
        }
    }

    let firm = CreateDyeingFirm {
        name: "Shree Colour Processors".to_string(),
        contact_person: Some("R. Iyer".to_string()),
        phone: Some("+91-422-2500100".to_string()),
        address: Some("SIDCO Estate, Coimbatore".to_string()),
        is_active: true,
    };
    if tolerate_existing(dyeing.create_firm(firm).await, "dyeing firm")?.is_some() {
        created += 1;
    }

    for (sku, name, category, uom, quantity, reorder_level, unit_cost) in [
        ("RM-COTTON-S6", "Raw cotton Shankar-6", ItemCategory::RawMaterial, "kg", 12000, 3000, 1625),
        ("DYE-REACT-RED", "Reactive red dye", ItemCategory::Dye, "kg", 80, 25, 9400),
        ("CHEM-SODA-ASH", "Soda ash", ItemCategory::Chemical, "kg", 400, 100, 380),
        ("PACK-CONE-PAPER", "Paper cones", ItemCategory::Packing, "pcs", 5000, 1500, 24),
    ] {
        let input = CreateInventoryItem {
            sku: sku.to_string(),
            name: name.to_string(),
            category,
            unit_of_measure: uom.to_string(),
            quantity: Decimal::from(quantity),
            reorder_level: Decimal::from(reorder_level),
            // Unit costs are listed in tenths
            unit_cost: Decimal::new(unit_cost, 1),
            location: Some("Main store".to_string()),
        };
        if tolerate_existing(inventory.create(input, None).await, sku)?.is_some() {
            created += 1;
        }
    }

    info!(created, "Demo data seeded");
    println!("Seeded {} demo records", created);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
