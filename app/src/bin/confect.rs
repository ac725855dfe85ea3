use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use structopt::StructOpt;

use confectionery::clients::{AddClient, ClientDraft, ListClients};
use confectionery::dashboard::{Period, ShowDashboard};
use confectionery::ingredients::{AddIngredient, IngredientDraft, ListIngredients, Unit};
use confectionery::orders::{ListOrders, Order, OrderLine, OrderStatus, PlaceOrder, UpdateOrder};
use confectionery::pricing::money;
use confectionery::recipes::{CalculateRecipe, PriceRecipes, Recipe};
use confectionery::semifinished::{CostSemiFinished, ListSemiFinished};
use confectionery::services::{Commandable, Queryable};
use confectionery::users::{RegisterProfile, User};
use infra::documents::HasMeta;
use infra::ids::Id;

#[derive(Debug, StructOpt)]
#[structopt(name = "confect", about = "Confectionery back office CLI")]
struct Opt {
    /// Configuration file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "setup", about = "Create tables and register the profile")]
    Setup,
    #[structopt(name = "ingredients", about = "List ingredients")]
    Ingredients,
    #[structopt(name = "add-ingredient", about = "Add an ingredient")]
    AddIngredient {
        #[structopt(long)]
        name: String,
        #[structopt(long)]
        unit: Unit,
        /// Price per unit
        #[structopt(long)]
        price: Decimal,
    },
    #[structopt(name = "semifinished", about = "List semi-finished products with costs")]
    SemiFinished,
    #[structopt(name = "recipes", about = "List recipes with prices")]
    Recipes,
    #[structopt(name = "cost", about = "Show the cost breakdown of a recipe")]
    Cost { recipe: Id<Recipe> },
    #[structopt(name = "clients", about = "List clients")]
    Clients,
    #[structopt(name = "add-client", about = "Add a client")]
    AddClient {
        #[structopt(long)]
        name: String,
        #[structopt(long)]
        email: Option<String>,
        #[structopt(long)]
        phone: Option<String>,
    },
    #[structopt(name = "orders", about = "List orders")]
    Orders,
    #[structopt(name = "place-order", about = "Place an order")]
    PlaceOrder {
        #[structopt(long)]
        client: Id<confectionery::clients::Client>,
        #[structopt(long)]
        item: String,
        /// Due date, YYYY-MM-DD
        #[structopt(long)]
        due: NaiveDate,
        /// Recipe lines as <recipe id>[:<quantity>]
        #[structopt(long = "line")]
        lines: Vec<OrderLine>,
        /// Manual total; suggested from the lines when absent
        #[structopt(long)]
        total: Option<Decimal>,
        #[structopt(long, default_value = "")]
        notes: String,
    },
    #[structopt(name = "set-status", about = "Change the status of an order")]
    SetStatus { order: Id<Order>, status: OrderStatus },
    #[structopt(name = "dashboard", about = "Show business statistics")]
    Dashboard {
        #[structopt(long, default_value = "month")]
        period: Period,
    },
}

#[derive(Deserialize, Debug)]
struct Config {
    #[serde(flatten)]
    confect: confectionery::config::Config,
    #[serde(default)]
    env_logger: confectionery::config::EnvLogger,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config_buf = String::new();
    File::open(&opt.config)?.read_to_string(&mut config_buf)?;
    let config: Config = toml::from_str(&config_buf)?;

    config.env_logger.builder().init();

    let settings = config.confect.with_env()?;
    let app = confectionery::Confectionery::connect(&settings)?;
    let owner = User::id_for(&settings.profile.email);

    match opt.command {
        Commands::Setup => {
            app.setup()?;
            let user = app.profiles().execute(RegisterProfile {
                name: settings.profile.name.clone(),
                email: settings.profile.email.clone(),
            })?;
            println!("{}: {} <{}>", user.meta().id, user.name, user.email);
        }
        Commands::Ingredients => {
            for ingredient in app.pantry(owner).query(ListIngredients)? {
                println!(
                    "{}: {} {}/{}",
                    ingredient.meta().id,
                    ingredient.name,
                    money(ingredient.price_per_unit),
                    ingredient.unit
                );
            }
        }
        Commands::AddIngredient { name, unit, price } => {
            let ingredient = app
                .pantry(owner)
                .execute(AddIngredient(IngredientDraft::new(&name, unit, price)))?;
            println!("{}", ingredient.meta().id);
        }
        Commands::SemiFinished => {
            let prep = app.prep(owner);
            for semi in prep.query(ListSemiFinished)? {
                let costing = prep.query(CostSemiFinished { id: semi.meta().id })?;
                println!(
                    "{}: {} {}/{}",
                    semi.meta().id,
                    semi.name,
                    money(costing.total_cost),
                    semi.unit
                );
            }
        }
        Commands::Recipes => {
            for quote in app.cookbook(owner).query(PriceRecipes)? {
                println!(
                    "{}: {} {}",
                    quote.recipe_id,
                    quote.name,
                    money(quote.costing.final_price)
                );
            }
        }
        Commands::Cost { recipe } => {
            let quote = app.cookbook(owner).query(CalculateRecipe { id: recipe })?;
            let costing = quote.costing.rounded();
            println!("{}", quote.name);
            println!("  components: {}", costing.base_cost);
            println!("  labor:      {}", costing.labor_cost);
            println!("  total cost: {}", costing.total_cost);
            println!("  markup:     {}%", costing.markup_percent);
            println!("  price:      {}", costing.final_price);
            for missing in quote.unresolved {
                println!("  warning: {}", missing);
            }
        }
        Commands::Clients => {
            for client in app.clients(owner).query(ListClients)? {
                println!(
                    "{}: {} {} {}",
                    client.meta().id,
                    client.name,
                    client.email.clone().unwrap_or_default(),
                    client.phone.clone().unwrap_or_default()
                );
            }
        }
        Commands::AddClient { name, email, phone } => {
            let draft = ClientDraft {
                email,
                phone,
                ..ClientDraft::new(&name)
            };
            let client = app.clients(owner).execute(AddClient(draft))?;
            println!("{}", client.meta().id);
        }
        Commands::Orders => {
            for order in app.orders(owner).query(ListOrders)? {
                print_order(&order);
            }
        }
        Commands::PlaceOrder {
            client,
            item,
            due,
            lines,
            total,
            notes,
        } => {
            let order = app.orders(owner).execute(PlaceOrder {
                client_id: client,
                item,
                due_date: due,
                lines,
                total,
                notes,
            })?;
            print_order(&order);
        }
        Commands::SetStatus { order, status } => {
            let order = app
                .orders(owner)
                .execute(UpdateOrder::status(order, status))?;
            print_order(&order);
        }
        Commands::Dashboard { period } => {
            let stats = app.dashboard(owner).query(ShowDashboard { period })?;
            println!("revenue ({}): {}", period, money(stats.total_revenue));
            println!("clients: {} ({} new)", stats.total_clients, stats.new_clients);
            println!("active orders: {}", stats.active_orders);
            println!("orders this week: {}", stats.recent_activities);
            for order in stats.upcoming_orders.iter() {
                print_order(order);
            }
        }
    }

    Ok(())
}

fn print_order(order: &Order) {
    println!(
        "{}: {} for {} due {} [{}] {}",
        order.meta().id,
        order.item,
        order.client.name,
        order.due_date,
        order.status,
        money(order.total)
    );
}
