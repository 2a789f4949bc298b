use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use kennel::api::{ApiClient, ApiResponse, FilePart, Notifier, Severity};
use kennel::config::Config;
use kennel::domain::resource::{self, Resource};
use kennel::domain::{
  dogs, leads, litters, photos, soft, Customer, CustomerApi, Dog, EntityType, Heat, Lead,
  LeadStatus, Litter, PhotoUpload, Puppy,
};
use kennel::session::Session;
use kennel::storage::{LocalStore, MemoryStore, SqliteStore};
use kennel::store::{AuthStore, MessageStore, PollEvent};

#[derive(Parser, Debug)]
#[command(name = "kennel")]
#[command(about = "Command line client for the kennel breeder-management API")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/kennel/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Also write logs to daily files in this directory
  #[arg(long, global = true)]
  pub log_dir: Option<PathBuf>,

  /// Keep local storage in memory for this run only
  #[arg(long, global = true)]
  pub ephemeral: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Sign in and store the token
  Login {
    #[arg(long)]
    email: String,
    /// Read from KENNEL_PASSWORD or stdin when omitted
    #[arg(long)]
    password: Option<String>,
  },
  /// Forget the stored token
  Logout,
  /// Show the signed-in user
  Whoami,
  /// Show the token fingerprint and expiry
  Token,
  /// Raw GET of an endpoint
  Get { endpoint: String },
  /// Raw POST of a JSON body
  Post {
    endpoint: String,
    /// JSON body, or @file
    #[arg(long)]
    data: Option<String>,
  },
  /// Raw PUT of a JSON body
  Put {
    endpoint: String,
    /// JSON body, or @file
    #[arg(long)]
    data: Option<String>,
  },
  /// Raw DELETE
  Delete { endpoint: String },
  #[command(alias = "dog")]
  Dogs {
    #[command(subcommand)]
    action: RecordAction,
  },
  #[command(alias = "litter")]
  Litters {
    #[command(subcommand)]
    action: LitterAction,
  },
  #[command(alias = "puppy")]
  Puppies {
    #[command(subcommand)]
    action: RecordAction,
  },
  #[command(alias = "heat")]
  Heats {
    #[command(subcommand)]
    action: RecordAction,
  },
  #[command(alias = "customer")]
  Customers {
    #[command(subcommand)]
    action: CustomerAction,
  },
  #[command(alias = "lead")]
  Leads {
    #[command(subcommand)]
    action: LeadAction,
  },
  #[command(alias = "photo")]
  Photos {
    #[command(subcommand)]
    action: PhotoAction,
  },
  /// Upload a contract or other document
  Document {
    /// dog, litter, puppy or customer
    entity: String,
    id: i64,
    file: PathBuf,
    #[arg(long)]
    title: Option<String>,
  },
  #[command(alias = "msg")]
  Messages {
    #[command(subcommand)]
    action: MessageAction,
  },
  /// Notifications feed
  Notifications,
  /// Counts across the kennel, fetched concurrently
  Summary,
}

#[derive(Subcommand, Debug)]
pub enum RecordAction {
  List {
    /// Raw query string, e.g. gender=female
    #[arg(long)]
    query: Option<String>,
  },
  Show {
    id: i64,
  },
  Create {
    /// JSON record, or @file
    #[arg(long)]
    data: String,
  },
  Update {
    id: i64,
    /// JSON record, or @file
    #[arg(long)]
    data: String,
  },
  Delete {
    id: i64,
  },
}

#[derive(Subcommand, Debug)]
pub enum LitterAction {
  #[command(flatten)]
  Record(RecordAction),
  /// Puppies of a litter
  Puppies { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum CustomerAction {
  #[command(flatten)]
  Record(RecordAction),
  /// Replay writes made while offline
  Sync {
    /// Keep syncing on the configured interval until interrupted
    #[arg(long)]
    watch: bool,
  },
  /// Writes waiting to be replayed
  Pending,
}

#[derive(Subcommand, Debug)]
pub enum LeadAction {
  #[command(flatten)]
  Record(RecordAction),
  /// Move a lead to another stage
  Status { id: i64, status: String },
  /// Turn a lead into a customer
  Convert { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum PhotoAction {
  List {
    entity: String,
    id: i64,
  },
  Upload {
    entity: String,
    id: i64,
    #[arg(required = true)]
    files: Vec<PathBuf>,
    #[arg(long)]
    caption: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    order: Option<i64>,
    /// Make the first file the cover photo
    #[arg(long)]
    cover: bool,
  },
  Cover {
    id: i64,
  },
  Delete {
    id: i64,
  },
}

#[derive(Subcommand, Debug)]
pub enum MessageAction {
  List,
  Show { id: i64 },
  Send { id: i64, content: String },
  /// Print conversation updates as they arrive
  Watch { id: Option<i64> },
}

/// Prints user-facing notifications to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
  fn notify(&self, severity: Severity, message: &str) {
    let label = match severity {
      Severity::Info => "info",
      Severity::Warning => "warning",
      Severity::Error => "error",
    };
    eprintln!("{}: {}", label, message);
  }
}

pub struct Context {
  config: Config,
  store: Arc<dyn LocalStore>,
  client: ApiClient,
}

impl Context {
  pub fn new(config: Config, ephemeral: bool) -> Result<Self> {
    let store: Arc<dyn LocalStore> = if ephemeral {
      Arc::new(MemoryStore::new())
    } else {
      Arc::new(SqliteStore::open(config.storage.path.as_deref())?)
    };

    // An env token wins for this run and is never written to storage
    let session = match Config::get_api_token() {
      Some(token) => Session::with_token(token),
      None => Session::load(store.clone())?,
    };
    if let Some(fingerprint) = session.fingerprint() {
      debug!(token = %fingerprint, "Using session token");
    }

    let client = ApiClient::builder(config.base_url())
      .timeout(config.timeout())
      .session(session)
      .notifier(Arc::new(StderrNotifier))
      .known_missing(config.api.known_missing.iter().cloned())
      .fallbacks(config.fallback_table())
      .build()?;

    Ok(Self {
      config,
      store,
      client,
    })
  }

  fn auth(&self) -> AuthStore {
    AuthStore::new(self.client.clone(), self.store.clone())
  }

  fn customers(&self) -> CustomerApi {
    CustomerApi::new(self.client.clone(), self.store.clone())
      .with_offline(self.config.offline.enabled)
  }
}

/// Run one command. Returns false when the API call failed.
pub async fn run(ctx: &Context, command: Command) -> Result<bool> {
  let client = &ctx.client;
  match command {
    Command::Login { email, password } => {
      let password = match password {
        Some(p) => p,
        None => read_password()?,
      };
      emit(&ctx.auth().login(&email, &password).await)
    }
    Command::Logout => {
      ctx.auth().logout()?;
      print_json(&json!({ "ok": true }))?;
      Ok(true)
    }
    Command::Whoami => {
      let auth = ctx.auth();
      if !auth.is_authenticated() {
        print_json(&json!({ "authenticated": false }))?;
        return Ok(false);
      }
      emit(&auth.refresh_user().await)
    }
    Command::Token => {
      print_json(&json!({
        "fingerprint": client.session().fingerprint(),
        "status": ctx.auth().token_status(),
      }))?;
      Ok(true)
    }
    Command::Get { endpoint } => emit(&client.get(&endpoint).await),
    Command::Post { endpoint, data } => {
      let body = parse_data(data.as_deref())?;
      emit(&client.post(&endpoint, &body).await)
    }
    Command::Put { endpoint, data } => {
      let body = parse_data(data.as_deref())?;
      emit(&client.put(&endpoint, &body).await)
    }
    Command::Delete { endpoint } => emit(&client.delete(&endpoint).await),
    Command::Dogs { action } => run_records::<Dog>(client, action).await,
    Command::Puppies { action } => run_records::<Puppy>(client, action).await,
    Command::Heats { action } => run_records::<Heat>(client, action).await,
    Command::Litters { action } => match action {
      LitterAction::Record(action) => run_records::<Litter>(client, action).await,
      LitterAction::Puppies { id } => emit(&litters::litter_puppies(client, id).await),
    },
    Command::Leads { action } => run_leads(client, action).await,
    Command::Customers { action } => run_customers(ctx, action).await,
    Command::Photos { action } => run_photos(client, action).await,
    Command::Document {
      entity,
      id,
      file,
      title,
    } => {
      let part = FilePart::from_path("file", &file).await?;
      emit(&photos::upload_document(client, part, &entity, id, title.as_deref()).await)
    }
    Command::Messages { action } => run_messages(ctx, action).await,
    Command::Notifications => emit(&soft::notifications(client).await),
    Command::Summary => run_summary(client).await,
  }
}

async fn run_records<R: Resource>(client: &ApiClient, action: RecordAction) -> Result<bool> {
  match action {
    RecordAction::List { query } => {
      emit(&resource::list_where::<R>(client, query.as_deref().unwrap_or("")).await)
    }
    RecordAction::Show { id } => emit(&resource::fetch::<R>(client, id).await),
    RecordAction::Create { data } => {
      let record: R = parse_record(&data, None)?;
      emit(&resource::create(client, &record).await)
    }
    RecordAction::Update { id, data } => {
      let record: R = parse_record(&data, Some(id))?;
      emit(&resource::update(client, &record).await)
    }
    RecordAction::Delete { id } => emit(&resource::remove::<R>(client, Some(id)).await),
  }
}

async fn run_leads(client: &ApiClient, action: LeadAction) -> Result<bool> {
  match action {
    LeadAction::Record(action) => run_records::<Lead>(client, action).await,
    LeadAction::Status { id, status } => {
      let status = LeadStatus::parse(&status).ok_or_else(|| {
        let known: Vec<&str> = LeadStatus::ALL.iter().map(|s| s.as_str()).collect();
        eyre!("Unknown lead status {:?}; expected one of {}", status, known.join(", "))
      })?;
      emit(&leads::update_lead_status(client, id, status).await)
    }
    LeadAction::Convert { id } => emit(&leads::convert_lead_to_customer(client, id).await),
  }
}

async fn run_customers(ctx: &Context, action: CustomerAction) -> Result<bool> {
  let customers = ctx.customers();
  match action {
    // The full list is mirrored for offline use, so it is never filtered
    CustomerAction::Record(RecordAction::List { query: Some(query) }) => Err(eyre!(
      "customers list does not accept --query (got {:?})",
      query
    )),
    CustomerAction::Record(RecordAction::List { query: None }) => {
      emit(&customers.fetch_customers().await)
    }
    CustomerAction::Record(RecordAction::Show { id }) => emit(&customers.fetch_customer(id).await),
    CustomerAction::Record(RecordAction::Create { data }) => {
      let customer: Customer = parse_record(&data, None)?;
      emit(&customers.create_customer(&customer).await)
    }
    CustomerAction::Record(RecordAction::Update { id, data }) => {
      let customer: Customer = parse_record(&data, Some(id))?;
      emit(&customers.update_customer(&customer).await)
    }
    CustomerAction::Record(RecordAction::Delete { id }) => {
      emit(&customers.delete_customer(id).await)
    }
    CustomerAction::Sync { watch: false } => {
      let report = customers.sync_pending().await?;
      print_json(&report)?;
      Ok(report.remaining == 0)
    }
    CustomerAction::Sync { watch: true } => {
      let interval = ctx.config.sync_interval();
      info!(interval_secs = interval.as_secs(), "Syncing customers until interrupted");
      let worker = customers.spawn_sync_worker(interval);
      tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for ctrl-c: {}", e))?;
      worker.stop();
      Ok(true)
    }
    CustomerAction::Pending => {
      print_json(&customers.queue().list()?)?;
      Ok(true)
    }
  }
}

async fn run_photos(client: &ApiClient, action: PhotoAction) -> Result<bool> {
  match action {
    PhotoAction::List { entity, id } => {
      emit(&photos::fetch_photos(client, parse_entity(&entity)?, id).await)
    }
    PhotoAction::Upload {
      entity,
      id,
      files,
      caption,
      title,
      description,
      order,
      cover,
    } => {
      let entity = parse_entity(&entity)?;
      let mut uploads = Vec::with_capacity(files.len());
      for (index, path) in files.iter().enumerate() {
        let mut upload = PhotoUpload::new(FilePart::from_path("file", path).await?, entity, id);
        upload.meta.caption = caption.clone();
        upload.meta.title = title.clone();
        upload.meta.description = description.clone();
        upload.meta.order = order.map(|o| o + index as i64);
        upload.is_cover = cover && index == 0;
        uploads.push(photos::upload_photo(client, upload));
      }

      let responses = futures::future::join_all(uploads).await;
      let ok = responses.iter().all(|r| r.ok());
      print_json(&responses)?;
      Ok(ok)
    }
    PhotoAction::Cover { id } => emit(&photos::set_cover_photo(client, id).await),
    PhotoAction::Delete { id } => emit(&photos::delete_photo(client, id).await),
  }
}

async fn run_messages(ctx: &Context, action: MessageAction) -> Result<bool> {
  let mut messages = MessageStore::new(ctx.client.clone());
  match action {
    MessageAction::List => {
      let ok = messages.refresh().await;
      print_json(&messages.conversations())?;
      Ok(ok)
    }
    MessageAction::Show { id } => emit(&messages.open_conversation(id).await),
    MessageAction::Send { id, content } => {
      messages.open_conversation(id).await;
      emit(&messages.send(&content).await)
    }
    MessageAction::Watch { id } => {
      let auth = ctx.auth();
      if !auth.is_authenticated() {
        return Err(eyre!("Not signed in. Run `kennel login` first."));
      }
      if let Some(id) = id {
        messages.open_conversation(id).await;
      }
      messages.refresh().await;
      print_json(&messages.conversations())?;

      let (poller, mut events) =
        messages.start_polling(auth.subscribe(), ctx.config.poll_interval());
      loop {
        tokio::select! {
          event = events.recv() => match event {
            Some(PollEvent::Stopped) | None => break,
            Some(event) => {
              print_event(&event)?;
              messages.apply(event);
            }
          },
          _ = tokio::signal::ctrl_c() => break,
        }
      }
      poller.stop();
      Ok(true)
    }
  }
}

async fn run_summary(client: &ApiClient) -> Result<bool> {
  let (dog_list, litter_list, lead_list, notifications, health) = futures::join!(
    dogs::fetch_dogs(client),
    litters::fetch_litters(client),
    leads::fetch_leads(client),
    soft::notifications(client),
    soft::dashboard_health(client),
  );

  let count = |len: Option<usize>| len.map_or(Value::Null, Value::from);
  let active_leads = lead_list.data().map(|list| {
    list
      .iter()
      .filter(|l| !matches!(l.status, Some(LeadStatus::Converted | LeadStatus::Lost)))
      .count()
  });
  print_json(&json!({
    "dogs": count(dog_list.data().map(Vec::len)),
    "litters": count(litter_list.data().map(Vec::len)),
    "active_leads": count(active_leads),
    "unread_notifications": count(
      notifications.data().map(|list| list.iter().filter(|n| !n.is_read).count())
    ),
    "health": health.data().map(|h| h.status.clone()),
  }))?;
  Ok(dog_list.ok() && litter_list.ok() && lead_list.ok())
}

fn print_event(event: &PollEvent) -> Result<()> {
  let value = match event {
    PollEvent::Conversations(list) => json!({ "conversations": list }),
    PollEvent::Messages {
      conversation_id,
      messages,
    } => json!({ "conversation_id": conversation_id, "messages": messages }),
    PollEvent::Failed(error) => json!({ "error": error }),
    PollEvent::Stopped => json!({ "stopped": true }),
  };
  let line = serde_json::to_string(&value).map_err(|e| eyre!("Failed to encode event: {}", e))?;
  println!("{}", line);
  Ok(())
}

fn emit<T: Serialize>(response: &ApiResponse<T>) -> Result<bool> {
  print_json(response)?;
  Ok(response.ok())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  let text =
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to encode output: {}", e))?;
  let mut stdout = io::stdout().lock();
  writeln!(stdout, "{}", text).map_err(|e| eyre!("Failed to write output: {}", e))
}

/// `--data` value: inline JSON, or `@path` to read it from a file.
fn parse_data(data: Option<&str>) -> Result<Value> {
  let raw = match data {
    None => return Ok(json!({})),
    Some(d) => match d.strip_prefix('@') {
      Some(path) => read_file(Path::new(path))?,
      None => d.to_string(),
    },
  };
  serde_json::from_str(&raw).map_err(|e| eyre!("Invalid JSON in --data: {}", e))
}

fn parse_record<R: serde::de::DeserializeOwned>(data: &str, id: Option<i64>) -> Result<R> {
  let mut value = parse_data(Some(data))?;
  if let (Some(id), Some(object)) = (id, value.as_object_mut()) {
    object.insert("id".to_string(), json!(id));
  }
  serde_json::from_value(value).map_err(|e| eyre!("Record does not match the schema: {}", e))
}

fn parse_entity(entity: &str) -> Result<EntityType> {
  EntityType::parse(entity)
    .ok_or_else(|| eyre!("Unknown entity {:?}; expected dog, litter or puppy", entity))
}

fn read_file(path: &Path) -> Result<String> {
  std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
}

fn read_password() -> Result<String> {
  if let Ok(password) = std::env::var("KENNEL_PASSWORD") {
    return Ok(password);
  }
  eprint!("Password: ");
  io::stderr()
    .flush()
    .map_err(|e| eyre!("Failed to write prompt: {}", e))?;
  let mut line = String::new();
  io::stdin()
    .lock()
    .read_line(&mut line)
    .map_err(|e| eyre!("Failed to read password: {}", e))?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
